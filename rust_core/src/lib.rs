//! Core pricing engine for the Skinfolio backend.
//!
//! Turns a user's inventory of tradable items into a valued portfolio:
//! - Inventory ingestion from a CSV export (Google Sheets)
//! - Name normalization so decorated and plain spellings match
//! - Two upstream shapes: direct per-item quotes and bulk catalog snapshots
//! - TTL caches with single-flight catalog refresh
//! - Per-item resolution with one-shot source fallback
//! - Batch pipeline with bounded concurrency and request pacing

pub mod cache;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod errors;
pub mod inventory;
pub mod pipeline;
pub mod resolver;
mod types;
pub mod utils;

pub use types::{InventoryItem, PriceSource, PricedItem, ResolvedQuote};
