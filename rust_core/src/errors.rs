//! Error taxonomy for the engine's boundary with the inventory collaborator.
//!
//! Per-item upstream failures (transport, protocol, parse) are absorbed into
//! `None` prices and never surface here. The only fatal condition is an
//! inventory source that cannot be read at all or yields nothing to resolve.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    /// The inventory export could not be fetched (transport failure or
    /// non-success HTTP status).
    #[error("unable to fetch inventory export: {0}")]
    Fetch(String),

    /// The export was fetched but is not readable as CSV.
    #[error("inventory export is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The export parsed but contained zero usable rows. Reported distinctly
    /// so callers never mistake an empty inventory for an empty result set.
    #[error("inventory contains no usable rows")]
    Empty,
}
