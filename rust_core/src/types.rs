//! Core data model for inventory pricing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace a quote can come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Exact-name, single-item price lookup (Steam community market).
    Direct,
    /// Bulk catalog listing refreshed periodically and searched locally (Skinport).
    Catalog,
}

impl PriceSource {
    /// The alternate source tried when this one yields no quote.
    pub fn fallback(&self) -> PriceSource {
        match self {
            PriceSource::Direct => PriceSource::Catalog,
            PriceSource::Catalog => PriceSource::Direct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Direct => "direct",
            PriceSource::Catalog => "catalog",
        }
    }

    /// Parse a source label from an inventory row. Case-insensitive; both the
    /// generic labels and the marketplace names are accepted. Anything
    /// unrecognized defaults to the direct source.
    pub fn from_label(label: &str) -> PriceSource {
        match label.trim().to_lowercase().as_str() {
            "catalog" | "skinport" => PriceSource::Catalog,
            _ => PriceSource::Direct,
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a user's inventory, as produced by the inventory collaborator.
/// Immutable once read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub preferred_source: PriceSource,
    pub paid_price: f64,
    pub quantity: u32,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preferred_source: PriceSource::Direct,
            paid_price: 0.0,
            quantity: 1,
        }
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.preferred_source = source;
        self
    }

    pub fn with_paid_price(mut self, paid: f64) -> Self {
        self.paid_price = paid;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }
}

/// Outcome of one price resolution. `current_price == None` means
/// "no match / no data", which is distinct from a price of zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedQuote {
    pub item_name: String,
    pub source: PriceSource,
    pub current_price: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// A resolved quote joined with the originating item's purchase data plus
/// derived profit metrics. Computed once per request, never persisted.
/// All derived fields are `None` iff `current_price` is `None`
/// (`percent_change` additionally requires a non-zero paid price).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricedItem {
    pub item_name: String,
    pub source: PriceSource,
    pub paid_price: f64,
    pub current_price: Option<f64>,
    pub quantity: u32,
    pub profit_per_item: Option<f64>,
    pub profit_total: Option<f64>,
    pub percent_change: Option<f64>,
    pub timestamp_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_labels() {
        assert_eq!(PriceSource::from_label("skinport"), PriceSource::Catalog);
        assert_eq!(PriceSource::from_label("CATALOG"), PriceSource::Catalog);
        assert_eq!(PriceSource::from_label("steam"), PriceSource::Direct);
        assert_eq!(PriceSource::from_label("direct"), PriceSource::Direct);
        // Unrecognized labels fall back to the direct source.
        assert_eq!(PriceSource::from_label("ebay"), PriceSource::Direct);
        assert_eq!(PriceSource::from_label(""), PriceSource::Direct);
    }

    #[test]
    fn test_source_fallback_is_involution() {
        assert_eq!(PriceSource::Direct.fallback(), PriceSource::Catalog);
        assert_eq!(PriceSource::Catalog.fallback(), PriceSource::Direct);
        assert_eq!(PriceSource::Direct.fallback().fallback(), PriceSource::Direct);
    }

    #[test]
    fn test_item_builder_floors_quantity() {
        let item = InventoryItem::new("AK-47 | Redline").with_quantity(0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&PriceSource::Catalog).unwrap();
        assert_eq!(json, "\"catalog\"");
    }
}
