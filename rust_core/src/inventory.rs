//! Lenient parsing of inventory CSV rows.
//!
//! Users maintain the sheet by hand, so rows degrade field-by-field instead
//! of being rejected wholesale: an unrecognized source falls back to the
//! direct marketplace, an unparseable paid price to 0, a bad quantity to 1.
//! The only row-level rejection is a missing item name, without which there
//! is nothing to resolve.

use tracing::warn;

use crate::errors::InventoryError;
use crate::types::{InventoryItem, PriceSource};

/// Parse CSV text into inventory items. Header names are matched after
/// trimming, lowercasing, and replacing spaces with underscores; `paid` is
/// accepted as an alias for `paid_price`. An empty result is not an error
/// here; the collaborator boundary decides whether that is fatal.
pub fn parse_inventory_csv(text: &str) -> Result<Vec<InventoryItem>, InventoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

    let mut items = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping unreadable inventory row: {e}");
                continue;
            }
        };

        let field = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        // A row without a name is not an item.
        let Some(name) = field("item_name") else {
            continue;
        };

        let preferred_source = field("source")
            .map(PriceSource::from_label)
            .unwrap_or(PriceSource::Direct);
        let paid_price = field("paid_price")
            .or_else(|| field("paid"))
            .and_then(parse_float_lenient)
            .map(|v| v.max(0.0))
            .unwrap_or(0.0);
        let quantity = field("quantity").and_then(parse_quantity).unwrap_or(1);

        items.push(InventoryItem {
            name: name.to_string(),
            preferred_source,
            paid_price,
            quantity,
        });
    }

    Ok(items)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Tolerates thousands separators and surrounding whitespace.
fn parse_float_lenient(raw: &str) -> Option<f64> {
    raw.replace(',', "").trim().parse().ok()
}

/// Quantities arrive as "2", "2.0", or garbage. Floored at 1.
fn parse_quantity(raw: &str) -> Option<u32> {
    let value = raw.parse::<f64>().ok()?;
    Some((value as i64).max(1) as u32)
}
