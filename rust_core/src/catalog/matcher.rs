//! Resolve an item name to an entry in a cached catalog.
//!
//! Two passes over the snapshot: exact normalized equality first, then a
//! looser containment pass for catalog entries that carry extra decoration.
//! Ties break by catalog order, first match wins. The containment pass can
//! pick an unrelated entry for short or generic names; that imprecision is
//! accepted as the cost of matching decorated listings at all.

use super::CatalogEntry;
use crate::utils::normalize_name;

/// Find the catalog entry for a target item name, or `None` when neither
/// pass matches anything.
pub fn find_entry<'a>(catalog: &'a [CatalogEntry], target_name: &str) -> Option<&'a CatalogEntry> {
    let target = normalize_name(target_name);
    if target.is_empty() {
        return None;
    }

    // Pass 1: exact normalized match on either name field.
    if let Some(found) = catalog
        .iter()
        .find(|entry| entry.normalized_names().any(|name| name == target))
    {
        return Some(found);
    }

    // Pass 2: best-effort containment, for entries with extra decoration.
    catalog
        .iter()
        .find(|entry| entry.normalized_names().any(|name| name.contains(&target)))
}
