//! Per-item price resolution with source fallback and quote caching.
//!
//! The resolver owns the order of attempts: preferred source first, the
//! alternate source exactly once when the preferred one yields nothing. The
//! outcome is cached either way, so an item with no quote anywhere is not
//! re-asked until its cache entry expires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::cache::{QuoteCache, QuoteKey};
use crate::catalog::{find_entry, CatalogCache};
use crate::clients::DirectQuoteClient;
use crate::types::{InventoryItem, PriceSource, ResolvedQuote};
use crate::utils::normalize_name;

pub struct PriceResolver {
    direct: Arc<dyn DirectQuoteClient>,
    catalogs: Arc<CatalogCache>,
    /// Which registered catalog backs `PriceSource::Catalog`.
    catalog_marketplace: String,
    quote_cache: QuoteCache,
    quote_ttl: Duration,
}

impl PriceResolver {
    pub fn new(
        direct: Arc<dyn DirectQuoteClient>,
        catalogs: Arc<CatalogCache>,
        catalog_marketplace: impl Into<String>,
        quote_ttl: Duration,
    ) -> Self {
        Self {
            direct,
            catalogs,
            catalog_marketplace: catalog_marketplace.into(),
            quote_cache: QuoteCache::new(),
            quote_ttl,
        }
    }

    fn quote_key(&self, item: &InventoryItem) -> QuoteKey {
        (item.preferred_source, normalize_name(&item.name))
    }

    /// Cache-only lookup, no upstream traffic. Lets batch callers skip the
    /// concurrency gate for items that are already resolved.
    pub fn cached_quote(&self, item: &InventoryItem) -> Option<ResolvedQuote> {
        self.quote_cache.get(&self.quote_key(item))
    }

    /// Resolve a current price for one item. Preferred source first, then
    /// the alternate source once. The result, priced or not, is cached under
    /// the item's preferred source and normalized name.
    pub async fn resolve(&self, item: &InventoryItem) -> ResolvedQuote {
        let key = self.quote_key(item);
        if let Some(hit) = self.quote_cache.get(&key) {
            debug!("quote cache hit for {:?}", item.name);
            return hit;
        }

        let preferred = item.preferred_source;
        let mut source = preferred;
        let mut price = self.try_source(preferred, &item.name).await;

        if price.is_none() {
            let fallback = preferred.fallback();
            debug!(
                "{} yielded no quote for {:?}, trying {}",
                preferred, item.name, fallback
            );
            price = self.try_source(fallback, &item.name).await;
            if price.is_some() {
                source = fallback;
            }
            // On a total miss `source` stays at the preferred one.
        }

        let quote = ResolvedQuote {
            item_name: item.name.clone(),
            source,
            current_price: price,
            observed_at: Utc::now(),
        };
        self.quote_cache.insert(key, quote.clone(), self.quote_ttl);
        quote
    }

    async fn try_source(&self, source: PriceSource, item_name: &str) -> Option<f64> {
        match source {
            PriceSource::Direct => match self.direct.quote(item_name).await {
                Ok(price) => price,
                Err(e) => {
                    // A failed call is a soft miss; the fallback still runs.
                    debug!("direct quote for {:?} failed: {e}", item_name);
                    None
                }
            },
            PriceSource::Catalog => {
                let catalog = self.catalogs.get_catalog(&self.catalog_marketplace).await;
                find_entry(&catalog, item_name).and_then(|entry| entry.price())
            }
        }
    }
}
