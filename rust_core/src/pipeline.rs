//! Batch resolution with bounded upstream concurrency.
//!
//! Every item is priced concurrently, but at most `concurrency` resolutions
//! talk upstream at once, each preceded by a pacing delay. Items already in
//! the quote cache skip the gate and the delay entirely. Output order
//! matches input order regardless of completion order.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::info;

use crate::resolver::PriceResolver;
use crate::types::{InventoryItem, PricedItem, ResolvedQuote};

pub struct FetchPipeline {
    resolver: Arc<PriceResolver>,
    concurrency: usize,
    request_delay: Duration,
}

impl FetchPipeline {
    pub fn new(resolver: Arc<PriceResolver>, concurrency: usize, request_delay: Duration) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
            request_delay,
        }
    }

    /// Price a whole inventory. One output per input item, in input order.
    /// An unresolvable item produces a row with `current_price: None`, never
    /// a missing row.
    pub async fn resolve_all(&self, items: &[InventoryItem]) -> Vec<PricedItem> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let futures = items.iter().map(|item| {
            let semaphore = semaphore.clone();
            async move {
                // Cache hits bypass the gate; the delay only paces upstream
                // traffic.
                let quote = match self.resolver.cached_quote(item) {
                    Some(quote) => quote,
                    None => {
                        let _permit = semaphore.acquire().await.ok();
                        if !self.request_delay.is_zero() {
                            sleep(self.request_delay).await;
                        }
                        self.resolver.resolve(item).await
                    }
                };
                price_item(quote, item)
            }
        });

        let priced = join_all(futures).await;
        info!(
            "priced {} items ({} with a current price)",
            priced.len(),
            priced.iter().filter(|p| p.current_price.is_some()).count()
        );
        priced
    }
}

/// Join a resolved quote with the item's purchase data and derive the profit
/// metrics. Monetary outputs are rounded to cents here and nowhere earlier;
/// the per-item profit is rounded first and the total and percent change are
/// derived from that rounded value.
pub fn price_item(quote: ResolvedQuote, item: &InventoryItem) -> PricedItem {
    let (profit_per_item, profit_total, percent_change) = match quote.current_price {
        Some(current) => {
            let per = round2(current - item.paid_price);
            let pct = if item.paid_price != 0.0 {
                Some(round2(per / item.paid_price * 100.0))
            } else {
                None
            };
            (Some(per), Some(round2(per * item.quantity as f64)), pct)
        }
        None => (None, None, None),
    };

    PricedItem {
        item_name: item.name.clone(),
        source: quote.source,
        paid_price: item.paid_price,
        current_price: quote.current_price.map(round2),
        quantity: item.quantity,
        profit_per_item,
        profit_total,
        percent_change,
        timestamp_utc: quote.observed_at,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogCache;
    use crate::clients::DirectQuoteClient;
    use crate::types::PriceSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quote(price: Option<f64>) -> ResolvedQuote {
        ResolvedQuote {
            item_name: "x".to_string(),
            source: PriceSource::Direct,
            current_price: price,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_profit_metrics() {
        let item = InventoryItem::new("AK-47 | Redline (Field-Tested)")
            .with_paid_price(10.0)
            .with_quantity(2);
        let priced = price_item(quote(Some(12.5)), &item);
        assert_eq!(priced.current_price, Some(12.5));
        assert_eq!(priced.profit_per_item, Some(2.5));
        assert_eq!(priced.profit_total, Some(5.0));
        assert_eq!(priced.percent_change, Some(25.0));
    }

    #[test]
    fn test_no_price_propagates_none_metrics() {
        let item = InventoryItem::new("Ghost Item").with_paid_price(10.0);
        let priced = price_item(quote(None), &item);
        assert_eq!(priced.current_price, None);
        assert_eq!(priced.profit_per_item, None);
        assert_eq!(priced.profit_total, None);
        assert_eq!(priced.percent_change, None);
    }

    #[test]
    fn test_zero_paid_price_suppresses_percent_change() {
        let item = InventoryItem::new("Drop");
        let priced = price_item(quote(Some(3.0)), &item);
        assert_eq!(priced.profit_per_item, Some(3.0));
        assert_eq!(priced.percent_change, None);
    }

    #[test]
    fn test_rounding_to_cents() {
        let item = InventoryItem::new("x").with_paid_price(3.0).with_quantity(3);
        let priced = price_item(quote(Some(3.3333)), &item);
        assert_eq!(priced.current_price, Some(3.33));
        assert_eq!(priced.profit_per_item, Some(0.33));
        assert_eq!(priced.profit_total, Some(0.99));
        assert_eq!(priced.percent_change, Some(11.0));
    }

    #[test]
    fn test_total_and_percent_derive_from_rounded_per_item() {
        // per rounds to 0.33; the total is 3 x 0.33, not 3 x 0.3333, and the
        // percent change is 0.33 / 3.0, not 0.3333 / 3.0.
        let item = InventoryItem::new("x").with_paid_price(3.0).with_quantity(3);
        let priced = price_item(quote(Some(3.3333)), &item);
        let per = priced.profit_per_item.expect("priced");
        assert_eq!(priced.profit_total, Some(round2(per * 3.0)));
        assert_eq!(priced.percent_change, Some(round2(per / 3.0 * 100.0)));
    }

    /// Tracks how many quote calls are in flight at once.
    struct GaugedDirect {
        in_flight: Arc<AtomicU32>,
        max_seen: Arc<AtomicU32>,
    }

    #[async_trait]
    impl DirectQuoteClient for GaugedDirect {
        fn source_name(&self) -> &str {
            "gauged"
        }

        async fn quote(&self, _item_name: &str) -> Result<Option<f64>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(1.0))
        }
    }

    fn pipeline_with_gauge(
        concurrency: usize,
        delay: Duration,
    ) -> (FetchPipeline, Arc<AtomicU32>) {
        let max_seen = Arc::new(AtomicU32::new(0));
        let direct = Arc::new(GaugedDirect {
            in_flight: Arc::new(AtomicU32::new(0)),
            max_seen: max_seen.clone(),
        });
        let catalogs = Arc::new(CatalogCache::new(
            Duration::from_secs(60),
            1,
            Duration::from_millis(1),
        ));
        let resolver = Arc::new(PriceResolver::new(
            direct,
            catalogs,
            "none",
            Duration::from_secs(60),
        ));
        (FetchPipeline::new(resolver, concurrency, delay), max_seen)
    }

    #[tokio::test]
    async fn test_one_output_per_input_in_order() {
        let (pipeline, _) = pipeline_with_gauge(4, Duration::ZERO);
        let items: Vec<InventoryItem> = (0..10)
            .map(|i| InventoryItem::new(format!("item {i}")))
            .collect();

        let priced = pipeline.resolve_all(&items).await;
        assert_eq!(priced.len(), 10);
        for (i, p) in priced.iter().enumerate() {
            assert_eq!(p.item_name, format!("item {i}"));
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let (pipeline, max_seen) = pipeline_with_gauge(2, Duration::ZERO);
        let items: Vec<InventoryItem> = (0..12)
            .map(|i| InventoryItem::new(format!("item {i}")))
            .collect();

        pipeline.resolve_all(&items).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cached_items_skip_the_gate() {
        let (pipeline, _) = pipeline_with_gauge(1, Duration::from_millis(50));
        let items = vec![InventoryItem::new("Chroma 3 Case")];

        // First pass pays the delay and populates the cache.
        pipeline.resolve_all(&items).await;

        let start = tokio::time::Instant::now();
        let priced = pipeline.resolve_all(&items).await;
        assert_eq!(priced[0].current_price, Some(1.0));
        assert!(start.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let (pipeline, _) = pipeline_with_gauge(0, Duration::ZERO);
        let items = vec![InventoryItem::new("Chroma 3 Case")];
        let priced = pipeline.resolve_all(&items).await;
        assert_eq!(priced.len(), 1);
    }
}
