//! Marketplace catalog snapshots: fetch, cache, and search.
//!
//! A catalog upstream returns its full priced listing in one call, so the
//! engine fetches it rarely (long TTL) and searches it locally. The cache
//! guarantees single-flight per marketplace: concurrent misses collapse into
//! one upstream fetch, with waiters either blocking on the in-flight fetch
//! or being served the previous snapshot when one exists.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::CacheRecord;
use crate::utils::normalize_name;
use crate::utils::parse_price_str;

pub mod matcher;

pub use matcher::find_entry;

/// Price-valued fields checked on a catalog entry, in preference order.
/// The first field that is present and parseable wins.
const PRICE_FIELD_PREFERENCE: &[&str] = &[
    "median_price",
    "min_price",
    "suggested_price",
    "mean_price",
    "price",
    "market_price",
    "last_price",
];

/// One read-only entry of an upstream catalog snapshot. Upstream payloads
/// vary in which name and price fields they carry, so everything beyond the
/// two name fields is kept as raw values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "market_hash_name")]
    pub alternate_name: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl CatalogEntry {
    /// The names this entry can be matched under, normalized.
    pub fn normalized_names(&self) -> impl Iterator<Item = String> + '_ {
        self.name
            .iter()
            .chain(self.alternate_name.iter())
            .map(|n| normalize_name(n))
    }

    /// Extract a representative price from whichever price-valued field the
    /// upstream happened to include. Values may be JSON numbers or
    /// locale-ambiguous display strings.
    pub fn price(&self) -> Option<f64> {
        for field in PRICE_FIELD_PREFERENCE {
            match self.fields.get(*field) {
                Some(serde_json::Value::Number(n)) => {
                    if let Some(v) = n.as_f64() {
                        return Some(v);
                    }
                }
                Some(serde_json::Value::String(s)) => {
                    if let Some(v) = parse_price_str(s) {
                        return Some(v);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Catalog fetch failures, split by whether a retry can help.
#[derive(Debug, Error)]
pub enum CatalogFetchError {
    /// Timeouts, connection errors, HTTP 5xx. Worth retrying.
    #[error("transient catalog failure: {0}")]
    Transient(String),

    /// HTTP 4xx or an unusable payload. Retrying sends the same request to
    /// the same answer.
    #[error("permanent catalog failure: {0}")]
    Permanent(String),
}

impl CatalogFetchError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, CatalogFetchError::Transient(_))
    }
}

/// A marketplace that can produce its full catalog in one call.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Marketplace identifier, used as the cache key (e.g. "skinport").
    fn marketplace_id(&self) -> &str;

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, CatalogFetchError>;
}

enum FlightRole {
    Leader(watch::Sender<()>),
    Follower(watch::Receiver<()>),
}

/// TTL-cached, single-flight catalog store for any number of marketplaces.
///
/// `get_catalog` never fails: transient trouble degrades to the last good
/// snapshot when one exists, or an empty catalog otherwise.
pub struct CatalogCache {
    fetchers: HashMap<String, Arc<dyn CatalogFetcher>>,
    snapshots: RwLock<HashMap<String, CacheRecord<Arc<Vec<CatalogEntry>>>>>,
    inflight: Mutex<HashMap<String, watch::Receiver<()>>>,
    ttl: Duration,
    max_attempts: u32,
    retry_base: Duration,
}

impl CatalogCache {
    pub fn new(ttl: Duration, max_attempts: u32, retry_base: Duration) -> Self {
        Self {
            fetchers: HashMap::new(),
            snapshots: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            ttl,
            max_attempts: max_attempts.max(1),
            retry_base,
        }
    }

    /// Register a marketplace fetcher under its own id.
    pub fn register(&mut self, fetcher: Arc<dyn CatalogFetcher>) {
        info!("registering catalog fetcher: {}", fetcher.marketplace_id());
        self.fetchers
            .insert(fetcher.marketplace_id().to_string(), fetcher);
    }

    /// Current snapshot for a marketplace, fetching if empty or expired.
    /// Always returns: the fresh snapshot, the previous snapshot when a
    /// refresh is in flight or failed, or an empty list when there has never
    /// been a successful fetch.
    pub async fn get_catalog(&self, marketplace_id: &str) -> Arc<Vec<CatalogEntry>> {
        if let Some(entries) = self.fresh_snapshot(marketplace_id) {
            return entries;
        }

        let Some(fetcher) = self.fetchers.get(marketplace_id) else {
            warn!("no catalog fetcher registered for {marketplace_id:?}");
            return Arc::new(Vec::new());
        };

        let role = {
            let mut inflight = self.inflight.lock();
            if let Some(rx) = inflight.get(marketplace_id) {
                FlightRole::Follower(rx.clone())
            } else {
                let (tx, rx) = watch::channel(());
                inflight.insert(marketplace_id.to_string(), rx);
                FlightRole::Leader(tx)
            }
        };

        match role {
            FlightRole::Follower(mut rx) => {
                // A stale snapshot is still usable while someone else
                // refreshes; only first-ever callers have to wait.
                if let Some(entries) = self.any_snapshot(marketplace_id) {
                    debug!("serving previous {marketplace_id} snapshot during refresh");
                    return entries;
                }
                // Resolves when the leader drops its sender.
                let _ = rx.changed().await;
                self.any_snapshot(marketplace_id).unwrap_or_default()
            }
            FlightRole::Leader(_tx) => {
                // Another flight may have landed between the freshness check
                // and winning leadership.
                if let Some(entries) = self.fresh_snapshot(marketplace_id) {
                    self.inflight.lock().remove(marketplace_id);
                    return entries;
                }

                match self.fetch_with_retry(fetcher.as_ref()).await {
                    Ok(entries) => {
                        info!(
                            "refreshed {} catalog: {} entries",
                            marketplace_id,
                            entries.len()
                        );
                        self.snapshots.write().insert(
                            marketplace_id.to_string(),
                            CacheRecord::new(Arc::new(entries), self.ttl),
                        );
                    }
                    Err(e) => {
                        // Keep whatever snapshot we had; expired beats empty.
                        warn!("catalog fetch for {marketplace_id} failed: {e}");
                    }
                }

                self.inflight.lock().remove(marketplace_id);
                // Dropping _tx here wakes every follower.
                self.any_snapshot(marketplace_id).unwrap_or_default()
            }
        }
    }

    fn fresh_snapshot(&self, marketplace_id: &str) -> Option<Arc<Vec<CatalogEntry>>> {
        let snapshots = self.snapshots.read();
        snapshots
            .get(marketplace_id)
            .filter(|record| record.is_fresh())
            .map(|record| record.value.clone())
    }

    /// Any snapshot, fresh or expired.
    fn any_snapshot(&self, marketplace_id: &str) -> Option<Arc<Vec<CatalogEntry>>> {
        let snapshots = self.snapshots.read();
        snapshots
            .get(marketplace_id)
            .map(|record| record.value.clone())
    }

    async fn fetch_with_retry(
        &self,
        fetcher: &dyn CatalogFetcher,
    ) -> Result<Vec<CatalogEntry>, CatalogFetchError> {
        let mut attempt = 1u32;
        loop {
            match fetcher.fetch_catalog().await {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_retriable() && attempt < self.max_attempts => {
                    let backoff = self.retry_base * attempt;
                    warn!(
                        "catalog fetch attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, e, backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn entry(name: &str, median: &str) -> CatalogEntry {
        let mut fields = serde_json::Map::new();
        fields.insert(
            "median_price".to_string(),
            serde_json::Value::String(median.to_string()),
        );
        CatalogEntry {
            name: Some(name.to_string()),
            alternate_name: None,
            fields,
        }
    }

    struct MockFetcher {
        calls: Arc<AtomicU32>,
        delay: Duration,
        /// Results consumed one per call; the last one repeats.
        outcomes: Vec<Result<Vec<CatalogEntry>, &'static str>>,
    }

    impl MockFetcher {
        fn succeeding(calls: Arc<AtomicU32>, delay: Duration) -> Self {
            Self {
                calls,
                delay,
                outcomes: vec![Ok(vec![entry("AK-47 | Redline (Field-Tested)", "12.50")])],
            }
        }
    }

    #[async_trait]
    impl CatalogFetcher for MockFetcher {
        fn marketplace_id(&self) -> &str {
            "mock"
        }

        async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, CatalogFetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            let outcome = self
                .outcomes
                .get(call)
                .or_else(|| self.outcomes.last())
                .expect("at least one outcome");
            match outcome {
                Ok(entries) => Ok(entries.clone()),
                Err(msg) if msg.starts_with("permanent") => {
                    Err(CatalogFetchError::Permanent(msg.to_string()))
                }
                Err(msg) => Err(CatalogFetchError::Transient(msg.to_string())),
            }
        }
    }

    fn cache_with(fetcher: MockFetcher, ttl: Duration) -> CatalogCache {
        let mut cache = CatalogCache::new(ttl, 3, Duration::from_millis(1));
        cache.register(Arc::new(fetcher));
        cache
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_into_one_fetch() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = Arc::new(cache_with(
            MockFetcher::succeeding(calls.clone(), Duration::from_millis(100)),
            Duration::from_secs(60),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(
                async move { cache.get_catalog("mock").await },
            ));
        }
        for handle in handles {
            let catalog = handle.await.expect("task completes");
            assert_eq!(catalog.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_issues_no_upstream_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = cache_with(
            MockFetcher::succeeding(calls.clone(), Duration::ZERO),
            Duration::from_secs(60),
        );

        cache.get_catalog("mock").await;
        cache.get_catalog("mock").await;
        cache.get_catalog("mock").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_triggers_exactly_one_refetch() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = cache_with(
            MockFetcher::succeeding(calls.clone(), Duration::ZERO),
            Duration::from_millis(30),
        );

        cache.get_catalog("mock").await;
        sleep(Duration::from_millis(60)).await;
        cache.get_catalog("mock").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_retry_with_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetcher = MockFetcher {
            calls: calls.clone(),
            delay: Duration::ZERO,
            outcomes: vec![
                Err("transient 503"),
                Err("transient 503"),
                Ok(vec![entry("AWP | Asiimov (Field-Tested)", "81.20")]),
            ],
        };
        let cache = cache_with(fetcher, Duration::from_secs(60));

        let catalog = cache.get_catalog("mock").await;
        assert_eq!(catalog.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_does_not_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetcher = MockFetcher {
            calls: calls.clone(),
            delay: Duration::ZERO,
            outcomes: vec![Err("permanent 404")],
        };
        let cache = cache_with(fetcher, Duration::from_secs(60));

        let catalog = cache.get_catalog("mock").await;
        assert!(catalog.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetcher = MockFetcher {
            calls: calls.clone(),
            delay: Duration::ZERO,
            outcomes: vec![
                Ok(vec![entry("AK-47 | Redline (Field-Tested)", "12.50")]),
                Err("permanent 400"),
            ],
        };
        let cache = cache_with(fetcher, Duration::from_millis(20));

        let first = cache.get_catalog("mock").await;
        assert_eq!(first.len(), 1);

        sleep(Duration::from_millis(40)).await;
        let second = cache.get_catalog("mock").await;
        // Expired beats empty: the old snapshot survives the failed refresh.
        assert_eq!(second.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unregistered_marketplace_yields_empty_catalog() {
        let cache = CatalogCache::new(Duration::from_secs(60), 3, Duration::from_millis(1));
        assert!(cache.get_catalog("nowhere").await.is_empty());
    }

    #[test]
    fn test_entry_price_field_preference() {
        let mut fields = serde_json::Map::new();
        fields.insert("min_price".to_string(), serde_json::json!(10.0));
        fields.insert("median_price".to_string(), serde_json::json!("11.25"));
        let e = CatalogEntry {
            name: Some("x".to_string()),
            alternate_name: None,
            fields,
        };
        assert_eq!(e.price(), Some(11.25));
    }

    #[test]
    fn test_entry_price_skips_unparseable_and_falls_through() {
        let mut fields = serde_json::Map::new();
        fields.insert("median_price".to_string(), serde_json::json!("n/a"));
        fields.insert("min_price".to_string(), serde_json::json!("9,50"));
        let e = CatalogEntry {
            name: Some("x".to_string()),
            alternate_name: None,
            fields,
        };
        assert_eq!(e.price(), Some(9.5));
    }

    #[test]
    fn test_entry_without_price_fields() {
        let e = entry("bare", "");
        assert_eq!(e.price(), None);
    }

    #[test]
    fn test_entry_deserializes_from_upstream_shape() {
        let e: CatalogEntry = serde_json::from_value(serde_json::json!({
            "market_hash_name": "AK-47 | Redline (Field-Tested)",
            "currency": "CAD",
            "min_price": 11.02,
            "median_price": 12.50,
            "quantity": 431
        }))
        .expect("upstream entry deserializes");
        assert_eq!(
            e.alternate_name.as_deref(),
            Some("AK-47 | Redline (Field-Tested)")
        );
        assert!(e.name.is_none());
        assert_eq!(e.price(), Some(12.5));
    }
}
