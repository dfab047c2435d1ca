//! In-memory TTL caches.
//!
//! Both caches in the engine (full catalog snapshots and per-item quotes)
//! share the same record container. Records expire on read; there is no
//! background eviction and no teardown, the caches live as long as the
//! process.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::{PriceSource, ResolvedQuote};

/// A value plus its expiry. Records are only ever published fully
/// constructed, so readers never observe a partially written entry.
#[derive(Debug, Clone)]
pub struct CacheRecord<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheRecord<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Key for the per-item quote cache: the source the resolution path started
/// from, plus the normalized item name.
pub type QuoteKey = (PriceSource, String);

/// Thread-safe cache of resolved quotes. Owned exclusively by the resolver;
/// only the market quote is cached, never the caller's purchase metadata.
#[derive(Default)]
pub struct QuoteCache {
    records: RwLock<HashMap<QuoteKey, CacheRecord<ResolvedQuote>>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh hit or nothing. Expired records are dropped on the way out so
    /// the map does not grow without bound.
    pub fn get(&self, key: &QuoteKey) -> Option<ResolvedQuote> {
        {
            let records = self.records.read();
            match records.get(key) {
                Some(record) if record.is_fresh() => return Some(record.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Freshness is re-checked under the write lock: an insert may have
        // replaced the record between the two locks, and a refreshed record
        // must not be evicted.
        let mut records = self.records.write();
        match records.get(key) {
            Some(record) if record.is_fresh() => Some(record.value.clone()),
            Some(_) => {
                records.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: QuoteKey, quote: ResolvedQuote, ttl: Duration) {
        self.records
            .write()
            .insert(key, CacheRecord::new(quote, ttl));
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
