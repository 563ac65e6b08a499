//! Short-lived read-through cache for price lookups.
//!
//! Entries expire after a fixed TTL and are purged on the next access;
//! there is no background sweep.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use tracing::debug;

use crate::storage::lock;

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Live value for `key`, evicting every expired entry first.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = lock(&self.entries);
        let now = Utc::now();
        let ttl = self.ttl;
        entries.retain(|_, entry| now - entry.inserted_at < ttl);
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        lock(&self.entries).insert(
            key,
            CacheEntry {
                value,
                inserted_at: Utc::now(),
            },
        );
    }

    /// Cached value, or the result of `fetch` stored under `key`. Errors
    /// from `fetch` are returned and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Price feed
// ---------------------------------------------------------------------------

/// Spot price lookup used by signal producers.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<f64>;
}

/// A `PriceFeed` fronted by a `TtlCache`.
pub struct CachedPriceFeed<F> {
    inner: F,
    cache: TtlCache<String, f64>,
}

impl<F: PriceFeed> CachedPriceFeed<F> {
    pub fn new(inner: F, ttl_secs: u64) -> Self {
        let ttl = Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000));
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<F: PriceFeed> PriceFeed for CachedPriceFeed<F> {
    async fn price(&self, symbol: &str) -> Result<f64> {
        let key = symbol.to_uppercase();
        let lookup = key.clone();
        let inner = &self.inner;
        self.cache
            .get_or_try_insert_with(key, move || async move {
                debug!(symbol = %lookup, "Price cache miss");
                inner.price(&lookup).await
            })
            .await
    }
}
