use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use crate::instrumentation::CacheMetrics;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const TTL: Duration = Duration::from_secs(24 * 60 * 60);
const TTL_MILLIS: i64 = TTL.as_millis() as i64;

pub trait Clock: Send + Sync {
    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self(AtomicI64::new(now_millis))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredEntry {
    pub value: serde_json::Value,
    pub written_at: i64,
}

/// Backing storage for [`RecordCache`]. Errors returned here never reach the
/// cache's callers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>>;

    async fn save(&self, key: &str, entry: StoredEntry) -> Result<()>;

    /// Drops the entry for `key` if it's still the one written at `written_at`.
    async fn discard(&self, key: &str, written_at: i64) -> Result<()>;
}

#[derive(Clone, Copy, Debug)]
pub enum Lookup {
    Hit,
    Miss,
    Stale,
    Error,
}

impl Lookup {
    pub fn as_label(&self) -> &'static str {
        match self {
            Lookup::Hit => "hit",
            Lookup::Miss => "miss",
            Lookup::Stale => "stale",
            Lookup::Error => "error",
        }
    }
}

/// Best-effort key/value cache with a fixed time to live.
///
/// Reads only return entries younger than [`TTL`]. Neither reads nor writes can
/// fail: storage problems are logged and turn into a miss.
#[derive(Clone)]
pub struct RecordCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    metrics: Option<CacheMetrics>,
}

impl RecordCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: CacheMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.store.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.record(Lookup::Miss);
                return None;
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Error reading from cache");
                self.record(Lookup::Error);
                return None;
            }
        };

        let age = self.clock.now_millis() - entry.written_at;
        if age >= TTL_MILLIS {
            self.record(Lookup::Stale);
            if let Err(e) = self.store.discard(key, entry.written_at).await {
                tracing::warn!(%key, error = %e, "Error discarding stale cache entry");
            }
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => {
                self.record(Lookup::Hit);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cached value doesn't decode anymore");
                self.record(Lookup::Error);
                None
            }
        }
    }

    #[tracing::instrument(skip(self, value))]
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Couldn't serialize value for cache");
                return;
            }
        };

        let entry = StoredEntry {
            value,
            written_at: self.clock.now_millis(),
        };

        if let Err(e) = self.store.save(key, entry).await {
            tracing::warn!(%key, error = %e, "Error writing to cache");
        }
    }

    fn record(&self, lookup: Lookup) {
        if let Some(metrics) = &self.metrics {
            metrics.record_lookup(lookup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn load(&self, _key: &str) -> Result<Option<StoredEntry>> {
            anyhow::bail!("store is down")
        }

        async fn save(&self, _key: &str, _entry: StoredEntry) -> Result<()> {
            anyhow::bail!("store is down")
        }

        async fn discard(&self, _key: &str, _written_at: i64) -> Result<()> {
            anyhow::bail!("store is down")
        }
    }

    fn cache_with_clock() -> (RecordCache, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(MemoryStore::default());
        let cache = RecordCache::new(store.clone()).with_clock(clock.clone());
        (cache, clock, store)
    }

    #[tokio::test]
    async fn test_fresh_entry_is_returned() {
        let (cache, clock, _) = cache_with_clock();
        cache.put("creature_pikachu", &"pika").await;
        clock.advance(TTL - Duration::from_millis(1));

        assert_eq!(
            cache.get::<String>("creature_pikachu").await.as_deref(),
            Some("pika")
        );
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let (cache, clock, store) = cache_with_clock();
        cache.put("creature_pikachu", &"pika").await;
        clock.advance(TTL);

        assert_eq!(cache.get::<String>("creature_pikachu").await, None);
        assert_eq!(store.load("creature_pikachu").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_refreshes() {
        let (cache, clock, _) = cache_with_clock();
        cache.put("creature_25", &1).await;
        clock.advance(Duration::from_secs(23 * 60 * 60));
        cache.put("creature_25", &2).await;
        clock.advance(Duration::from_secs(2 * 60 * 60));

        assert_eq!(cache.get::<i32>("creature_25").await, Some(2));
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let (cache, _, _) = cache_with_clock();
        cache.put("creature_ditto", &"not a number").await;

        assert_eq!(cache.get::<u32>("creature_ditto").await, None);
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let cache = RecordCache::new(Arc::new(BrokenStore));
        cache.put("creature_mew", &151).await;

        assert_eq!(cache.get::<u32>("creature_mew").await, None);
    }
}
