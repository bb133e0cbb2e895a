use moka::future::Cache;
use std::time::Duration;

/// Hot cache of raw reference JSON, keyed by reference key.
///
/// Misses are cached too (as `None`) so repeated lookups of unknown
/// drugs do not hit SQLite on every request.
pub struct MemoryCache {
    inner: Cache<String, Option<String>>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// `None` when the key was never looked up, `Some(None)` for a cached miss.
    pub async fn get(&self, key: &str) -> Option<Option<String>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: Option<String>) {
        self.inner.insert(key, value).await;
    }
}
