//! Response cache for the generic CRUD endpoints.
//!
//! Keys are `{table}:{operation}:{params}`; invalidation is coarse: any
//! successful write to a table drops every entry under that table's prefix.
//! Races between readers and writers are benign (worst case a stale read
//! within the TTL window).

use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Cache<String, Value>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: Value) {
        self.inner.insert(key, value).await;
    }

    /// Drops every cached response whose key is prefixed by `{table}:`.
    pub fn invalidate_table(&self, table: &str) {
        let prefix = format!("{table}:");
        if let Err(e) = self.inner.invalidate_entries_if(move |key, _| key.starts_with(&prefix)) {
            tracing::error!(error = %e, table, "Cache invalidation failed");
        }
    }

    /// Builds a list cache key from the four discriminating list inputs.
    #[must_use]
    pub fn list_key(table: &str, page: u32, page_size: u32, sort_by: &str, sort_order: &str) -> String {
        format!("{table}:list:{page}:{page_size}:{sort_by}:{sort_order}")
    }

    /// Builds a get-by-id cache key from the exact id tuple.
    #[must_use]
    pub fn get_key(table: &str, id_segments: &[String]) -> String {
        format!("{table}:get:{}", id_segments.join(":"))
    }
}
