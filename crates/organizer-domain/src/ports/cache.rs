//! `Cache`: content-addressed key/value capability with TTL.
//!
//! One trait backs the document-analysis cache, the image-analysis cache,
//! the model-runtime preflight cache, and the folder-upsert dedup cache —
//! only the key shape and TTL differ per use site.

use async_trait::async_trait;

use crate::error::Result;

/// Capability trait for a TTL'd key/value cache. Implementations decide
/// eviction policy (LRU, etc.); callers only see get/set/invalidate.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a cached JSON-serialized value by key, if present and not
    /// expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert a JSON-serialized value under `key` with the given
    /// time-to-live in milliseconds.
    async fn set(&self, key: &str, value: String, ttl_ms: u64) -> Result<()>;

    /// Remove a single key, returning whether it was present.
    async fn invalidate(&self, key: &str) -> Result<bool>;

    /// Remove every entry whose key contains `substring`.
    async fn invalidate_matching(&self, substring: &str) -> Result<usize>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Number of live entries, for diagnostics.
    async fn len(&self) -> Result<usize>;

    /// Whether the cache currently holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
