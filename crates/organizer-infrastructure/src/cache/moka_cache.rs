//! `moka`-backed implementation of the `Cache` port, used for the
//! document-analysis cache, the image-analysis cache, the model-runtime
//! preflight cache, and the folder-upsert dedup cache.
//!
//! Entries carry a per-insert TTL rather than a cache-wide one, so expiry
//! is checked on read rather than delegated to `moka`'s built-in policies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use organizer_domain::ports::Cache;
use organizer_domain::Result;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// An LRU-bounded, variable-TTL cache over `moka::future::Cache`.
pub struct InMemoryCache {
    inner: MokaCache<String, Entry>,
}

impl InMemoryCache {
    /// Build a cache capped at `max_entries`. Per-entry TTL is supplied on
    /// each `set` call rather than fixed at construction.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: MokaCache::builder().max_capacity(max_entries).build(),
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.inner.get(key).await else {
            return Ok(None);
        };
        if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
            self.inner.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl_ms: u64) -> Result<()> {
        let expires_at = if ttl_ms == 0 {
            None
        } else {
            Instant::now().checked_add(Duration::from_millis(ttl_ms))
        };
        self.inner.insert(key.to_string(), Entry { value, expires_at }).await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        let existed = self.inner.contains_key(key);
        self.inner.invalidate(key).await;
        Ok(existed)
    }

    async fn invalidate_matching(&self, substring: &str) -> Result<usize> {
        self.inner.run_pending_tasks().await;
        let matching: Vec<String> = self
            .inner
            .iter()
            .filter(|(key, _)| key.contains(substring))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        for key in &matching {
            self.inner.invalidate(key).await;
        }
        Ok(matching.len())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        self.inner.run_pending_tasks().await;
        Ok(self.inner.entry_count() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let cache = InMemoryCache::new(100);
        cache.set("k", "v".to_string(), 60_000).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = InMemoryCache::new(100);
        cache.set("k", "v".to_string(), 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let cache = InMemoryCache::new(100);
        cache.set("k", "v".to_string(), 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn invalidate_matching_removes_by_substring() {
        let cache = InMemoryCache::new(100);
        cache.set("doc::/a/report.pdf", "1".to_string(), 60_000).await.unwrap();
        cache.set("doc::/a/notes.txt", "2".to_string(), 60_000).await.unwrap();
        cache.set("doc::/b/report.pdf", "3".to_string(), 60_000).await.unwrap();
        let removed = cache.invalidate_matching("/a/").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let cache = InMemoryCache::new(100);
        cache.set("k1", "v".to_string(), 60_000).await.unwrap();
        cache.set("k2", "v".to_string(), 60_000).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_reports_whether_key_was_present() {
        let cache = InMemoryCache::new(100);
        cache.set("k", "v".to_string(), 60_000).await.unwrap();
        assert!(cache.invalidate("k").await.unwrap());
        assert!(!cache.invalidate("k").await.unwrap());
    }
}
