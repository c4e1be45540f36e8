//! `CacheInvalidationBus`: fans out invalidation events to every cache
//! subscribed to it. Caches invalidate any entry whose key
//! substring contains the affected path.

use std::sync::Arc;

use organizer_domain::ports::Cache;
use tokio::sync::broadcast;

/// An invalidation event published by whoever detects a filesystem change.
#[derive(Debug, Clone)]
pub enum InvalidationEvent {
    /// Drop every cached entry.
    FullInvalidate,
    /// A file moved or was renamed from `old_path`.
    PathChange {
        /// The path under which the entry was previously keyed.
        old_path: String,
    },
    /// A file was deleted.
    Deletion {
        /// The deleted file's path.
        path: String,
    },
    /// Several changes landed together (e.g. a directory move); applied as
    /// one coalesced fan-out rather than one event per path.
    Batch {
        /// The affected paths.
        paths: Vec<String>,
    },
}

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for `InvalidationEvent`s. `publish` is non-blocking;
/// `subscribe_cache` spawns a background task that drives one `Cache`.
pub struct CacheInvalidationBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl Default for CacheInvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidationBus {
    /// Build a bus with no subscribers yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every current subscriber. Silently drops the
    /// event if there are none (mirrors `tokio::sync::broadcast` semantics).
    pub fn publish(&self, event: InvalidationEvent) {
        let _ = self.sender.send(event);
    }

    /// Spawn a task that applies every future event to `cache`, returning a
    /// handle the caller can abort on shutdown.
    pub fn subscribe_cache(&self, cache: Arc<dyn Cache>) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.sender.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => apply_event(&cache, &event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "invalidation bus subscriber lagged, full-invalidating");
                        let _ = cache.clear().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

async fn apply_event(cache: &Arc<dyn Cache>, event: &InvalidationEvent) {
    match event {
        InvalidationEvent::FullInvalidate => {
            if let Err(error) = cache.clear().await {
                tracing::warn!(%error, "full cache invalidation failed");
            }
        }
        InvalidationEvent::PathChange { old_path } => {
            if let Err(error) = cache.invalidate_matching(old_path).await {
                tracing::warn!(%error, old_path, "path-change invalidation failed");
            }
        }
        InvalidationEvent::Deletion { path } => {
            if let Err(error) = cache.invalidate_matching(path).await {
                tracing::warn!(%error, path, "deletion invalidation failed");
            }
        }
        InvalidationEvent::Batch { paths } => {
            for path in paths {
                if let Err(error) = cache.invalidate_matching(path).await {
                    tracing::warn!(%error, path, "batched invalidation failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::moka_cache::InMemoryCache;
    use std::time::Duration;

    #[tokio::test]
    async fn deletion_event_invalidates_matching_entries() {
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new(100));
        cache.set("doc::/a/report.pdf", "1".into(), 60_000).await.unwrap();
        cache.set("doc::/b/notes.txt", "2".into(), 60_000).await.unwrap();

        let bus = CacheInvalidationBus::new();
        let handle = bus.subscribe_cache(cache.clone());
        bus.publish(InvalidationEvent::Deletion { path: "/a/report.pdf".to_string() });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.len().await.unwrap(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn full_invalidate_clears_everything() {
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new(100));
        cache.set("k1", "v".into(), 60_000).await.unwrap();
        cache.set("k2", "v".into(), 60_000).await.unwrap();

        let bus = CacheInvalidationBus::new();
        let handle = bus.subscribe_cache(cache.clone());
        bus.publish(InvalidationEvent::FullInvalidate);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.is_empty().await.unwrap());
        handle.abort();
    }
}
