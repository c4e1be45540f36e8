//! In-flight call deduplication: collapses concurrent identical model
//! calls into a single underlying call, keyed by the
//! caller-supplied `{type, filename, content_hash, model, folder_set_hash}`
//! composite string.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use tokio::sync::Mutex as AsyncMutex;

use organizer_domain::Error;

type BoxFuture<V> = Pin<Box<dyn Future<Output = Result<V, Arc<Error>>> + Send>>;

/// Collapses concurrent calls sharing a dedup key into one underlying
/// call; every caller for that key observes the same result.
pub struct CallDeduplicator<V: Clone + Send + Sync + 'static> {
    inflight: AsyncMutex<HashMap<String, Shared<BoxFuture<V>>>>,
}

impl<V: Clone + Send + Sync + 'static> Default for CallDeduplicator<V> {
    fn default() -> Self {
        Self { inflight: AsyncMutex::new(HashMap::new()) }
    }
}

impl<V: Clone + Send + Sync + 'static> CallDeduplicator<V> {
    /// Build an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make_call` for `key` unless a call for the same key is already
    /// in flight, in which case await that one instead.
    pub async fn call<F, Fut>(&self, key: String, make_call: F) -> Result<V, Arc<Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let mut guard = self.inflight.lock().await;
        if let Some(existing) = guard.get(&key) {
            let shared = existing.clone();
            drop(guard);
            return shared.await;
        }
        let fut = make_call();
        let boxed: BoxFuture<V> = Box::pin(async move { fut.await.map_err(Arc::new) });
        let shared = boxed.shared();
        guard.insert(key.clone(), shared.clone());
        drop(guard);

        let result = shared.await;
        self.inflight.lock().await.remove(&key);
        result
    }
}

/// Build the composite dedup key.
#[must_use]
pub fn dedup_key(
    item_type: &str,
    filename: &str,
    content_hash: &str,
    model: &str,
    folder_set_hash: &str,
) -> String {
    format!("{item_type}|{filename}|{content_hash}|{model}|{folder_set_hash}")
}
