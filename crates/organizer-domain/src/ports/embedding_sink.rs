//! `EmbeddingSink`: boundary the analyzer pipeline enqueues finished
//! embeddings through, so `organizer-application` never needs to depend on
//! the concrete durable queue implementation that lives further out.

use async_trait::async_trait;

use crate::value_objects::{QueueItem, Stage};
use crate::Result;

/// Destination for a finished analysis embedding.
#[async_trait]
pub trait EmbeddingSink: Send + Sync {
    /// Enqueue `item` for `stage`'s eventual delivery to the vector store.
    async fn enqueue(&self, stage: Stage, item: QueueItem) -> Result<()>;
}
