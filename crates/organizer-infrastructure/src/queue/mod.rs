//! Embedding work queue: two durable, batched stage queues (`analysis`,
//! `organize`) sitting ahead of the vector store, plus the persistence,
//! failed-items, and dead-letter machinery they share.

/// Terminal parking lot for items that exhaust `ITEM_MAX_RETRIES`.
pub mod dead_letter;
/// Per-item retry bookkeeping between flush attempts.
pub mod failed_items;
/// Atomic sidecar read/write helpers.
pub mod persistence;
/// The per-stage queue state machine.
pub mod stage_queue;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use organizer_domain::ports::{Clock, EmbeddingSink, VectorStore};
use organizer_domain::value_objects::{FileKind, QueueItem, Stage};
use organizer_domain::Result;

pub use dead_letter::DeadLetterStore;
pub use failed_items::{FailedItem, FailedItemsMap};
pub use stage_queue::{CapacityWait, QueueState, StageQueue};

/// Owns both stage queues and fans path-change/removal events out to
/// whichever of them holds the affected item.
pub struct EmbeddingQueueSet {
    analysis: StageQueue,
    organize: StageQueue,
}

impl EmbeddingQueueSet {
    /// Load both stage queues from `data_dir`, restoring any buffered items
    /// from their sidecars.
    pub async fn load(data_dir: &Path, vector_store: Arc<dyn VectorStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let analysis = StageQueue::load(Stage::Analysis, data_dir, vector_store.clone(), clock.clone()).await?;
        let organize = StageQueue::load(Stage::Organize, data_dir, vector_store, clock).await?;
        Ok(Self { analysis, organize })
    }

    /// The queue for `stage`.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> &StageQueue {
        match stage {
            Stage::Analysis => &self.analysis,
            Stage::Organize => &self.organize,
        }
    }

    /// Enqueue `item` onto its stage's buffer, flushing immediately if the
    /// batch-size threshold is reached.
    pub async fn enqueue(&self, stage: Stage, item: QueueItem) -> Result<()> {
        let queue = self.stage(stage);
        queue.enqueue(item).await?;
        if queue.should_flush_immediately().await {
            queue.flush().await?;
        }
        Ok(())
    }

    /// Schedule an immediate flush for any stage that restored buffered
    /// items at `load` time.
    pub async fn flush_restored(&self) -> Result<()> {
        for stage in Stage::all() {
            let queue = self.stage(stage);
            if queue.has_buffered_items().await {
                queue.flush().await?;
            }
        }
        Ok(())
    }

    /// Propagate a path change to both stage queues, rederiving each moved
    /// item's id from `new_path` (file and chunk ids are path-derived).
    pub async fn update_by_file_path(
        &self,
        old_path: &str,
        new_path: &str,
        new_name: &str,
        kind: FileKind,
    ) -> Result<usize> {
        let mut updated = 0;
        for stage in Stage::all() {
            updated += self.stage(stage).update_by_file_path(old_path, new_path, new_name, kind).await?;
        }
        Ok(updated)
    }

    /// Remove every item tied to `path` from both stage queues.
    pub async fn remove_by_file_path(&self, path: &str) -> Result<usize> {
        let mut removed = 0;
        for stage in Stage::all() {
            removed += self.stage(stage).remove_by_file_path(path).await?;
        }
        Ok(removed)
    }

    /// Force-flush both stage queues to completion, for graceful shutdown
    /// and the `flush` CLI command.
    pub async fn shutdown(&self) -> Result<()> {
        for stage in Stage::all() {
            self.stage(stage).force_flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingSink for EmbeddingQueueSet {
    async fn enqueue(&self, stage: Stage, item: QueueItem) -> Result<()> {
        EmbeddingQueueSet::enqueue(self, stage, item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use organizer_domain::ports::clock::SystemClock;
    use organizer_domain::ports::vector_store::{BatchUpsertReport, ChunkPathUpdate, ScoredRecord, VectorRecord};
    use organizer_domain::value_objects::{CollectionId, QueueItemMeta};

    struct FakeVectorStore;

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn batch_upsert_files(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
            Ok(BatchUpsertReport { upserted: records.into_iter().map(|r| r.id).collect(), skipped: vec![] })
        }
        async fn batch_upsert_folders(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
            Ok(BatchUpsertReport { upserted: records.into_iter().map(|r| r.id).collect(), skipped: vec![] })
        }
        async fn batch_upsert_chunks(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
            Ok(BatchUpsertReport { upserted: records.into_iter().map(|r| r.id).collect(), skipped: vec![] })
        }
        async fn query_folders_by_vector(&self, _vector: &[f32], _k: usize) -> Result<Vec<ScoredRecord>> {
            Ok(vec![])
        }
        async fn query_folders_for_file(&self, _file_id: &str, _k: usize) -> Result<Vec<ScoredRecord>> {
            Ok(vec![])
        }
        async fn delete_file(&self, _file_id: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_folder(&self, _folder_id: &str) -> Result<()> {
            Ok(())
        }
        async fn mark_chunks_orphaned(&self, _file_ids: &[String]) -> Result<()> {
            Ok(())
        }
        async fn get_orphaned_chunks(&self, _max_age_ms: Option<u64>) -> Result<Vec<ScoredRecord>> {
            Ok(vec![])
        }
        async fn delete_file_chunks(&self, _file_id: &str) -> Result<()> {
            Ok(())
        }
        async fn batch_delete_file_chunks(&self, _file_ids: &[String]) -> Result<()> {
            Ok(())
        }
        async fn update_file_chunk_paths(&self, _updates: &[ChunkPathUpdate]) -> Result<()> {
            Ok(())
        }
        async fn collection_dimension(&self, _collection: CollectionId) -> Result<Option<usize>> {
            Ok(None)
        }
        async fn heartbeat(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn item(id: &str, path: &str) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            vector: Some(vec![0.1, 0.2]),
            model: Some("nomic-embed-text".to_string()),
            meta: QueueItemMeta { path: path.to_string(), name: "f".to_string(),..Default::default() },
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn enqueue_routes_to_the_right_stage() {
        let dir = tempfile::tempdir().unwrap();
        let set = EmbeddingQueueSet::load(dir.path(), Arc::new(FakeVectorStore), Arc::new(SystemClock)).await.unwrap();
        set.enqueue(Stage::Analysis, item("filehash1", "/a")).await.unwrap();
        assert_eq!(set.stage(Stage::Organize).len().await, 0);
    }

    #[tokio::test]
    async fn update_by_file_path_touches_both_stages() {
        let dir = tempfile::tempdir().unwrap();
        let set = EmbeddingQueueSet::load(dir.path(), Arc::new(FakeVectorStore), Arc::new(SystemClock)).await.unwrap();
        set.analysis.enqueue(item("filehash1", "/old")).await.unwrap();
        let updated = set.update_by_file_path("/old", "/new", "f", FileKind::Doc).await.unwrap();
        assert_eq!(updated, 1);
    }
}
