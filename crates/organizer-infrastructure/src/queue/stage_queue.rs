//! The per-stage embedding queue: a durable, batched, back-pressured buffer
//! ahead of the vector store, with per-item retry and dead-lettering.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use organizer_domain::constants::{
    BATCH_SIZE, FLUSH_DELAY_MS, ITEM_MAX_RETRIES, ITEM_RETRY_BASE_MS, QUEUE_CAPACITY,
    QUEUE_HIGH_WATERMARK_FRACTION, QUEUE_OFFLINE_BACKOFF_MS, QUEUE_RELEASE_WATERMARK_FRACTION,
    QUEUE_WAIT_FOR_CAPACITY_MAX_WAIT_MS,
};
use organizer_domain::ports::vector_store::VectorRecord;
use organizer_domain::ports::{Clock, VectorStore};
use organizer_domain::value_objects::ids::ItemId;
use organizer_domain::value_objects::{
    DeadLetterEntry, DeadLetterItemType, FileKind, QueueItem, Stage,
};
use organizer_domain::Result;
use tokio::sync::{Mutex, Notify};

use super::dead_letter::DeadLetterStore;
use super::failed_items::{FailedItem, FailedItemsMap};
use super::persistence;

/// `Idle -> Scheduled -> Flushing -> {Idle | Backoff}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No pending items, no timer running.
    Idle,
    /// A flush timer is pending.
    Scheduled,
    /// A flush is in progress.
    Flushing,
    /// The last flush failed because the store was offline; waiting to retry.
    Backoff,
}

/// Outcome of `wait_for_capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityWait {
    /// The buffer drained back to the release watermark in time.
    Ready,
    /// `max_wait` elapsed first.
    TimedOut,
}

struct Sidecars {
    pending: PathBuf,
    failed: PathBuf,
    dead_letter: PathBuf,
}

fn sidecars_for(data_dir: &Path, stage: Stage) -> Sidecars {
    let suffix = stage.as_str();
    Sidecars {
        pending: data_dir.join(format!("pending_embeddings.{suffix}.json")),
        failed: data_dir.join(format!("failed_embeddings.{suffix}.json")),
        dead_letter: data_dir.join(format!("dead_letter_queue.{suffix}.json")),
    }
}

/// One stage's durable embedding queue.
pub struct StageQueue {
    stage: Stage,
    buffer: Mutex<VecDeque<QueueItem>>,
    failed_items: Mutex<FailedItemsMap>,
    dead_letter: Mutex<DeadLetterStore>,
    is_flushing: AtomicBool,
    state: Mutex<QueueState>,
    capacity_notify: Notify,
    sidecars: Sidecars,
    vector_store: Arc<dyn VectorStore>,
    clock: Arc<dyn Clock>,
}

impl StageQueue {
    /// Load a stage queue's sidecars (if present) and build it. Any items
    /// restored from the pending sidecar are scheduled for immediate flush
    /// by the caller.
    pub async fn load(
        stage: Stage,
        data_dir: &Path,
        vector_store: Arc<dyn VectorStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let sidecars = sidecars_for(data_dir, stage);
        let pending: Vec<QueueItem> =
            persistence::load_or_default(&sidecars.pending, Vec::new(), clock.as_ref()).await?;
        let failed_wire: Vec<(String, FailedItem)> =
            persistence::load_or_default(&sidecars.failed, Vec::new(), clock.as_ref()).await?;
        let dead_letter_entries: Vec<DeadLetterEntry> =
            persistence::load_or_default(&sidecars.dead_letter, Vec::new(), clock.as_ref()).await?;

        Ok(Self {
            stage,
            buffer: Mutex::new(pending.into()),
            failed_items: Mutex::new(FailedItemsMap::from_wire(failed_wire)),
            dead_letter: Mutex::new(DeadLetterStore::from_entries(dead_letter_entries)),
            is_flushing: AtomicBool::new(false),
            state: Mutex::new(QueueState::Idle),
            capacity_notify: Notify::new(),
            sidecars,
            vector_store,
            clock,
        })
    }

    /// This queue's stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether `pending` restored any items at `load` time, for the caller
    /// to decide whether to trigger the startup flush.
    pub async fn has_buffered_items(&self) -> bool {
        !self.buffer.lock().await.is_empty()
    }

    /// Validate and append `item`, persisting the updated buffer and
    /// returning once the buffer is at or above `BATCH_SIZE` (the caller is
    /// then expected to `flush`) or once `FLUSH_DELAY_MS` worth of
    /// coalescing would apply (left to the caller's scheduler).
    ///
    /// # Errors
    ///
    /// Returns an error if `item`'s id is empty or its vector contains a
    /// non-finite component.
    pub async fn enqueue(&self, item: QueueItem) -> Result<()> {
        validate_item(&item)?;
        let mut buffer = self.buffer.lock().await;
        buffer.push_back(item);
        self.persist_buffer(&buffer).await?;
        drop(buffer);
        *self.state.lock().await = QueueState::Scheduled;
        Ok(())
    }

    /// Whether the buffer holds at least `BATCH_SIZE` items (the immediate
    /// flush condition).
    pub async fn should_flush_immediately(&self) -> bool {
        self.buffer.lock().await.len() >= BATCH_SIZE
    }

    /// Snapshot and clear the buffer for worker-thread isolation; the
    /// caller becomes responsible for delivering the items upstream.
    pub async fn drain(&self) -> Result<Vec<QueueItem>> {
        let mut buffer = self.buffer.lock().await;
        let drained: Vec<QueueItem> = buffer.drain(..).collect();
        self.persist_buffer(&buffer).await?;
        self.capacity_notify.notify_waiters();
        Ok(drained)
    }

    async fn persist_buffer(&self, buffer: &VecDeque<QueueItem>) -> Result<()> {
        let items: Vec<&QueueItem> = buffer.iter().collect();
        persistence::write_atomic(&self.sidecars.pending, &items, items.is_empty(), self.clock.as_ref()).await
    }

    async fn persist_failed(&self, map: &FailedItemsMap) -> Result<()> {
        let wire = map.to_wire();
        persistence::write_atomic(&self.sidecars.failed, &wire, wire.is_empty(), self.clock.as_ref()).await
    }

    async fn persist_dead_letter(&self, store: &DeadLetterStore) -> Result<()> {
        let entries = store.entries();
        persistence::write_atomic(&self.sidecars.dead_letter, &entries, entries.is_empty(), self.clock.as_ref()).await
    }

    /// Snapshot the buffer, persist it ahead of clearing (write-ahead), then
    /// attempt delivery. Single-flight: a flush already in progress is a
    /// no-op. On total failure (vector store unreachable) the snapshot is
    /// restored to the head of the buffer from the sidecar just written,
    /// per the write-ahead discipline.
    pub async fn flush(&self) -> Result<()> {
        if self.is_flushing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        *self.state.lock().await = QueueState::Flushing;
        let result = self.flush_inner().await;
        self.is_flushing.store(false, Ordering::SeqCst);
        result
    }

    async fn flush_inner(&self) -> Result<()> {
        let snapshot: Vec<QueueItem> = {
            let buffer = self.buffer.lock().await;
            buffer.iter().cloned().collect()
        };
        if snapshot.is_empty() {
            *self.state.lock().await = QueueState::Idle;
            return Ok(());
        }

        persistence::write_atomic(&self.sidecars.pending, &snapshot, false, self.clock.as_ref()).await?;
        {
            let mut buffer = self.buffer.lock().await;
            buffer.clear();
        }
        self.capacity_notify.notify_waiters();

        match self.deliver(&snapshot).await {
            Ok(()) => {
                persistence::write_atomic(&self.sidecars.pending, &Vec::<QueueItem>::new(), true, self.clock.as_ref())
                    .await?;
                *self.state.lock().await = QueueState::Idle;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(stage = self.stage.as_str(), %error, "flush failed, restoring batch");
                let restored: Vec<QueueItem> =
                    persistence::load_or_default(&self.sidecars.pending, Vec::new(), self.clock.as_ref()).await?;
                let mut buffer = self.buffer.lock().await;
                for item in restored.into_iter().rev() {
                    buffer.push_front(item);
                }
                drop(buffer);
                *self.state.lock().await = QueueState::Backoff;
                tokio::time::sleep(std::time::Duration::from_millis(QUEUE_OFFLINE_BACKOFF_MS)).await;
                *self.state.lock().await = QueueState::Scheduled;
                Ok(())
            }
        }
    }

    async fn deliver(&self, snapshot: &[QueueItem]) -> Result<()> {
        let mut files = Vec::new();
        let mut chunks = Vec::new();
        let mut folders = Vec::new();

        for item in snapshot {
            let Some(record) = to_vector_record(item) else { continue };
            match ItemId::from_wire(&item.id) {
                ItemId::File(_) => files.push((item, record)),
                ItemId::Chunk {.. } => chunks.push((item, record)),
                ItemId::Folder {.. } => folders.push((item, record)),
            }
        }

        let files_report = if files.is_empty() {
            None
        } else {
            Some(
                self.vector_store
                    .batch_upsert_files(files.iter().map(|(_, record)| record.clone()).collect())
                    .await?,
            )
        };
        let chunks_report = if chunks.is_empty() {
            None
        } else {
            Some(
                self.vector_store
                    .batch_upsert_chunks(chunks.iter().map(|(_, record)| record.clone()).collect())
                    .await?,
            )
        };
        let folders_report = if folders.is_empty() {
            None
        } else {
            Some(
                self.vector_store
                    .batch_upsert_folders(folders.iter().map(|(_, record)| record.clone()).collect())
                    .await?,
            )
        };

        let mut failed_ids = std::collections::HashSet::new();
        for report in [&files_report, &chunks_report, &folders_report].into_iter().flatten() {
            for (id, _reason) in &report.skipped {
                failed_ids.insert(id.clone());
            }
        }

        if !failed_ids.is_empty() {
            let now_iso = self.clock.now_iso();
            let mut failed_map = self.failed_items.lock().await;
            let mut dead_letter = self.dead_letter.lock().await;
            for (item, _) in files.iter().chain(chunks.iter()).chain(folders.iter()) {
                if !failed_ids.contains(&item.id) {
                    continue;
                }
                self.handle_item_failure(
                    &mut failed_map,
                    &mut dead_letter,
                    (**item).clone(),
                    "skipped by vector store: invalid entry".to_string(),
                    &now_iso,
                )
                    .await;
            }
            self.persist_failed(&failed_map).await?;
            self.persist_dead_letter(&dead_letter).await?;
        } else {
            let mut failed_map = self.failed_items.lock().await;
            let mut changed = false;
            for item in snapshot {
                if failed_map.remove(&item.id).is_some() {
                    changed = true;
                }
            }
            if changed {
                self.persist_failed(&failed_map).await?;
            }
        }

        Ok(())
    }

    async fn handle_item_failure(
        &self,
        failed_map: &mut FailedItemsMap,
        dead_letter: &mut DeadLetterStore,
        item: QueueItem,
        error: String,
        now_iso: &str,
    ) {
        let retry_count =
            failed_map.iter().find(|(id, _)| *id == item.id.as_str()).map_or(0, |(_, entry)| entry.retry_count) + 1;

        if retry_count > ITEM_MAX_RETRIES {
            failed_map.remove(&item.id);
            dead_letter.push(DeadLetterEntry {
                item_type: item_type_of(&item),
                item,
                error,
                retry_count,
                failed_at: now_iso.to_string(),
            });
            return;
        }

        let id = item.id.clone();
        if let Some((evicted_id, evicted)) = failed_map.record(
            id,
            FailedItem { item, retry_count, last_attempt: now_iso.to_string(), error },
        ) {
            dead_letter.push(DeadLetterEntry {
                item_type: item_type_of(&evicted.item),
                item: evicted.item,
                error: evicted.error,
                retry_count: evicted.retry_count,
                failed_at: now_iso.to_string(),
            });
            tracing::warn!(evicted_id, "failed-items map at capacity, LRU-evicted to dead-letter");
        }
    }

    /// Per-item backoff delay before a failed item is eligible to be
    /// re-queued: `BASE * 2 * 2^(retry_count-1)`.
    #[must_use]
    pub fn item_backoff_delay_ms(retry_count: u32) -> u64 {
        ITEM_RETRY_BASE_MS.saturating_mul(2).saturating_mul(1u64 << retry_count.saturating_sub(1).min(16))
    }

    /// Re-queue every failed item whose backoff has elapsed, at the head of
    /// the buffer, for the next flush tick.
    pub async fn requeue_eligible_failed_items(&self) -> Result<usize> {
        let now_ms = self.clock.now_ms();
        let mut failed_map = self.failed_items.lock().await;
        let eligible: Vec<String> = failed_map
            .iter()
            .filter(|(_, entry)| {
                let elapsed = now_ms - iso_to_ms_best_effort(&entry.last_attempt);
                elapsed >= Self::item_backoff_delay_ms(entry.retry_count) as i64
            })
                .map(|(id, _)| id.to_string())
                .collect();

        let mut requeued = 0;
        if !eligible.is_empty() {
            let mut buffer = self.buffer.lock().await;
            for id in &eligible {
                if let Some(entry) = failed_map.remove(id) {
                    buffer.push_front(entry.item);
                    requeued += 1;
                }
            }
            self.persist_buffer(&buffer).await?;
        }
        self.persist_failed(&failed_map).await?;
        Ok(requeued)
    }

    /// Propagate a path change across this stage's buffer, failed-items
    /// map, and in-flight state: items keyed to `old_path` have their
    /// `meta.path`/`meta.name` updated to `new_path`, and their id rederived
    /// from it (`CanonicalFileId` is path-derived, so a rename that left the
    /// old id in place would upsert under a stale id and orphan the old
    /// vector-store record).
    pub async fn update_by_file_path(
        &self,
        old_path: &str,
        new_path: &str,
        new_name: &str,
        kind: FileKind,
    ) -> Result<usize> {
        let mut updated = 0;
        {
            let mut buffer = self.buffer.lock().await;
            for item in buffer.iter_mut() {
                if item.meta.path == old_path {
                    item.id = ItemId::from_wire(&item.id).rebased(new_path, kind).to_wire();
                    item.meta.path = new_path.to_string();
                    item.meta.name = new_name.to_string();
                    updated += 1;
                }
            }
            self.persist_buffer(&buffer).await?;
        }
        {
            let mut failed_map = self.failed_items.lock().await;
            let mut changed = false;
            for (_, entry) in failed_map.iter() {
                if entry.item.meta.path == old_path {
                    changed = true;
                }
            }
            if changed {
                let pairs = failed_map.remove_by_path(old_path);
                for (_old_id, mut entry) in pairs {
                    let new_id = ItemId::from_wire(&entry.item.id).rebased(new_path, kind).to_wire();
                    entry.item.id = new_id.clone();
                    entry.item.meta.path = new_path.to_string();
                    entry.item.meta.name = new_name.to_string();
                    updated += 1;
                    failed_map.record(new_id, entry);
                }
                self.persist_failed(&failed_map).await?;
            }
        }
        Ok(updated)
    }

    /// Remove every item (buffered or failed) keyed to `path`.
    pub async fn remove_by_file_path(&self, path: &str) -> Result<usize> {
        let mut removed = 0;
        {
            let mut buffer = self.buffer.lock().await;
            let before = buffer.len();
            buffer.retain(|item| item.meta.path != path);
            removed += before - buffer.len();
            self.persist_buffer(&buffer).await?;
        }
        {
            let mut failed_map = self.failed_items.lock().await;
            let pairs = failed_map.remove_by_path(path);
            removed += pairs.len();
            if !pairs.is_empty() {
                self.persist_failed(&failed_map).await?;
            }
        }
        self.capacity_notify.notify_waiters();
        Ok(removed)
    }

    /// Block until the buffer drains to the release watermark, or until
    /// `max_wait_ms` elapses.
    pub async fn wait_for_capacity(&self) -> CapacityWait {
        let high = (QUEUE_CAPACITY as f64 * QUEUE_HIGH_WATERMARK_FRACTION) as usize;
        let release = (QUEUE_CAPACITY as f64 * QUEUE_RELEASE_WATERMARK_FRACTION) as usize;

        if self.buffer.lock().await.len() < high {
            return CapacityWait::Ready;
        }

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(QUEUE_WAIT_FOR_CAPACITY_MAX_WAIT_MS);
        loop {
            if self.buffer.lock().await.len() <= release {
                return CapacityWait::Ready;
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return CapacityWait::TimedOut;
            }
            let _ = tokio::time::timeout(remaining, self.capacity_notify.notified()).await;
        }
    }

    /// Current buffer length, for diagnostics and `wait_for_capacity` tests.
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Current state, for diagnostics.
    pub async fn state(&self) -> QueueState {
        *self.state.lock().await
    }

    /// Dead-letter entries, for the `dead-letter list` CLI command.
    pub async fn dead_letter_entries(&self) -> Vec<DeadLetterEntry> {
        self.dead_letter.lock().await.entries().to_vec()
    }

    /// Move one dead-lettered item back to the buffer for redelivery.
    pub async fn retry_dead_letter_item(&self, item_id: &str) -> Result<bool> {
        let mut dead_letter = self.dead_letter.lock().await;
        let Some(mut entry) = dead_letter.take(item_id) else { return Ok(false) };
        entry.item.retry_count = 0;
        drop(dead_letter);
        let mut buffer = self.buffer.lock().await;
        buffer.push_back(entry.item);
        self.persist_buffer(&buffer).await?;
        Ok(true)
    }

    /// Move every dead-lettered item back to the buffer for redelivery.
    pub async fn retry_all_dead_letter_items(&self) -> Result<usize> {
        let mut dead_letter = self.dead_letter.lock().await;
        let entries = dead_letter.take_all();
        let count = entries.len();
        drop(dead_letter);
        if count > 0 {
            let mut buffer = self.buffer.lock().await;
            for mut entry in entries {
                entry.item.retry_count = 0;
                buffer.push_back(entry.item);
            }
            self.persist_buffer(&buffer).await?;
        }
        Ok(count)
    }

    /// Clear the dead-letter store outright.
    pub async fn clear_dead_letter(&self) -> Result<()> {
        let mut dead_letter = self.dead_letter.lock().await;
        dead_letter.clear();
        self.persist_dead_letter(&dead_letter).await
    }

    /// Drain deterministically: flush repeatedly until the buffer is empty.
    /// Used by `force_flush`/`shutdown`.
    pub async fn force_flush(&self) -> Result<()> {
        loop {
            self.flush().await?;
            if self.buffer.lock().await.is_empty() {
                return Ok(());
            }
        }
    }

    /// Suggested coalescing delay before the next scheduled flush, for the
    /// caller's timer.
    #[must_use]
    pub fn flush_delay() -> std::time::Duration {
        std::time::Duration::from_millis(FLUSH_DELAY_MS)
    }
}

fn validate_item(item: &QueueItem) -> Result<()> {
    if item.id.is_empty() {
        return Err(organizer_domain::Error::InvalidArgument { message: "queue item id is empty".to_string() });
    }
    if let Some(vector) = &item.vector {
        if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
            return Err(organizer_domain::Error::InvalidArgument {
                message: format!("queue item {} has a non-finite or empty vector", item.id),
            });
        }
    }
    Ok(())
}

fn to_vector_record(item: &QueueItem) -> Option<VectorRecord> {
    let vector = item.vector.clone()?;
    let metadata = metadata_from_meta(item);
    Some(VectorRecord { id: item.id.clone(), vector, metadata })
}

fn metadata_from_meta(item: &QueueItem) -> BTreeMap<String, serde_json::Value> {
    let mut metadata = BTreeMap::new();
    metadata.insert("path".to_string(), serde_json::Value::String(item.meta.path.clone()));
    metadata.insert("name".to_string(), serde_json::Value::String(item.meta.name.clone()));
    metadata.insert("category".to_string(), serde_json::Value::String(item.meta.category.clone()));
    metadata.insert("updatedAt".to_string(), serde_json::Value::String(item.updated_at.clone()));
    if let ItemId::Chunk { file_id,.. } = ItemId::from_wire(&item.id) {
        metadata.insert("fileId".to_string(), serde_json::Value::String(file_id.to_string()));
    }
    metadata
}

fn item_type_of(item: &QueueItem) -> DeadLetterItemType {
    match ItemId::from_wire(&item.id) {
        ItemId::File(_) => DeadLetterItemType::File,
        ItemId::Chunk {.. } => DeadLetterItemType::Chunk,
        ItemId::Folder {.. } => DeadLetterItemType::Folder,
    }
}

fn iso_to_ms_best_effort(iso: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(iso).map(|dt| dt.timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use organizer_domain::ports::clock::SystemClock;
    use organizer_domain::ports::vector_store::{BatchUpsertReport, ChunkPathUpdate, ScoredRecord};
    use organizer_domain::value_objects::{CanonicalFileId, QueueItemMeta};
    use std::sync::atomic::AtomicU32;

    struct FakeVectorStore {
        fail_next: AtomicBool,
        upserts: AtomicU32,
    }

    impl FakeVectorStore {
        fn new() -> Self {
            Self { fail_next: AtomicBool::new(false), upserts: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn batch_upsert_files(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
            if self.fail_next.load(Ordering::SeqCst) {
                return Err(organizer_domain::Error::VectorStoreUnavailable { message: "offline".to_string() });
            }
            self.upserts.fetch_add(records.len() as u32, Ordering::SeqCst);
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
        async fn collection_dimension(
            &self,
            _collection: organizer_domain::value_objects::CollectionId,
        ) -> Result<Option<usize>> {
            Ok(None)
        }
        async fn heartbeat(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn file_item(id: &str, path: &str) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            vector: Some(vec![0.1, 0.2, 0.3]),
            model: Some("nomic-embed-text".to_string()),
            meta: QueueItemMeta { path: path.to_string(), name: "f".to_string(),..Default::default() },
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            retry_count: 0,
        }
    }

    async fn queue(vector_store: Arc<dyn VectorStore>) -> (StageQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let queue = StageQueue::load(Stage::Analysis, dir.path(), vector_store, Arc::new(SystemClock))
            .await
            .unwrap();
        (queue, dir)
    }

    #[tokio::test]
    async fn enqueue_then_flush_delivers_to_vector_store() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store.clone()).await;
        queue.enqueue(file_item("filehash1", "/a/report.pdf")).await.unwrap();
        queue.flush().await.unwrap();
        assert_eq!(queue.len().await, 0);
        assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_empty_id() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store).await;
        let mut item = file_item("x", "/a");
        item.id = String::new();
        assert!(queue.enqueue(item).await.is_err());
    }

    #[tokio::test]
    async fn rejects_non_finite_vector() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store).await;
        let mut item = file_item("x", "/a");
        item.vector = Some(vec![f32::NAN]);
        assert!(queue.enqueue(item).await.is_err());
    }

    #[tokio::test]
    async fn flush_failure_restores_buffer_and_enters_backoff() {
        let store = Arc::new(FakeVectorStore::new());
        store.fail_next.store(true, Ordering::SeqCst);
        let (queue, _dir) = queue(store).await;
        queue.enqueue(file_item("filehash1", "/a/report.pdf")).await.unwrap();
        queue.flush().await.unwrap();
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn update_by_file_path_rewrites_buffered_item() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store).await;
        queue.enqueue(file_item("filehash1", "/old/report.pdf")).await.unwrap();
        let updated = queue
            .update_by_file_path("/old/report.pdf", "/new/report.pdf", "report.pdf", FileKind::Doc)
            .await
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn update_by_file_path_rederives_the_item_id() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store).await;
        queue.enqueue(file_item("filehash1", "/old/report.pdf")).await.unwrap();
        queue
            .update_by_file_path("/old/report.pdf", "/new/report.pdf", "report.pdf", FileKind::Doc)
            .await
            .unwrap();
        let buffered = queue.buffer.lock().await;
        let expected = CanonicalFileId::compute("/new/report.pdf", FileKind::Doc).to_string();
        assert_eq!(buffered.front().unwrap().id, expected);
    }

    #[tokio::test]
    async fn remove_by_file_path_drops_buffered_item() {
        let store = Arc::new(FakeVectorStore::new());
        let (queue, _dir) = queue(store).await;
        queue.enqueue(file_item("filehash1", "/a/report.pdf")).await.unwrap();
        let removed = queue.remove_by_file_path("/a/report.pdf").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn restarted_queue_loads_persisted_buffer() {
        let store = Arc::new(FakeVectorStore::new());
        let dir = tempfile::tempdir().unwrap();
        let queue1 = StageQueue::load(Stage::Analysis, dir.path(), store.clone(), Arc::new(SystemClock))
            .await
            .unwrap();
        queue1.enqueue(file_item("filehash1", "/a/report.pdf")).await.unwrap();

        let queue2 = StageQueue::load(Stage::Analysis, dir.path(), store, Arc::new(SystemClock)).await.unwrap();
        assert!(queue2.has_buffered_items().await);
        assert_eq!(queue2.len().await, 1);
    }
}
