//! In-memory `VectorStore` adapter: the default, dependency-free engine
//! behind the `files`/`file_chunks`/`folders` collections.
//!
//! Every collection is cosine space and lives in its own `DashMap` keyed by
//! wire-form id (`ItemId::to_wire`), so lookups, upserts, and deletes are
//! lock-free with respect to each other. A real engine adapter (a Qdrant or
//! Pinecone client, say) would implement the same trait over HTTP; this one
//! exists so the rest of the core can run end to end with zero external
//! services, and so tests don't need a running engine.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use organizer_domain::ports::vector_store::{BatchUpsertReport, ChunkPathUpdate, ScoredRecord, SkipReason, VectorRecord};
use organizer_domain::ports::{Clock, VectorStore};
use organizer_domain::value_objects::{CollectionId, ItemId};
use organizer_domain::Result;
use serde_json::Value;

/// Read-after-write retry schedule for `query_folders_for_file`: retry up
/// to 3 times with 50/100/200ms backoff.
const READ_AFTER_WRITE_BACKOFF_MS: [u64; 3] = [50, 100, 200];

#[derive(Debug, Clone)]
struct StoredRecord {
    vector: Vec<f32>,
    metadata: BTreeMap<String, Value>,
    orphaned_at_ms: Option<i64>,
}

/// One cosine-space collection: its records plus the dimension the first
/// upsert fixed (subsequent upserts of a different length are skipped with
/// `SkipReason::DimensionMismatch`).
#[derive(Default)]
struct Collection {
    records: DashMap<String, StoredRecord>,
    dimension: Mutex<Option<usize>>,
}

impl Collection {
    fn declared_dimension(&self) -> Option<usize> {
        *self.dimension.lock().expect("collection dimension mutex poisoned")
    }

    /// Validate and partition a batch of incoming records, fixing the
    /// collection's dimension from the first accepted record if unset.
    fn upsert(&self, records: Vec<VectorRecord>) -> BatchUpsertReport {
        let mut report = BatchUpsertReport::default();
        for record in records {
            if record.id.is_empty() {
                report.skipped.push((record.id, SkipReason::EmptyId));
                continue;
            }
            if record.vector.is_empty() || record.vector.iter().any(|v| !v.is_finite()) {
                report.skipped.push((record.id, SkipReason::NonFinite));
                continue;
            }
            let expected = {
                let mut guard = self.dimension.lock().expect("collection dimension mutex poisoned");
                match *guard {
                    Some(dim) => dim,
                    None => {
                        *guard = Some(record.vector.len());
                        record.vector.len()
                    }
                }
            };
            if record.vector.len() != expected {
                report.skipped.push((
                    record.id,
                    SkipReason::DimensionMismatch { expected, actual: record.vector.len() },
                ));
                continue;
            }
            self.records.insert(
                record.id.clone(),
                StoredRecord { vector: record.vector, metadata: record.metadata, orphaned_at_ms: None },
            );
            report.upserted.push(record.id);
        }
        report
    }

    fn query(&self, vector: &[f32], k: usize) -> Vec<ScoredRecord> {
        let mut scored: Vec<ScoredRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().vector.len() == vector.len())
            .map(|entry| ScoredRecord {
                id: entry.key().clone(),
                score: cosine_score(vector, &entry.value().vector),
                metadata: entry.value().metadata.clone(),
            })
                .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// Cosine-distance-derived similarity score.
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine_similarity = dot / (norm_a * norm_b);
    let distance = 1.0 - cosine_similarity;
    (1.0 - distance / 2.0).max(0.0)
}

fn metadata_str(metadata: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Dependency-free `VectorStore` implementation over three in-process
/// `Collection`s. Safe to share across tasks via `Arc`.
pub struct InMemoryVectorStore {
    files: Collection,
    chunks: Collection,
    folders: Collection,
    clock: Arc<dyn Clock>,
}

impl InMemoryVectorStore {
    /// Build an empty store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { files: Collection::default(), chunks: Collection::default(), folders: Collection::default(), clock }
    }

    fn collection(&self, id: CollectionId) -> &Collection {
        match id {
            CollectionId::Files => &self.files,
            CollectionId::FileChunks => &self.chunks,
            CollectionId::Folders => &self.folders,
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn batch_upsert_files(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
        Ok(self.files.upsert(records))
    }

    async fn batch_upsert_folders(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
        Ok(self.folders.upsert(records))
    }

    async fn batch_upsert_chunks(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
        Ok(self.chunks.upsert(records))
    }

    async fn query_folders_by_vector(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        Ok(self.folders.query(vector, k))
    }

    async fn query_folders_for_file(&self, file_id: &str, k: usize) -> Result<Vec<ScoredRecord>> {
        for (attempt, delay_ms) in READ_AFTER_WRITE_BACKOFF_MS.iter().enumerate() {
            if let Some(record) = self.files.records.get(file_id) {
                let vector = record.vector.clone();
                drop(record);
                return Ok(self.folders.query(&vector, k));
            }
            tracing::debug!(file_id, attempt, "file not yet visible, retrying read-after-write");
            tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
        }
        Ok(Vec::new())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.files.records.remove(file_id);
        Ok(())
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<()> {
        self.folders.records.remove(folder_id);
        Ok(())
    }

    async fn mark_chunks_orphaned(&self, file_ids: &[String]) -> Result<()> {
        let now = self.clock.now_ms();
        let ids: HashSet<&str> = file_ids.iter().map(String::as_str).collect();
        for mut entry in self.chunks.records.iter_mut() {
            if metadata_str(&entry.metadata, "fileId").is_some_and(|id| ids.contains(id.as_str())) {
                entry.orphaned_at_ms = Some(now);
            }
        }
        Ok(())
    }

    async fn get_orphaned_chunks(&self, max_age_ms: Option<u64>) -> Result<Vec<ScoredRecord>> {
        let now = self.clock.now_ms();
        Ok(self
            .chunks
            .records
            .iter()
            .filter(|entry| match (entry.value().orphaned_at_ms, max_age_ms) {
                (Some(orphaned_at), Some(max_age)) => (now - orphaned_at) as u64 >= max_age,
                (Some(_), None) => true,
                (None, _) => false,
            })
                .map(|entry| ScoredRecord { id: entry.key().clone(), score: 1.0, metadata: entry.value().metadata.clone() })
                .collect())
    }

    async fn delete_file_chunks(&self, file_id: &str) -> Result<()> {
        self.chunks.records.retain(|_, record| metadata_str(&record.metadata, "fileId").as_deref() != Some(file_id));
        Ok(())
    }

    async fn batch_delete_file_chunks(&self, file_ids: &[String]) -> Result<()> {
        let ids: HashSet<&str> = file_ids.iter().map(String::as_str).collect();
        self.chunks
            .records
            .retain(|_, record| !metadata_str(&record.metadata, "fileId").is_some_and(|id| ids.contains(id.as_str())));
        Ok(())
    }

    async fn update_file_chunk_paths(&self, updates: &[ChunkPathUpdate]) -> Result<()> {
        for update in updates {
            let stale_ids: Vec<String> = self
                .chunks
                .records
                .iter()
                .filter(|entry| metadata_str(&entry.value().metadata, "fileId").as_deref() == Some(update.old_file_id.as_str()))
                .map(|entry| entry.key().clone())
                .collect();
            for old_id in stale_ids {
                let Some((_, mut record)) = self.chunks.records.remove(&old_id) else { continue };
                let ItemId::Chunk { index,.. } = ItemId::from_wire(&old_id) else { continue };
                let new_id = ItemId::Chunk { file_id: organizer_domain::value_objects::CanonicalFileId::from_raw(update.new_file_id.clone()), index }
                    .to_wire();
                record.metadata.insert("fileId".to_string(), Value::String(update.new_file_id.clone()));
                record.metadata.insert("path".to_string(), Value::String(update.new_path.clone()));
                record.metadata.insert("name".to_string(), Value::String(update.new_name.clone()));
                self.chunks.records.insert(new_id, record);
            }
        }
        Ok(())
    }

    async fn collection_dimension(&self, collection: CollectionId) -> Result<Option<usize>> {
        Ok(self.collection(collection).declared_dimension())
    }

    async fn heartbeat(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::ports::clock::SystemClock;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(SystemClock))
    }

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord { id: id.to_string(), vector, metadata: BTreeMap::new() }
    }

    #[tokio::test]
    async fn upserts_then_queries_by_cosine_similarity() {
        let store = store();
        store
            .batch_upsert_folders(vec![
                record("folder:finance", vec![1.0, 0.0]),
                record("folder:photos", vec![0.0, 1.0]),
            ])
                .await
                .unwrap();
        let top = store.query_folders_by_vector(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top[0].id, "folder:finance");
        assert!(top[0].score > 0.9);
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch_after_first_upsert_fixes_it() {
        let store = store();
        let report = store.batch_upsert_files(vec![record("a", vec![1.0, 2.0])]).await.unwrap();
        assert_eq!(report.upserted, vec!["a".to_string()]);
        let report = store.batch_upsert_files(vec![record("b", vec![1.0, 2.0, 3.0])]).await.unwrap();
        assert!(matches!(report.skipped[0].1, SkipReason::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn skips_empty_id_and_non_finite_vector() {
        let store = store();
        let report = store
            .batch_upsert_files(vec![record("", vec![1.0]), record("x", vec![f32::NAN])])
            .await
            .unwrap();
        assert_eq!(report.upserted.len(), 0);
        assert!(matches!(report.skipped[0].1, SkipReason::EmptyId));
        assert!(matches!(report.skipped[1].1, SkipReason::NonFinite));
    }

    #[tokio::test]
    async fn query_folders_for_file_uses_the_files_collection_vector() {
        let store = store();
        store.batch_upsert_files(vec![record("file-a", vec![1.0, 0.0])]).await.unwrap();
        store.batch_upsert_folders(vec![record("folder:finance", vec![1.0, 0.0])]).await.unwrap();
        let top = store.query_folders_for_file("file-a", 1).await.unwrap();
        assert_eq!(top[0].id, "folder:finance");
    }

    #[tokio::test]
    async fn mark_and_fetch_orphaned_chunks() {
        let store = store();
        let mut metadata = BTreeMap::new();
        metadata.insert("fileId".to_string(), Value::String("file-a".to_string()));
        store.chunks.records.insert("chunk:file-a:0".to_string(), StoredRecord { vector: vec![1.0], metadata, orphaned_at_ms: None });
        store.mark_chunks_orphaned(&["file-a".to_string()]).await.unwrap();
        let orphaned = store.get_orphaned_chunks(None).await.unwrap();
        assert_eq!(orphaned.len(), 1);
    }

    #[tokio::test]
    async fn delete_file_chunks_removes_only_matching_file() {
        let store = store();
        let mut meta_a = BTreeMap::new();
        meta_a.insert("fileId".to_string(), Value::String("a".to_string()));
        let mut meta_b = BTreeMap::new();
        meta_b.insert("fileId".to_string(), Value::String("b".to_string()));
        store.chunks.records.insert("chunk:a:0".to_string(), StoredRecord { vector: vec![1.0], metadata: meta_a, orphaned_at_ms: None });
        store.chunks.records.insert("chunk:b:0".to_string(), StoredRecord { vector: vec![1.0], metadata: meta_b, orphaned_at_ms: None });
        store.delete_file_chunks("a").await.unwrap();
        assert_eq!(store.chunks.records.len(), 1);
        assert!(store.chunks.records.contains_key("chunk:b:0"));
    }

    #[tokio::test]
    async fn update_file_chunk_paths_rewrites_id_and_metadata() {
        let store = store();
        let mut metadata = BTreeMap::new();
        metadata.insert("fileId".to_string(), Value::String("old-id".to_string()));
        store.chunks.records.insert("chunk:old-id:0".to_string(), StoredRecord { vector: vec![1.0], metadata, orphaned_at_ms: None });

        store
            .update_file_chunk_paths(&[ChunkPathUpdate {
                old_file_id: "old-id".to_string(),
                new_file_id: "new-id".to_string(),
                new_path: "/new/path.pdf".to_string(),
                new_name: "path.pdf".to_string(),
            }])
                .await
                .unwrap();

        assert!(!store.chunks.records.contains_key("chunk:old-id:0"));
        let moved = store.chunks.records.get("chunk:new-id:0").unwrap();
        assert_eq!(metadata_str(&moved.metadata, "fileId").as_deref(), Some("new-id"));
        assert_eq!(metadata_str(&moved.metadata, "path").as_deref(), Some("/new/path.pdf"));
    }

    #[tokio::test]
    async fn heartbeat_reports_healthy() {
        let store = store();
        assert!(store.heartbeat().await.unwrap());
    }
}
