//! `VectorStore`: adapter boundary hiding engine specifics behind three
//! logical collections — `files`, `file_chunks`, `folders` — all cosine
//! space.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::value_objects::CollectionId;

/// A record to upsert: id, vector, and arbitrary metadata.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Wire-form id (`ItemId::to_wire`).
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Metadata carried alongside the vector.
    pub metadata: BTreeMap<String, Value>,
}

/// Why a record was skipped during a batch upsert, rather than silently
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Vector length did not match the collection's declared dimension.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual vector length.
        actual: usize,
    },
    /// The vector contained a non-finite component.
    NonFinite,
    /// The record's id was empty.
    EmptyId,
}

/// Outcome of a batch upsert: which ids were accepted and which were
/// skipped, with a reason for each skip.
#[derive(Debug, Clone, Default)]
pub struct BatchUpsertReport {
    /// Ids that were upserted successfully.
    pub upserted: Vec<String>,
    /// Ids that were skipped, with a reason each.
    pub skipped: Vec<(String, SkipReason)>,
}

/// A scored query result, already normalized, returned sorted by score descending.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// Matched record's id.
    pub id: String,
    /// Normalized similarity score.
    pub score: f32,
    /// Metadata carried on the matched record.
    pub metadata: BTreeMap<String, Value>,
}

/// A path update for `update_file_chunk_paths`: the owning file's old and
/// new canonical id plus the new display path/name.
#[derive(Debug, Clone)]
pub struct ChunkPathUpdate {
    /// File's canonical id before the move.
    pub old_file_id: String,
    /// File's canonical id after the move.
    pub new_file_id: String,
    /// New absolute path.
    pub new_path: String,
    /// New display name (filename).
    pub new_name: String,
}

/// Adapter boundary over the underlying vector-store engine.
/// Implementations must keep file-level, chunk-level, and folder-level
/// collections consistent under moves, renames, and deletes.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent batch upsert into the `files` collection.
    async fn batch_upsert_files(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport>;

    /// Idempotent batch upsert into the `folders` collection.
    async fn batch_upsert_folders(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport>;

    /// Idempotent batch upsert into the `file_chunks` collection. Each
    /// record's metadata MUST carry a `fileId` entry.
    async fn batch_upsert_chunks(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport>;

    /// Top-k cosine-similar folders for a raw query vector.
    async fn query_folders_by_vector(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredRecord>>;

    /// Top-k cosine-similar folders for a file already present in the
    /// `files` collection. Implementations must retry the underlying `get`
    /// up to 3 times with 50/100/200ms backoff to tolerate read-after-write
    /// lag.
    async fn query_folders_for_file(&self, file_id: &str, k: usize) -> Result<Vec<ScoredRecord>>;

    /// Delete a single file record from the `files` collection.
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Delete a single folder record from the `folders` collection.
    async fn delete_folder(&self, folder_id: &str) -> Result<()>;

    /// Mark all chunks belonging to the given files as orphaned, without
    /// deleting them outright.
    async fn mark_chunks_orphaned(&self, file_ids: &[String]) -> Result<()>;

    /// Fetch chunks marked orphaned, optionally only those older than
    /// `max_age_ms`.
    async fn get_orphaned_chunks(&self, max_age_ms: Option<u64>) -> Result<Vec<ScoredRecord>>;

    /// Delete every chunk belonging to one file.
    async fn delete_file_chunks(&self, file_id: &str) -> Result<()>;

    /// Delete every chunk belonging to any of the given files.
    async fn batch_delete_file_chunks(&self, file_ids: &[String]) -> Result<()>;

    /// Rewrite chunk ids and `fileId`/`path`/`name` metadata after a file
    /// move, deleting the old ids.
    async fn update_file_chunk_paths(&self, updates: &[ChunkPathUpdate]) -> Result<()>;

    /// Declared vector dimension for a collection, if it has been created.
    async fn collection_dimension(&self, collection: CollectionId) -> Result<Option<usize>>;

    /// Liveness probe with the adapter's own retry/backoff applied
    /// internally.
    async fn heartbeat(&self) -> Result<bool>;
}
