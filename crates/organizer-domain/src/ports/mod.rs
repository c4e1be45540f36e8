//! Capability traits implemented by `organizer-providers` and
//! `organizer-infrastructure`.

/// Cooperative cancellation token shared by every external call.
pub mod cancellation;
/// `Cache`: content-addressed key/value store with TTL, used by the
/// analysis caches and the preflight/folder-upsert dedup caches.
pub mod cache;
/// `Clock`: injectable source of "now", so TTL/backoff/circuit-timeout
/// logic is deterministically testable.
pub mod clock;
/// `ContentExtractor`: boundary capability for raw text/image extraction.
pub mod content_extractor;
/// `EmbeddingSink`: boundary the analyzer pipeline enqueues finished
/// embeddings through.
pub mod embedding_sink;
/// `FileAccess`: boundary capability for raw filesystem stat/read.
pub mod file_access;
/// `ModelRuntime`: single choke-point for all LLM calls.
pub mod model_runtime;
/// `VectorStore`: adapter boundary over the underlying vector-store engine.
pub mod vector_store;

pub use cache::Cache;
pub use cancellation::CancellationToken;
pub use clock::Clock;
pub use content_extractor::{ContentExtractor, ExtractOptions, ExtractedText, ExtractionMethod};
pub use embedding_sink::EmbeddingSink;
pub use file_access::{FileAccess, FileStat};
pub use model_runtime::{CallOptions, EmbedResult, HealthStatus, ModelResponse, ModelRuntime};
pub use vector_store::{
    BatchUpsertReport, ChunkPathUpdate, ScoredRecord, SkipReason, VectorRecord, VectorStore,
};
