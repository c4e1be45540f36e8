//! `CoreContext`: the service container a process builds once at startup
//! and tears down once at shutdown — the concrete collaborators behind
//! every domain port, wired from `OrganizerConfig`.

use std::sync::Arc;

use organizer_domain::ports::clock::SystemClock;
use organizer_domain::ports::{Cache, Clock, VectorStore};
use organizer_domain::value_objects::FileKind;
use organizer_domain::Result;
use organizer_infrastructure::cache::{CacheInvalidationBus, InvalidationEvent};
use organizer_infrastructure::config::OrganizerConfig;
use organizer_infrastructure::queue::EmbeddingQueueSet;
use organizer_infrastructure::relationships::RelationshipStore;

use crate::cache::{document_analysis_cache, folder_upsert_dedup_cache, image_analysis_cache, preflight_cache};
use crate::content_extractor::NativeContentExtractor;
use crate::file_access::TokioFileAccess;
use crate::model_runtime::OllamaModelRuntime;
use crate::vector_store::InMemoryVectorStore;

/// Context window of the configured embedding model, in tokens. `nomic-embed-text`
/// (the default) supports 8192; a deployment pointed at a different
/// embedding model would need this to track that model's own window.
const EMBEDDING_TOKEN_LIMIT: usize = 8192;

/// Owns every long-lived collaborator a running process needs: the model
/// runtime, the content extractor and file access boundaries, the vector
/// store, the named analysis/dedup caches, and the durable embedding
/// queue. Built once via [`CoreContext::init`]; torn down once via
/// [`CoreContext::shutdown`].
pub struct CoreContext {
    /// The configuration this context was built from.
    pub config: OrganizerConfig,
    /// HTTP model runtime adapter.
    pub model_runtime: Arc<OllamaModelRuntime>,
    /// Native plain-text content extractor.
    pub content_extractor: Arc<NativeContentExtractor>,
    /// `tokio::fs`-backed file access.
    pub file_access: Arc<TokioFileAccess>,
    /// In-memory vector store adapter.
    pub vector_store: Arc<InMemoryVectorStore>,
    /// Document-analysis result cache.
    pub document_analysis_cache: Arc<dyn Cache>,
    /// Image-analysis result cache.
    pub image_analysis_cache: Arc<dyn Cache>,
    /// Folder-upsert de-duplication cache.
    pub folder_upsert_dedup_cache: Arc<dyn Cache>,
    /// Durable, batched embedding work queue.
    pub queue: Arc<EmbeddingQueueSet>,
    /// Persisted relationship edge index.
    pub relationships: Arc<RelationshipStore>,
    /// Cross-cache invalidation fan-out; every named cache above is
    /// subscribed to it at construction time.
    pub invalidation_bus: Arc<CacheInvalidationBus>,
    /// Injectable time source shared by every collaborator above.
    pub clock: Arc<dyn Clock>,
    cache_invalidation_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl CoreContext {
    /// Build every collaborator from `config`, loading the embedding
    /// queue's sidecars from `config.data_dir` and scheduling a flush for
    /// whatever they restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the model runtime's HTTP client fails to build,
    /// or if a queue sidecar exists but cannot be read or is unrecoverably
    /// malformed.
    pub async fn init(config: OrganizerConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let vector_store = Arc::new(InMemoryVectorStore::new(clock.clone()));

        let model_preflight_cache = preflight_cache();
        let model_runtime = Arc::new(OllamaModelRuntime::new(
            config.models.base_url.clone(),
            config.models.text_model.clone(),
            config.models.vision_model.clone(),
            config.models.embedding_model.clone(),
            EMBEDDING_TOKEN_LIMIT,
            config.image_preflight_ttl_ms,
            model_preflight_cache,
            clock.clone(),
        )?);

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|source| organizer_domain::Error::Io { source })?;
        let queue = Arc::new(EmbeddingQueueSet::load(&config.data_dir, vector_store.clone(), clock.clone()).await?);
        queue.flush_restored().await?;

        let relationships = Arc::new(RelationshipStore::new(&config.data_dir, clock.clone()));

        let document_analysis_cache = document_analysis_cache();
        let image_analysis_cache = image_analysis_cache();
        let folder_upsert_dedup_cache = folder_upsert_dedup_cache();

        let invalidation_bus = Arc::new(CacheInvalidationBus::new());
        let cache_invalidation_handles = vec![
            invalidation_bus.subscribe_cache(document_analysis_cache.clone()),
            invalidation_bus.subscribe_cache(image_analysis_cache.clone()),
            invalidation_bus.subscribe_cache(folder_upsert_dedup_cache.clone()),
        ];

        Ok(Self {
            config,
            model_runtime,
            content_extractor: Arc::new(NativeContentExtractor),
            file_access: Arc::new(TokioFileAccess),
            vector_store,
            document_analysis_cache,
            image_analysis_cache,
            folder_upsert_dedup_cache,
            queue,
            relationships,
            invalidation_bus,
            clock,
            cache_invalidation_handles,
        })
    }

    /// Propagate a rename/move: rederive affected queue items' ids and
    /// drop any cache entry keyed under the old path. Callers that detect
    /// filesystem moves (a watcher, an explicit CLI invocation) should
    /// route every rename through this rather than touching `queue`
    /// directly, so the caches stay consistent with the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if either stage queue's path-change update fails.
    pub async fn handle_path_change(&self, old_path: &str, new_path: &str, new_name: &str, kind: FileKind) -> Result<usize> {
        let updated = self.queue.update_by_file_path(old_path, new_path, new_name, kind).await?;
        self.invalidation_bus.publish(InvalidationEvent::PathChange { old_path: old_path.to_string() });
        Ok(updated)
    }

    /// Propagate a deletion: drop the path's queue items and invalidate
    /// any cache entry keyed under it.
    ///
    /// # Errors
    ///
    /// Returns an error if either stage queue's removal fails.
    pub async fn handle_deletion(&self, path: &str) -> Result<usize> {
        let removed = self.queue.remove_by_file_path(path).await?;
        self.invalidation_bus.publish(InvalidationEvent::Deletion { path: path.to_string() });
        Ok(removed)
    }

    /// Force-flush every queue stage to completion and stop the
    /// invalidation-bus subscriber tasks. Safe to call from both the
    /// `flush` CLI command and a graceful-shutdown hook.
    pub async fn shutdown(&self) -> Result<()> {
        self.queue.shutdown().await?;
        for handle in &self.cache_invalidation_handles {
            handle.abort();
        }
        Ok(())
    }
}
