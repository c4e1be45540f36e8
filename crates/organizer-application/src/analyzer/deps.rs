//! Collaborator bundle shared by the document and image orchestrators.

use std::sync::Arc;

use organizer_domain::ports::{Cache, Clock, ContentExtractor, EmbeddingSink, FileAccess, ModelRuntime};

use crate::analyzer::dedup::CallDeduplicator;
use crate::folder_matcher::SemanticFolderMatcher;
use crate::gate::GateSettings;

/// Every collaborator an analyzer orchestrator needs, injected once at
/// wiring time.
#[derive(Clone)]
pub struct AnalyzerDeps {
    /// Single choke-point for LLM calls.
    pub model_runtime: Arc<dyn ModelRuntime>,
    /// Format-specific text/EXIF/preprocessing extraction boundary.
    pub content_extractor: Arc<dyn ContentExtractor>,
    /// Raw filesystem stat/read boundary.
    pub file_access: Arc<dyn FileAccess>,
    /// Analysis-result cache (document or image instance).
    pub analysis_cache: Arc<dyn Cache>,
    /// Semantic folder matcher, absent when no smart folders are
    /// configured for this call.
    pub folder_matcher: Option<Arc<SemanticFolderMatcher>>,
    /// In-flight model-call deduplicator.
    pub dedup: Arc<CallDeduplicator<organizer_domain::ports::ModelResponse>>,
    /// Destination for the finished embedding, once the gate decides to
    /// persist one.
    pub embedding_sink: Arc<dyn EmbeddingSink>,
    /// Embedding-gate policy/timing/scope this call obeys.
    pub gate_settings: GateSettings,
    /// Injectable time source.
    pub clock: Arc<dyn Clock>,
}
