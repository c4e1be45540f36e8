//! Embedding gate: single source of truth deciding whether to persist an
//! embedding. A pure decision function — no I/O, no state —
//! so it is exhaustively table-tested.

use serde::{Deserialize, Serialize};

/// Pipeline checkpoint at which the gate is asked to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    /// Asked during the initial analysis pass.
    Analysis,
    /// Asked after the file has been organized/moved.
    Final,
}

/// When, across the pipeline, embeddings are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingTiming {
    /// Embed as soon as analysis produces a result.
    #[default]
    DuringAnalysis,
    /// Defer until the file has been moved into its destination folder.
    AfterOrganize,
    /// Never embed automatically; only on explicit user action.
    Manual,
}

/// Whether embedding happens at all, by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingPolicy {
    /// Embed according to `EmbeddingTiming`/`EmbeddingScope`.
    #[default]
    Embed,
    /// Never embed.
    Skip,
    /// Reserved for a web-search-only mode; behaves like `Skip` for the
    /// local vector store.
    WebOnly,
}

/// Which files are eligible for embedding at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingScope {
    /// Every analyzed file is eligible.
    #[default]
    AllAnalyzed,
    /// Only files that ended up assigned to a smart folder are eligible.
    SmartFoldersOnly,
}

/// Settings consulted by the gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateSettings {
    /// When embeddings are persisted.
    pub timing: EmbeddingTiming,
    /// Whether embedding is enabled at all.
    pub policy: EmbeddingPolicy,
    /// Which files are eligible.
    pub scope: EmbeddingScope,
}

/// Decide whether an embedding should be persisted for this call.
/// Pure function: same inputs, same answer,
/// every time.
#[must_use]
pub fn should_embed(stage: GateStage, settings: GateSettings, is_in_smart_folder: bool) -> bool {
    if settings.policy != EmbeddingPolicy::Embed {
        return false;
    }
    if settings.scope == EmbeddingScope::SmartFoldersOnly && !is_in_smart_folder {
        return false;
    }
    if settings.timing == EmbeddingTiming::Manual {
        return false;
    }
    match stage {
        GateStage::Analysis => settings.timing == EmbeddingTiming::DuringAnalysis,
        GateStage::Final => settings.timing == EmbeddingTiming::AfterOrganize,
    }
}
