//! `ModelRuntime`: the single choke-point for all LLM calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::cancellation::CancellationToken;

/// Per-call options shared by every `ModelRuntime` method.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Wall-clock deadline in milliseconds; exceeding it MUST abort the
    /// underlying request and fail with `Error::Timeout`.
    pub deadline_ms: u64,
    /// Cooperative cancellation source.
    pub cancellation: CancellationToken,
    /// An explicit vision-model override that beats configuration.
    pub vision_model_override: Option<String>,
}

impl CallOptions {
    /// Build options with a deadline and a fresh cancellation token.
    #[must_use]
    pub fn with_deadline_ms(deadline_ms: u64) -> Self {
        Self {
            deadline_ms,
            cancellation: CancellationToken::new(),
            vision_model_override: None,
        }
    }
}

/// A model's raw text response, prior to JSON parsing/normalization.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Raw text returned by the model.
    pub text: String,
    /// Name of the model that produced it.
    pub model: String,
}

/// Result of `embed_text`.
#[derive(Debug, Clone)]
pub struct EmbedResult {
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Name of the embedding model that produced it.
    pub model: String,
}

/// Runtime health, as reported by `health_check`. Memoized whole by the
/// preflight cache so a cache hit carries the same model introspection a
/// fresh probe would.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the runtime is currently usable.
    pub healthy: bool,
    /// Human-readable status detail (e.g. an error summary when unhealthy).
    pub status: String,
    /// The vision model this runtime is configured with, when it supports
    /// vision calls at all.
    pub vision_model_name: Option<String>,
    /// Model names the backend reported as available, when the probe could
    /// reach `list_models`.
    pub available_models: Vec<String>,
}

/// Single choke-point for all LLM calls: text analysis, vision analysis,
/// embedding, and introspection.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Call the configured text model with a prompt, subject to the
    /// call's deadline and cancellation token.
    async fn analyze_text(&self, prompt: &str, opts: &CallOptions) -> Result<ModelResponse>;

    /// Call the configured (or overridden) vision model with a prompt and
    /// raw image bytes.
    async fn analyze_image(
        &self,
        prompt: &str,
        image_bytes: &[u8],
        opts: &CallOptions,
    ) -> Result<ModelResponse>;

    /// Embed a text input with the configured embedding model. Returns a
    /// finite-valued vector; callers validate dimension against the target
    /// collection.
    async fn embed_text(&self, text: &str, opts: &CallOptions) -> Result<EmbedResult>;

    /// List model names currently available in the runtime.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Whether the configured runtime backend supports vision calls at all.
    fn supports_vision(&self) -> bool;

    /// Probe runtime health. Callers should treat this as authoritative for
    /// gating analysis and should force-refresh any
    /// preflight cache after receiving an unhealthy response.
    async fn health_check(&self) -> Result<HealthStatus>;
}
