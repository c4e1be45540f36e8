//! HTTP `ModelRuntime` adapter for a local, Ollama-shaped inference API.
//! Composes the resilience layer (circuit breaker, retry with
//! GPU fallback, abortable timeout) around a plain `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashmap::DashMap;
use organizer_domain::constants::{DEFAULT_CHARS_PER_TOKEN, TOKEN_BUDGET_SAFETY_FACTOR};
use organizer_domain::ports::model_runtime::{CallOptions, EmbedResult, HealthStatus, ModelResponse};
use organizer_domain::ports::{Cache, Clock, ModelRuntime};
use organizer_domain::{Error, Result};
use organizer_infrastructure::resilience::{
    with_abortable_timeout, with_gpu_fallback_retry, with_retry, CircuitBreaker, CircuitBreakerConfig, RetryConfig,
};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

/// Connection-pool tunables for the runtime's `reqwest::Client`, mirroring
/// the shape of a typical HTTP provider config: bounded idle connections,
/// a keepalive, and an identifying user agent.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum idle connections kept open per host.
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept before being closed.
    pub idle_timeout: Duration,
    /// TCP keepalive interval.
    pub keepalive: Duration,
    /// Per-request timeout floor; the deadline in `CallOptions` is the
    /// authoritative one, enforced separately by `with_abortable_timeout`.
    pub request_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            keepalive: Duration::from_secs(60),
            request_timeout: Duration::from_secs(180),
            user_agent: "organizer-core/model-runtime".to_string(),
        }
    }
}

fn build_client(config: &HttpClientConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(config.idle_timeout)
        .tcp_keepalive(config.keepalive)
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

const PREFLIGHT_CACHE_KEY: &str = "model-runtime:preflight:health";

/// `ModelRuntime` over a local Ollama-compatible HTTP API (`/api/generate`,
/// `/api/embeddings`, `/api/tags`). One circuit breaker per model name,
/// created lazily the first time that model is called — covers the
/// configured text/vision/embedding models plus any `vision_model_override`
/// passed in a call.
pub struct OllamaModelRuntime {
    client: reqwest::Client,
    base_url: String,
    text_model: String,
    vision_model: String,
    embedding_model: String,
    max_prompt_chars: usize,
    breakers: DashMap<String, std::sync::Arc<CircuitBreaker>>,
    preflight_cache: std::sync::Arc<dyn Cache>,
    preflight_ttl_ms: u64,
    clock: std::sync::Arc<dyn Clock>,
}

impl OllamaModelRuntime {
    /// Build a runtime pointed at `base_url`, with the given model
    /// selections.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` fails to build
    /// (e.g. an invalid TLS configuration).
    pub fn new(
        base_url: impl Into<String>,
        text_model: impl Into<String>,
        vision_model: impl Into<String>,
        embedding_model: impl Into<String>,
        embedding_token_limit: usize,
        preflight_ttl_ms: u64,
        preflight_cache: std::sync::Arc<dyn Cache>,
        clock: std::sync::Arc<dyn Clock>,
    ) -> Result<Self> {
        let client = build_client(&HttpClientConfig::default())
            .map_err(|source| Error::Generic(Box::new(source)))?;
        let max_prompt_chars =
            (embedding_token_limit as f64 * TOKEN_BUDGET_SAFETY_FACTOR * DEFAULT_CHARS_PER_TOKEN as f64) as usize;
        Ok(Self {
            client,
            base_url: base_url.into(),
            text_model: text_model.into(),
            vision_model: vision_model.into(),
            embedding_model: embedding_model.into(),
            max_prompt_chars,
            breakers: DashMap::new(),
            preflight_cache,
            preflight_ttl_ms,
            clock,
        })
    }

    fn breaker_for(&self, model: &str) -> std::sync::Arc<CircuitBreaker> {
        self.breakers
            .entry(model.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default(), self.clock.clone())))
            .clone()
    }

    /// Resolve an operational `model-type` argument (`"text"`, `"vision"`,
    /// `"embedding"`, or a literal model name) to the configured model name,
    /// for the `reset-circuit` CLI command.
    #[must_use]
    pub fn resolve_model_type(&self, model_type: &str) -> String {
        match model_type {
            "text" => self.text_model.clone(),
            "vision" => self.vision_model.clone(),
            "embedding" => self.embedding_model.clone(),
            other => other.to_string(),
        }
    }

    /// Force the named model's circuit breaker back to `Closed`, if one
    /// exists yet (a model never called has no breaker to reset). Returns
    /// whether a breaker was found.
    pub async fn reset_circuit(&self, model: &str) -> bool {
        let Some(breaker) = self.breakers.get(model).map(|entry| entry.clone()) else {
            return false;
        };
        breaker.force_close().await;
        true
    }

    async fn call_generate(
        &self,
        model: &str,
        prompt: &str,
        image_bytes: Option<&[u8]>,
        opts: &CallOptions,
    ) -> Result<ModelResponse> {
        let breaker = self.breaker_for(model);
        if !breaker.try_acquire().await {
            return Err(Error::CircuitOpen { model: model.to_string() });
        }

        let prompt = truncate_to_char_budget(prompt, self.max_prompt_chars);
        let image_b64 = image_bytes.map(|bytes| BASE64.encode(bytes));
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let model_owned = model.to_string();

        let result = with_abortable_timeout(
            with_gpu_fallback_retry(
                move |force_cpu| {
                    let client = client.clone();
                    let base_url = base_url.clone();
                    let model = model_owned.clone();
                    let prompt = prompt.clone();
                    let image_b64 = image_b64.clone();
                    async move { generate_request(&client, &base_url, &model, &prompt, image_b64.as_deref(), force_cpu).await }
                },
                "model-generate",
            ),
            opts.deadline_ms,
            "model-generate",
            &opts.cancellation,
        )
            .await;

        record_outcome(&breaker, &result).await;
        result
    }
}

async fn record_outcome<T>(breaker: &CircuitBreaker, result: &Result<T>) {
    match result {
        Ok(_) => breaker.record_success().await,
        Err(error) if error.is_non_transient() => breaker.record_non_transient_failure().await,
        Err(_) => breaker.record_failure().await,
    }
}

/// Truncate `text` to at most `max_chars` Unicode grapheme clusters, so a
/// truncation point never lands inside a multi-byte character.
fn truncate_to_char_budget(text: &str, max_chars: usize) -> String {
    if text.graphemes(true).count() <= max_chars {
        return text.to_string();
    }
    text.graphemes(true).take(max_chars).collect()
}

async fn generate_request(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    prompt: &str,
    image_b64: Option<&str>,
    force_cpu: bool,
) -> Result<ModelResponse> {
    let mut body = serde_json::json!({ "model": model, "prompt": prompt, "stream": false });
    if let Some(image) = image_b64 {
        body["images"] = serde_json::json!([image]);
    }
    if force_cpu {
        body["options"] = serde_json::json!({ "num_gpu": 0 });
    }

    let response = client
        .post(format!("{base_url}/api/generate"))
        .json(&body)
        .send()
        .await
        .map_err(|source| transport_error(model, &source))?;

    if !response.status().is_success() {
        return Err(classify_http_status(response.status()));
    }

    let parsed: Value = response.json().await.map_err(|source| Error::ParseFailed { message: source.to_string() })?;
    let text = parsed.get("response").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(ModelResponse { text, model: model.to_string() })
}

async fn embed_request(client: &reqwest::Client, base_url: &str, model: &str, text: &str) -> Result<EmbedResult> {
    let body = serde_json::json!({ "model": model, "prompt": text });
    let response = client
        .post(format!("{base_url}/api/embeddings"))
        .json(&body)
        .send()
        .await
        .map_err(|source| transport_error(model, &source))?;

    if !response.status().is_success() {
        return Err(classify_http_status(response.status()));
    }

    let parsed: Value = response.json().await.map_err(|source| Error::ParseFailed { message: source.to_string() })?;
    let vector: Vec<f32> = parsed
        .get("embedding")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
        .unwrap_or_default();

    if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::ParseFailed { message: "embedding response was empty or non-finite".to_string() });
    }
    Ok(EmbedResult { vector, model: model.to_string() })
}

fn transport_error(model: &str, source: &reqwest::Error) -> Error {
    if source.is_connect() {
        Error::ModelUnavailable { model: model.to_string() }
    } else {
        Error::Generic(Box::new(std::io::Error::other(source.to_string())))
    }
}

fn classify_http_status(status: reqwest::StatusCode) -> Error {
    match status.as_u16() {
        404 => Error::NonTransient { message: "model not found".to_string() },
        400 | 422 => Error::NonTransient { message: format!("invalid request: {status}") },
        _ => Error::Generic(Box::new(std::io::Error::other(format!("model runtime returned {status}")))),
    }
}

#[async_trait]
impl ModelRuntime for OllamaModelRuntime {
    async fn analyze_text(&self, prompt: &str, opts: &CallOptions) -> Result<ModelResponse> {
        self.call_generate(&self.text_model, prompt, None, opts).await
    }

    async fn analyze_image(&self, prompt: &str, image_bytes: &[u8], opts: &CallOptions) -> Result<ModelResponse> {
        let model = opts.vision_model_override.clone().unwrap_or_else(|| self.vision_model.clone());
        self.call_generate(&model, prompt, Some(image_bytes), opts).await
    }

    async fn embed_text(&self, text: &str, opts: &CallOptions) -> Result<EmbedResult> {
        let model = self.embedding_model.clone();
        let breaker = self.breaker_for(&model);
        if !breaker.try_acquire().await {
            return Err(Error::CircuitOpen { model });
        }

        let text = truncate_to_char_budget(text, self.max_prompt_chars);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let model_owned = model.clone();

        let result = with_abortable_timeout(
            with_retry(
                move || {
                    let client = client.clone();
                    let base_url = base_url.clone();
                    let model = model_owned.clone();
                    let text = text.clone();
                    async move { embed_request(&client, &base_url, &model, &text).await }
                },
                RetryConfig::default(),
                "embed-text",
            ),
            opts.deadline_ms,
            "embed-text",
            &opts.cancellation,
        )
            .await;

        record_outcome(&breaker, &result).await;
        result
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|source| transport_error("runtime", &source))?;
        if !response.status().is_success() {
            return Err(classify_http_status(response.status()));
        }
        let parsed: Value = response.json().await.map_err(|source| Error::ParseFailed { message: source.to_string() })?;
        Ok(parsed
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
                .unwrap_or_default())
    }

    fn supports_vision(&self) -> bool {
        !self.vision_model.is_empty()
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if let Some(cached) = self.preflight_cache.get(PREFLIGHT_CACHE_KEY).await? {
            if let Ok(status) = serde_json::from_str::<HealthStatus>(&cached) {
                return Ok(status);
            }
        }
        let vision_model_name = self.supports_vision().then(|| self.vision_model.clone());
        let status = match self.client.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(response) if response.status().is_success() => {
                let available_models = self.list_models().await.unwrap_or_default();
                HealthStatus { healthy: true, status: "healthy".to_string(), vision_model_name, available_models }
            }
            Ok(response) => HealthStatus {
                healthy: false,
                status: format!("unhealthy: HTTP {}", response.status()),
                vision_model_name,
                available_models: Vec::new(),
            },
            Err(source) => HealthStatus {
                healthy: false,
                status: format!("unhealthy: {source}"),
                vision_model_name,
                available_models: Vec::new(),
            },
        };
        // Only memoize healthy results, so the next call re-probes instead
        // of trusting a stale failure for the full TTL.
        if status.healthy {
            if let Ok(serialized) = serde_json::to_string(&status) {
                self.preflight_cache.set(PREFLIGHT_CACHE_KEY, serialized, self.preflight_ttl_ms).await?;
            }
        }
        Ok(status)
    }
}
