//! `OrganizerConfig`: every tunable, loaded with `figment`
//! by layering, in increasing priority, built-in defaults, an optional
//! `organizer.toml` profile file, and `ORGANIZER_`-prefixed environment
//! variables.

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use organizer_application::gate::{EmbeddingPolicy, EmbeddingScope, EmbeddingTiming, GateSettings};
use serde::{Deserialize, Serialize};

use organizer_domain::{constants, Error, Result};

/// Structured logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `RUST_LOG`-style filter directive, e.g. `"info"` or `"organizer=debug"`.
    pub level: String,
    /// Emit newline-delimited JSON instead of the human-readable formatter.
    pub json_format: bool,
    /// Directory to write rotating log files into, if any.
    pub file_output: Option<PathBuf>,
    /// Maximum number of rotated files retained when `file_output` is set.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_output: None,
            max_files: 7,
        }
    }
}

/// Model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    /// Base URL of the local model runtime's HTTP API.
    pub base_url: String,
    /// Text analysis model identifier.
    pub text_model: String,
    /// Vision analysis model identifier.
    pub vision_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            text_model: "llama3.1".to_string(),
            vision_model: "llava".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

/// Circuit breaker tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitConfig {
    /// Consecutive failures before `Closed -> Open`.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before `-> Closed`.
    pub success_threshold: u32,
    /// Time spent `Open` before a probe is admitted, in seconds.
    pub timeout_secs: u64,
    /// Time with no failures, while `Closed`, before the failure counter
    /// resets to zero, in seconds.
    pub reset_timeout_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: constants::CIRCUIT_FAILURE_THRESHOLD,
            success_threshold: constants::CIRCUIT_SUCCESS_THRESHOLD,
            timeout_secs: constants::CIRCUIT_OPEN_TIMEOUT_SECS,
            reset_timeout_secs: constants::CIRCUIT_RESET_TIMEOUT_SECS,
        }
    }
}

/// Size caps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeCapsConfig {
    /// Analysis refused above this many bytes.
    pub max_image_size_bytes: u64,
    /// OCR skipped (analysis still proceeds) above this many bytes.
    pub max_ocr_size_bytes: u64,
}

impl Default for SizeCapsConfig {
    fn default() -> Self {
        Self {
            max_image_size_bytes: constants::MAX_IMAGE_SIZE_BYTES,
            max_ocr_size_bytes: constants::MAX_OCR_SIZE_BYTES,
        }
    }
}

/// Top-level configuration covering every tunable plus the ambient
/// logging and persisted-state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerConfig {
    /// Directory holding the persisted-state sidecars: queue
    /// buffers, dead-letter queue, relationship index.
    pub data_dir: PathBuf,
    /// Embedding gate policy.
    pub embedding_timing: EmbeddingTiming,
    /// Default embedding policy.
    pub default_embedding_policy: EmbeddingPolicy,
    /// Embedding scope.
    pub embedding_scope: EmbeddingScope,
    /// Model selection.
    pub models: ModelsConfig,
    /// Minimum folder-match score before the matcher overrides the model's
    /// own category.
    pub folder_match_confidence: f32,
    /// Confidence below which a non-strict OCR post-pass is attempted.
    pub ocr_post_pass_confidence_skip_threshold: u8,
    /// Confidence below which the OCR post-pass runs even in strict mode.
    pub ocr_post_pass_strict_skip_threshold: u8,
    /// TTL for the model-runtime preflight cache, in milliseconds.
    pub image_preflight_ttl_ms: u64,
    /// Embedding queue flush batch size.
    pub batch_size: usize,
    /// Delay before a coalesced flush timer fires, in milliseconds.
    pub flush_delay_ms: u64,
    /// Circuit breaker tunables.
    pub circuit: CircuitConfig,
    /// Size caps.
    pub size_caps: SizeCapsConfig,
    /// Structured logging configuration.
    pub logging: LoggingConfig,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            embedding_timing: EmbeddingTiming::default(),
            default_embedding_policy: EmbeddingPolicy::default(),
            embedding_scope: EmbeddingScope::default(),
            models: ModelsConfig::default(),
            folder_match_confidence: constants::FOLDER_MATCH_CONFIDENCE,
            ocr_post_pass_confidence_skip_threshold: constants::OCR_POST_PASS_CONFIDENCE_SKIP_THRESHOLD,
            ocr_post_pass_strict_skip_threshold: constants::OCR_POST_PASS_STRICT_SKIP_THRESHOLD,
            image_preflight_ttl_ms: constants::IMAGE_PREFLIGHT_TTL_MS,
            batch_size: constants::BATCH_SIZE,
            flush_delay_ms: constants::FLUSH_DELAY_MS,
            circuit: CircuitConfig::default(),
            size_caps: SizeCapsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl OrganizerConfig {
    /// The gate policy settings this config implies, ready for
    /// `organizer_application::gate::should_embed`.
    #[must_use]
    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            timing: self.embedding_timing,
            policy: self.default_embedding_policy,
            scope: self.embedding_scope,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("organizer-core")
}

/// Load configuration by layering defaults, an optional `profile_path`
/// (typically `organizer.toml`), and `ORGANIZER_`-prefixed environment
/// variables, in that increasing-priority order.
///
/// # Errors
///
/// Returns an error if the TOML file is malformed or a value fails to
/// deserialize into its declared type.
pub fn load(profile_path: Option<&std::path::Path>) -> Result<OrganizerConfig> {
    let mut figment = Figment::from(Serialized::defaults(OrganizerConfig::default()));
    if let Some(path) = profile_path {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
    }
    figment = figment.merge(Env::prefixed("ORGANIZER_").split("__"));
    figment.extract().map_err(|source| Error::Generic(Box::new(source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_profile_file() {
        let config = load(None).unwrap();
        assert_eq!(config.models.text_model, "llama3.1");
        assert_eq!(config.batch_size, constants::BATCH_SIZE);
    }

    #[test]
    fn environment_override_wins_over_defaults() {
        std::env::set_var("ORGANIZER_BATCH_SIZE", "99");
        let config = load(None).unwrap();
        std::env::remove_var("ORGANIZER_BATCH_SIZE");
        assert_eq!(config.batch_size, 99);
    }

    #[test]
    fn toml_profile_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("organizer.toml");
        std::fs::write(&profile, "folderMatchConfidence = 0.75\n").unwrap();
        let config = load(Some(&profile)).unwrap();
        assert!((config.folder_match_confidence - 0.75).abs() < f32::EPSILON);
    }
}
