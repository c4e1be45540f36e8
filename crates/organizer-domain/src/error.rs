//! Error taxonomy for the analysis-and-embedding core.
//!
//! Kinds are grouped by propagation policy: recoverable model errors get one
//! retry, circuit-open and non-transient errors short-circuit to a filename
//! fallback, and persistence/queue errors stay with the queue rather than
//! the caller.

use thiserror::Error;

/// Result type alias used throughout the analysis core.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the analysis-and-embedding core.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Generic error from an external collaborator.
    #[error("{0}")]
    Generic(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The file referenced by a `FileRef` could not be found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The file was deleted between `stat` and `read` (TOCTOU).
    #[error("file deleted during read: {path}")]
    FileDeletedDuringRead {
        /// Path that disappeared mid-read.
        path: String,
    },

    /// The file exceeds a size cap (`MAX_IMAGE_SIZE`, `MAX_OCR_SIZE`).
    #[error("file too large: {path} ({size} bytes, cap {cap} bytes)")]
    FileTooLarge {
        /// Path of the oversized file.
        path: String,
        /// Observed size in bytes.
        size: u64,
        /// The cap that was exceeded.
        cap: u64,
    },

    /// The file contained zero bytes.
    #[error("empty file: {path}")]
    EmptyFile {
        /// Path of the empty file.
        path: String,
    },

    /// The file extension is not in the supported-format set.
    #[error("unsupported format: {extension}")]
    UnsupportedFormat {
        /// The rejected extension.
        extension: String,
    },

    /// Image preprocessing (resize/convert) failed, typically on corrupt input.
    #[error("image preprocessing failed: {message}")]
    PreprocessingFailed {
        /// Description of the failure.
        message: String,
    },

    /// An external call exceeded its deadline and was aborted.
    #[error("operation timed out after {label} ({elapsed_ms}ms)")]
    Timeout {
        /// Label identifying the timed-out operation (for logs/metrics).
        label: String,
        /// Elapsed milliseconds before the abort fired.
        elapsed_ms: u64,
    },

    /// A per-model circuit breaker is open; the call was rejected without
    /// attempting the underlying operation.
    #[error("circuit open for model '{model}'")]
    CircuitOpen {
        /// The model whose breaker is open.
        model: String,
    },

    /// The operation was cancelled via its cancellation token.
    #[error("operation cancelled: {label}")]
    Cancelled {
        /// Label identifying the cancelled operation.
        label: String,
    },

    /// An embedding vector did not match the collection's declared dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension declared by the collection.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },

    /// The requested model is not available in the runtime.
    #[error("model unavailable: {model}")]
    ModelUnavailable {
        /// Name of the unavailable model.
        model: String,
    },

    /// The model's response could not be parsed as the expected structure,
    /// even after a repair attempt.
    #[error("failed to parse model response: {message}")]
    ParseFailed {
        /// Description of the parse failure.
        message: String,
    },

    /// The single LLM-repair round also failed to produce parseable JSON.
    #[error("repair attempt failed: {message}")]
    RepairFailed {
        /// Description of the repair failure.
        message: String,
    },

    /// The vector store backend is unreachable or returned a transport error.
    #[error("vector store unavailable: {message}")]
    VectorStoreUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// A persisted sidecar file was corrupt and has been quarantined.
    #[error("persisted state corrupt: {path}")]
    PersistenceCorrupt {
        /// Path of the corrupt sidecar (before it was renamed aside).
        path: String,
    },

    /// The embedding queue is at capacity and `wait_for_capacity` timed out.
    #[error("queue saturated: {stage}")]
    QueueSaturated {
        /// Stage (`analysis` or `organize`) that is saturated.
        stage: String,
    },

    /// A non-transient model error (model-not-found, corrupted model, invalid
    /// input). Callers must not count these against a circuit breaker.
    #[error("non-transient model error: {message}")]
    NonTransient {
        /// Description of the non-transient failure.
        message: String,
    },

    /// Invalid argument passed to a domain operation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: String,
    },

    /// All GPU-fallback-class retries were exhausted, including the
    /// forced-CPU attempts.
    #[error("{message} (used_cpu_fallback={used_cpu_fallback})")]
    GpuFallbackExhausted {
        /// Description built from the last underlying failure.
        message: String,
        /// Whether a forced-CPU retry was attempted before giving up.
        used_cpu_fallback: bool,
    },
}

impl Error {
    /// Whether this error belongs to the "recoverable" set that the analyzer
    /// retries exactly once with `bypass_cache=true`.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout {.. } | Error::ParseFailed {.. } | Error::EmptyFile {.. }
        )
    }

    /// Whether this error must bypass circuit-breaker failure counting.
    #[must_use]
    pub fn is_non_transient(&self) -> bool {
        matches!(self, Error::NonTransient {.. } | Error::ModelUnavailable {.. })
    }

    /// Whether this looks like a transient GPU backend fault (driver reset,
    /// VRAM exhaustion) rather than a genuine model or input problem. Such
    /// errors get the two-stage primary-then-forced-CPU retry in
    /// `organizer-infrastructure::resilience::retry`.
    #[must_use]
    pub fn is_gpu_fallback_class(&self) -> bool {
        match self {
            Error::PreprocessingFailed { message } => gpu_fault_text(message),
            Error::Generic(source) => gpu_fault_text(&source.to_string()),
            _ => false,
        }
    }
}

fn gpu_fault_text(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["gpu", "cuda", "vram", "out of memory", "device-side assert"]
        .iter()
        .any(|needle| lower.contains(needle))
}
