//! Default tunables. `organizer_infrastructure::config`
//! loads an `OrganizerConfig` that may override every one of these; code
//! elsewhere in the workspace should read the config value rather than these
//! constants directly, except in tests and in the `Default` impls that
//! seed the config layer itself.

/// Minimum folder-match score required before the semantic folder matcher
/// will consider overriding the model's own category.
pub const FOLDER_MATCH_CONFIDENCE: f32 = 0.55;

/// Confidence below which a fresh (non-strict) OCR post-pass is attempted.
pub const OCR_POST_PASS_CONFIDENCE_SKIP_THRESHOLD: u8 = 88;

/// Confidence below which the OCR post-pass runs even in strict mode.
pub const OCR_POST_PASS_STRICT_SKIP_THRESHOLD: u8 = 92;

/// TTL for the model-runtime preflight cache.
pub const IMAGE_PREFLIGHT_TTL_MS: u64 = 15_000;

/// TTL for the folder-upsert de-duplication cache.
pub const FOLDER_UPSERT_DEDUP_TTL_MS: u64 = 30_000;

/// Embedding queue flush batch size.
pub const BATCH_SIZE: usize = 50;

/// Delay before a coalesced flush timer fires.
pub const FLUSH_DELAY_MS: u64 = 500;

/// Circuit breaker: consecutive failures before `Closed -> Open`.
pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;

/// Circuit breaker: consecutive half-open successes before `-> Closed`.
pub const CIRCUIT_SUCCESS_THRESHOLD: u32 = 2;

/// Circuit breaker: time spent `Open` before a probe is admitted.
pub const CIRCUIT_OPEN_TIMEOUT_SECS: u64 = 300;

/// Circuit breaker: time with no failures, while `Closed`, before the
/// failure counter resets to zero.
pub const CIRCUIT_RESET_TIMEOUT_SECS: u64 = 300;

/// Maximum concurrent probes admitted while a breaker is `HalfOpen`.
pub const CIRCUIT_HALF_OPEN_MAX_CONCURRENT: u32 = 1;

/// Retry wrapper: maximum attempts beyond the first.
pub const RETRY_MAX_RETRIES: u32 = 3;

/// Retry wrapper: initial backoff delay.
pub const RETRY_INITIAL_DELAY_MS: u64 = 1_000;

/// Retry wrapper: backoff delay cap.
pub const RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Size cap above which image analysis is refused outright.
pub const MAX_IMAGE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Size cap above which OCR is skipped even though analysis proceeds.
pub const MAX_OCR_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Default assumed characters per token, used to derive the text truncation
/// cap from a model's declared token budget.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Fraction of the embedding token limit left as headroom before truncation.
pub const TOKEN_BUDGET_SAFETY_FACTOR: f64 = 0.9;

/// Maximum number of keywords retained on an `AnalysisResult`.
pub const MAX_KEYWORDS: usize = 7;

/// Maximum number of named entities retained on an `AnalysisResult`.
pub const MAX_KEY_ENTITIES: usize = 20;

/// Maximum length of `extracted_text` carried on a queue item.
pub const MAX_QUEUE_EXTRACTED_TEXT_CHARS: usize = 5000;

/// Maximum length of `summary` carried on a queue item.
pub const MAX_QUEUE_SUMMARY_CHARS: usize = 2000;

/// Maximum length of `purpose` carried on a queue item.
pub const MAX_QUEUE_PURPOSE_CHARS: usize = 1000;

/// Maximum length of `reasoning` carried on a queue item.
pub const MAX_QUEUE_REASONING_CHARS: usize = 500;

/// Maximum length of extracted-text snippet fed to the folder-matcher
/// embedding input.
pub const MAX_FOLDER_MATCH_TEXT_SNIPPET_CHARS: usize = 2000;

/// Number of nearest neighbours requested when querying the folders
/// collection.
pub const FOLDER_MATCH_TOP_K: usize = 5;

/// Failed-items map capacity before LRU eviction to dead-letter.
pub const MAX_FAILED_ITEMS_SIZE: usize = 1000;

/// Per-item maximum retry attempts before dead-lettering.
pub const ITEM_MAX_RETRIES: u32 = 8;

/// Relationship index: minimum edge weight retained.
pub const RELATIONSHIP_MIN_WEIGHT: u32 = 2;

/// Relationship index: maximum number of edges retained.
pub const MAX_RELATIONSHIP_EDGES: usize = 2000;

/// Stable cache-signature format version.
pub const SIGNATURE_VERSION: &str = "v2";

/// Deadline for a full text/vision analysis model call. Generous because local model inference on CPU can
/// be slow, especially for vision.
pub const AI_ANALYSIS_LONG_MS: u64 = 120_000;

/// Deadline for a single `embed_text` call.
pub const EMBEDDING_REQUEST_MS: u64 = 15_000;

/// Deadline for a folder-collection similarity query.
pub const SEMANTIC_QUERY_MS: u64 = 5_000;

/// Extensions (no leading dot, lower-case) accepted by the document
/// orchestrator's supported-format gate.
pub const SUPPORTED_DOCUMENT_EXTENSIONS: &[&str] =
    &["pdf", "doc", "docx", "txt", "md", "rtf", "odt", "csv", "xlsx", "xls", "pptx", "ppt"];

/// Extensions (no leading dot, lower-case) accepted by the image
/// orchestrator's supported-format gate.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "heic"];

/// Embedding queue: maximum in-memory buffer size per stage, used to derive
/// the `wait_for_capacity` high/release watermarks.
pub const QUEUE_CAPACITY: usize = 1000;

/// Embedding queue: producers block in `wait_for_capacity` once the buffer
/// reaches this fraction of `QUEUE_CAPACITY`.
pub const QUEUE_HIGH_WATERMARK_FRACTION: f64 = 0.75;

/// Embedding queue: `wait_for_capacity` unblocks once the buffer drains
/// back down to this fraction of `QUEUE_CAPACITY`.
pub const QUEUE_RELEASE_WATERMARK_FRACTION: f64 = 0.50;

/// Embedding queue: `wait_for_capacity` gives up after this long and
/// reports `timed_out`.
pub const QUEUE_WAIT_FOR_CAPACITY_MAX_WAIT_MS: u64 = 60_000;

/// Embedding queue: base delay for per-item exponential backoff
/// (`BASE * 2 * 2^(retry_count-1)`).
pub const ITEM_RETRY_BASE_MS: u64 = 1_000;

/// Embedding queue: dead-letter list capacity; when full, the oldest 10%
/// is pruned to make room.
pub const MAX_DEAD_LETTER_SIZE: usize = 5_000;

/// Embedding queue: back-off before rescheduling a flush after the vector
/// store reports itself offline.
pub const QUEUE_OFFLINE_BACKOFF_MS: u64 = 5_000;
