//! Provider implementations: the concrete adapters that plug into the
//! domain port traits `ModelRuntime`, `ContentExtractor`, `FileAccess`, and
//! `VectorStore`. `organizer-application`'s orchestrators depend on the
//! traits only; this crate is where a process wires real collaborators in.
//!
//! The `Cache` port's concrete implementation
//! (`organizer_infrastructure::cache::InMemoryCache`) already lives in the
//! infrastructure crate; `cache` here just builds the named instances the
//! analysis pipeline expects.

/// Named `Cache` instances for the analysis pipeline.
pub mod cache;
/// `CoreContext`: the service container a process builds once at startup.
#[cfg(feature = "vectorstore-memory")]
pub mod context;
/// Default `ContentExtractor`: native plain-text extraction, boundary
/// pass-through for everything else.
pub mod content_extractor;
/// `tokio::fs`-backed `FileAccess`.
pub mod file_access;
/// HTTP `ModelRuntime` adapter for a local Ollama-shaped API.
pub mod model_runtime;
/// In-memory `VectorStore` adapter.
#[cfg(feature = "vectorstore-memory")]
pub mod vector_store;
