//! Infrastructure layer: concrete, I/O-capable implementations of the
//! cross-cutting concerns the domain and application layers depend on as
//! traits only — resilience wrappers, the cache service, the durable
//! embedding queue, layered configuration, and structured logging.
//!
//! Nothing here implements a domain port directly except `Cache`
//! (`cache::InMemoryCache`); the model-runtime, vector-store, and
//! content-extractor adapters live in `organizer-providers`, which depends
//! on this crate for the resilience and cache machinery it wraps around
//! them.

/// `InMemoryCache` (moka-backed) and the cross-cache invalidation bus.
pub mod cache;
/// Layered `OrganizerConfig`.
pub mod config;
/// Structured logging setup (`tracing` + `tracing-subscriber` +
/// `tracing-appender`).
pub mod logging;
/// `ModelMemoryManager`: LRU eviction of loaded models against a live
/// system-memory budget.
pub mod memory_manager;
/// Durable, batched embedding work queue.
pub mod queue;
/// Persisted relationship edge index.
pub mod relationships;
/// Circuit breaker, retry (including GPU-fallback), and abortable timeout.
pub mod resilience;
