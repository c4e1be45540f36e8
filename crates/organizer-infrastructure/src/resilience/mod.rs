//! Resilience primitives wrapping every external call to a model runtime
//! or vector store: a per-model circuit breaker, bounded retry with a
//! GPU-fallback escalation path, and an abortable timeout.

/// Per-model circuit breaker state machine.
pub mod circuit_breaker;
/// Bounded retry, including the GPU-fallback-class two-stage path.
pub mod retry;
/// Abortable timeout wrapper.
pub mod timeout;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use retry::{with_gpu_fallback_retry, with_retry, RetryConfig};
pub use timeout::with_abortable_timeout;
