//! `withRetry`: bounded exponential-backoff retry, with a dedicated
//! two-stage path for GPU-fallback-class failures.

use std::future::Future;
use std::time::Duration;

use organizer_domain::{Error, Result};

/// Tunables for `with_retry`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Attempts beyond the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Delay cap; backoff doubles each attempt up to this value.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: organizer_domain::constants::RETRY_MAX_RETRIES,
            initial_delay_ms: organizer_domain::constants::RETRY_INITIAL_DELAY_MS,
            max_delay_ms: organizer_domain::constants::RETRY_MAX_DELAY_MS,
        }
    }
}

fn backoff_delay_ms(config: &RetryConfig, attempt: u32) -> u64 {
    let scaled = config.initial_delay_ms.saturating_mul(1u64 << attempt.min(16));
    scaled.min(config.max_delay_ms)
}

/// Whether a failure is worth retrying at all. Non-transient and
/// circuit-open errors are excluded: retrying them cannot succeed before
/// the breaker or the underlying model state changes.
fn is_retryable(error: &Error) -> bool {
    !error.is_non_transient() && !matches!(error, Error::CircuitOpen {.. })
}

/// Retry `op` with exponential backoff, up to `config.max_retries` times
/// beyond the first attempt. Stops early on a non-retryable error.
pub async fn with_retry<F, Fut, T>(mut op: F, config: RetryConfig, label: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < config.max_retries && is_retryable(&error) => {
                tracing::warn!(
                    label,
                    attempt,
                    error = %error,
                    "retrying after recoverable failure"
                );
                tokio::time::sleep(Duration::from_millis(backoff_delay_ms(&config, attempt))).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Two-stage retry for GPU-fallback-class failures: retry the primary
/// backend up to twice for transient GPU faults, then re-invoke with
/// `force_cpu = true` for up to two further attempts. `op` receives the
/// `force_cpu` flag for each call. Non-GPU-fallback-class errors propagate
/// immediately without consuming a GPU-fallback attempt.
pub async fn with_gpu_fallback_retry<F, Fut, T>(mut op: F, label: &str) -> Result<T>
where
    F: FnMut(bool) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    const PRIMARY_ATTEMPTS: u32 = 2;
    const CPU_FALLBACK_ATTEMPTS: u32 = 2;

    let mut last_error: Option<Error> = None;

    for attempt in 0..PRIMARY_ATTEMPTS {
        match op(false).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_gpu_fallback_class() => {
                tracing::warn!(label, attempt, error = %error, "gpu fault, retrying primary backend");
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    for attempt in 0..CPU_FALLBACK_ATTEMPTS {
        match op(true).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_gpu_fallback_class() => {
                tracing::warn!(label, attempt, error = %error, "gpu fault persists under forced cpu");
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    Err(Error::GpuFallbackExhausted {
        message: last_error.map(|e| e.to_string()).unwrap_or_else(|| "unknown gpu fault".to_string()),
        used_cpu_fallback: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig { max_retries: 3, initial_delay_ms: 1, max_delay_ms: 2 }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(7)
            },
            fast_config(),
            "op",
        )
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_recoverable_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::Timeout { label: "x".into(), elapsed_ms: 1 })
                } else {
                    Ok(9)
                }
            },
            fast_config(),
            "op",
        )
            .await;
        assert_eq!(result.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::NonTransient { message: "bad model".into() })
            },
            fast_config(),
            "op",
        )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout { label: "x".into(), elapsed_ms: 1 })
            },
            fast_config(),
            "op",
        )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4); // first attempt + 3 retries
    }

    #[tokio::test]
    async fn gpu_fault_falls_back_to_forced_cpu_and_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_gpu_fallback_retry(
            |force_cpu| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if force_cpu {
                        Ok(42)
                    } else if n < 2 {
                        Err(Error::PreprocessingFailed { message: "CUDA OOM".into() })
                    } else {
                        unreachable!("primary attempts capped at two")
                    }
                }
            },
            "vision-call",
        )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3); // 2 primary + 1 forced-cpu
    }

    #[tokio::test]
    async fn non_gpu_error_propagates_without_fallback() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_gpu_fallback_retry(
            |_force_cpu| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::ParseFailed { message: "bad json".into() }) }
            },
            "vision-call",
        )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gpu_fault_exhausts_all_attempts() {
        let result: Result<i32> = with_gpu_fallback_retry(
            |_force_cpu| async { Err(Error::PreprocessingFailed { message: "gpu driver reset".into() }) },
            "vision-call",
        )
            .await;
        match result {
            Err(Error::GpuFallbackExhausted { used_cpu_fallback,.. }) => assert!(used_cpu_fallback),
            other => panic!("expected GpuFallbackExhausted, got {other:?}"),
        }
    }
}
