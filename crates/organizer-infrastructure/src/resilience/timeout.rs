//! `withAbortableTimeout`: wraps a future with a deadline, cancelling the
//! underlying work and surfacing `Error::Timeout` on expiry.

use std::future::Future;
use std::time::Duration;

use organizer_domain::ports::CancellationToken;
use organizer_domain::{Error, Result};

/// Race `op` against a deadline. On expiry, signal `cancellation` (callers
/// are expected to check it inside `op`) and return `Error::Timeout`
/// carrying `label` for logs/metrics.
pub async fn with_abortable_timeout<F, T>(
    op: F,
    deadline_ms: u64,
    label: &str,
    cancellation: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = std::time::Instant::now();
    tokio::select! {
        result = op => result,
        () = tokio::time::sleep(Duration::from_millis(deadline_ms)) => {
            cancellation.cancel();
            Err(Error::Timeout {
                label: label.to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_ok_when_op_finishes_first() {
        let token = CancellationToken::new();
        let result = with_abortable_timeout(async { Ok::<_, Error>(42) }, 50, "op", &token).await;
        assert_eq!(result.unwrap(), 42);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn times_out_and_cancels() {
        let token = CancellationToken::new();
        let op = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, Error>(42)
        };
        let result = with_abortable_timeout(op, 10, "slow-op", &token).await;
        assert!(matches!(result, Err(Error::Timeout {.. })));
        assert!(token.is_cancelled());
    }
}
