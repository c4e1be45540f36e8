//! `Clock`: injectable source of "now", replacing ambient
//! `Instant::now()`/`SystemTime::now()` calls so TTL, backoff, and
//! circuit-breaker timeout logic is deterministically testable.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for code that needs to reason about elapsed
/// durations or ISO-8601 timestamps without calling `SystemTime::now()`
/// directly.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Current time as an ISO-8601 / RFC 3339 string, for persisted state.
    fn now_iso(&self) -> String;
}

/// `Clock` backed by the real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn now_iso(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from(SystemTime::now()).to_rfc3339()
    }
}
