//! Per-model circuit breaker.
//!
//! `Closed -> Open` after `failure_threshold` consecutive full failures;
//! `Open -> HalfOpen` after `timeout`; `HalfOpen -> Closed` after
//! `success_threshold` consecutive successes; `HalfOpen -> Open` on any
//! failure. At most `half_open_max_concurrent` probes are admitted while
//! `HalfOpen`. Non-transient errors never count against the failure
//! counter (callers signal this via `record_non_transient`).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use organizer_domain::ports::Clock;
use tokio::sync::Mutex;

/// Breaker state machine: `Closed` -> `Open` -> `HalfOpen` -> `Closed`/`Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through normally.
    Closed,
    /// Calls are rejected without attempting the underlying operation.
    Open,
    /// A single probe is admitted to test recovery.
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at_ms: i64,
    last_failure_at_ms: i64,
    half_open_probes_in_flight: u32,
}

/// Tunables for one breaker instance.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before `Closed -> Open`.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before `-> Closed`.
    pub success_threshold: u32,
    /// Time spent `Open` before a probe is admitted, in milliseconds.
    pub open_timeout_ms: u64,
    /// Time with no failures, while `Closed`, before the failure counter
    /// resets to zero.
    pub reset_timeout_ms: u64,
    /// Maximum concurrent probes admitted while `HalfOpen`.
    pub half_open_max_concurrent: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: organizer_domain::constants::CIRCUIT_FAILURE_THRESHOLD,
            success_threshold: organizer_domain::constants::CIRCUIT_SUCCESS_THRESHOLD,
            open_timeout_ms: organizer_domain::constants::CIRCUIT_OPEN_TIMEOUT_SECS * 1000,
            reset_timeout_ms: organizer_domain::constants::CIRCUIT_RESET_TIMEOUT_SECS * 1000,
            half_open_max_concurrent: organizer_domain::constants::CIRCUIT_HALF_OPEN_MAX_CONCURRENT,
        }
    }
}

/// One model's circuit breaker. Cheaply cloneable (`Arc` inside); share
/// one instance per model name across the process.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    rejected_calls: AtomicU32,
}

impl CircuitBreaker {
    /// Build a breaker starting `Closed`.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at_ms: 0,
                last_failure_at_ms: now,
                half_open_probes_in_flight: 0,
            }),
            rejected_calls: AtomicU32::new(0),
        }
    }

    /// Current state, advancing `Open -> HalfOpen` as a side effect if the
    /// open timeout has elapsed.
    pub async fn state(&self) -> BreakerState {
        let mut guard = self.inner.lock().await;
        self.maybe_transition_to_half_open(&mut guard);
        guard.state
    }

    fn maybe_transition_to_half_open(&self, guard: &mut Inner) {
        if guard.state == BreakerState::Open {
            let elapsed = self.clock.now_ms() - guard.opened_at_ms;
            if elapsed >= self.config.open_timeout_ms as i64 {
                guard.state = BreakerState::HalfOpen;
                guard.consecutive_successes = 0;
                guard.half_open_probes_in_flight = 0;
            }
        }
    }

    /// Whether a call should be attempted right now. `HalfOpen` admits at
    /// most `half_open_max_concurrent` concurrent probes; callers that are
    /// admitted MUST call `record_success`/`record_failure` exactly once.
    pub async fn try_acquire(&self) -> bool {
        let mut guard = self.inner.lock().await;
        self.maybe_transition_to_half_open(&mut guard);
        match guard.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                false
            }
            BreakerState::HalfOpen => {
                if guard.half_open_probes_in_flight < self.config.half_open_max_concurrent {
                    guard.half_open_probes_in_flight += 1;
                    true
                } else {
                    self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
        }
    }

    /// Record a successful call acquired via `try_acquire`.
    pub async fn record_success(&self) {
        let mut guard = self.inner.lock().await;
        match guard.state {
            BreakerState::Closed => {
                guard.consecutive_failures = 0;
            }
            BreakerState::HalfOpen => {
                guard.half_open_probes_in_flight = guard.half_open_probes_in_flight.saturating_sub(1);
                guard.consecutive_successes += 1;
                if guard.consecutive_successes >= self.config.success_threshold {
                    guard.state = BreakerState::Closed;
                    guard.consecutive_failures = 0;
                    guard.consecutive_successes = 0;
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed call acquired via `try_acquire`. Non-transient
    /// errors must be reported via `record_non_transient_failure` instead,
    /// which never counts toward the breaker.
    pub async fn record_failure(&self) {
        let mut guard = self.inner.lock().await;
        let now = self.clock.now_ms();
        guard.last_failure_at_ms = now;
        match guard.state {
            BreakerState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.config.failure_threshold {
                    guard.state = BreakerState::Open;
                    guard.opened_at_ms = now;
                }
            }
            BreakerState::HalfOpen => {
                guard.half_open_probes_in_flight = guard.half_open_probes_in_flight.saturating_sub(1);
                guard.state = BreakerState::Open;
                guard.opened_at_ms = now;
                guard.consecutive_successes = 0;
            }
            BreakerState::Open => {}
        }
    }

    /// Record a non-transient failure: releases the half-open probe slot
    /// (if any) but never advances the failure counter.
    pub async fn record_non_transient_failure(&self) {
        let mut guard = self.inner.lock().await;
        if guard.state == BreakerState::HalfOpen {
            guard.half_open_probes_in_flight = guard.half_open_probes_in_flight.saturating_sub(1);
        }
    }

    /// Reset the failure counter to zero if `Closed` and `reset_timeout_ms`
    /// has passed with no failures.
    pub async fn maybe_reset_failure_counter(&self) {
        let mut guard = self.inner.lock().await;
        if guard.state == BreakerState::Closed && guard.consecutive_failures > 0 {
            let elapsed = self.clock.now_ms() - guard.last_failure_at_ms;
            if elapsed >= self.config.reset_timeout_ms as i64 {
                guard.consecutive_failures = 0;
            }
        }
    }

    /// Force the breaker back to `Closed` (the operational `reset-circuit`
    /// CLI command).
    pub async fn force_close(&self) {
        let mut guard = self.inner.lock().await;
        guard.state = BreakerState::Closed;
        guard.consecutive_failures = 0;
        guard.consecutive_successes = 0;
        guard.half_open_probes_in_flight = 0;
    }

    /// Number of calls rejected while `Open`/saturated `HalfOpen`, for
    /// diagnostics.
    #[must_use]
    pub fn rejected_calls(&self) -> u32 {
        self.rejected_calls.load(Ordering::Relaxed)
    }
}
