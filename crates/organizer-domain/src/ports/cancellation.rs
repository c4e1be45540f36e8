//! A lightweight, runtime-agnostic cancellation token.
//!
//! Domain stays free of a specific async runtime dependency, so every
//! external call in `ModelRuntime`/`VectorStore`/`ContentExtractor` accepts
//! this instead of a `tokio_util::sync::CancellationToken`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag, cheaply cloneable, shared between the
/// issuer (e.g. a timeout wrapper) and the operation being cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation; observers calling `is_cancelled` afterward see it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// A token pinned permanently to "not cancelled", for call sites that
    /// have no cancellation source of their own (e.g. CLI one-shot commands).
    #[must_use]
    pub fn never() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_propagates_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
