//! Cache service: a `moka`-backed `Cache` implementation plus the
//! invalidation bus that keeps every cache instance consistent with
//! filesystem changes.

/// Cross-cache invalidation fan-out.
pub mod invalidation_bus;
/// `moka`-backed `Cache` implementation.
pub mod moka_cache;

pub use invalidation_bus::{CacheInvalidationBus, InvalidationEvent};
pub use moka_cache::InMemoryCache;
