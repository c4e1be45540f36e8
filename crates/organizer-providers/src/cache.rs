//! Named `Cache` instances the analysis pipeline expects: two
//! analysis-result caches tuned per file kind, plus the smaller dedup
//! caches used by the model runtime and folder matcher. All four share the
//! same `moka`-backed `InMemoryCache` from `organizer-infrastructure`; only
//! capacity and call-site TTL differ.

use std::sync::Arc;

use organizer_domain::ports::Cache;
use organizer_infrastructure::cache::InMemoryCache;

/// Document-analysis cache capacity.
pub const DOCUMENT_CACHE_CAPACITY: u64 = 500;
/// Image-analysis cache capacity.
pub const IMAGE_CACHE_CAPACITY: u64 = 300;
/// Model-runtime preflight cache capacity: a handful of entries, one per
/// distinct runtime instance in practice.
pub const PREFLIGHT_CACHE_CAPACITY: u64 = 16;
/// Folder-upsert de-duplication cache capacity: one entry per distinct
/// smart-folder-set fingerprint seen recently.
pub const FOLDER_UPSERT_DEDUP_CACHE_CAPACITY: u64 = 64;

/// Build the document-analysis cache.
#[must_use]
pub fn document_analysis_cache() -> Arc<dyn Cache> {
    Arc::new(InMemoryCache::new(DOCUMENT_CACHE_CAPACITY))
}

/// Build the image-analysis cache.
#[must_use]
pub fn image_analysis_cache() -> Arc<dyn Cache> {
    Arc::new(InMemoryCache::new(IMAGE_CACHE_CAPACITY))
}

/// Build the model-runtime preflight cache.
#[must_use]
pub fn preflight_cache() -> Arc<dyn Cache> {
    Arc::new(InMemoryCache::new(PREFLIGHT_CACHE_CAPACITY))
}

/// Build the folder-upsert de-duplication cache.
#[must_use]
pub fn folder_upsert_dedup_cache() -> Arc<dyn Cache> {
    Arc::new(InMemoryCache::new(FOLDER_UPSERT_DEDUP_CACHE_CAPACITY))
}
