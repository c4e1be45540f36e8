//! Stable cache-signature format: both the document and image
//! analysis caches key on this exact shape, folder descriptions included.

use crate::constants::SIGNATURE_VERSION;
use crate::value_objects::{smart_folder_set_fingerprint, SmartFolder};

/// Compute the versioned cache signature for an analysis call.
#[must_use]
pub fn compute_cache_signature(
    model_name: &str,
    folders: &[SmartFolder],
    absolute_path: &str,
    size_bytes: u64,
    mtime_ms: i64,
) -> String {
    let folder_sig = smart_folder_set_fingerprint(folders);
    format!("{SIGNATURE_VERSION}|{model_name}|{folder_sig}|{absolute_path}|{size_bytes}|{mtime_ms}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_changes_with_any_component() {
        let base = compute_cache_signature("llama3", &[], "/a/x.pdf", 100, 0);
        let diff_model = compute_cache_signature("llava", &[], "/a/x.pdf", 100, 0);
        let diff_path = compute_cache_signature("llama3", &[], "/a/y.pdf", 100, 0);
        let diff_size = compute_cache_signature("llama3", &[], "/a/x.pdf", 200, 0);
        assert_ne!(base, diff_model);
        assert_ne!(base, diff_path);
        assert_ne!(base, diff_size);
        assert!(base.starts_with("v2|"));
    }
}
