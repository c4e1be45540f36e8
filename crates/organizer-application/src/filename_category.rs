//! Filename-derived category heuristic: the last resort when the model's
//! own category is generic, missing, or has been discarded entirely.

use organizer_domain::heuristics::{contains_any_term, DOCUMENT_TERMS, FINANCIAL_TERMS};

/// Guess a specific category from filename stem vocabulary alone. Returns
/// `None` when nothing in the stem hints at a specific category, in which
/// case callers keep whatever generic category they already had.
#[must_use]
pub fn derive_filename_category(filename_stem: &str) -> Option<String> {
    if contains_any_term(filename_stem, FINANCIAL_TERMS) {
        return Some("Finance".to_string());
    }
    if contains_any_term(filename_stem, DOCUMENT_TERMS) {
        return Some("Documents".to_string());
    }
    None
}

/// Confidence band assigned to a pure filename-only fallback result.
#[must_use]
pub fn fallback_confidence(has_specific_category: bool) -> u8 {
    if has_specific_category {
        60
    } else {
        55
    }
}
