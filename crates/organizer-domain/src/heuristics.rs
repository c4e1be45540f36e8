//! Filename/content term dictionaries used by hallucination validation
//! and by filename-only fallback naming. Kept in the domain crate because both the application
//! layer's analyzer orchestrators and its hallucination validator consume
//! the same vocabulary and must agree on classification.

/// Filename stems that suggest financial content (budgets, invoices,
/// receipts, tax documents,...).
pub const FINANCIAL_TERMS: &[&str] = &[
    "budget",
    "invoice",
    "receipt",
    "tax",
    "statement",
    "financial",
    "expense",
    "payment",
    "bill",
    "finance",
];

/// Filename stems that suggest generic document content.
pub const DOCUMENT_TERMS: &[&str] =
    &["report", "document", "form", "contract", "agreement", "memo", "letter"];

/// Filename or suggested-name stems that suggest landscape/travel
/// photography — used as the contradiction signal in hallucination rules.
pub const LANDSCAPE_TERMS: &[&str] = &[
    "sunset",
    "sunrise",
    "mountain",
    "beach",
    "landscape",
    "scenery",
    "vista",
    "horizon",
    "ocean",
    "forest",
];

/// Filename stems that hint the file may contain legible text worth an OCR
/// pre-pass.
pub const OCR_HINT_TERMS: &[&str] = &[
    "report",
    "document",
    "invoice",
    "receipt",
    "form",
    "screenshot",
    "budget",
    "financial",
    "statement",
    "tax",
];

/// Word-stem roots recognized as financial keywords, for the "inject
/// filename terms into keywords" rule.
pub const FINANCIAL_KEYWORD_STEMS: &[&str] =
    &["budget", "invoice", "receipt", "tax", "expense", "payment", "bill", "financial", "finance"];

/// Whether any term in `terms` occurs as a substring of the lower-cased
/// `haystack` (filename stem or OCR text).
#[must_use]
pub fn contains_any_term(haystack: &str, terms: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    terms.iter().any(|t| lower.contains(t))
}

/// Which of `terms` matched, in dictionary order, for keyword-injection
/// call sites that need the actual matched stems rather than a boolean.
#[must_use]
pub fn matching_terms(haystack: &str, terms: &[&str]) -> Vec<String> {
    let lower = haystack.to_lowercase();
    terms.iter().filter(|t| lower.contains(*t)).map(|t| (*t).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_financial_filenames() {
        assert!(contains_any_term("invoice_march_2024", FINANCIAL_TERMS));
        assert!(!contains_any_term("mountain_sunset", FINANCIAL_TERMS));
    }

    #[test]
    fn matching_terms_returns_matched_stems() {
        let matches = matching_terms("q3_budget_invoice", FINANCIAL_KEYWORD_STEMS);
        assert!(matches.contains(&"budget".to_string()));
        assert!(matches.contains(&"invoice".to_string()));
    }
}
