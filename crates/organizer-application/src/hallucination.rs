//! Hallucination validation: filename/OCR-anchored cross-check that may
//! override the model's suggested name and category.

use organizer_domain::heuristics::{
    contains_any_term, matching_terms, DOCUMENT_TERMS, FINANCIAL_KEYWORD_STEMS, FINANCIAL_TERMS,
    LANDSCAPE_TERMS,
};
use organizer_domain::normalize::is_generic_category;
use organizer_domain::value_objects::{AnalysisResult, CategorySource};

use crate::filename_category::derive_filename_category;

/// Extra context the validator needs beyond the `AnalysisResult` itself:
/// the original filename stem (no extension, no directory) and, if an OCR
/// pre/post-pass ran, the recovered text.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext<'a> {
    /// Filename stem, lower-cased comparisons happen inside the rules.
    pub filename_stem: &'a str,
    /// OCR-recovered text, if any ran ahead of validation.
    pub ocr_text: Option<&'a str>,
}

/// Apply every hallucination rule in spec order, mutating `result` in
/// place. Returns whether any rule fired (sets `hallucination_detected`
/// itself, this return value is for caller logging).
pub fn validate(result: &mut AnalysisResult, ctx: &ValidationContext<'_>) -> bool {
    let mut fired = false;

    let filename_is_financial = contains_any_term(ctx.filename_stem, FINANCIAL_TERMS);
    let filename_is_document = contains_any_term(ctx.filename_stem, DOCUMENT_TERMS);
    let filename_is_landscape = contains_any_term(ctx.filename_stem, LANDSCAPE_TERMS);
    let suggestion_is_landscape = contains_any_term(&result.suggested_name, LANDSCAPE_TERMS);

    // Rule 1: financial filename + landscape suggestion, filename itself
    // has no landscape term -> force override, confidence <= 25.
    if filename_is_financial && suggestion_is_landscape && !filename_is_landscape {
        force_override(result, "Finance", ctx.filename_stem, 25);
        fired = true;
    }

    // Rule 2: document-term filename + landscape suggestion -> override,
    // confidence <= 30.
    if !fired && filename_is_document && suggestion_is_landscape {
        force_override(result, "Documents", ctx.filename_stem, 30);
        fired = true;
    }

    // Rule 3: financial filename, but no financial keyword present ->
    // penalize confidence and inject filename terms into keywords.
    if filename_is_financial {
        let has_financial_keyword = result
            .keywords
            .iter()
            .any(|kw| contains_any_term(kw, FINANCIAL_KEYWORD_STEMS));
        if !has_financial_keyword {
            result.confidence = result.confidence.saturating_sub(20);
            let injected = matching_terms(ctx.filename_stem, FINANCIAL_KEYWORD_STEMS);
            for term in injected {
                if result.keywords.len() >= 7 {
                    break;
                }
                if !result.keywords.iter().any(|k| k.eq_ignore_ascii_case(&term)) {
                    result.keywords.push(term);
                }
            }
            fired = true;
        }
    }

    // Rule 4: OCR text carries currency/total markers + landscape
    // suggestion -> override, confidence <= 20.
    if let Some(ocr) = ctx.ocr_text {
        let ocr_lower = ocr.to_lowercase();
        let has_money_markers =
            ocr.contains('$') || ocr_lower.contains("total") || ocr_lower.contains("amount");
        if has_money_markers && suggestion_is_landscape {
            force_override(result, "Finance", ctx.filename_stem, 20);
            fired = true;
        }
    }

    // Rule 5: generic AI category with a specific filename-derived
    // alternative available -> replace with filename_fallback.
    if is_generic_category(&result.category) {
        if let Some(specific) = derive_filename_category(ctx.filename_stem) {
            result.llm_original_category = Some(result.category.clone());
            result.category = specific;
            result.category_source = CategorySource::FilenameFallback;
            fired = true;
        }
    }

    if fired {
        result.hallucination_detected = true;
    }
    fired
}

fn force_override(result: &mut AnalysisResult, category: &str, filename_stem: &str, cap: u8) {
    result.llm_original_category = Some(result.category.clone());
    result.category = category.to_string();
    result.category_source = CategorySource::FilenameFinancialOverride;
    result.suggested_name = filename_stem.to_string();
    result.confidence = result.confidence.min(cap);
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::value_objects::ContentType;
    use std::collections::BTreeMap;

    fn base_result(category: &str, suggested_name: &str, confidence: u8) -> AnalysisResult {
        AnalysisResult {
            category: category.to_string(),
            category_source: CategorySource::Llama,
            suggested_name: suggested_name.to_string(),
            keywords: Vec::new(),
            confidence,
            content_type: ContentType::Photograph,
            summary: String::new(),
            purpose: String::new(),
            project: String::new(),
            entity: String::new(),
            document_type: String::new(),
            key_entities: Vec::new(),
            colors: Vec::new(),
            has_text: false,
            date: None,
            extracted_text: None,
            extraction_method: organizer_domain::value_objects::ExtractionMethod::None,
            hallucination_detected: false,
            is_fallback: false,
            analysis_warning: None,
            error: None,
            suggested_folder: None,
            destination_folder: None,
            llm_original_category: None,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn financial_filename_vs_landscape_suggestion_forces_override() {
        let mut result = base_result("Travel", "mountain_sunset", 90);
        let ctx = ValidationContext {
            filename_stem: "invoice_march",
            ocr_text: None,
        };
        assert!(validate(&mut result, &ctx));
        assert_eq!(result.category, "Finance");
        assert_eq!(result.suggested_name, "invoice_march");
        assert!(result.confidence <= 25);
        assert!(result.hallucination_detected);
    }

    #[test]
    fn ocr_money_markers_override_landscape_suggestion() {
        let mut result = base_result("Travel", "ocean_view", 85);
        let ctx = ValidationContext {
            filename_stem: "scan_0001",
            ocr_text: Some("Total: $452.10"),
        };
        assert!(validate(&mut result, &ctx));
        assert_eq!(result.category, "Finance");
        assert!(result.confidence <= 20);
    }

    #[test]
    fn financial_filename_without_financial_keyword_penalizes_and_injects() {
        let mut result = base_result("Finance", "budget_q3", 90);
        result.keywords = vec!["quarterly".to_string()];
        let ctx = ValidationContext {
            filename_stem: "budget_q3",
            ocr_text: None,
        };
        assert!(validate(&mut result, &ctx));
        assert_eq!(result.confidence, 70);
        assert!(result.keywords.iter().any(|k| k == "budget"));
    }

    #[test]
    fn generic_category_replaced_by_filename_heuristic() {
        let mut result = base_result("other", "budget_q3", 80);
        let ctx = ValidationContext {
            filename_stem: "budget_q3",
            ocr_text: None,
        };
        assert!(validate(&mut result, &ctx));
        assert_eq!(result.category, "Finance");
        assert_eq!(result.category_source, CategorySource::FilenameFallback);
    }

    #[test]
    fn no_rule_fires_on_consistent_result() {
        let mut result = base_result("Finance", "invoice_march", 90);
        result.keywords = vec!["invoice".to_string()];
        let ctx = ValidationContext {
            filename_stem: "invoice_march",
            ocr_text: None,
        };
        assert!(!validate(&mut result, &ctx));
        assert!(!result.hallucination_detected);
    }
}
