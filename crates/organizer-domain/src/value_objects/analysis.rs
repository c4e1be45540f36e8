//! `AnalysisResult` and its constituent enums.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse content classification produced by the model or by fallback
/// heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A document containing primarily prose/structured text.
    TextDocument,
    /// A photograph (landscape, portrait, product shot,...).
    Photograph,
    /// A screenshot of a UI, terminal, or document scan.
    Screenshot,
    /// Recognized but not one of the above.
    Other,
    /// Could not be determined.
    Unknown,
}

/// Records where the final `category` value came from, so downstream
/// consumers (and tests) can tell a model-chosen category from an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// The model's own answer, unmodified.
    Llama,
    /// Replaced by a filename heuristic because the model's category was
    /// generic or missing.
    FilenameFallback,
    /// Replaced because hallucination validation detected a financial-named
    /// file being mis-categorized.
    FilenameFinancialOverride,
    /// Replaced because the semantic folder matcher scored a folder higher
    /// than the model's own confidence in its stated category.
    EmbeddingOverride,
    /// The folder matcher considered overriding but the model's category won.
    LlmPreserved,
}

/// How a file's extractable text was obtained, for provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Extracted by a native parser (e.g. PDF text layer).
    Native,
    /// Extracted by local OCR (Tesseract).
    OcrTesseract,
    /// Extracted by a vision-model OCR fallback.
    OcrVision,
    /// No text could be extracted.
    None,
}

/// Normalized per-file analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Final category. Equal to a smart-folder name when a folder set was
    /// provided, unless `category_source` records an override path.
    pub category: String,
    /// Where `category` came from.
    pub category_source: CategorySource,
    /// Suggested filename, without extension.
    pub suggested_name: String,
    /// Ordered, deduplicated keyword set, 0..7 entries.
    pub keywords: Vec<String>,
    /// Confidence, clamped to 0..100.
    pub confidence: u8,
    /// Coarse content classification.
    pub content_type: ContentType,
    /// One- or two-sentence summary.
    pub summary: String,
    /// Inferred purpose of the document/image.
    pub purpose: String,
    /// Inferred project association, if any.
    pub project: String,
    /// Primary entity (person/org) the file concerns, if any.
    pub entity: String,
    /// Document type (e.g. "invoice", "receipt", "contract").
    pub document_type: String,
    /// Named entities mentioned in the content, capped at 20.
    pub key_entities: Vec<String>,
    /// Dominant hex colors, images only.
    pub colors: Vec<String>,
    /// Whether the image/document contains legible text.
    pub has_text: bool,
    /// ISO-8601 date (`YYYY-MM-DD`) if one could be determined.
    pub date: Option<String>,
    /// Extracted text, possibly truncated.
    pub extracted_text: Option<String>,
    /// How `extracted_text` was obtained.
    pub extraction_method: ExtractionMethod,
    /// Set when validation determined the model hallucinated a mismatched
    /// suggestion and overrode it.
    pub hallucination_detected: bool,
    /// Set when any step degraded to a filename-only/partial result.
    pub is_fallback: bool,
    /// User-readable explanation attached to a degraded result.
    pub analysis_warning: Option<String>,
    /// Non-fatal error recorded while still producing a (possibly degraded)
    /// result, e.g. `"Failed to parse"`.
    pub error: Option<String>,
    /// Folder the semantic matcher suggested, when it ran.
    pub suggested_folder: Option<String>,
    /// Destination path implied by `suggested_folder`, when known.
    pub destination_folder: Option<String>,
    /// The model's original category before an embedding override replaced it.
    pub llm_original_category: Option<String>,
    /// Unknown fields preserved from the model's raw JSON response, so a
    /// lenient decoder never silently drops data.
    pub extensions: BTreeMap<String, Value>,
}

impl AnalysisResult {
    /// Build a minimal fallback result driven entirely by filename
    /// heuristics, for use when the model runtime is unhealthy, the circuit
    /// is open, or every recovery path has been exhausted.
    #[must_use]
    pub fn filename_fallback(
        suggested_name: impl Into<String>,
        category: impl Into<String>,
        confidence: u8,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            category_source: CategorySource::FilenameFallback,
            suggested_name: suggested_name.into(),
            keywords: Vec::new(),
            confidence: confidence.clamp(0, 100),
            content_type: ContentType::Unknown,
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
            extraction_method: ExtractionMethod::None,
            hallucination_detected: false,
            is_fallback: true,
            analysis_warning: Some(warning.into()),
            error: None,
            suggested_folder: None,
            destination_folder: None,
            llm_original_category: None,
            extensions: BTreeMap::new(),
        }
    }

    /// An error result for an unsupported format.
    #[must_use]
    pub fn unsupported_format(extension: &str) -> Self {
        let mut result = Self::filename_fallback(
            "unsupported",
            "unsupported",
            0,
            format!("unsupported format:.{extension}"),
        );
        result.error = Some(format!("unsupported format:.{extension}"));
        result
    }
}
