//! `ContentExtractor`: boundary capability for raw document/image text
//! extraction. The core depends only on this contract; concrete
//! extraction libraries are out of scope.

use async_trait::async_trait;

use crate::error::Result;

/// How extracted text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// A native format-specific parser (e.g. a PDF text layer).
    Native,
    /// Tesseract OCR.
    OcrTesseract,
    /// Vision-model OCR fallback.
    OcrVision,
    /// No extraction was attempted or possible.
    None,
}

/// Options controlling an `extract_text` call.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Force OCR even when a native extractor might apply.
    pub force_ocr: bool,
    /// Prefer the vision-model OCR path over Tesseract.
    pub prefer_vision_ocr: bool,
}

/// Result of `extract_text`.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted text, possibly empty.
    pub text: String,
    /// How it was obtained.
    pub method: ExtractionMethod,
    /// Whether the text was truncated to fit a size/length cap.
    pub truncated: bool,
}

/// Boundary capability covering format-specific content extraction,
/// EXIF date recovery, and image preprocessing ahead of a vision-model call.
/// Never throws on an unsupported format: it returns an empty
/// result with `method = None` instead.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract text content from a file at `path`. Returns an empty string
    /// with `method = None` for unsupported formats rather than erroring.
    async fn extract_text(&self, path: &str, opts: &ExtractOptions) -> Result<ExtractedText>;

    /// Recover an EXIF capture date from raw image bytes, if present.
    async fn extract_exif_date(&self, bytes: &[u8]) -> Result<Option<String>>;

    /// Normalize raw image bytes into a supported raster format at
    /// `<= 1024px` on the longest side. Fails with
    /// `Error::PreprocessingFailed` on corrupted input.
    async fn preprocess_image(&self, bytes: &[u8], ext: &str) -> Result<Vec<u8>>;
}
