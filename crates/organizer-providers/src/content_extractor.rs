//! Default `ContentExtractor`: native extraction for plain-text formats,
//! honest boundary pass-through for everything else. Real
//! PDF/Office text layers, Tesseract OCR, and vision-model OCR are the
//! concrete format-specific libraries the core explicitly keeps out of
//! scope — a deployment swaps this adapter for one
//! backed by those libraries without touching the analyzer pipeline.

use async_trait::async_trait;
use organizer_domain::ports::content_extractor::{ExtractOptions, ExtractedText, ExtractionMethod};
use organizer_domain::ports::ContentExtractor;
use organizer_domain::Result;

/// Extensions this adapter can read natively as UTF-8 text.
const NATIVE_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json", "rtf"];

/// Cap on native-extracted text length; longer files are truncated rather
/// than fed whole into a model prompt.
const NATIVE_TEXT_CHAR_CAP: usize = 20_000;

/// Native-only content extractor. Anything it cannot read is reported as
/// an empty, `method = None` result rather than an error, per the port's
/// contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeContentExtractor;

#[async_trait]
impl ContentExtractor for NativeContentExtractor {
    async fn extract_text(&self, path: &str, opts: &ExtractOptions) -> Result<ExtractedText> {
        if opts.force_ocr {
            return Ok(ExtractedText { text: String::new(), method: ExtractionMethod::None, truncated: false });
        }
        let extension = std::path::Path::new(path)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("")
            .to_lowercase();
        if !NATIVE_TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Ok(ExtractedText { text: String::new(), method: ExtractionMethod::None, truncated: false });
        }
        let Ok(bytes) = tokio::fs::read(path).await else {
            return Ok(ExtractedText { text: String::new(), method: ExtractionMethod::None, truncated: false });
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let truncated = text.chars().count() > NATIVE_TEXT_CHAR_CAP;
        let text = if truncated { text.chars().take(NATIVE_TEXT_CHAR_CAP).collect() } else { text };
        Ok(ExtractedText { text, method: ExtractionMethod::Native, truncated })
    }

    async fn extract_exif_date(&self, _bytes: &[u8]) -> Result<Option<String>> {
        // EXIF parsing is a raster-format concern the core keeps at the
        // boundary; this adapter never finds one.
        Ok(None)
    }

    async fn preprocess_image(&self, bytes: &[u8], _ext: &str) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(organizer_domain::Error::PreprocessingFailed {
                message: "empty image input".to_string(),
            });
        }
        // Real decode/resize to <=1024px requires a raster library the
        // core deliberately excludes; pass the bytes through
        // unchanged so the vision call still gets something to work with.
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_plain_text_natively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "hello world").await.unwrap();

        let extractor = NativeContentExtractor;
        let result = extractor.extract_text(path.to_str().unwrap(), &ExtractOptions::default()).await.unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.method, ExtractionMethod::Native);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn unsupported_format_returns_empty_without_erroring() {
        let extractor = NativeContentExtractor;
        let result = extractor.extract_text("/tmp/doesnotmatter.pdf", &ExtractOptions::default()).await.unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.method, ExtractionMethod::None);
    }

    #[tokio::test]
    async fn preprocess_rejects_empty_bytes() {
        let extractor = NativeContentExtractor;
        let result = extractor.preprocess_image(&[], "png").await;
        assert!(result.is_err());
    }
}
