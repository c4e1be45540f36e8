//! Image analysis orchestrator: the vision-model front door over the
//! shared pipeline, adding EXIF date recovery, preprocessing,
//! and the OCR pre/post-pass.

use organizer_domain::value_objects::FileKind;

use super::deps::AnalyzerDeps;
use super::pipeline::{self, AnalyzeOutcome, AnalyzeRequest};

/// Analyzes an image-kind file end to end.
pub struct ImageAnalyzer {
    deps: AnalyzerDeps,
}

impl ImageAnalyzer {
    /// Build an analyzer over the given collaborators.
    #[must_use]
    pub fn new(deps: AnalyzerDeps) -> Self {
        Self { deps }
    }

    /// Run the pipeline for one image file.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> AnalyzeOutcome {
        pipeline::run(&self.deps, request, FileKind::Image).await
    }
}
