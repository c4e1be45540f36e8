//! Document analysis orchestrator: the text-model front door over the
//! shared pipeline.

use organizer_domain::value_objects::FileKind;

use super::deps::AnalyzerDeps;
use super::pipeline::{self, AnalyzeOutcome, AnalyzeRequest};

/// Analyzes a document-kind file end to end.
pub struct DocumentAnalyzer {
    deps: AnalyzerDeps,
}

impl DocumentAnalyzer {
    /// Build an analyzer over the given collaborators.
    #[must_use]
    pub fn new(deps: AnalyzerDeps) -> Self {
        Self { deps }
    }

    /// Run the pipeline for one document file.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> AnalyzeOutcome {
        pipeline::run(&self.deps, request, FileKind::Doc).await
    }
}
