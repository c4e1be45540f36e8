//! Analyzer orchestrators: turn a `FileRef` into a normalized
//! `AnalysisResult`. `document` and `image` are narrow front
//! doors over the shared `pipeline` implementation.

/// Collaborator bundle shared by both orchestrators.
pub mod deps;
/// In-flight model-call deduplication.
pub mod dedup;
/// The document orchestrator.
pub mod document;
/// The image orchestrator.
pub mod image;
/// The shared seventeen-step pipeline.
pub mod pipeline;

pub use deps::AnalyzerDeps;
pub use document::DocumentAnalyzer;
pub use image::ImageAnalyzer;
pub use pipeline::{AnalyzeOutcome, AnalyzeRequest};
