//! Domain layer for the file organizer analysis-and-embedding core.
//!
//! Pure types and port traits only: entities, value objects, the error
//! taxonomy, normalization routines, and the capability traits
//! (`ModelRuntime`, `ContentExtractor`, `VectorStore`, `Cache`, `Clock`) that
//! every other crate in the workspace depends on but does not implement.
//! No I/O happens in this crate.

/// Tunable default thresholds, overridable via
/// `organizer_infrastructure::config::OrganizerConfig`.
pub mod constants;
/// The `Error` taxonomy and recoverability/non-transience classification.
pub mod error;
/// Filename/content term dictionaries shared by hallucination validation
/// and filename-only fallback naming.
pub mod heuristics;
/// Confidence, keyword, and category normalization routines.
pub mod normalize;
/// Capability traits implemented by `organizer-providers` and
/// `organizer-infrastructure`.
pub mod ports;
/// The stable, versioned analysis-cache signature format.
pub mod signature;
/// Entities and value objects.
pub mod value_objects;

pub use error::{Error, Result};
