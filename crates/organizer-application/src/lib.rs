//! Application layer: analyzer orchestrators, the semantic folder matcher,
//! the embedding gate policy, hallucination validation, and the
//! relationship index builder. Depends only on `organizer-domain`'s types
//! and port traits — no concrete I/O.

/// Document and image analysis orchestrators.
pub mod analyzer;
/// Filename-derived category heuristic shared by fallback naming and
/// hallucination validation.
pub mod filename_category;
/// Semantic folder matcher.
pub mod folder_matcher;
/// Embedding gate policy.
pub mod gate;
/// Hallucination validation.
pub mod hallucination;
/// Relationship index builder.
pub mod relationship;
