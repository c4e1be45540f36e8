//! `RelationshipEdge`: precomputed file-to-file association.

use serde::{Deserialize, Serialize};

use super::ids::CanonicalFileId;

/// An edge between two files that share concepts (tags ∪ keyEntities).
/// Always stored with `source < target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Stable edge id (`"{source}:{target}"`), for persistence lookups.
    pub id: String,
    /// Lexicographically smaller of the two endpoints.
    pub source: CanonicalFileId,
    /// Lexicographically larger of the two endpoints.
    pub target: CanonicalFileId,
    /// Count of shared concepts between the two files.
    pub weight: u32,
}

impl RelationshipEdge {
    /// Build an edge, ordering the two ids so `source < target` always
    /// holds regardless of call-site order.
    #[must_use]
    pub fn new(a: CanonicalFileId, b: CanonicalFileId, weight: u32) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        let id = format!("{source}:{target}");
        Self {
            id,
            source,
            target,
            weight,
        }
    }
}

/// One file's contribution to the relationship graph, as persisted by
/// whatever keeps a durable record of past analyses. `updated_at` is the
/// ISO-8601 timestamp of the analysis that produced `concepts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisHistoryEntry {
    /// The file this entry describes.
    pub file_id: CanonicalFileId,
    /// Tags ∪ key entities recovered from the file's analysis.
    pub concepts: Vec<String>,
    /// When this entry was last produced.
    pub updated_at: String,
}

/// On-disk shape of `knowledge-relationships.json`: the edge set
/// plus enough provenance to decide whether a rebuild is needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedRelationships {
    /// When this edge set was last (re)built.
    pub updated_at: String,
    /// The analysis history's own `updatedAt` this edge set was built from;
    /// a rebuild is a no-op when the current history matches this value.
    pub source_updated_at: String,
    /// The edges themselves.
    pub edges: Vec<RelationshipEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ids::FileKind;

    #[test]
    fn ordering_is_normalized_regardless_of_call_order() {
        let a = CanonicalFileId::compute("/a", FileKind::Doc);
        let b = CanonicalFileId::compute("/b", FileKind::Doc);
        let e1 = RelationshipEdge::new(a.clone(), b.clone(), 3);
        let e2 = RelationshipEdge::new(b, a, 3);
        assert_eq!(e1, e2);
        assert!(e1.source <= e1.target);
    }
}
