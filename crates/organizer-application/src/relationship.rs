//! Relationship index builder: precomputes file-to-file edges from
//! analysis history.

use std::collections::HashMap;

use organizer_domain::constants::{MAX_RELATIONSHIP_EDGES, RELATIONSHIP_MIN_WEIGHT};
use organizer_domain::value_objects::{CanonicalFileId, RelationshipEdge};

/// A file's contribution to the relationship graph: its id plus the
/// concepts (tags ∪ keyEntities) recovered from its analysis.
#[derive(Debug, Clone)]
pub struct FileConcepts {
    /// The file this concept set belongs to.
    pub file_id: CanonicalFileId,
    /// Tags and key entities, case-folded by the caller or here.
    pub concepts: Vec<String>,
}

/// Build the relationship graph: bucket files by shared lower-cased
/// concept, count co-occurrence pairs, keep edges with `weight >= 2`,
/// sorted by weight descending and capped at `MAX_RELATIONSHIP_EDGES`
#[must_use]
pub fn build_relationship_edges(files: &[FileConcepts]) -> Vec<RelationshipEdge> {
    let mut buckets: HashMap<String, Vec<&CanonicalFileId>> = HashMap::new();
    for file in files {
        for concept in &file.concepts {
            let key = concept.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            buckets.entry(key).or_default().push(&file.file_id);
        }
    }

    let mut pair_weights: HashMap<(CanonicalFileId, CanonicalFileId), u32> = HashMap::new();
    for members in buckets.values() {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                if members[i] == members[j] {
                    continue;
                }
                let (a, b) = order_pair(members[i].clone(), members[j].clone());
                *pair_weights.entry((a, b)).or_insert(0) += 1;
            }
        }
    }

    let mut edges: Vec<RelationshipEdge> = pair_weights
        .into_iter()
        .filter(|(_, weight)| *weight >= RELATIONSHIP_MIN_WEIGHT)
        .map(|((source, target), weight)| RelationshipEdge::new(source, target, weight))
        .collect();

    edges.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
    edges.truncate(MAX_RELATIONSHIP_EDGES);
    edges
}

fn order_pair(a: CanonicalFileId, b: CanonicalFileId) -> (CanonicalFileId, CanonicalFileId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::value_objects::FileKind;

    fn id(path: &str) -> CanonicalFileId {
        CanonicalFileId::compute(path, FileKind::Doc)
    }

    #[test]
    fn shared_concept_creates_an_edge_above_threshold() {
        let files = vec![
            FileConcepts { file_id: id("/a"), concepts: vec!["invoice".into(), "march".into()] },
            FileConcepts { file_id: id("/b"), concepts: vec!["Invoice".into(), "march".into()] },
        ];
        let edges = build_relationship_edges(&files);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 2);
        assert!(edges[0].source <= edges[0].target);
    }

    #[test]
    fn single_shared_concept_below_threshold_is_dropped() {
        let files = vec![
            FileConcepts { file_id: id("/a"), concepts: vec!["invoice".into()] },
            FileConcepts { file_id: id("/b"), concepts: vec!["invoice".into()] },
        ];
        let edges = build_relationship_edges(&files);
        assert!(edges.is_empty());
    }

    #[test]
    fn edges_are_sorted_by_weight_descending() {
        let files = vec![
            FileConcepts { file_id: id("/a"), concepts: vec!["x".into(), "y".into()] },
            FileConcepts { file_id: id("/b"), concepts: vec!["x".into(), "y".into()] },
            FileConcepts { file_id: id("/c"), concepts: vec!["x".into()] },
        ];
        let edges = build_relationship_edges(&files);
        for pair in edges.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }
}
