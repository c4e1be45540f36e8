//! Relationship index persistence: wraps `organizer_application::relationship`'s
//! pure edge builder with the `knowledge-relationships.json` sidecar and the
//! "rebuild only when the source history changed" rule.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use organizer_application::relationship::{build_relationship_edges, FileConcepts};
use organizer_domain::ports::Clock;
use organizer_domain::value_objects::{AnalysisHistoryEntry, PersistedRelationships};
use organizer_domain::Result;

use crate::queue::persistence;

/// Owns the on-disk relationship edge set for one `data_dir`.
pub struct RelationshipStore {
    path: PathBuf,
    history_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl RelationshipStore {
    /// Point at `data_dir`'s `knowledge-relationships.json` and
    /// `analysis-history.json` sidecars.
    #[must_use]
    pub fn new(data_dir: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: data_dir.join("knowledge-relationships.json"),
            history_path: data_dir.join("analysis-history.json"),
            clock,
        }
    }

    /// The currently persisted edge set, or an empty one if never built.
    pub async fn load(&self) -> Result<PersistedRelationships> {
        persistence::load_or_default(&self.path, PersistedRelationships::default(), self.clock.as_ref()).await
    }

    /// The analysis history this store rebuilds from.
    pub async fn load_history(&self) -> Result<Vec<AnalysisHistoryEntry>> {
        persistence::load_or_default(&self.history_path, Vec::new(), self.clock.as_ref()).await
    }

    /// Rebuild from the current analysis history and persist, unless the
    /// history hasn't changed since the last build. Returns the edge
    /// set in force afterward, whether freshly built or left untouched.
    pub async fn rebuild(&self) -> Result<PersistedRelationships> {
        let history = self.load_history().await?;
        let source_updated_at = history.iter().map(|entry| entry.updated_at.as_str()).max().unwrap_or("").to_string();

        let current = self.load().await?;
        if !source_updated_at.is_empty() && current.source_updated_at == source_updated_at {
            return Ok(current);
        }

        let files: Vec<FileConcepts> =
            history.into_iter().map(|entry| FileConcepts { file_id: entry.file_id, concepts: entry.concepts }).collect();
        let edges = build_relationship_edges(&files);
        let rebuilt = PersistedRelationships { updated_at: self.clock.now_iso(), source_updated_at, edges };

        persistence::write_atomic(&self.path, &rebuilt, false, self.clock.as_ref()).await?;
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::ports::clock::SystemClock;
    use organizer_domain::value_objects::{CanonicalFileId, FileKind};

    fn entry(path: &str, updated_at: &str, concepts: &[&str]) -> AnalysisHistoryEntry {
        AnalysisHistoryEntry {
            file_id: CanonicalFileId::compute(path, FileKind::Doc),
            concepts: concepts.iter().map(|s| s.to_string()).collect(),
            updated_at: updated_at.to_string(),
        }
    }

    #[tokio::test]
    async fn rebuilds_edges_from_history_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let history = vec![
            entry("/a/invoice.pdf", "2026-01-01T00:00:00Z", &["invoice", "march"]),
            entry("/b/invoice.pdf", "2026-01-01T00:00:01Z", &["invoice", "march"]),
        ];
        persistence::write_atomic(&dir.path().join("analysis-history.json"), &history, false, &SystemClock)
            .await
            .unwrap();

        let store = RelationshipStore::new(dir.path(), Arc::new(SystemClock));
        let rebuilt = store.rebuild().await.unwrap();
        assert_eq!(rebuilt.edges.len(), 1);
        assert_eq!(rebuilt.source_updated_at, "2026-01-01T00:00:01Z");
    }

    #[tokio::test]
    async fn second_rebuild_is_a_no_op_when_history_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let history = vec![
            entry("/a/invoice.pdf", "2026-01-01T00:00:00Z", &["invoice"]),
            entry("/b/invoice.pdf", "2026-01-01T00:00:00Z", &["invoice"]),
        ];
        persistence::write_atomic(&dir.path().join("analysis-history.json"), &history, false, &SystemClock)
            .await
            .unwrap();

        let store = RelationshipStore::new(dir.path(), Arc::new(SystemClock));
        let first = store.rebuild().await.unwrap();
        let second = store.rebuild().await.unwrap();
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn missing_history_produces_an_empty_edge_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = RelationshipStore::new(dir.path(), Arc::new(SystemClock));
        let rebuilt = store.rebuild().await.unwrap();
        assert!(rebuilt.edges.is_empty());
    }
}
