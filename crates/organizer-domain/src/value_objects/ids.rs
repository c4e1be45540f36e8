//! Identity value objects.
//!
//! `canonical_file_id` is derived from the normalized absolute path and kind
//! rather than assigned, so it is reproducible across process
//! restarts and stable under everything except a move/rename.

use std::fmt;

use sha2::{Digest, Sha256};

/// Kind of file an identity refers to; the analyzer dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A document-like file handled by the text/document orchestrator.
    Doc,
    /// An image file handled by the vision orchestrator.
    Image,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Doc => write!(f, "doc"),
            FileKind::Image => write!(f, "image"),
        }
    }
}

/// Stable identifier for a file: `hash(normalized_absolute_path, kind)`.
///
/// Two `FileRef`s with the same normalized path and kind always produce the
/// same id; a move or rename produces a *different* id, so callers handling
/// a rename must rederive it (see `ItemId::rebased`) rather than carry the
/// old one forward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct CanonicalFileId(String);

impl CanonicalFileId {
    /// Compute the canonical id for a normalized absolute path and kind.
    #[must_use]
    pub fn compute(normalized_absolute_path: &str, kind: FileKind) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalized_absolute_path.as_bytes());
        hasher.update([0u8]); // separator so "ab"+"c" != "a"+"bc"
        hasher.update(kind.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already-computed id string (used when deserializing persisted
    /// state, where the id was computed in a prior process).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a queue/vector-store item: a file, a chunk of a file, or a
/// smart folder. Chunk and folder ids are namespaced
/// so a single stage's buffer can hold all three kinds unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ItemId {
    /// `canonical_file_id` of a file-level item.
    File(CanonicalFileId),
    /// `chunk:{file_id}:{chunk_index}`.
    Chunk {
        /// Owning file's canonical id.
        file_id: CanonicalFileId,
        /// Zero-based chunk index within the file.
        index: u32,
    },
    /// `folder:{folder_id}`.
    Folder {
        /// Smart folder id.
        folder_id: String,
    },
}

impl ItemId {
    /// Render the wire-format string used as the map/array key in persisted
    /// state and in vector-store ids.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            ItemId::File(id) => id.to_string(),
            ItemId::Chunk { file_id, index } => format!("chunk:{file_id}:{index}"),
            ItemId::Folder { folder_id } => format!("folder:{folder_id}"),
        }
    }

    /// Rederive this id after its underlying file moved to `new_path`. File
    /// and chunk ids are path-derived and must be recomputed on rename, or
    /// the old id lingers in the vector store as an orphan after the new
    /// path's id is upserted; folder ids aren't path-keyed and pass through
    /// unchanged.
    #[must_use]
    pub fn rebased(&self, new_path: &str, kind: FileKind) -> Self {
        match self {
            ItemId::File(_) => ItemId::File(CanonicalFileId::compute(new_path, kind)),
            ItemId::Chunk { index,.. } => {
                ItemId::Chunk { file_id: CanonicalFileId::compute(new_path, kind), index: *index }
            }
            ItemId::Folder {.. } => self.clone(),
        }
    }

    /// Parse the wire-format string back into a typed `ItemId`.
    #[must_use]
    pub fn from_wire(wire: &str) -> Self {
        if let Some(rest) = wire.strip_prefix("chunk:") {
            if let Some((file_id, index)) = rest.rsplit_once(':') {
                if let Ok(index) = index.parse::<u32>() {
                    return ItemId::Chunk {
                        file_id: CanonicalFileId::from_raw(file_id),
                        index,
                    };
                }
            }
        }
        if let Some(folder_id) = wire.strip_prefix("folder:") {
            return ItemId::Folder {
                folder_id: folder_id.to_string(),
            };
        }
        ItemId::File(CanonicalFileId::from_raw(wire))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Identifier for a vector-store collection (`files`, `file_chunks`, `folders`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionId {
    /// File-level embeddings.
    Files,
    /// Chunk-level embeddings (carry `fileId` metadata).
    FileChunks,
    /// Smart-folder description embeddings.
    Folders,
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionId::Files => write!(f, "files"),
            CollectionId::FileChunks => write!(f, "file_chunks"),
            CollectionId::Folders => write!(f, "folders"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_stable_for_same_path_and_kind() {
        let a = CanonicalFileId::compute("/inbox/budget_q3.png", FileKind::Image);
        let b = CanonicalFileId::compute("/inbox/budget_q3.png", FileKind::Image);
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_changes_on_move() {
        let a = CanonicalFileId::compute("/a/x.pdf", FileKind::Doc);
        let b = CanonicalFileId::compute("/b/x.pdf", FileKind::Doc);
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_id_distinguishes_kind() {
        let a = CanonicalFileId::compute("/inbox/file", FileKind::Doc);
        let b = CanonicalFileId::compute("/inbox/file", FileKind::Image);
        assert_ne!(a, b);
    }

    #[test]
    fn item_id_wire_round_trip() {
        let file_id = CanonicalFileId::compute("/a/x.pdf", FileKind::Doc);
        let chunk = ItemId::Chunk {
            file_id: file_id.clone(),
            index: 3,
        };
        let wire = chunk.to_wire();
        assert_eq!(wire, format!("chunk:{file_id}:3"));
        assert_eq!(ItemId::from_wire(&wire), chunk);

        let folder = ItemId::Folder {
            folder_id: "finance".to_string(),
        };
        assert_eq!(ItemId::from_wire(&folder.to_wire()), folder);
    }

    #[test]
    fn rebased_file_id_matches_a_fresh_compute_at_the_new_path() {
        let old = ItemId::File(CanonicalFileId::compute("/a/x.pdf", FileKind::Doc));
        let rebased = old.rebased("/b/x.pdf", FileKind::Doc);
        assert_eq!(rebased, ItemId::File(CanonicalFileId::compute("/b/x.pdf", FileKind::Doc)));
        assert_ne!(rebased, old);
    }

    #[test]
    fn rebased_chunk_id_keeps_its_index() {
        let old = ItemId::Chunk { file_id: CanonicalFileId::compute("/a/x.pdf", FileKind::Doc), index: 3 };
        let rebased = old.rebased("/b/x.pdf", FileKind::Doc);
        assert_eq!(
            rebased,
            ItemId::Chunk { file_id: CanonicalFileId::compute("/b/x.pdf", FileKind::Doc), index: 3 }
        );
    }

    #[test]
    fn rebased_folder_id_is_unchanged() {
        let folder = ItemId::Folder { folder_id: "finance".to_string() };
        assert_eq!(folder.rebased("/b/x.pdf", FileKind::Doc), folder);
    }
}
