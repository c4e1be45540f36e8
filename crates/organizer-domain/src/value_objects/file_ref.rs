//! `FileRef` entity: identity plus the minimal stat metadata the pipeline
//! reasons about.

use serde::{Deserialize, Serialize};

use super::ids::{CanonicalFileId, FileKind};

/// A file under analysis. Created on first observation, mutated only via the
/// path coordinator (move/rename), destroyed on deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    /// Stable identity derived from path + kind.
    pub id: CanonicalFileId,
    /// Current absolute path on disk.
    pub path: String,
    /// File size in bytes at last stat.
    pub size: u64,
    /// Modification time, milliseconds since the Unix epoch.
    pub mtime_ms: i64,
    /// Lower-cased extension without the leading dot (e.g. `"png"`).
    pub extension: String,
    /// Whether this is a document or an image.
    pub kind: FileKind,
}

impl FileRef {
    /// Build a `FileRef` from a normalized absolute path and the remaining
    /// stat fields, computing its canonical id.
    #[must_use]
    pub fn new(
        normalized_absolute_path: impl Into<String>,
        size: u64,
        mtime_ms: i64,
        kind: FileKind,
    ) -> Self {
        let path = normalized_absolute_path.into();
        let extension = extension_of(&path);
        let id = CanonicalFileId::compute(&path, kind);
        Self {
            id,
            path,
            size,
            mtime_ms,
            extension,
            kind,
        }
    }

    /// Re-derive a `FileRef` at a new path, recomputing its id (the result of
    /// a move/rename).
    #[must_use]
    pub fn moved_to(&self, new_normalized_absolute_path: impl Into<String>) -> Self {
        Self::new(new_normalized_absolute_path, self.size, self.mtime_ms, self.kind)
    }
}

fn extension_of(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}
