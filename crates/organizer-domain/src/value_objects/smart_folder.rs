//! `SmartFolder` value object: a user-defined destination used to route
//! files, owned by the settings collaborator and passed in by value.

use serde::{Deserialize, Serialize};

/// A user-defined destination folder with a name and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartFolder {
    /// Stable identifier.
    pub id: String,
    /// Display name; must be unique within a session.
    pub name: String,
    /// Destination path on disk.
    pub path: String,
    /// Human-authored description used to seed the folder's embedding.
    pub description: String,
}

/// Compute the document-form fingerprint for a set of smart folders: the
/// sorted, joined `"id:name:path:description"` tuples. Both the document
/// and image pipelines use this form; the image pipeline's earlier,
/// divergent fingerprint form was retired in favor of it.
#[must_use]
pub fn smart_folder_set_fingerprint(folders: &[SmartFolder]) -> String {
    let mut parts: Vec<String> = folders
        .iter()
        .map(|f| format!("{}:{}:{}:{}", f.id, f.name, f.path, f.description))
        .collect();
    parts.sort();
    parts.join("|")
}
