//! `QueueItem` wire shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ItemId;

/// Pipeline checkpoint at which an embedding is eligible to enter
/// persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Embedded during initial analysis.
    Analysis,
    /// Embedded after the file has been organized/moved.
    Organize,
}

impl Stage {
    /// Both stage variants, for iterating "all stage queues".
    #[must_use]
    pub const fn all() -> [Stage; 2] {
        [Stage::Analysis, Stage::Organize]
    }

    /// Lowercase name, used in file paths and CLI output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Analysis => "analysis",
            Stage::Organize => "organize",
        }
    }
}

/// Metadata carried alongside a queue item's vector, mirroring the wire
/// shape exactly (field names, caps are enforced by the producer, not by
/// this struct).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueItemMeta {
    /// Current path of the file this item concerns.
    pub path: String,
    /// Display name (filename without directory).
    pub name: String,
    /// File extension, no leading dot.
    pub file_extension: String,
    /// File size in bytes, when known.
    pub file_size: Option<u64>,
    /// Final category (post hallucination-validation / folder-match).
    pub category: String,
    /// Confidence 0..100.
    pub confidence: u8,
    /// `"file" | "chunk" | "folder"`.
    #[serde(rename = "type")]
    pub item_type: String,
    /// MIME-ish type tag (`"document"` / `"image"`).
    pub file_type: String,
    /// How the text was extracted.
    pub extraction_method: String,
    /// Summary, capped at 2000 chars by the producer.
    pub summary: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Keyword set, 0..7 entries.
    pub keywords: Vec<String>,
    /// ISO-8601 date, if known.
    pub date: Option<String>,
    /// Suggested filename without extension.
    pub suggested_name: String,
    /// Named entities, capped at 20.
    pub key_entities: Vec<String>,
    /// Primary entity.
    pub entity: String,
    /// Project association.
    pub project: String,
    /// Purpose, capped at 1000 chars.
    pub purpose: String,
    /// Model's reasoning trace, capped at 500 chars.
    pub reasoning: String,
    /// Document type.
    pub document_type: String,
    /// Extracted text, capped at 5000 chars.
    pub extracted_text: String,
    /// Smart folder name, if matched.
    pub smart_folder: Option<String>,
    /// Smart folder destination path, if matched.
    pub smart_folder_path: Option<String>,
    /// Content type tag (images only).
    pub content_type: Option<String>,
    /// Dominant hex colors (images only).
    pub colors: Vec<String>,
    /// Whether the image contains legible text (images only).
    pub has_text: Option<bool>,
    /// Unknown/extra fields preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A durable item awaiting delivery to the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// File, chunk, or folder id (wire form).
    pub id: String,
    /// Embedding vector, if already computed.
    pub vector: Option<Vec<f32>>,
    /// Embedding model identifier.
    pub model: Option<String>,
    /// Metadata describing this item.
    pub meta: QueueItemMeta,
    /// ISO-8601 timestamp of last update.
    pub updated_at: String,
    /// Number of delivery attempts so far.
    #[serde(default)]
    pub retry_count: u32,
}

impl QueueItem {
    /// Typed view of `id`.
    #[must_use]
    pub fn item_id(&self) -> ItemId {
        ItemId::from_wire(&self.id)
    }
}
