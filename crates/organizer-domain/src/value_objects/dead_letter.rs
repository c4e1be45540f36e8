//! `DeadLetterEntry`: terminal state for items that exhausted retries.

use serde::{Deserialize, Serialize};

use super::queue_item::QueueItem;

/// Kind of item a dead-letter entry holds, preserved for operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterItemType {
    /// A file-level item.
    File,
    /// A chunk-level item.
    Chunk,
    /// A folder-level item.
    Folder,
}

/// An item that exhausted `ITEM_MAX_RETRIES` and is parked for manual
/// intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// The item as it last stood before being dead-lettered.
    pub item: QueueItem,
    /// The error message from the final failed attempt.
    pub error: String,
    /// Number of attempts made before dead-lettering.
    pub retry_count: u32,
    /// ISO-8601 timestamp of dead-lettering.
    pub failed_at: String,
    /// Kind of item (file/chunk/folder).
    pub item_type: DeadLetterItemType,
}

impl DeadLetterEntry {
    /// The dead-lettered item's wire id, used for `retryDeadLetterItem`.
    #[must_use]
    pub fn item_id(&self) -> &str {
        &self.item.id
    }
}
