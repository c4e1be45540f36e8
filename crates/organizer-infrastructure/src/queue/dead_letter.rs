//! Dead-letter store: terminal parking lot for items that exhausted
//! `ITEM_MAX_RETRIES`, capped at `MAX_DEAD_LETTER_SIZE` with oldest-10%
//! pruning when full.

use organizer_domain::constants::MAX_DEAD_LETTER_SIZE;
use organizer_domain::value_objects::DeadLetterEntry;

/// An ordered, capacity-bounded list of dead-lettered items.
#[derive(Debug, Default)]
pub struct DeadLetterStore {
    entries: Vec<DeadLetterEntry>,
}

impl DeadLetterStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a persisted snapshot.
    #[must_use]
    pub fn from_entries(entries: Vec<DeadLetterEntry>) -> Self {
        Self { entries }
    }

    /// Park `entry`, pruning the oldest 10% first if already at capacity.
    pub fn push(&mut self, entry: DeadLetterEntry) {
        if self.entries.len() >= MAX_DEAD_LETTER_SIZE {
            let prune_count = (self.entries.len() / 10).max(1);
            self.entries.drain(0..prune_count);
        }
        self.entries.push(entry);
    }

    /// Remove and return the entry with the given wire id, if present.
    pub fn take(&mut self, item_id: &str) -> Option<DeadLetterEntry> {
        let index = self.entries.iter().position(|entry| entry.item_id() == item_id)?;
        Some(self.entries.remove(index))
    }

    /// Remove and return every entry, clearing the store (used by
    /// `retry_all_dead_letter_items`).
    pub fn take_all(&mut self) -> Vec<DeadLetterEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Current entries, for the `dead-letter list` CLI command.
    #[must_use]
    pub fn entries(&self) -> &[DeadLetterEntry] {
        &self.entries
    }

    /// Number of parked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::value_objects::{DeadLetterItemType, QueueItem, QueueItemMeta};

    fn entry(id: &str) -> DeadLetterEntry {
        DeadLetterEntry {
            item: QueueItem {
                id: id.to_string(),
                vector: None,
                model: None,
                meta: QueueItemMeta::default(),
                updated_at: "2026-01-01T00:00:00Z".to_string(),
                retry_count: 8,
            },
            error: "boom".to_string(),
            retry_count: 8,
            failed_at: "2026-01-01T00:00:00Z".to_string(),
            item_type: DeadLetterItemType::File,
        }
    }

    #[test]
    fn prunes_oldest_tenth_when_full() {
        let mut store = DeadLetterStore::new();
        for i in 0..MAX_DEAD_LETTER_SIZE {
            store.push(entry(&format!("file:{i}")));
        }
        assert_eq!(store.len(), MAX_DEAD_LETTER_SIZE);
        store.push(entry("file:overflow"));
        assert!(store.len() < MAX_DEAD_LETTER_SIZE + 1);
        assert!(store.entries().iter().any(|e| e.item_id() == "file:overflow"));
        assert!(!store.entries().iter().any(|e| e.item_id() == "file:0"));
    }

    #[test]
    fn take_removes_a_single_entry_by_id() {
        let mut store = DeadLetterStore::new();
        store.push(entry("file:1"));
        store.push(entry("file:2"));
        let taken = store.take("file:1").unwrap();
        assert_eq!(taken.item_id(), "file:1");
        assert_eq!(store.len(), 1);
    }
}
