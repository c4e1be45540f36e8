//! Failed-items map: tracks per-item retry state between flush attempts,
//! capped at `MAX_FAILED_ITEMS_SIZE` with LRU eviction straight to the
//! dead-letter queue.

use std::collections::HashMap;

use organizer_domain::constants::MAX_FAILED_ITEMS_SIZE;
use organizer_domain::value_objects::QueueItem;
use serde::{Deserialize, Serialize};

/// One item's retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    /// The item as it stood after its last failed attempt.
    pub item: QueueItem,
    /// Attempts made so far.
    pub retry_count: u32,
    /// ISO-8601 timestamp of the last attempt.
    pub last_attempt: String,
    /// Error message from the last attempt.
    pub error: String,
}

/// An LRU-bounded map from item id to `FailedItem`, serialized on the wire
/// as `[[id, FailedItem],...]`.
#[derive(Debug, Default)]
pub struct FailedItemsMap {
    entries: HashMap<String, FailedItem>,
    order: Vec<String>,
}

impl FailedItemsMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or update a failure for `id`. Returns the id evicted (oldest
    /// by insertion) if this insertion pushed the map over
    /// `MAX_FAILED_ITEMS_SIZE`, which the caller must move to dead-letter.
    pub fn record(&mut self, id: String, entry: FailedItem) -> Option<(String, FailedItem)> {
        if !self.entries.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.entries.insert(id, entry);

        if self.entries.len() > MAX_FAILED_ITEMS_SIZE {
            let evicted_id = self.order.remove(0);
            self.entries.remove(&evicted_id).map(|evicted| (evicted_id, evicted))
        } else {
            None
        }
    }

    /// Remove and return `id`'s entry, if present.
    pub fn remove(&mut self, id: &str) -> Option<FailedItem> {
        self.order.retain(|existing| existing != id);
        self.entries.remove(id)
    }

    /// Remove every entry whose item's `meta.path == path`, returning them.
    pub fn remove_by_path(&mut self, path: &str) -> Vec<(String, FailedItem)> {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.item.meta.path == path)
            .map(|(id, _)| id.clone())
            .collect();
        ids.into_iter().filter_map(|id| self.remove(&id).map(|entry| (id, entry))).collect()
    }

    /// Number of tracked items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion (oldest-first) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FailedItem)> {
        self.order.iter().filter_map(|id| self.entries.get(id).map(|entry| (id.as_str(), entry)))
    }

    /// Snapshot as the wire-form `Vec<(id, FailedItem)>` for persistence.
    #[must_use]
    pub fn to_wire(&self) -> Vec<(String, FailedItem)> {
        self.iter().map(|(id, entry)| (id.to_string(), entry.clone())).collect()
    }

    /// Rebuild from a persisted wire-form snapshot.
    #[must_use]
    pub fn from_wire(pairs: Vec<(String, FailedItem)>) -> Self {
        let mut map = Self::new();
        for (id, entry) in pairs {
            map.order.push(id.clone());
            map.entries.insert(id, entry);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_domain::value_objects::QueueItemMeta;

    fn item(path: &str) -> QueueItem {
        QueueItem {
            id: "file:1".to_string(),
            vector: None,
            model: None,
            meta: QueueItemMeta { path: path.to_string(),..Default::default() },
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            retry_count: 0,
        }
    }

    fn failed(path: &str) -> FailedItem {
        FailedItem {
            item: item(path),
            retry_count: 1,
            last_attempt: "2026-01-01T00:00:00Z".to_string(),
            error: "boom".to_string(),
        }
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut map = FailedItemsMap::new();
        for i in 0..MAX_FAILED_ITEMS_SIZE {
            assert!(map.record(format!("id-{i}"), failed("/a")).is_none());
        }
        let evicted = map.record("id-overflow".to_string(), failed("/a"));
        assert_eq!(evicted.unwrap().0, "id-0");
        assert_eq!(map.len(), MAX_FAILED_ITEMS_SIZE);
    }

    #[test]
    fn remove_by_path_removes_matching_entries_only() {
        let mut map = FailedItemsMap::new();
        map.record("a".to_string(), failed("/x"));
        map.record("b".to_string(), failed("/y"));
        let removed = map.remove_by_path("/x");
        assert_eq!(removed.len(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn round_trips_through_wire_form() {
        let mut map = FailedItemsMap::new();
        map.record("a".to_string(), failed("/x"));
        let wire = map.to_wire();
        let restored = FailedItemsMap::from_wire(wire);
        assert_eq!(restored.len(), 1);
    }
}
