//! Value objects and entities.

/// `AnalysisResult` and its constituent enums.
pub mod analysis;
/// `DeadLetterEntry`.
pub mod dead_letter;
/// `Embedding` and its validation helpers.
pub mod embedding;
/// `FileRef` entity.
pub mod file_ref;
/// Identity types: `CanonicalFileId`, `ItemId`, `FileKind`, `CollectionId`.
pub mod ids;
/// `QueueItem` and `QueueItemMeta` wire shapes.
pub mod queue_item;
/// `RelationshipEdge`.
pub mod relationship;
/// `SmartFolder` and its fingerprint function.
pub mod smart_folder;

pub use analysis::{AnalysisResult, CategorySource, ContentType, ExtractionMethod};
pub use dead_letter::{DeadLetterEntry, DeadLetterItemType};
pub use embedding::Embedding;
pub use file_ref::FileRef;
pub use ids::{CanonicalFileId, CollectionId, FileKind, ItemId};
pub use queue_item::{QueueItem, QueueItemMeta, Stage};
pub use relationship::{AnalysisHistoryEntry, PersistedRelationships, RelationshipEdge};
pub use smart_folder::{smart_folder_set_fingerprint, SmartFolder};
