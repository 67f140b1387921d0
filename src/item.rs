//! Queue item and its persistence tier tag.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence tier that currently owns an item.
///
/// In-channel items are implicitly [`Tag::Default`]; the tag only matters for
/// persisted copies. The stored form of an item does not include the tag:
/// store adapters encode tier membership structurally (separate tables or
/// maps) and stamp the tag back on when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Fast path: the item is mirrored by the in-memory channel.
    #[default]
    Default,
    /// Spilled: the item is persisted but not in memory.
    Overflow,
}

/// A payload with its identity and enqueue metadata.
///
/// Items are created by [`Queue::enqueue`](crate::Queue::enqueue) and owned
/// by the engine; consumers receive copies. The `tag` field is managed by the
/// engine and its stores; delivered items always report [`Tag::Default`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    /// Unique item identifier (UUID v4), generated at enqueue.
    pub id: Uuid,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Timestamp when the item was enqueued.
    pub created_at: DateTime<Utc>,
    /// Tier that owns the persisted copy.
    #[serde(skip)]
    pub tag: Tag,
}

impl Item {
    /// Create a fresh item tagged for the fast path.
    pub(crate) fn new(payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            created_at: Utc::now(),
            tag: Tag::Default,
        }
    }
}
