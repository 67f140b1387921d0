//! Persistent store contract and the built-in adapters.
//!
//! The queue engine depends only on the [`Store`] trait; concrete adapters
//! decide how the two tiers are laid out on disk. Two adapters ship with the
//! crate:
//!
//! - [`RedbStore`] - embedded, ordered key/value storage backed by a single
//!   redb file. Survives restarts; the production choice.
//! - [`MemoryStore`] - ordered in-memory maps. Nothing survives the process;
//!   intended for tests, development, and embedded use.
//!
//! A store instance is owned by exactly one queue. Sharing a store between
//! two engines is undefined behavior at the contract level.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::item::{Item, Tag};

mod memory;
mod redb;

pub use memory::MemoryStore;
pub use redb::RedbStore;

#[cfg(test)]
mod tests;

/// Durable keyed persistence for queue items, split into a default and an
/// overflow tier.
///
/// All methods must be safe under concurrent access from a single engine's
/// tasks (producers, consumers, and the promoter). Implementations handle
/// their own internal mutual exclusion; the engine takes no locks around
/// store calls.
///
/// Any method may fail with [`Error::Store`] on I/O problems, corruption, or
/// a closed handle.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Prepare tables, indices, or collections. Idempotent.
    async fn init(&self) -> Result<()>;

    /// Persist an item under its current tag.
    ///
    /// Ids are unique by construction, so a key collision overwrites; a
    /// collision in practice is a bug in the caller.
    async fn put(&self, item: &Item) -> Result<()>;

    /// Up to `count` default-tier items in the store's deterministic
    /// iteration order. Used only for startup recovery.
    async fn get_default(&self, count: usize) -> Result<Vec<Item>>;

    /// The earliest overflow-tier item under the store's key order, without
    /// removing it.
    ///
    /// # Errors
    ///
    /// [`Error::NoOverflowItems`] when the overflow tier is empty.
    async fn pick_overflow(&self) -> Result<Item>;

    /// Atomically move an item from one tier to the other, returning the item
    /// under its new tag.
    ///
    /// Implementations that cannot flip atomically must write the `to` copy
    /// before removing the `from` copy, so a crash mid-flip leaves a
    /// recoverable duplicate rather than a lost item.
    ///
    /// # Errors
    ///
    /// [`Error::NoOverflowItems`] when the id is not present under `from`.
    async fn retag(&self, id: Uuid, from: Tag, to: Tag) -> Result<Item>;

    /// Remove an item from whichever tier holds it. Idempotent; returns
    /// whether anything was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Total number of items across both tiers.
    async fn size(&self) -> Result<usize>;
}

/// Resolve an opaque store URL into a store instance.
///
/// Recognized forms:
///
/// - `memory:` - a fresh [`MemoryStore`]
/// - `redb:<path>` - a [`RedbStore`] at `<path>`
/// - anything else is treated as a filesystem path for a [`RedbStore`]
///
/// # Errors
///
/// Returns an error if the backing database cannot be opened or created.
pub fn open(url: &str) -> Result<Arc<dyn Store>> {
    if url == "memory:" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = url.strip_prefix("redb:").unwrap_or(url);
    if path.is_empty() {
        return Err(Error::store(anyhow::anyhow!("empty store path in {url:?}")));
    }
    Ok(Arc::new(RedbStore::open(path)?))
}
