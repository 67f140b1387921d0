//! In-memory store adapter.
//!
//! Keeps both tiers in ordered maps behind a single lock. All data is lost
//! when the process exits. Intended for testing, development, and embedded
//! use where durability is not required.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::item::{Item, Tag};

#[derive(Default)]
struct Tiers {
    default: BTreeMap<Uuid, Item>,
    overflow: BTreeMap<Uuid, Item>,
}

impl Tiers {
    fn tier_mut(&mut self, tag: Tag) -> &mut BTreeMap<Uuid, Item> {
        match tag {
            Tag::Default => &mut self.default,
            Tag::Overflow => &mut self.overflow,
        }
    }
}

/// In-memory store backed by ordered maps.
///
/// `BTreeMap` iteration gives the deterministic key order the [`Store`]
/// contract requires for recovery and for the overflow pick policy. One lock
/// guards both tiers, so a retag is never observable half-done.
///
/// # Thread Safety
///
/// `MemoryStore` is `Clone`; clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tiers: Arc<RwLock<Tiers>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently held under `tag`.
    pub fn count(&self, tag: Tag) -> usize {
        let tiers = self.tiers.read();
        match tag {
            Tag::Default => tiers.default.len(),
            Tag::Overflow => tiers.overflow.len(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, item: &Item) -> Result<()> {
        let mut tiers = self.tiers.write();
        tiers.tier_mut(item.tag).insert(item.id, item.clone());
        Ok(())
    }

    async fn get_default(&self, count: usize) -> Result<Vec<Item>> {
        let tiers = self.tiers.read();
        Ok(tiers.default.values().take(count).cloned().collect())
    }

    async fn pick_overflow(&self) -> Result<Item> {
        let tiers = self.tiers.read();
        tiers
            .overflow
            .values()
            .next()
            .cloned()
            .ok_or(Error::NoOverflowItems)
    }

    async fn retag(&self, id: Uuid, from: Tag, to: Tag) -> Result<Item> {
        let mut tiers = self.tiers.write();
        let mut item = tiers
            .tier_mut(from)
            .remove(&id)
            .ok_or(Error::NoOverflowItems)?;
        item.tag = to;
        tiers.tier_mut(to).insert(id, item.clone());
        Ok(item)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tiers = self.tiers.write();
        let in_default = tiers.default.remove(&id).is_some();
        let in_overflow = tiers.overflow.remove(&id).is_some();
        Ok(in_default || in_overflow)
    }

    async fn size(&self) -> Result<usize> {
        let tiers = self.tiers.read();
        Ok(tiers.default.len() + tiers.overflow.len())
    }
}
