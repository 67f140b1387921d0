//! Contract tests for the store adapters.
//!
//! The shared laws run against both adapters; adapter-specific tests cover
//! redb reopen durability and the memory store's tier counters.

use anyhow::Result;
use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use super::{MemoryStore, RedbStore, Store};
use crate::error::Error;
use crate::item::{Item, Tag};

fn item_with(id: u128, payload: &[u8], tag: Tag) -> Item {
    Item {
        id: Uuid::from_u128(id),
        payload: payload.to_vec(),
        created_at: Utc::now(),
        tag,
    }
}

async fn check_get_default_order_and_limit(store: &dyn Store) -> Result<()> {
    store.put(&item_with(2, b"v2", Tag::Default)).await?;
    store.put(&item_with(1, b"v1", Tag::Default)).await?;
    store.put(&item_with(3, b"v3", Tag::Overflow)).await?;

    let items = store.get_default(10).await?;
    let payloads: Vec<_> = items.iter().map(|i| i.payload.clone()).collect();
    assert_eq!(payloads, vec![b"v1".to_vec(), b"v2".to_vec()]);
    assert!(items.iter().all(|i| i.tag == Tag::Default));

    let limited = store.get_default(1).await?;
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].payload, b"v1");

    assert!(store.get_default(0).await?.is_empty());
    Ok(())
}

async fn check_pick_overflow(store: &dyn Store) -> Result<()> {
    let err = store.pick_overflow().await.unwrap_err();
    assert!(matches!(err, Error::NoOverflowItems));

    store.put(&item_with(5, b"later", Tag::Overflow)).await?;
    store.put(&item_with(4, b"earlier", Tag::Overflow)).await?;

    let picked = store.pick_overflow().await?;
    assert_eq!(picked.payload, b"earlier");
    assert_eq!(picked.tag, Tag::Overflow);

    // Pick does not remove.
    let again = store.pick_overflow().await?;
    assert_eq!(again.id, picked.id);
    assert_eq!(store.size().await?, 2);
    Ok(())
}

async fn check_retag(store: &dyn Store) -> Result<()> {
    let item = item_with(7, b"spilled", Tag::Overflow);
    store.put(&item).await?;

    let promoted = store.retag(item.id, Tag::Overflow, Tag::Default).await?;
    assert_eq!(promoted.id, item.id);
    assert_eq!(promoted.payload, b"spilled");
    assert_eq!(promoted.tag, Tag::Default);

    // The id now lives under exactly one tag.
    let err = store.pick_overflow().await.unwrap_err();
    assert!(matches!(err, Error::NoOverflowItems));
    let defaults = store.get_default(10).await?;
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, item.id);

    // Retagging an id no longer present under `from` reports no items.
    let err = store
        .retag(item.id, Tag::Overflow, Tag::Default)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoOverflowItems));
    Ok(())
}

async fn check_delete_idempotent(store: &dyn Store) -> Result<()> {
    let default_item = item_with(8, b"d", Tag::Default);
    let overflow_item = item_with(9, b"o", Tag::Overflow);
    store.put(&default_item).await?;
    store.put(&overflow_item).await?;

    assert!(store.delete(default_item.id).await?);
    assert!(!store.delete(default_item.id).await?);
    assert!(store.delete(overflow_item.id).await?);
    assert!(!store.delete(Uuid::new_v4()).await?);
    assert_eq!(store.size().await?, 0);
    Ok(())
}

async fn check_size_spans_tiers(store: &dyn Store) -> Result<()> {
    assert_eq!(store.size().await?, 0);
    store.put(&item_with(1, b"a", Tag::Default)).await?;
    store.put(&item_with(2, b"b", Tag::Overflow)).await?;
    store.put(&item_with(3, b"c", Tag::Overflow)).await?;
    assert_eq!(store.size().await?, 3);
    Ok(())
}

async fn check_init_idempotent(store: &dyn Store) -> Result<()> {
    store.init().await?;
    store.put(&item_with(1, b"kept", Tag::Default)).await?;
    store.init().await?;
    assert_eq!(store.size().await?, 1);
    Ok(())
}

mod memory {
    use super::*;

    #[tokio::test]
    async fn test_get_default_order_and_limit() -> Result<()> {
        check_get_default_order_and_limit(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_pick_overflow() -> Result<()> {
        check_pick_overflow(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_retag() -> Result<()> {
        check_retag(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_delete_idempotent() -> Result<()> {
        check_delete_idempotent(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_size_spans_tiers() -> Result<()> {
        check_size_spans_tiers(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_init_idempotent() -> Result<()> {
        check_init_idempotent(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_count_tracks_tiers() -> Result<()> {
        let store = MemoryStore::new();
        store.put(&item_with(1, b"a", Tag::Default)).await?;
        store.put(&item_with(2, b"b", Tag::Overflow)).await?;

        assert_eq!(store.count(Tag::Default), 1);
        assert_eq!(store.count(Tag::Overflow), 1);

        store.retag(Uuid::from_u128(2), Tag::Overflow, Tag::Default).await?;
        assert_eq!(store.count(Tag::Default), 2);
        assert_eq!(store.count(Tag::Overflow), 0);
        Ok(())
    }
}

mod redb {
    use super::*;

    fn open_store(tmp: &TempDir) -> Result<RedbStore> {
        Ok(RedbStore::open(tmp.path().join("store.redb"))?)
    }

    #[tokio::test]
    async fn test_get_default_order_and_limit() -> Result<()> {
        let tmp = TempDir::new()?;
        check_get_default_order_and_limit(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_pick_overflow() -> Result<()> {
        let tmp = TempDir::new()?;
        check_pick_overflow(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_retag() -> Result<()> {
        let tmp = TempDir::new()?;
        check_retag(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_delete_idempotent() -> Result<()> {
        let tmp = TempDir::new()?;
        check_delete_idempotent(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_size_spans_tiers() -> Result<()> {
        let tmp = TempDir::new()?;
        check_size_spans_tiers(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_init_idempotent() -> Result<()> {
        let tmp = TempDir::new()?;
        check_init_idempotent(&open_store(&tmp)?).await
    }

    #[tokio::test]
    async fn test_reopen_preserves_items() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("store.redb");

        {
            let store = RedbStore::open(&path)?;
            store.put(&item_with(1, b"v1", Tag::Default)).await?;
            store.put(&item_with(2, b"v2", Tag::Overflow)).await?;
        }

        let store = RedbStore::open(&path)?;
        assert_eq!(store.size().await?, 2);

        let defaults = store.get_default(10).await?;
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].payload, b"v1");

        let picked = store.pick_overflow().await?;
        assert_eq!(picked.payload, b"v2");
        Ok(())
    }

    #[tokio::test]
    async fn test_open_creates_parent_dirs() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("nested").join("dirs").join("store.redb");
        let store = RedbStore::open(&path)?;
        assert_eq!(store.path(), path);
        assert_eq!(store.size().await?, 0);
        Ok(())
    }
}

mod open_url {
    use std::sync::Arc;

    use super::*;
    use crate::store;

    #[tokio::test]
    async fn test_memory_scheme() -> Result<()> {
        let opened = store::open("memory:")?;
        opened.put(&item_with(1, b"a", Tag::Default)).await?;
        assert_eq!(opened.size().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_redb_scheme_and_bare_path() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("via_url.redb");

        {
            let opened: Arc<dyn Store> = store::open(&format!("redb:{}", path.display()))?;
            opened.put(&item_with(1, b"a", Tag::Default)).await?;
        }

        let reopened = store::open(&path.display().to_string())?;
        assert_eq!(reopened.size().await?, 1);
        Ok(())
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(store::open("redb:").is_err());
    }
}
