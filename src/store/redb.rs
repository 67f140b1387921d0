//! Redb-backed store adapter.
//!
//! Persists both tiers in a single redb database file, one table per tier,
//! keyed by the item's 16 uuid bytes. Table iteration is key-ordered, which
//! satisfies the deterministic recovery order and the earliest-key overflow
//! pick policy. Retag runs as one write transaction, so the flip is atomic;
//! within the transaction the new-tier copy is written before the old-tier
//! copy is removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use uuid::Uuid;

use super::Store;
use crate::error::{Error, Result};
use crate::item::{Item, Tag};

const DEFAULT_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("default");
const OVERFLOW_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("overflow");

/// Embedded store backed by a redb database file.
///
/// Blocking database calls run on the tokio blocking pool so store I/O never
/// stalls the async runtime.
///
/// # Thread Safety
///
/// `RedbStore` is `Clone`; clones share the same database handle, and redb
/// serializes concurrent writers internally.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates parent directories if needed and ensures both tier tables
    /// exist, so later reads never race table creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// file cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("failed to open store database: {}", path.display()))?;

        let store = Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(tag: Tag) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
        match tag {
            Tag::Default => DEFAULT_TABLE,
            Tag::Overflow => OVERFLOW_TABLE,
        }
    }

    fn ensure_tables(&self) -> Result<()> {
        let txn = self
            .db
            .begin_write()
            .context("failed to begin initialization transaction")?;
        {
            let _default = txn
                .open_table(DEFAULT_TABLE)
                .context("failed to initialize default table")?;
            let _overflow = txn
                .open_table(OVERFLOW_TABLE)
                .context("failed to initialize overflow table")?;
        }
        txn.commit()
            .context("failed to commit initialization transaction")?;
        Ok(())
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|err| Error::store(anyhow::Error::new(err).context("store task panicked")))?
    }

    fn put_sync(&self, item: &Item) -> Result<()> {
        let encoded = encode(item)?;
        let txn = self
            .db
            .begin_write()
            .context("failed to begin write transaction")?;
        {
            let mut table = txn
                .open_table(Self::table(item.tag))
                .context("failed to open tier table")?;
            table
                .insert(item.id.as_bytes().as_slice(), encoded.as_slice())
                .with_context(|| format!("failed to persist item {}", item.id))?;
        }
        txn.commit().context("failed to commit put transaction")?;
        Ok(())
    }

    fn get_default_sync(&self, count: usize) -> Result<Vec<Item>> {
        let txn = self
            .db
            .begin_read()
            .context("failed to begin read transaction")?;
        let table = txn
            .open_table(DEFAULT_TABLE)
            .context("failed to open default table")?;

        let mut items = Vec::new();
        for entry in table
            .iter()
            .context("failed to iterate default table")?
            .take(count)
        {
            let (_, value) = entry.context("failed to read default entry")?;
            items.push(decode(value.value(), Tag::Default)?);
        }
        Ok(items)
    }

    fn pick_overflow_sync(&self) -> Result<Item> {
        let txn = self
            .db
            .begin_read()
            .context("failed to begin read transaction")?;
        let table = txn
            .open_table(OVERFLOW_TABLE)
            .context("failed to open overflow table")?;

        match table
            .iter()
            .context("failed to iterate overflow table")?
            .next()
        {
            Some(entry) => {
                let (_, value) = entry.context("failed to read overflow entry")?;
                decode(value.value(), Tag::Overflow)
            },
            None => Err(Error::NoOverflowItems),
        }
    }

    fn retag_sync(&self, id: Uuid, from: Tag, to: Tag) -> Result<Item> {
        let txn = self
            .db
            .begin_write()
            .context("failed to begin write transaction")?;
        let item = {
            let mut from_table = txn
                .open_table(Self::table(from))
                .context("failed to open source tier table")?;
            let mut to_table = txn
                .open_table(Self::table(to))
                .context("failed to open target tier table")?;

            let key = id.as_bytes().as_slice();
            let mut item = {
                let guard = from_table
                    .get(key)
                    .with_context(|| format!("failed to read item {id}"))?;
                match guard {
                    Some(value) => decode(value.value(), from)?,
                    None => return Err(Error::NoOverflowItems),
                }
            };
            item.tag = to;

            // New-tier copy lands before the old one goes away; redb makes the
            // pair atomic at commit anyway.
            let encoded = encode(&item)?;
            to_table
                .insert(key, encoded.as_slice())
                .with_context(|| format!("failed to write retagged item {id}"))?;
            from_table
                .remove(key)
                .with_context(|| format!("failed to remove item {id} from source tier"))?;
            item
        };
        txn.commit().context("failed to commit retag transaction")?;
        Ok(item)
    }

    fn delete_sync(&self, id: Uuid) -> Result<bool> {
        let txn = self
            .db
            .begin_write()
            .context("failed to begin write transaction")?;
        let removed = {
            let key = id.as_bytes().as_slice();
            let mut default_table = txn
                .open_table(DEFAULT_TABLE)
                .context("failed to open default table")?;
            let mut overflow_table = txn
                .open_table(OVERFLOW_TABLE)
                .context("failed to open overflow table")?;

            let in_default = default_table
                .remove(key)
                .with_context(|| format!("failed to delete item {id}"))?
                .is_some();
            let in_overflow = overflow_table
                .remove(key)
                .with_context(|| format!("failed to delete item {id}"))?
                .is_some();
            in_default || in_overflow
        };
        txn.commit().context("failed to commit delete transaction")?;
        Ok(removed)
    }

    fn size_sync(&self) -> Result<usize> {
        let txn = self
            .db
            .begin_read()
            .context("failed to begin read transaction")?;
        let default_len = txn
            .open_table(DEFAULT_TABLE)
            .context("failed to open default table")?
            .len()
            .context("failed to count default table")?;
        let overflow_len = txn
            .open_table(OVERFLOW_TABLE)
            .context("failed to open overflow table")?
            .len()
            .context("failed to count overflow table")?;
        Ok((default_len + overflow_len) as usize)
    }
}

#[async_trait]
impl Store for RedbStore {
    async fn init(&self) -> Result<()> {
        self.run_blocking(Self::ensure_tables).await
    }

    async fn put(&self, item: &Item) -> Result<()> {
        let item = item.clone();
        self.run_blocking(move |store| store.put_sync(&item)).await
    }

    async fn get_default(&self, count: usize) -> Result<Vec<Item>> {
        self.run_blocking(move |store| store.get_default_sync(count))
            .await
    }

    async fn pick_overflow(&self) -> Result<Item> {
        self.run_blocking(Self::pick_overflow_sync).await
    }

    async fn retag(&self, id: Uuid, from: Tag, to: Tag) -> Result<Item> {
        self.run_blocking(move |store| store.retag_sync(id, from, to))
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.run_blocking(move |store| store.delete_sync(id)).await
    }

    async fn size(&self) -> Result<usize> {
        self.run_blocking(Self::size_sync).await
    }
}

fn encode(item: &Item) -> Result<Vec<u8>> {
    let encoded = serde_json::to_vec(item)
        .with_context(|| format!("failed to serialize item {}", item.id))?;
    Ok(encoded)
}

fn decode(bytes: &[u8], tag: Tag) -> Result<Item> {
    let mut item: Item =
        serde_json::from_slice(bytes).context("failed to deserialize stored item")?;
    item.tag = tag;
    Ok(item)
}
