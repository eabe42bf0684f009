use crate::cache::Cache;
use crate::db::DB;
use crate::errors::{StoreError, StoreResult};
use crate::key::DbKey;
use crate::writer::DbWriter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::Arc;

/// Typed, cached access to a single RocksDB logical store identified by
/// `prefix`. Every persistent store in the node (headers, block nodes,
/// utxos, tx-meta, ...) is a thin wrapper around one of these.
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync + Copy + AsRef<[u8]>,
    TData: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    db: Arc<DB>,
    prefix: &'static [u8],
    cache: Cache<TKey, TData, S>,
}

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync + Copy + AsRef<[u8]>,
    TData: Clone + Send + Sync + Serialize + DeserializeOwned,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_size: u64, prefix: &'static [u8]) -> Self {
        Self { db, prefix, cache: Cache::new(cache_size) }
    }

    pub fn has(&self, key: TKey) -> StoreResult<bool> {
        if self.cache.contains_key(&key) {
            return Ok(true);
        }
        Ok(self.db.get_pinned(DbKey::new(self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> StoreResult<TData> {
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }
        let db_key = DbKey::new(self.prefix, key);
        let bytes = self.db.get_pinned(&db_key)?.ok_or(StoreError::KeyNotFound(db_key))?;
        let data: TData = bincode::deserialize(&bytes)?;
        self.cache.insert(key, data.clone());
        Ok(data)
    }

    pub fn iterator(&self) -> impl Iterator<Item = Result<(Box<[u8]>, TData), Box<bincode::ErrorKind>>> + '_ {
        let prefix = self.prefix;
        self.db
            .prefix_iterator(prefix)
            .take_while(move |item| item.as_ref().map(|(key, _)| key.starts_with(prefix)).unwrap_or(true))
            .map(move |item| {
                let (key, bytes) = item.expect("iterator read error");
                let data: TData = bincode::deserialize(&bytes)?;
                Ok((key, data))
            })
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: &TData) -> StoreResult<()> {
        self.cache.insert(key, data.clone());
        let bytes = bincode::serialize(data)?;
        writer.put(DbKey::new(self.prefix, key), bytes)?;
        Ok(())
    }

    pub fn write_many(&self, mut writer: impl DbWriter, entries: impl IntoIterator<Item = (TKey, TData)>) -> StoreResult<()> {
        let entries: Vec<_> = entries.into_iter().collect();
        self.cache.insert_many(&mut entries.iter().cloned());
        for (key, data) in entries {
            let bytes = bincode::serialize(&data)?;
            writer.put(DbKey::new(self.prefix, key), bytes)?;
        }
        Ok(())
    }

    pub fn delete(&self, mut writer: impl DbWriter, key: TKey) -> StoreResult<()> {
        self.cache.remove(&key);
        writer.delete(DbKey::new(self.prefix, key))?;
        Ok(())
    }

    pub fn delete_many(&self, mut writer: impl DbWriter, keys: impl IntoIterator<Item = TKey>) -> StoreResult<()> {
        let keys: Vec<_> = keys.into_iter().collect();
        self.cache.remove_many(&mut keys.iter().cloned());
        for key in keys {
            writer.delete(DbKey::new(self.prefix, key))?;
        }
        Ok(())
    }
}
