use crate::db::DB;
use crate::errors::{StoreError, StoreResult, StoreResultExtensions};
use crate::writer::DbWriter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A single cached value keyed by a fixed prefix, e.g. the block assembler's
/// persisted best-tip or a store's schema-version marker. Backed directly by
/// the DB rather than [`crate::prelude::CachedDbAccess`] since there is only
/// ever one key.
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: &'static [u8],
    cached: Arc<std::sync::RwLock<Option<T>>>,
}

impl<T: Clone + Serialize + DeserializeOwned> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: &'static [u8]) -> Self {
        Self { db, key, cached: Arc::new(std::sync::RwLock::new(None)) }
    }

    pub fn read(&self) -> StoreResult<T> {
        if let Some(value) = self.cached.read().unwrap().clone() {
            return Ok(value);
        }
        let bytes = self.db.get_pinned(self.key)?.ok_or_else(|| StoreError::KeyNotFound(crate::key::DbKey::prefix_only(self.key)))?;
        let value: T = bincode::deserialize(&bytes)?;
        *self.cached.write().unwrap() = Some(value.clone());
        Ok(value)
    }

    pub fn read_opt(&self) -> StoreResult<Option<T>> {
        self.read().unwrap_option()
    }

    pub fn write(&self, mut writer: impl DbWriter, value: &T) -> StoreResult<()> {
        let bytes = bincode::serialize(value)?;
        writer.put(self.key, bytes)?;
        *self.cached.write().unwrap() = Some(value.clone());
        Ok(())
    }

    /// Reads the current value (if any), applies `f`, and writes the result back.
    pub fn update<F>(&self, mut writer: impl DbWriter, f: F) -> StoreResult<T>
    where
        F: Fn(Option<T>) -> T,
    {
        let current = self.read_opt()?;
        let next = f(current);
        self.write(&mut writer, &next)?;
        Ok(next)
    }
}
