use parking_lot::RwLock;
use rand::Rng;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

/// A bounded, randomly-evicting read cache sitting in front of a [`crate::prelude::CachedDbAccess`].
/// When full, a random entry (not necessarily LRU) is evicted to make room —
/// cheap to maintain and good enough since hot keys (recent headers, recent
/// utxos) are re-inserted on every read miss anyway.
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    inner: Arc<RwLock<HashMap<TKey, TData, S>>>,
    max_size: usize,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(size: u64) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::with_capacity_and_hasher(size as usize, S::default()))), max_size: size as usize }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.inner.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        self.inner.read().contains_key(key)
    }

    fn evict_one_if_full(map: &mut HashMap<TKey, TData, S>, max_size: usize) {
        if max_size == 0 || map.len() < max_size {
            return;
        }
        if let Some(victim) = map.keys().nth(rand::thread_rng().gen_range(0..map.len())).cloned() {
            map.remove(&victim);
        }
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.max_size == 0 {
            return;
        }
        let mut guard = self.inner.write();
        Self::evict_one_if_full(&mut guard, self.max_size);
        guard.insert(key, data);
    }

    pub fn insert_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        if self.max_size == 0 {
            return;
        }
        let mut guard = self.inner.write();
        for (key, data) in iter {
            Self::evict_one_if_full(&mut guard, self.max_size);
            guard.insert(key, data);
        }
    }

    pub fn remove(&self, key: &TKey) -> Option<TData> {
        if self.max_size == 0 {
            return None;
        }
        self.inner.write().remove(key)
    }

    pub fn remove_many(&self, key_iter: &mut impl Iterator<Item = TKey>) {
        if self.max_size == 0 {
            return;
        }
        let mut guard = self.inner.write();
        for key in key_iter {
            guard.remove(&key);
        }
    }

    pub fn remove_all(&self) {
        self.inner.write().clear();
    }
}
