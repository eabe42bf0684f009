use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::subtree::SubtreeLeaf;
use nodecore_database::prelude::*;
use nodecore_database::registry::StorePrefix;
use nodecore_subtree_processor::SubtreeBlobStore;
use std::sync::Arc;

/// RocksDB-backed [`SubtreeBlobStore`], keyed by subtree root hash under
/// [`StorePrefix::Subtrees`]. A completed subtree is write-once: the subtree
/// processor persists its leaves the moment the subtree rotates out of the
/// in-flight front, and nothing ever mutates an entry afterward.
#[derive(Clone)]
pub struct RocksDbBlobStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Vec<SubtreeLeaf>>,
}

impl RocksDbBlobStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self { access: CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::Subtrees.as_bytes()), db }
    }
}

impl SubtreeBlobStore for RocksDbBlobStore {
    fn load_leaves(&self, root: Hash) -> NodeResult<Vec<SubtreeLeaf>> {
        self.access.read(root).map_err(store_err)
    }

    fn save_leaves(&self, root: Hash, leaves: &[SubtreeLeaf]) -> NodeResult<()> {
        self.access.write(DirectDbWriter::new(&self.db), root, &leaves.to_vec()).map_err(store_err)
    }
}

fn store_err(e: StoreError) -> NodeError {
    match e {
        StoreError::KeyNotFound(k) => NodeError::NotFound(k.to_string()),
        other => NodeError::Storage(other.to_string()),
    }
}
