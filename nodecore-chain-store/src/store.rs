use crate::keys::{HeightKey, IdKey};
use nodecore_consensus_core::errors::{BlockRuleError, NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::header::block_work;
use nodecore_consensus_core::node::{BlockNode, BlockNodeId, TipCandidate};
use nodecore_database::prelude::*;
use nodecore_database::registry::{state_keys, StorePrefix};
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Durable header DAG: blocks, derived active-chain index, and best-tip
/// selection. Strongly consistent per-call; callers needing a point-in-time
/// view across multiple calls should take their own external lock.
#[derive(Clone)]
pub struct BlockchainStore {
    db: Arc<DB>,
    nodes: CachedDbAccess<IdKey, BlockNode>,
    hash_index: CachedDbAccess<Hash, IdKey>,
    height_index: CachedDbAccess<HeightKey, IdKey>,
    best_tip: Arc<RwLock<Option<TipCandidate>>>,
    next_id: Arc<AtomicU64>,
}

pub struct BlockInsertResult {
    pub id: BlockNodeId,
    pub height: u32,
    pub became_best_tip: bool,
}

impl BlockchainStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        let nodes = CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::BlockNodes.as_bytes());
        let hash_index = CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::HashIndex.as_bytes());
        let height_index = CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::HeightIndex.as_bytes());
        let store = Self { db, nodes, hash_index, height_index, best_tip: Arc::new(RwLock::new(None)), next_id: Arc::new(AtomicU64::new(1)) };
        store.rebuild_best_tip_cache();
        store
    }

    fn state_item(&self) -> CachedDbItem<TipCandidate> {
        CachedDbItem::new(Arc::clone(&self.db), state_keys::BEST_TIP)
    }

    fn rebuild_best_tip_cache(&self) {
        if let Ok(Some(tip)) = self.state_item().read_opt() {
            *self.best_tip.write() = Some(tip);
        }
    }

    pub fn exists(&self, hash: Hash) -> NodeResult<bool> {
        Ok(self.hash_index.has(hash).map_err(store_err)?)
    }

    pub fn get_by_hash(&self, hash: Hash) -> NodeResult<BlockNode> {
        let id_key = self.hash_index.read(hash).map_err(not_found_hash)?;
        self.nodes.read(id_key).map_err(store_err)
    }

    pub fn get_by_id(&self, id: BlockNodeId) -> NodeResult<BlockNode> {
        self.nodes.read(IdKey::from(id)).map_err(store_err)
    }

    pub fn best_tip(&self) -> Option<TipCandidate> {
        *self.best_tip.read()
    }

    pub fn best_tip_node(&self) -> NodeResult<Option<BlockNode>> {
        match self.best_tip() {
            Some(tip) => Ok(Some(self.get_by_id(tip.id)?)),
            None => Ok(None),
        }
    }

    /// Inserts a new block-DAG node. The genesis node (`parent_id == 0`) is
    /// the sole case with no parent lookup. Chain-work accumulates from the
    /// parent; the store itself decides whether this becomes the new best
    /// tip by comparing chain-work, exactly as the spec's insertion
    /// algorithm requires.
    #[allow(clippy::too_many_arguments)]
    pub fn store_block(
        &self,
        header: nodecore_consensus_core::header::BlockHeader,
        tx_count: u64,
        size_bytes: u64,
        coinbase_bytes: Vec<u8>,
        subtree_hashes: Vec<Hash>,
        peer_id: u32,
        is_genesis: bool,
    ) -> NodeResult<BlockInsertResult> {
        let hash = header.hash();
        if self.exists(hash)? {
            return Err(NodeError::InvalidBlock(BlockRuleError::DuplicateBlock(hash)));
        }

        let (parent_id, parent_chain_work, height) = if is_genesis {
            (0u64, 0u128, 0u32)
        } else {
            let parent_id_key = self.hash_index.read(header.prev_hash).map_err(not_found_hash)?;
            let parent = self.nodes.read(parent_id_key).map_err(store_err)?;
            (BlockNodeId::from(parent_id_key), parent.chain_work, parent.height + 1)
        };

        let chain_work = parent_chain_work + block_work(header.bits);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let node = BlockNode {
            id,
            parent_id,
            header,
            height,
            chain_work,
            peer_id,
            tx_count,
            size_bytes,
            coinbase_bytes,
            subtree_hashes,
            invalid: false,
            mined_set: false,
            subtrees_set: false,
        };

        let mut batch = WriteBatch::default();
        self.nodes.write(BatchDbWriter::new(&mut batch), IdKey::from(id), &node).map_err(store_err)?;
        self.hash_index.write(BatchDbWriter::new(&mut batch), hash, &IdKey::from(id)).map_err(store_err)?;
        self.db.write(batch).map_err(|e| NodeError::Storage(e.to_string()))?;

        let candidate = TipCandidate { chain_work, peer_id, id };
        let became_best_tip = self.maybe_update_best_tip(candidate)?;
        if became_best_tip {
            self.rebuild_height_index_to(id, height)?;
        }

        Ok(BlockInsertResult { id, height, became_best_tip })
    }

    fn maybe_update_best_tip(&self, candidate: TipCandidate) -> NodeResult<bool> {
        let mut guard = self.best_tip.write();
        let should_update = match *guard {
            None => true,
            Some(current) => candidate > current,
        };
        if should_update {
            *guard = Some(candidate);
            self.state_item().write(DirectDbWriter::new(&self.db), &candidate).map_err(store_err)?;
        }
        Ok(should_update)
    }

    /// Rewrites the active-chain height index by walking from `tip_id` back
    /// to genesis via parent-id. Called after any tip change (new block,
    /// reorg) so `get_block_by_height` stays O(1) rather than O(height).
    fn rebuild_height_index_to(&self, tip_id: BlockNodeId, tip_height: u32) -> NodeResult<()> {
        let mut batch = WriteBatch::default();
        let mut current_id = tip_id;
        let mut current_height = tip_height;
        loop {
            self.height_index.write(BatchDbWriter::new(&mut batch), HeightKey::from(current_height), &IdKey::from(current_id)).map_err(store_err)?;
            if current_height == 0 {
                break;
            }
            let node = self.nodes.read(IdKey::from(current_id)).map_err(store_err)?;
            current_id = node.parent_id;
            current_height -= 1;
        }
        self.db.write(batch).map_err(|e| NodeError::Storage(e.to_string()))
    }

    /// Recursive walk from best tip down via parent-id, picking the row at
    /// the requested height. Returns `NotFound` if the active chain is
    /// shorter than the requested height.
    pub fn get_block_by_height(&self, height: u32) -> NodeResult<BlockNode> {
        let id_key = self.height_index.read(HeightKey::from(height)).map_err(|_| NodeError::NotFound(format!("no block at height {height}")))?;
        self.nodes.read(id_key).map_err(store_err)
    }

    /// Marks `hash` and every descendant on record as invalid, then
    /// re-selects the best tip from the remaining valid nodes and persists
    /// the new height index if the tip changed.
    pub fn invalidate(&self, hash: Hash) -> NodeResult<()> {
        let root_id_key = self.hash_index.read(hash).map_err(not_found_hash)?;
        let root_id = BlockNodeId::from(root_id_key);

        // Descendants aren't indexed by parent, so a full scan over all
        // known nodes is required; acceptable since invalidation is rare
        // and only triggered by explicit reorg failure or policy rejection.
        let mut to_invalidate = vec![root_id];
        let mut batch = WriteBatch::default();
        let mut idx = 0;
        while idx < to_invalidate.len() {
            let id = to_invalidate[idx];
            idx += 1;
            for item in self.nodes.iterator() {
                let (_, node) = item.map_err(|e| NodeError::Storage(e.to_string()))?;
                if node.parent_id == id && !node.invalid && !to_invalidate.contains(&node.id) {
                    to_invalidate.push(node.id);
                }
            }
        }

        for id in &to_invalidate {
            let mut node = self.nodes.read(IdKey::from(*id)).map_err(store_err)?;
            node.invalid = true;
            self.nodes.write(BatchDbWriter::new(&mut batch), IdKey::from(*id), &node).map_err(store_err)?;
        }
        self.db.write(batch).map_err(|e| NodeError::Storage(e.to_string()))?;

        self.reselect_best_tip(&to_invalidate)
    }

    /// Block locator from the best tip, capped at `12 + floor(log2(height -
    /// 10))` entries per [`crate::locator::block_locator`]. Convenience
    /// wrapper for callers that want "from wherever the chain currently is"
    /// rather than an explicit starting hash.
    pub fn block_locator(&self) -> NodeResult<Vec<Hash>> {
        let tip = match self.best_tip_node()? {
            Some(tip) => tip,
            None => return Ok(Vec::new()),
        };
        crate::locator::block_locator(self, tip.hash())
    }

    fn reselect_best_tip(&self, excluded: &[BlockNodeId]) -> NodeResult<()> {
        let mut best: Option<TipCandidate> = None;
        for item in self.nodes.iterator() {
            let (_, node) = item.map_err(|e| NodeError::Storage(e.to_string()))?;
            if node.invalid || excluded.contains(&node.id) {
                continue;
            }
            let candidate = TipCandidate { chain_work: node.chain_work, peer_id: node.peer_id, id: node.id };
            best = Some(match best {
                Some(current) if current >= candidate => current,
                _ => candidate,
            });
        }
        *self.best_tip.write() = best;
        if let Some(tip) = best {
            self.state_item().write(DirectDbWriter::new(&self.db), &tip).map_err(store_err)?;
            let tip_node = self.nodes.read(IdKey::from(tip.id)).map_err(store_err)?;
            self.rebuild_height_index_to(tip.id, tip_node.height)?;
        }
        Ok(())
    }
}

fn store_err(e: StoreError) -> NodeError {
    match e {
        StoreError::KeyNotFound(k) => NodeError::NotFound(k.to_string()),
        other => NodeError::Storage(other.to_string()),
    }
}

fn not_found_hash(e: StoreError) -> NodeError {
    match e {
        StoreError::KeyNotFound(_) => NodeError::NotFound("block hash unknown".to_string()),
        other => NodeError::Storage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::header::BlockHeader;

    fn temp_store() -> (BlockchainStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(dir.path(), true, 128);
        (BlockchainStore::new(db, 1_000), dir)
    }

    fn header(prev: Hash, nonce: u32) -> BlockHeader {
        BlockHeader::new(1, prev, Hash::ZERO, 1_700_000_000, 0x1d00ffff, nonce)
    }

    #[test]
    fn test_genesis_insert_becomes_best_tip() {
        let (store, _dir) = temp_store();
        let genesis = header(Hash::ZERO, 0);
        let result = store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        assert_eq!(result.height, 0);
        assert!(result.became_best_tip);
        assert_eq!(store.best_tip().unwrap().id, result.id);
    }

    #[test]
    fn test_chain_extends_and_height_index_resolves() {
        let (store, _dir) = temp_store();
        let genesis = header(Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        let child = header(genesis.hash(), 1);
        let result = store.store_block(child, 1, 200, vec![], vec![], 0, false).unwrap();
        assert_eq!(result.height, 1);
        let fetched = store.get_block_by_height(1).unwrap();
        assert_eq!(fetched.hash(), child.hash());
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let (store, _dir) = temp_store();
        let genesis = header(Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        let err = store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(BlockRuleError::DuplicateBlock(_))));
    }

    #[test]
    fn test_invalidate_reselects_best_tip() {
        let (store, _dir) = temp_store();
        let genesis = header(Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        let child = header(genesis.hash(), 1);
        let result = store.store_block(child, 1, 200, vec![], vec![], 0, false).unwrap();
        assert!(result.became_best_tip);

        store.invalidate(child.hash()).unwrap();
        let tip = store.best_tip().unwrap();
        assert_eq!(store.get_by_id(tip.id).unwrap().hash(), genesis.hash());
    }

    #[test]
    fn test_block_locator_starts_at_tip_and_ends_at_genesis() {
        let (store, _dir) = temp_store();
        let genesis = header(Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        let mut prev = genesis.hash();
        let mut last = genesis;
        for nonce in 1..15 {
            let h = header(prev, nonce);
            store.store_block(h, 1, 200, vec![], vec![], 0, false).unwrap();
            prev = h.hash();
            last = h;
        }
        let locator = store.block_locator().unwrap();
        assert_eq!(locator[0], last.hash());
        assert_eq!(*locator.last().unwrap(), genesis.hash());
    }

    #[test]
    fn test_block_locator_empty_when_no_blocks() {
        let (store, _dir) = temp_store();
        assert!(store.block_locator().unwrap().is_empty());
    }
}
