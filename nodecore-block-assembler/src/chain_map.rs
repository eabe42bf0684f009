use nodecore_chain_store::BlockchainStore;
use nodecore_consensus_core::errors::NodeResult;
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::node::BlockNode;
use parking_lot::RwLock;
use std::collections::VecDeque;

/// The active chain's recent hashes, newest first, bounded to `max_rollback +
/// 1` entries. Readers (mining-candidate construction never needs this, but
/// reorg-diffing does) take the shared lock; the control thread is the sole
/// writer, rebuilding or incrementally sliding the window on every tip
/// change — the reader-many/writer-one resource the design calls for.
pub struct ChainMap {
    hashes: RwLock<VecDeque<Hash>>,
    depth: usize,
}

impl ChainMap {
    pub fn new(depth: usize) -> Self {
        Self { hashes: RwLock::new(VecDeque::new()), depth }
    }

    /// Snapshot of the tracked hashes, newest first.
    pub fn snapshot(&self) -> Vec<Hash> {
        self.hashes.read().iter().copied().collect()
    }

    /// Pushes a new tip onto the front, evicting the oldest entry past `depth`.
    pub fn push_front(&self, hash: Hash) {
        let mut guard = self.hashes.write();
        guard.push_front(hash);
        guard.truncate(self.depth);
    }

    /// Rebuilds the window from `tip`, walking parent links back through the store.
    pub fn rebuild(&self, store: &BlockchainStore, tip: &BlockNode) -> NodeResult<()> {
        let mut walked = VecDeque::with_capacity(self.depth);
        walked.push_back(tip.hash());
        let mut current = tip.clone();
        while walked.len() < self.depth && !current.is_genesis() {
            current = store.get_by_id(current.parent_id)?;
            walked.push_back(current.hash());
        }
        *self.hashes.write() = walked;
        Ok(())
    }
}
