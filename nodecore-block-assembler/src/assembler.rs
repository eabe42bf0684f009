use crate::candidate::{build_candidate, MiningCandidate};
use crate::chain_map::ChainMap;
use crossbeam_channel::{unbounded, Sender};
use log::{error, info, warn};
use nodecore_chain_store::BlockchainStore;
use nodecore_consensus_core::block::Block;
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::header::BlockHeader;
use nodecore_consensus_core::node::BlockNode;
use nodecore_core::time::unix_now_secs_u32;
use nodecore_database::prelude::*;
use nodecore_database::registry::state_keys;
use nodecore_consensus_core::subtree::Subtree;
use nodecore_subtree_processor::{find_common_ancestor_split, SubtreeProcessor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Persisted best-tip checkpoint: `height(u32 LE) ∥ header_bytes(80)` on the
/// wire; stored internally via bincode like every other singleton state key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedTip {
    height: u32,
    header: BlockHeader,
}

enum Command {
    TipChanged,
    GetMiningCandidate { reply: Sender<NodeResult<(MiningCandidate, Vec<Subtree>)>> },
    CurrentBlock { reply: Sender<Option<(BlockHeader, u32)>> },
    Shutdown,
}

/// Owns the current chain tip, produces mining candidates from the subtree
/// processor's snapshot, and drives the subtree processor through tip
/// changes. A single control thread serialises mining-candidate requests
/// against tip notifications, per the design's mutual-exclusion requirement —
/// the same single-consumer worker-thread shape used by
/// [`nodecore_subtree_processor::SubtreeProcessor`].
pub struct BlockAssembler {
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

struct Worker {
    config: Config,
    store: Arc<BlockchainStore>,
    subtree_processor: Arc<SubtreeProcessor>,
    tip_item: CachedDbItem<PersistedTip>,
    db: Arc<DB>,
    chain_map: ChainMap,
    current_tip: Option<BlockNode>,
}

impl BlockAssembler {
    pub fn new(config: Config, db: Arc<DB>, store: Arc<BlockchainStore>, subtree_processor: Arc<SubtreeProcessor>) -> Self {
        let (sender, receiver) = unbounded::<Command>();
        let depth = config.max_rollback as usize + 1;

        let handle = std::thread::Builder::new()
            .name("block-assembler".into())
            .spawn(move || {
                let mut worker = Worker {
                    tip_item: CachedDbItem::new(Arc::clone(&db), state_keys::BLOCK_ASSEMBLER_TIP),
                    db,
                    chain_map: ChainMap::new(depth),
                    current_tip: None,
                    config,
                    store,
                    subtree_processor,
                };
                worker.bootstrap();
                while let Ok(cmd) = receiver.recv() {
                    match cmd {
                        Command::TipChanged => {
                            if let Err(err) = worker.reconcile() {
                                error!("block assembler failed to reconcile tip: {err}");
                            }
                        }
                        Command::GetMiningCandidate { reply } => {
                            let _ = reply.send(worker.mining_candidate());
                        }
                        Command::CurrentBlock { reply } => {
                            let _ = reply.send(worker.current_tip.as_ref().map(|n| (n.header, n.height)));
                        }
                        Command::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn block assembler worker thread");

        Self { sender, handle: Some(handle) }
    }

    /// Notifies the assembler that the blockchain store's best tip may have
    /// changed; it reconciles by re-reading `store.best_tip_node()`. Fire and
    /// forget: ordering is preserved by the single control thread, and the
    /// caller doesn't need the reconciliation's outcome to proceed.
    pub fn on_tip_changed(&self) {
        let _ = self.sender.send(Command::TipChanged);
    }

    pub fn current_block(&self) -> Option<(BlockHeader, u32)> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Command::CurrentBlock { reply: reply_tx }).is_err() {
            return None;
        }
        reply_rx.recv().ok().flatten()
    }

    pub fn get_mining_candidate(&self) -> NodeResult<(MiningCandidate, Vec<Subtree>)> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Command::GetMiningCandidate { reply: reply_tx }).is_err() {
            return Err(NodeError::Service("block assembler worker thread is gone".into()));
        }
        reply_rx.recv().map_err(|_| NodeError::Service("block assembler worker thread dropped the reply channel".into()))?
    }
}

impl Drop for BlockAssembler {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Worker {
    /// Adopts whatever tip the store already has at startup, restoring the
    /// in-memory chain map without driving the subtree processor through any
    /// synthetic move-up/move-down (the persisted tip recorded here is purely
    /// advisory; the store's best tip is always authoritative).
    fn bootstrap(&mut self) {
        match self.store.best_tip_node() {
            Ok(Some(tip)) => {
                if let Err(err) = self.chain_map.rebuild(&self.store, &tip) {
                    warn!("block assembler failed to rebuild chain map at startup: {err}");
                }
                self.current_tip = Some(tip);
            }
            Ok(None) => info!("block assembler starting with no chain tip yet"),
            Err(err) => warn!("block assembler failed to read best tip at startup: {err}"),
        }
    }

    fn mining_candidate(&self) -> NodeResult<(MiningCandidate, Vec<Subtree>)> {
        let subtrees = self.subtree_processor.get_completed_subtrees_for_mining_candidate();
        let (prev_hash, next_height) = match &self.current_tip {
            Some(tip) => (tip.hash(), tip.height + 1),
            None => (Hash::ZERO, 0),
        };
        let now = unix_now_secs_u32();
        let candidate = build_candidate(&subtrees, prev_hash, next_height, self.config.fallback_bits, 1, now);
        Ok((candidate, subtrees))
    }

    /// Reconciles the assembler's view of the tip with the store's current
    /// best tip: a no-op if unchanged, a `move_up` if the new tip directly
    /// extends the old one, otherwise a `reorg` computed from the two
    /// chains' recent history. Persists the new tip only after the subtree
    /// processor has successfully applied the change.
    fn reconcile(&mut self) -> NodeResult<()> {
        let new_tip = match self.store.best_tip_node()? {
            Some(tip) => tip,
            None => return Ok(()),
        };

        let Some(current) = self.current_tip.clone() else {
            self.adopt(new_tip)?;
            return Ok(());
        };

        if new_tip.hash() == current.hash() {
            return Ok(());
        }

        if new_tip.header.prev_hash == current.hash() {
            let block = reconstruct_block(&new_tip)?;
            self.subtree_processor.move_up(block)?;
            self.chain_map.push_front(new_tip.hash());
            self.current_tip = Some(new_tip.clone());
            self.persist(&new_tip)?;
            return Ok(());
        }

        self.apply_reorg(new_tip)
    }

    fn apply_reorg(&mut self, new_tip: BlockNode) -> NodeResult<()> {
        let current_hashes = self.chain_map.snapshot();
        let depth = self.config.max_rollback as usize + 1;
        let new_hashes = walk_newest_first(&self.store, &new_tip, depth)?;

        let (down_idx, up_idx) = find_common_ancestor_split(&current_hashes, &new_hashes, self.config.max_rollback)?;

        let mut move_down = Vec::with_capacity(down_idx);
        for hash in &current_hashes[..down_idx] {
            move_down.push(reconstruct_block(&self.store.get_by_hash(*hash)?)?);
        }

        let mut move_up = Vec::with_capacity(up_idx);
        for hash in new_hashes[..up_idx].iter().rev() {
            move_up.push(reconstruct_block(&self.store.get_by_hash(*hash)?)?);
        }

        self.subtree_processor.reorg(move_down, move_up)?;
        self.chain_map.rebuild(&self.store, &new_tip)?;
        self.current_tip = Some(new_tip.clone());
        self.persist(&new_tip)?;
        warn!("block assembler reorged to new tip {} at height {}", new_tip.hash(), new_tip.height);
        Ok(())
    }

    fn adopt(&mut self, tip: BlockNode) -> NodeResult<()> {
        self.chain_map.rebuild(&self.store, &tip)?;
        self.current_tip = Some(tip.clone());
        self.persist(&tip)
    }

    fn persist(&self, tip: &BlockNode) -> NodeResult<()> {
        let record = PersistedTip { height: tip.height, header: tip.header };
        self.tip_item.write(DirectDbWriter::new(&self.db), &record).map_err(|e| NodeError::Storage(e.to_string()))
    }
}

/// Walks back from `tip` via parent-id, collecting up to `limit` hashes
/// newest-first, used to build the new chain's side of a reorg diff.
fn walk_newest_first(store: &BlockchainStore, tip: &BlockNode, limit: usize) -> NodeResult<Vec<Hash>> {
    let mut hashes = Vec::with_capacity(limit.max(1));
    hashes.push(tip.hash());
    let mut current = tip.clone();
    while hashes.len() < limit.max(1) && !current.is_genesis() {
        current = store.get_by_id(current.parent_id)?;
        hashes.push(current.hash());
    }
    Ok(hashes)
}

fn reconstruct_block(node: &BlockNode) -> NodeResult<Block> {
    let coinbase = bincode::deserialize(&node.coinbase_bytes).map_err(|e| NodeError::Storage(format!("corrupt coinbase bytes for block {}: {e}", node.hash())))?;
    Ok(Block::new(node.header, coinbase, node.subtree_hashes.clone(), node.tx_count, node.size_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::tx::{ScriptBytes, Tx, TransactionOutpoint, TxInput, TxOutput};
    use nodecore_database::prelude::open_db;
    use parking_lot::RwLock as PlRwLock;
    use std::collections::HashMap;
    use std::thread::sleep;
    use std::time::Duration;

    #[derive(Default)]
    struct InMemoryBlobStore {
        subtrees: PlRwLock<HashMap<Hash, Vec<nodecore_consensus_core::subtree::SubtreeLeaf>>>,
    }

    impl nodecore_subtree_processor::SubtreeBlobStore for InMemoryBlobStore {
        fn load_leaves(&self, root: Hash) -> NodeResult<Vec<nodecore_consensus_core::subtree::SubtreeLeaf>> {
            self.subtrees.read().get(&root).cloned().ok_or_else(|| NodeError::NotFound(format!("subtree {root}")))
        }

        fn save_leaves(&self, root: Hash, leaves: &[nodecore_consensus_core::subtree::SubtreeLeaf]) -> NodeResult<()> {
            self.subtrees.write().insert(root, leaves.to_vec());
            Ok(())
        }
    }

    fn coinbase_tx() -> Tx {
        Tx::new(
            1,
            vec![TxInput::new(TransactionOutpoint::new(Hash::ZERO, 0xffffffff), ScriptBytes::new(), 0, ScriptBytes::from_slice(&[0x03]), 0xffffffff)],
            vec![TxOutput::new(5_000_000_000, ScriptBytes::new())],
            0,
        )
    }

    fn header(prev: Hash, merkle: Hash, nonce: u32) -> BlockHeader {
        BlockHeader::new(1, prev, merkle, 1_700_000_000, 0x1d00ffff, nonce)
    }

    fn harness() -> (BlockAssembler, Arc<BlockchainStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(dir.path(), true, 128);
        let store = Arc::new(BlockchainStore::new(Arc::clone(&db), 1_000));
        let blob = Arc::new(InMemoryBlobStore::default());
        let mut config = Config::default();
        config.subtree_capacity = 4;
        let subtree_processor = Arc::new(SubtreeProcessor::new(config.clone(), blob));
        let assembler = BlockAssembler::new(config, db, Arc::clone(&store), subtree_processor);
        (assembler, store, dir)
    }

    #[test]
    fn test_bootstrap_with_no_blocks_has_no_current_tip() {
        let (assembler, _store, _dir) = harness();
        assert!(assembler.current_block().is_none());
    }

    #[test]
    fn test_tip_changed_after_genesis_insert_adopts_it() {
        let (assembler, store, _dir) = harness();
        let genesis = header(Hash::ZERO, Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 0, true).unwrap();

        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));

        let (current_header, height) = assembler.current_block().unwrap();
        assert_eq!(current_header.hash(), genesis.hash());
        assert_eq!(height, 0);
    }

    #[test]
    fn test_get_mining_candidate_reflects_empty_subtree_state() {
        let (assembler, _store, _dir) = harness();
        let (candidate, subtrees) = assembler.get_mining_candidate().unwrap();
        assert_eq!(subtrees.len(), 1);
        assert_eq!(candidate.height, 0);
        assert_eq!(candidate.coinbase_value, subsidy_for_test());
    }

    fn subsidy_for_test() -> u64 {
        nodecore_consensus_core::constants::subsidy(0)
    }

    #[test]
    fn test_move_up_on_direct_extension() {
        let (assembler, store, _dir) = harness();
        let genesis = header(Hash::ZERO, Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 0, true).unwrap();
        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));

        let child = header(genesis.hash(), Hash::ZERO, 1);
        store.store_block(child, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 0, false).unwrap();
        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));

        let (current_header, height) = assembler.current_block().unwrap();
        assert_eq!(current_header.hash(), child.hash());
        assert_eq!(height, 1);
    }

    #[test]
    fn test_reorg_to_heavier_competing_chain() {
        let (assembler, store, _dir) = harness();
        let genesis = header(Hash::ZERO, Hash::ZERO, 0);
        store.store_block(genesis, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 0, true).unwrap();
        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));

        let branch_a = header(genesis.hash(), Hash::ZERO, 1);
        store.store_block(branch_a, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 0, false).unwrap();
        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));
        assert_eq!(assembler.current_block().unwrap().0.hash(), branch_a.hash());

        let branch_b1 = header(genesis.hash(), Hash::ZERO, 2);
        store.store_block(branch_b1, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 1, false).unwrap();
        let branch_b2 = header(branch_b1.hash(), Hash::ZERO, 3);
        let result = store.store_block(branch_b2, 1, 200, bincode::serialize(&coinbase_tx()).unwrap(), vec![], 1, false).unwrap();
        assert!(result.became_best_tip);

        assembler.on_tip_changed();
        sleep(Duration::from_millis(50));

        let (current_header, height) = assembler.current_block().unwrap();
        assert_eq!(current_header.hash(), branch_b2.hash());
        assert_eq!(height, 2);
    }
}
