use crate::bloom::TxidBloomFilter;
use crate::catchup::{self, PeerClient};
use crate::pending::PendingSet;
use crate::subtree_validator::{MissingTxResolver, SubtreeValidator};
use crossbeam_channel::{unbounded, Select, Sender};
use log::{error, warn};
use nodecore_chain_store::{BlockInsertResult, BlockchainStore};
use nodecore_consensus_core::block::Block;
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{BlockRuleError, NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::tx::{TransactionId, Tx};
use nodecore_subtree_processor::SubtreeBlobStore;
use nodecore_utxo::{TxMeta, TxMetaStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const PARENT_WAIT_CAP: Duration = Duration::from_secs(10);

enum Command {
    BlockFound { hash: Hash, origin: Option<String> },
    ValidateBlock { block: Box<Block>, origin: Option<String>, reply: Sender<NodeResult<()>> },
    SetTxMetaMany { records: Vec<TxMeta>, reply: Sender<NodeResult<()>> },
    Exists { hash: Hash, reply: Sender<NodeResult<bool>> },
    SubtreeExists { hash: Hash, reply: Sender<NodeResult<bool>> },
    Shutdown,
}

/// Shared state touched by both the control thread and the background
/// optimistic re-check tasks it spawns; cheap to clone (an `Arc` and a
/// handful of already-`Clone`/`Arc`-backed stores).
struct Inner {
    config: Config,
    store: BlockchainStore,
    subtree_validator: SubtreeValidator,
    tx_meta: Arc<TxMetaStore>,
    peer_client: Arc<dyn PeerClient>,
    pending: PendingSet,
    catchup_pool: rayon::ThreadPool,
    catchup_backlog: Mutex<HashMap<u32, Option<String>>>,
    catchup_sender: Sender<u32>,
}

/// Validates externally-announced blocks, orchestrates subtree validation,
/// and drives catch-up when this node falls behind a peer. One control
/// thread serialises `block_found`/`validate_block` dispatch against the
/// catch-up backlog, mirroring `SubtreeProcessor`'s/`BlockAssembler`'s
/// worker-thread actor shape; optimistic-mode re-checks run on their own
/// spawned thread per block, since the spec explicitly describes that path
/// as a background task racing ahead of persistence.
pub struct BlockValidator {
    sender: Sender<Command>,
    catchup_sender: Sender<u32>,
    handle: Option<JoinHandle<()>>,
}

impl BlockValidator {
    pub fn new(
        config: Config,
        store: BlockchainStore,
        blob_store: Arc<dyn SubtreeBlobStore>,
        tx_meta: Arc<TxMetaStore>,
        resolver: Arc<dyn MissingTxResolver>,
        peer_client: Arc<dyn PeerClient>,
    ) -> Self {
        let catchup_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.resolved_catchup_concurrency())
            .thread_name(|i| format!("block-validator-catchup-{i}"))
            .build()
            .expect("failed to build catch-up thread pool");

        let (sender, command_receiver) = unbounded::<Command>();
        let (catchup_sender, catchup_receiver) = unbounded::<u32>();

        let inner = Arc::new(Inner {
            subtree_validator: SubtreeValidator::new(blob_store, Arc::clone(&tx_meta), resolver),
            config,
            store,
            tx_meta,
            peer_client,
            pending: PendingSet::new(),
            catchup_pool,
            catchup_backlog: Mutex::new(HashMap::new()),
            catchup_sender: catchup_sender.clone(),
        });

        let handle = std::thread::Builder::new()
            .name("block-validator".into())
            .spawn(move || loop {
                let mut select = Select::new();
                let cmd_idx = select.recv(&command_receiver);
                let catchup_idx = select.recv(&catchup_receiver);
                let op = select.select();
                let keep_running = match op.index() {
                    i if i == cmd_idx => match op.recv(&command_receiver) {
                        Ok(cmd) => handle_command(&inner, cmd),
                        Err(_) => false,
                    },
                    i if i == catchup_idx => {
                        if let Ok(peer) = op.recv(&catchup_receiver) {
                            handle_catchup_notification(&inner, peer);
                        }
                        true
                    }
                    _ => unreachable!(),
                };
                if !keep_running {
                    break;
                }
            })
            .expect("failed to spawn block validator worker thread");

        Self { sender, catchup_sender, handle: Some(handle) }
    }

    /// Asynchronous notification that a peer announced `hash`. Fetches and
    /// validates it on the control thread; never blocks the caller.
    pub fn block_found(&self, hash: Hash, origin: Option<String>) {
        let _ = self.sender.send(Command::BlockFound { hash, origin });
    }

    /// Synchronous validation of an already-fetched block.
    pub fn validate_block(&self, block: Block, origin: Option<String>) -> NodeResult<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Command::ValidateBlock { block: Box::new(block), origin, reply: reply_tx }).is_err() {
            return Err(NodeError::Service("block validator worker thread is gone".into()));
        }
        reply_rx.recv().map_err(|_| NodeError::Service("block validator worker thread dropped the reply channel".into()))?
    }

    pub fn set_tx_meta_many(&self, records: Vec<TxMeta>) -> NodeResult<()> {
        self.call(|reply| Command::SetTxMetaMany { records, reply })
    }

    pub fn exists(&self, hash: Hash) -> NodeResult<bool> {
        self.call(|reply| Command::Exists { hash, reply })
    }

    pub fn subtree_exists(&self, hash: Hash) -> NodeResult<bool> {
        self.call(|reply| Command::SubtreeExists { hash, reply })
    }

    fn call<T, F>(&self, build: F) -> NodeResult<T>
    where
        F: FnOnce(Sender<NodeResult<T>>) -> Command,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(build(reply_tx)).is_err() {
            return Err(NodeError::Service("block validator worker thread is gone".into()));
        }
        reply_rx.recv().map_err(|_| NodeError::Service("block validator worker thread dropped the reply channel".into()))?
    }
}

impl Drop for BlockValidator {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        // Wake the select loop if it's currently parked on the catch-up arm.
        let _ = self.catchup_sender.send(0);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_command(inner: &Arc<Inner>, cmd: Command) -> bool {
    match cmd {
        Command::BlockFound { hash, origin } => {
            let peer = peer_id_from_origin(origin.as_deref());
            match inner.peer_client.fetch_block(hash, peer) {
                Ok(block) => {
                    if let Err(err) = validate_block_dispatch(inner, block, origin) {
                        warn!("block_found validation failed for {hash}: {err}");
                    }
                }
                Err(err) => warn!("block_found fetch failed for {hash}: {err}"),
            }
        }
        Command::ValidateBlock { block, origin, reply } => {
            let result = validate_block_dispatch(inner, *block, origin);
            let _ = reply.send(result);
        }
        Command::SetTxMetaMany { records, reply } => {
            let _ = reply.send(inner.tx_meta.set_tx_meta_many(records));
        }
        Command::Exists { hash, reply } => {
            let _ = reply.send(inner.store.exists(hash));
        }
        Command::SubtreeExists { hash, reply } => {
            let _ = reply.send(inner.subtree_validator.subtree_exists(hash));
        }
        Command::Shutdown => return false,
    }
    true
}

fn handle_catchup_notification(inner: &Arc<Inner>, peer: u32) {
    let origin = match inner.catchup_backlog.lock().remove(&peer) {
        Some(origin) => origin,
        None => return,
    };
    let blocks = match catchup::run(&inner.store, inner.peer_client.as_ref(), &inner.catchup_pool, peer) {
        Ok(blocks) => blocks,
        Err(err) => {
            warn!("catch-up walk for peer {peer} failed: {err}");
            return;
        }
    };
    for block in blocks {
        if let Err(err) = validate_block_dispatch(inner, block, origin.clone()) {
            warn!("catch-up validation failed: {err}");
        }
    }
}

fn divert_to_catchup(inner: &Arc<Inner>, peer: u32, origin: Option<String>) {
    inner.catchup_backlog.lock().insert(peer, origin);
    let _ = inner.catchup_sender.send(peer);
}

fn peer_id_from_origin(origin: Option<&str>) -> u32 {
    match origin {
        None => 0,
        Some(s) => {
            let mut hash: u32 = 2_166_136_261;
            for byte in s.bytes() {
                hash ^= byte as u32;
                hash = hash.wrapping_mul(16_777_619);
            }
            hash
        }
    }
}

fn validate_block_dispatch(inner: &Arc<Inner>, block: Block, origin: Option<String>) -> NodeResult<()> {
    let hash = block.hash();
    // Step 1: fast-path duplicate check downgrades to success per the
    // AlreadyExists policy, rather than surfacing an error.
    if inner.store.exists(hash)? {
        return Ok(());
    }

    let first_subtree_root_with_coinbase = match block.subtree_hashes.first() {
        Some(root) => Some(inner.subtree_validator.first_subtree_root_with_coinbase(*root, block.coinbase.id())?),
        None => None,
    };
    check_headers(&block, &inner.config, first_subtree_root_with_coinbase)?;

    let peer = peer_id_from_origin(origin.as_deref());

    // Step 3: unknown parent diverts to catch-up instead of failing.
    if !inner.store.exists(block.header.prev_hash)? {
        divert_to_catchup(inner, peer, origin);
        return Ok(());
    }

    // Step 4: wait for an in-progress sibling validation of our parent.
    if inner.pending.is_pending(block.header.prev_hash) && !inner.pending.wait_until_done(block.header.prev_hash, PARENT_WAIT_CAP) {
        return Err(NodeError::Service(format!("timed out waiting for parent {} to finish validating", block.header.prev_hash)));
    }

    inner.pending.begin(hash);
    let result = run_validation(inner, block, origin, peer);
    inner.pending.end(hash);
    result
}

fn check_headers(block: &Block, config: &Config, first_subtree_root_with_coinbase: Option<Hash>) -> NodeResult<()> {
    if !block.matches_declared_merkle_root(first_subtree_root_with_coinbase) {
        return Err(NodeError::InvalidBlock(BlockRuleError::MerkleRootMismatch {
            header: block.header.merkle_root,
            computed: block.compute_merkle_root(first_subtree_root_with_coinbase),
        }));
    }
    let now = nodecore_core::time::unix_now_secs_u32();
    if block.header.time > now.saturating_add(config.future_time_bound_secs) {
        return Err(NodeError::InvalidBlock(BlockRuleError::TimestampTooFarInFuture));
    }
    if !block.header.meets_target() {
        return Err(NodeError::InvalidBlock(BlockRuleError::InsufficientWork));
    }
    Ok(())
}

fn check_coinbase_height(coinbase: &Tx, expected_height: u32, activation_height: u32) -> NodeResult<()> {
    if expected_height < activation_height {
        return Ok(());
    }
    let Some(input) = coinbase.inputs.first() else {
        return Err(NodeError::InvalidBlock(BlockRuleError::MalformedHeader));
    };
    match extract_bip34_height(&input.unlocking_script) {
        Some(found) if found == expected_height => Ok(()),
        Some(found) => Err(NodeError::InvalidBlock(BlockRuleError::CoinbaseHeightMismatch { expected: expected_height, found })),
        None => Err(NodeError::InvalidBlock(BlockRuleError::CoinbaseHeightMismatch { expected: expected_height, found: 0 })),
    }
}

/// Decodes the minimal-push CScriptNum height BIP34 requires at the start
/// of the coinbase scriptSig: a single push opcode (`<= 4` for any height
/// this chain will reach before block 2^31) followed by its little-endian
/// magnitude bytes.
fn extract_bip34_height(unlocking_script: &[u8]) -> Option<u32> {
    let len = *unlocking_script.first()? as usize;
    if len == 0 || len > 4 || unlocking_script.len() < 1 + len {
        return None;
    }
    let mut value: u32 = 0;
    for (i, byte) in unlocking_script[1..1 + len].iter().enumerate() {
        value |= (*byte as u32) << (8 * i);
    }
    Some(value)
}

fn run_validation(inner: &Arc<Inner>, block: Block, origin: Option<String>, peer: u32) -> NodeResult<()> {
    let legacy_peer = false; // no legacy wire-protocol collaborator is wired in this build
    let optimistic = inner.config.optimistic_mode && !legacy_peer;

    if optimistic {
        let insert = persist(inner, &block, peer)?;
        let inner_bg = Arc::clone(inner);
        let block_bg = block;
        std::thread::spawn(move || {
            let outcome = verify_subtrees(&inner_bg, &block_bg, origin.as_deref()).and_then(|(mined, _filters)| finalize_mined(&inner_bg, &block_bg, insert.id, mined));
            if let Err(err) = outcome {
                warn!("optimistic subtree re-check failed for block {}: {err}, invalidating", block_bg.hash());
                if let Err(invalidate_err) = inner_bg.store.invalidate(block_bg.hash()) {
                    error!("failed to invalidate block {} after optimistic re-check failure: {invalidate_err}", block_bg.hash());
                }
            }
        });
        Ok(())
    } else {
        let (mined, _filters) = verify_subtrees(inner, &block, origin.as_deref())?;
        let insert = persist(inner, &block, peer)?;
        finalize_mined(inner, &block, insert.id, mined)
    }
}

fn verify_subtrees(inner: &Arc<Inner>, block: &Block, origin: Option<&str>) -> NodeResult<(Vec<TransactionId>, Vec<TxidBloomFilter>)> {
    let mut mined = Vec::new();
    let mut filters = Vec::with_capacity(block.subtree_hashes.len());
    let coinbase_id = block.coinbase.id();
    for (index, root) in block.subtree_hashes.iter().enumerate() {
        let expected_coinbase_id = if index == 0 { Some(coinbase_id) } else { None };
        let outcome = inner.subtree_validator.validate_subtree(*root, index, origin, expected_coinbase_id)?;
        mined.extend(outcome.mined_txids);
        filters.push(outcome.filter);
    }
    Ok((mined, filters))
}

fn persist(inner: &Arc<Inner>, block: &Block, peer: u32) -> NodeResult<BlockInsertResult> {
    let parent = inner.store.get_by_hash(block.header.prev_hash)?;
    check_coinbase_height(&block.coinbase, parent.height + 1, inner.config.bip34_activation_height)?;

    let coinbase_bytes = bincode::serialize(&block.coinbase).map_err(|e| NodeError::Processing(format!("coinbase serialization failed: {e}")))?;
    inner.store.store_block(block.header, block.tx_count, block.size_bytes, coinbase_bytes, block.subtree_hashes.clone(), peer, false)
}

fn finalize_mined(inner: &Arc<Inner>, block: &Block, block_id: u64, mined: Vec<TransactionId>) -> NodeResult<()> {
    let coinbase_txid = block.coinbase.id();
    let mut coinbase_meta = TxMeta::new(coinbase_txid, 0, block.coinbase.serialized_size() as u64, Vec::new(), true, block.coinbase.outputs.len() as u32);
    coinbase_meta.block_ids.push(block_id);
    inner.tx_meta.insert(coinbase_meta)?;
    if !mined.is_empty() {
        inner.tx_meta.set_mined_many(&mined, block_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::hash::merkle_root;
    use nodecore_consensus_core::subtree::SubtreeLeaf;
    use nodecore_consensus_core::tx::{ScriptBytes, TransactionOutpoint, TxInput, TxOutput};
    use parking_lot::RwLock;
    use std::thread;
    use std::time::Duration;

    struct InMemoryBlobStore {
        subtrees: RwLock<HashMap<Hash, Vec<SubtreeLeaf>>>,
    }

    impl InMemoryBlobStore {
        fn new() -> Self {
            Self { subtrees: RwLock::new(HashMap::new()) }
        }
        fn put(&self, root: Hash, leaves: Vec<SubtreeLeaf>) {
            self.subtrees.write().insert(root, leaves);
        }
    }

    impl SubtreeBlobStore for InMemoryBlobStore {
        fn load_leaves(&self, root: Hash) -> NodeResult<Vec<SubtreeLeaf>> {
            self.subtrees.read().get(&root).cloned().ok_or_else(|| NodeError::NotFound(format!("subtree {root}")))
        }

        fn save_leaves(&self, root: Hash, leaves: &[SubtreeLeaf]) -> NodeResult<()> {
            self.subtrees.write().insert(root, leaves.to_vec());
            Ok(())
        }
    }

    struct DeadPeer;
    impl PeerClient for DeadPeer {
        fn fetch_headers(&self, _locator: &[Hash], _peer: u32) -> NodeResult<Vec<nodecore_consensus_core::header::BlockHeader>> {
            Err(NodeError::Service("no peer transport wired in this test".into()))
        }
        fn fetch_block(&self, hash: Hash, _peer: u32) -> NodeResult<Block> {
            Err(NodeError::NotFound(format!("block {hash}")))
        }
    }

    fn coinbase_tx() -> Tx {
        Tx::new(
            1,
            vec![TxInput::new(TransactionOutpoint::new(Hash::ZERO, 0xffffffff), ScriptBytes::new(), 0, ScriptBytes::from_slice(&[0x01, 0x01]), 0xffffffff)],
            vec![TxOutput::new(5_000_000_000, ScriptBytes::new())],
            0,
        )
    }

    fn test_db() -> (BlockchainStore, Arc<TxMetaStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = nodecore_database::prelude::open_db(dir.path(), true, 128);
        (BlockchainStore::new(db.clone(), 1_000), Arc::new(TxMetaStore::new(db, 1_000)), dir)
    }

    fn easy_bits() -> u32 {
        0x207fffff
    }

    fn make_validator(store: BlockchainStore, blob: Arc<InMemoryBlobStore>, tx_meta: Arc<TxMetaStore>, optimistic: bool) -> BlockValidator {
        let mut config = Config::default();
        config.optimistic_mode = optimistic;
        config.bip34_activation_height = u32::MAX; // skip BIP34 for these tests' shallow chains
        BlockValidator::new(config, store, blob, tx_meta, Arc::new(NullMissingTxResolver), Arc::new(DeadPeer))
    }

    fn seed_genesis(store: &BlockchainStore) -> Hash {
        let genesis = nodecore_consensus_core::header::BlockHeader::new(1, Hash::ZERO, Hash::ZERO, 0, easy_bits(), 0);
        store.store_block(genesis, 1, 200, vec![], vec![], 0, true).unwrap();
        genesis.hash()
    }

    /// `easy_bits()` is the loosest target this compact-bits encoding can
    /// express (roughly half the 256-bit space), so an exhaustive nonce
    /// search lands on a meeting hash within a handful of tries.
    fn mine(header: &mut nodecore_consensus_core::header::BlockHeader) {
        while !header.meets_target() {
            header.nonce = header.nonce.wrapping_add(1);
        }
    }

    fn child_block(parent_hash: Hash, blob: &InMemoryBlobStore, coinbase: Tx, time: u32) -> Block {
        let coinbase_txid = coinbase.id();
        let leaf = SubtreeLeaf::new(coinbase_txid, 0, coinbase.serialized_size() as u64);
        let root = merkle_root(&[coinbase_txid]);
        blob.put(root, vec![leaf]);
        let mut header = nodecore_consensus_core::header::BlockHeader::new(1, parent_hash, root, time, easy_bits(), 0);
        mine(&mut header);
        Block::new(header, coinbase, vec![root], 1, 200)
    }

    #[test]
    fn test_duplicate_block_downgrades_to_success() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store.clone(), Arc::clone(&blob), tx_meta, false);

        let block = child_block(genesis_hash, &blob, coinbase_tx(), 10);
        validator.validate_block(block.clone(), None).unwrap();
        // Re-submitting the same (now-persisted) block must succeed, not error.
        validator.validate_block(block, None).unwrap();
    }

    #[test]
    fn test_merkle_mismatch_rejected() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store, Arc::clone(&blob), tx_meta, false);

        let mut block = child_block(genesis_hash, &blob, coinbase_tx(), 10);
        block.header.merkle_root = Hash::double_sha256(b"wrong");
        let err = validator.validate_block(block, None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(BlockRuleError::MerkleRootMismatch { .. })));
    }

    #[test]
    fn test_insufficient_work_rejected() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store, Arc::clone(&blob), tx_meta, false);

        let mut block = child_block(genesis_hash, &blob, coinbase_tx(), 10);
        block.header.bits = 0x03000001; // smallest practical target, essentially unmeetable
        let err = validator.validate_block(block, None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(BlockRuleError::InsufficientWork)));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store, Arc::clone(&blob), tx_meta, false);

        let far_future = nodecore_core::time::unix_now_secs_u32() + 100 * 24 * 60 * 60;
        let block = child_block(genesis_hash, &blob, coinbase_tx(), far_future);
        let err = validator.validate_block(block, None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(BlockRuleError::TimestampTooFarInFuture)));
    }

    #[test]
    fn test_unknown_parent_diverts_to_catchup_without_error() {
        let (store, tx_meta, _dir) = test_db();
        let _genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store.clone(), Arc::clone(&blob), tx_meta, false);

        let orphan_parent = Hash::double_sha256(b"unknown-parent");
        let block = child_block(orphan_parent, &blob, coinbase_tx(), 10);
        let hash = block.hash();
        validator.validate_block(block, Some("peer-a".into())).unwrap();
        assert!(!store.exists(hash).unwrap());
    }

    #[test]
    fn test_successful_non_optimistic_validation_persists_and_marks_mined() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store.clone(), Arc::clone(&blob), Arc::clone(&tx_meta), false);

        let block = child_block(genesis_hash, &blob, coinbase_tx(), 10);
        let hash = block.hash();
        let coinbase_txid = block.coinbase.id();
        validator.validate_block(block, None).unwrap();

        assert!(store.exists(hash).unwrap());
        let coinbase_meta = tx_meta.get(coinbase_txid).unwrap();
        assert!(coinbase_meta.is_coinbase);
        assert!(!coinbase_meta.block_ids.is_empty());
    }

    #[test]
    fn test_optimistic_validation_persists_then_finalizes_in_background() {
        let (store, tx_meta, _dir) = test_db();
        let genesis_hash = seed_genesis(&store);
        let blob = Arc::new(InMemoryBlobStore::new());
        let validator = make_validator(store.clone(), Arc::clone(&blob), Arc::clone(&tx_meta), true);

        let block = child_block(genesis_hash, &blob, coinbase_tx(), 10);
        let hash = block.hash();
        let coinbase_txid = block.coinbase.id();
        validator.validate_block(block, None).unwrap();

        // Persistence is synchronous even in optimistic mode.
        assert!(store.exists(hash).unwrap());

        // Give the spawned background re-check a moment to finish.
        let mut found = false;
        for _ in 0..50 {
            if tx_meta.exists(coinbase_txid).unwrap() {
                found = true;
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(found, "background subtree re-check did not finalize the coinbase tx-meta in time");
    }
}
