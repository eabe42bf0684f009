use crate::blob_store::RocksDbBlobStore;
use crate::peer_stub::OfflinePeerClient;
use crate::tombstone_sweeper::TombstoneSweeper;
use crossbeam_channel::{bounded, Receiver, Sender};
use nodecore_block_assembler::BlockAssembler;
use nodecore_block_validator::{BlockValidator, NullMissingTxResolver};
use nodecore_chain_store::BlockchainStore;
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_core::signals::Shutdown;
use nodecore_database::prelude::open_db;
use nodecore_subtree_processor::SubtreeProcessor;
use nodecore_tx_validator::{AcceptAllVerifier, TxValidator};
use nodecore_utxo::{TxMetaStore, UtxoStore};
use std::sync::Arc;

/// Owns every long-lived component of the node. All five pipeline pieces
/// spawn their own worker thread in their own constructor (none implement
/// `nodecore_core::service::Service`), so this struct is a plain bag of
/// `Arc`s rather than something registered with `nodecore_core::core::Core`;
/// dropping it joins every worker thread via their own `Drop` impls.
pub struct Daemon {
    pub subtree_processor: Arc<SubtreeProcessor>,
    pub block_assembler: Arc<BlockAssembler>,
    pub tx_validator: Arc<TxValidator>,
    pub block_validator: Arc<BlockValidator>,
    _tombstone_sweeper: TombstoneSweeper,
    shutdown_tx: Sender<()>,
}

impl Daemon {
    /// Opens the data directory, wires the five components together on top
    /// of it, and returns the daemon alongside the receiving half of its
    /// shutdown channel for the caller to block on.
    pub fn start(config: Config, cache_size: u64) -> NodeResult<(Arc<Daemon>, Receiver<()>)> {
        let data_dir = config.data_dir.clone().ok_or_else(|| NodeError::Configuration("data_dir not set".to_string()))?;
        let db = open_db(&data_dir, true, 512);

        let store = BlockchainStore::new(Arc::clone(&db), cache_size);
        let tx_meta_store = Arc::new(TxMetaStore::new(Arc::clone(&db), cache_size));
        let utxo_store = UtxoStore::new(Arc::clone(&db), cache_size);
        let blob_store = Arc::new(RocksDbBlobStore::new(Arc::clone(&db), cache_size));

        let subtree_processor = Arc::new(SubtreeProcessor::new(config.clone(), blob_store.clone()));

        let block_assembler =
            Arc::new(BlockAssembler::new(config.clone(), Arc::clone(&db), Arc::new(store.clone()), Arc::clone(&subtree_processor)));

        let tx_validator = Arc::new(TxValidator::new(config.clone(), utxo_store, tx_meta_store.clone(), Arc::new(AcceptAllVerifier)));

        let tombstone_sweeper = TombstoneSweeper::start(tx_meta_store.clone(), config.tombstone_ttl_secs, config.tombstone_sweep_interval_secs);

        // Peer transport (header/block fetch over the wire, remote tx
        // resolution) is out of scope here; these stand-ins make every
        // catch-up and missing-tx path fail cleanly instead of silently
        // doing nothing once a real transport is wired in.
        let block_validator = Arc::new(BlockValidator::new(
            config,
            store,
            blob_store,
            tx_meta_store,
            Arc::new(NullMissingTxResolver),
            Arc::new(OfflinePeerClient),
        ));

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let daemon = Arc::new(Daemon {
            subtree_processor,
            block_assembler,
            tx_validator,
            block_validator,
            _tombstone_sweeper: tombstone_sweeper,
            shutdown_tx,
        });
        Ok((daemon, shutdown_rx))
    }
}

impl Shutdown for Daemon {
    fn shutdown(self: &Arc<Self>) {
        let _ = self.shutdown_tx.try_send(());
    }
}
