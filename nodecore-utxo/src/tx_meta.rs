use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::tx::TransactionId;
use nodecore_database::prelude::*;
use nodecore_database::registry::StorePrefix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Derived metadata keyed by txid. Created on successful validation,
/// mutated only by appending block-ids when the tx is mined, deleted when
/// tombstoned (all outputs spent and an expiration elapses — the expiration
/// itself is enforced by the caller, not this store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxMeta {
    pub txid: TransactionId,
    pub fee: u64,
    pub size_bytes: u64,
    pub parent_txids: Vec<TransactionId>,
    pub block_ids: Vec<u64>,
    pub is_coinbase: bool,
    pub spent_outputs: u32,
    pub total_outputs: u32,
    /// Unix time the tx first became tombstone-eligible, set once and never
    /// cleared — a later reorg that empties `block_ids` again does not reset
    /// the TTL clock.
    pub tombstone_eligible_since: Option<u32>,
}

impl TxMeta {
    pub fn new(txid: TransactionId, fee: u64, size_bytes: u64, parent_txids: Vec<TransactionId>, is_coinbase: bool, total_outputs: u32) -> Self {
        Self { txid, fee, size_bytes, parent_txids, block_ids: Vec::new(), is_coinbase, spent_outputs: 0, total_outputs, tombstone_eligible_since: None }
    }

    /// A tx is eligible for tombstoning only once every output has been
    /// spent; a tx that has been mined into any block is never tombstoned,
    /// per the lifecycle rule that block membership is permanent record
    /// (Open Question (ii): a non-empty `block_ids` disables tombstoning
    /// outright, reorgs included).
    pub fn is_tombstone_eligible(&self) -> bool {
        self.block_ids.is_empty() && self.spent_outputs >= self.total_outputs
    }

    /// Whether the tx's tombstone TTL has elapsed as of `now`, given the
    /// time it first became eligible.
    pub fn is_tombstone_expired(&self, now: u32, ttl_secs: u32) -> bool {
        match self.tombstone_eligible_since {
            Some(since) => self.is_tombstone_eligible() && now.saturating_sub(since) >= ttl_secs,
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct TxMetaStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, TxMeta>,
}

impl TxMetaStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self { access: CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::TxMeta.as_bytes()), db }
    }

    pub fn exists(&self, txid: TransactionId) -> NodeResult<bool> {
        self.access.has(txid).map_err(store_err)
    }

    pub fn get(&self, txid: TransactionId) -> NodeResult<TxMeta> {
        self.access.read(txid).map_err(store_err)
    }

    pub fn insert(&self, meta: TxMeta) -> NodeResult<()> {
        self.access.write(DirectDbWriter::new(&self.db), meta.txid, &meta).map_err(store_err)
    }

    /// Reverses a successful-but-not-yet-handed-off validation, per the
    /// idempotent reversal-on-failure path.
    pub fn remove(&self, txid: TransactionId) -> NodeResult<()> {
        self.access.delete(DirectDbWriter::new(&self.db), txid).map_err(store_err)
    }

    /// Batched mined-marking used when a block is confirmed: appends
    /// `block_id` to every listed txid's `block_ids`.
    pub fn set_mined_many(&self, txids: &[TransactionId], block_id: u64) -> NodeResult<()> {
        for &txid in txids {
            let mut meta = self.access.read(txid).map_err(store_err)?;
            if !meta.block_ids.contains(&block_id) {
                meta.block_ids.push(block_id);
            }
            self.access.write(DirectDbWriter::new(&self.db), txid, &meta).map_err(store_err)?;
        }
        Ok(())
    }

    /// Batched tx-meta ingestion, used primarily during catch-up.
    pub fn set_tx_meta_many(&self, records: Vec<TxMeta>) -> NodeResult<()> {
        let mut batch = rocksdb::WriteBatch::default();
        for meta in records {
            self.access.write(BatchDbWriter::new(&mut batch), meta.txid, &meta).map_err(store_err)?;
        }
        self.db.write(batch).map_err(|e| NodeError::Storage(e.to_string()))
    }

    /// Marks one more output of the producing tx as spent, stamping
    /// `tombstone_eligible_since` the moment every output has been.
    pub fn record_spend(&self, txid: TransactionId, now: u32) -> NodeResult<()> {
        let mut meta = self.access.read(txid).map_err(store_err)?;
        meta.spent_outputs += 1;
        if meta.is_tombstone_eligible() && meta.tombstone_eligible_since.is_none() {
            meta.tombstone_eligible_since = Some(now);
        }
        self.access.write(DirectDbWriter::new(&self.db), txid, &meta).map_err(store_err)
    }

    /// Reverses a [`TxMetaStore::record_spend`] on validation rollback.
    pub fn record_unspend(&self, txid: TransactionId) -> NodeResult<()> {
        let mut meta = self.access.read(txid).map_err(store_err)?;
        meta.spent_outputs = meta.spent_outputs.saturating_sub(1);
        if !meta.is_tombstone_eligible() {
            meta.tombstone_eligible_since = None;
        }
        self.access.write(DirectDbWriter::new(&self.db), txid, &meta).map_err(store_err)
    }

    /// Deletes every record whose tombstone TTL has elapsed as of `now`.
    /// Returns the number of records removed. Run periodically by the
    /// daemon, not on any hot path.
    pub fn sweep_tombstoned(&self, now: u32, ttl_secs: u32) -> NodeResult<usize> {
        let expired: Vec<TransactionId> = self
            .access
            .iterator()
            .map(|item| item.expect("tx-meta iterator read error"))
            .filter(|(_, meta)| meta.is_tombstone_expired(now, ttl_secs))
            .map(|(_, meta)| meta.txid)
            .collect();
        let count = expired.len();
        self.access.delete_many(DirectDbWriter::new(&self.db), expired).map_err(store_err)?;
        Ok(count)
    }
}

fn store_err(e: StoreError) -> NodeError {
    match e {
        StoreError::KeyNotFound(k) => NodeError::NotFound(k.to_string()),
        other => NodeError::Storage(other.to_string()),
    }
}
