use nodecore_consensus_core::errors::{NodeError, NodeResult, TxRuleError};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::tx::{OutpointKey, TransactionId, TransactionOutpoint};
use nodecore_consensus_core::utxo::UtxoEntry;
use nodecore_database::prelude::*;
use nodecore_database::registry::StorePrefix;
use parking_lot::Mutex;
use std::sync::Arc;

pub enum SpendOutcome {
    Spent,
    AlreadySpentBySameTx,
}

/// Durable UTXO set. `spend`/`unspend` are linearizable per-outpoint via a
/// per-call lock on the whole store — acceptable since RocksDB itself
/// serializes writes to the same key, and the spec requires only
/// correctness, not per-key lock striping.
#[derive(Clone)]
pub struct UtxoStore {
    db: Arc<DB>,
    entries: CachedDbAccess<OutpointKey, UtxoEntry>,
    /// Per-outpoint reservation: which tx currently holds a spend on it. Set
    /// by `spend`, cleared by `unspend`; doesn't remove the underlying entry
    /// (so unspend can restore it), only masks it from being spent again.
    reservations: CachedDbAccess<OutpointKey, TransactionId>,
    write_lock: Arc<Mutex<()>>,
}

impl UtxoStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self {
            entries: CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::Utxo.as_bytes()),
            reservations: CachedDbAccess::new(Arc::clone(&db), cache_size, StorePrefix::UtxoReservations.as_bytes()),
            write_lock: Arc::new(Mutex::new(())),
            db,
        }
    }

    pub fn get(&self, outpoint: TransactionOutpoint) -> NodeResult<UtxoEntry> {
        self.entries.read(outpoint.into()).map_err(store_err)
    }

    pub fn exists(&self, outpoint: TransactionOutpoint) -> NodeResult<bool> {
        self.entries.has(outpoint.into()).map_err(store_err)
    }

    /// Creates a brand new utxo. Each utxo is created exactly once; a
    /// duplicate create is an error.
    pub fn create(&self, entry: UtxoEntry) -> NodeResult<()> {
        let _guard = self.write_lock.lock();
        let key = OutpointKey::from(entry.outpoint);
        if self.entries.has(key).map_err(store_err)? {
            return Err(NodeError::AlreadyExists(format!("utxo {}", entry.outpoint)));
        }
        self.entries.write(DirectDbWriter::new(&self.db), key, &entry).map_err(store_err)
    }

    /// Atomically reserves `outpoint` for `spending_txid`, per the spec's
    /// UTXO spend protocol: rejects a mismatched utxo-hash, a double spend
    /// by a different tx, or an immature coinbase spend.
    pub fn spend(
        &self,
        outpoint: TransactionOutpoint,
        presented_utxo_hash: Hash,
        spending_txid: TransactionId,
        tip_height: u32,
        coinbase_maturity: u32,
    ) -> NodeResult<SpendOutcome> {
        let _guard = self.write_lock.lock();
        let key = OutpointKey::from(outpoint);
        let entry = self.entries.read(key).map_err(|e| missing_entry(e, outpoint))?;

        if entry.utxo_hash() != presented_utxo_hash {
            return Err(NodeError::InvalidTx(TxRuleError::UtxoHashMismatch(outpoint)));
        }
        if !entry.is_spendable_at(tip_height, coinbase_maturity) {
            return Err(NodeError::InvalidTx(TxRuleError::ImmatureCoinbaseSpend(outpoint)));
        }

        if let Ok(existing) = self.reservations.read(key) {
            if existing == spending_txid {
                return Ok(SpendOutcome::AlreadySpentBySameTx);
            }
            return Err(NodeError::DoubleSpend(presented_utxo_hash));
        }

        self.reservations.write(DirectDbWriter::new(&self.db), key, &spending_txid).map_err(store_err)?;
        Ok(SpendOutcome::Spent)
    }

    /// Reverses a `spend` reservation. Idempotent: unspending an outpoint
    /// with no reservation is a no-op, so the validator's reversal path
    /// never needs to track which spends actually succeeded.
    pub fn unspend(&self, outpoint: TransactionOutpoint) -> NodeResult<()> {
        let _guard = self.write_lock.lock();
        let key = OutpointKey::from(outpoint);
        self.reservations.delete(DirectDbWriter::new(&self.db), key).map_err(store_err)
    }

    /// Deletes a utxo entirely, used once a spend is finalized by block
    /// confirmation (rather than left as a mempool-only reservation).
    pub fn delete(&self, outpoint: TransactionOutpoint) -> NodeResult<()> {
        let _guard = self.write_lock.lock();
        let key = OutpointKey::from(outpoint);
        self.reservations.delete(DirectDbWriter::new(&self.db), key).map_err(store_err)?;
        self.entries.delete(DirectDbWriter::new(&self.db), key).map_err(store_err)
    }
}

fn store_err(e: StoreError) -> NodeError {
    match e {
        StoreError::KeyNotFound(k) => NodeError::NotFound(k.to_string()),
        other => NodeError::Storage(other.to_string()),
    }
}

fn missing_entry(e: StoreError, outpoint: TransactionOutpoint) -> NodeError {
    match e {
        StoreError::KeyNotFound(_) => NodeError::InvalidTx(TxRuleError::MissingUtxoEntry(outpoint)),
        other => NodeError::Storage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::tx::ScriptBytes;

    fn temp_store() -> (UtxoStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(dir.path(), true, 128);
        (UtxoStore::new(db, 1_000), dir)
    }

    fn sample_entry(is_coinbase: bool, block_height: u32) -> UtxoEntry {
        UtxoEntry::new(
            TransactionOutpoint::new(Hash::double_sha256(b"tx"), 0),
            ScriptBytes::from_slice(&[0x76, 0xa9]),
            5_000,
            is_coinbase,
            block_height,
        )
    }

    #[test]
    fn test_create_then_spend_succeeds() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        let outcome = store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender"), 10, 100).unwrap();
        assert!(matches!(outcome, SpendOutcome::Spent));
    }

    #[test]
    fn test_double_spend_by_different_tx_rejected() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender1"), 10, 100).unwrap();
        let err = store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender2"), 10, 100).unwrap_err();
        assert!(matches!(err, NodeError::DoubleSpend(_)));
    }

    #[test]
    fn test_spend_by_same_tx_is_idempotent() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        let spender = Hash::double_sha256(b"spender");
        store.spend(entry.outpoint, entry.utxo_hash(), spender, 10, 100).unwrap();
        let outcome = store.spend(entry.outpoint, entry.utxo_hash(), spender, 10, 100).unwrap();
        assert!(matches!(outcome, SpendOutcome::AlreadySpentBySameTx));
    }

    #[test]
    fn test_immature_coinbase_rejected() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(true, 100);
        store.create(entry.clone()).unwrap();
        let err = store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender"), 150, 100).unwrap_err();
        assert!(matches!(err, NodeError::InvalidTx(TxRuleError::ImmatureCoinbaseSpend(_))));
    }

    #[test]
    fn test_utxo_hash_mismatch_rejected() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        let err = store.spend(entry.outpoint, Hash::double_sha256(b"wrong"), Hash::double_sha256(b"spender"), 10, 100).unwrap_err();
        assert!(matches!(err, NodeError::InvalidTx(TxRuleError::UtxoHashMismatch(_))));
    }

    #[test]
    fn test_unspend_is_idempotent() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        store.unspend(entry.outpoint).unwrap();
        store.unspend(entry.outpoint).unwrap();
    }

    #[test]
    fn test_unspend_allows_respend_by_other_tx() {
        let (store, _dir) = temp_store();
        let entry = sample_entry(false, 0);
        store.create(entry.clone()).unwrap();
        store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender1"), 10, 100).unwrap();
        store.unspend(entry.outpoint).unwrap();
        let outcome = store.spend(entry.outpoint, entry.utxo_hash(), Hash::double_sha256(b"spender2"), 10, 100).unwrap();
        assert!(matches!(outcome, SpendOutcome::Spent));
    }
}
