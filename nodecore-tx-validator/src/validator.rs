use crate::isolation::validate_in_isolation;
use crate::script::ScriptVerifier;
use crate::utxo_context::{compute_fee, validate_in_utxo_context};
use log::{debug, warn};
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::tx::{Tx, TransactionOutpoint};
use nodecore_consensus_core::utxo::UtxoEntry;
use nodecore_utxo::{SpendOutcome, TxMeta, TxMetaStore, UtxoStore};
use std::sync::Arc;

/// The hand-off seam to the Subtree Processor (kept as a trait so this crate
/// has no dependency on it — `nodecore-subtree-processor` depends on
/// `nodecore-tx-validator`, not the reverse, per the component dependency order).
pub trait TxHandoff: Send + Sync {
    fn submit(&self, txid: nodecore_consensus_core::tx::TransactionId, fee: u64, size: u64) -> bool;
}

/// Validates a single transaction end to end: isolated rule checks,
/// UTXO-context checks, the atomic spend protocol (with full reversal on
/// any downstream failure), and tx-meta registration.
pub struct TxValidator {
    config: Config,
    utxo_store: UtxoStore,
    tx_meta_store: TxMetaStore,
    verifier: Arc<dyn ScriptVerifier>,
}

impl TxValidator {
    pub fn new(config: Config, utxo_store: UtxoStore, tx_meta_store: TxMetaStore, verifier: Arc<dyn ScriptVerifier>) -> Self {
        Self { config, utxo_store, tx_meta_store, verifier }
    }

    pub fn validate(&self, tx: &Tx, at_block_height: u32, handoff: &dyn TxHandoff) -> NodeResult<()> {
        let txid = tx.id();

        // Idempotence: a tx-meta record already existing means a prior call
        // already validated and handed this tx off.
        if self.tx_meta_store.exists(txid)? {
            debug!("tx {txid} already has tx-meta, skipping re-validation");
            return Ok(());
        }

        validate_in_isolation(tx, &self.config)?;
        validate_in_utxo_context(tx, &self.config, at_block_height, self.verifier.as_ref())?;

        let mut spent: Vec<TransactionOutpoint> = Vec::with_capacity(tx.inputs.len());
        let spend_result = self.spend_all_inputs(tx, at_block_height, &mut spent);
        if let Err(err) = spend_result {
            self.unspend_all(&spent);
            return Err(err);
        }

        let created_result = self.create_outputs(tx, at_block_height);
        if let Err(err) = created_result {
            self.unspend_all(&spent);
            return Err(err);
        }

        let fee = compute_fee(tx);
        let size = tx.serialized_size() as u64;
        let parent_txids = tx.inputs.iter().map(|i| i.previous_outpoint.txid).collect();
        let meta = TxMeta::new(txid, fee, size, parent_txids, tx.is_coinbase(), tx.outputs.len() as u32);
        if let Err(err) = self.tx_meta_store.insert(meta) {
            self.delete_outputs(tx);
            self.unspend_all(&spent);
            return Err(err);
        }

        if !handoff.submit(txid, fee, size) {
            warn!("hand-off failed for tx {txid}, reversing");
            let _ = self.tx_meta_store.remove(txid);
            self.delete_outputs(tx);
            self.unspend_all(&spent);
            return Err(NodeError::Processing(format!("hand-off failed for tx {txid}")));
        }

        Ok(())
    }

    fn spend_all_inputs(&self, tx: &Tx, at_block_height: u32, spent: &mut Vec<TransactionOutpoint>) -> NodeResult<()> {
        if tx.is_coinbase() {
            return Ok(());
        }
        for input in &tx.inputs {
            let utxo_hash = nodecore_consensus_core::utxo::compute_utxo_hash(
                input.previous_outpoint.txid,
                input.previous_outpoint.vout,
                &input.previous_script,
                input.previous_satoshis,
            );
            match self.utxo_store.spend(input.previous_outpoint, utxo_hash, tx.id(), at_block_height, self.config.coinbase_maturity) {
                Ok(SpendOutcome::Spent) => {
                    spent.push(input.previous_outpoint);
                    // Best-effort: the producing tx may have no tx-meta of
                    // its own (pruned, or predates this node's history).
                    let now = nodecore_core::time::unix_now_secs_u32();
                    let _ = self.tx_meta_store.record_spend(input.previous_outpoint.txid, now);
                }
                Ok(SpendOutcome::AlreadySpentBySameTx) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn unspend_all(&self, spent: &[TransactionOutpoint]) {
        for outpoint in spent {
            let _ = self.utxo_store.unspend(*outpoint);
            let _ = self.tx_meta_store.record_unspend(outpoint.txid);
        }
    }

    fn create_outputs(&self, tx: &Tx, at_block_height: u32) -> NodeResult<()> {
        let txid = tx.id();
        for (vout, output) in tx.outputs.iter().enumerate() {
            let entry = UtxoEntry::new(
                TransactionOutpoint::new(txid, vout as u32),
                output.locking_script.clone(),
                output.satoshis,
                tx.is_coinbase(),
                at_block_height,
            );
            self.utxo_store.create(entry)?;
        }
        Ok(())
    }

    fn delete_outputs(&self, tx: &Tx) {
        let txid = tx.id();
        for vout in 0..tx.outputs.len() {
            let _ = self.utxo_store.delete(TransactionOutpoint::new(txid, vout as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::AcceptAllVerifier;
    use nodecore_consensus_core::hash::Hash;
    use nodecore_consensus_core::tx::{ScriptBytes, TxInput, TxOutput};
    use nodecore_database::prelude::open_db;
    use std::sync::Mutex;

    struct RecordingHandoff {
        accept: bool,
        submitted: Mutex<Vec<nodecore_consensus_core::tx::TransactionId>>,
    }

    impl TxHandoff for RecordingHandoff {
        fn submit(&self, txid: nodecore_consensus_core::tx::TransactionId, _fee: u64, _size: u64) -> bool {
            self.submitted.lock().unwrap().push(txid);
            self.accept
        }
    }

    fn harness() -> (TxValidator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(dir.path(), true, 128);
        let utxo_store = UtxoStore::new(db.clone(), 1_000);
        let tx_meta_store = TxMetaStore::new(db, 1_000);
        let validator = TxValidator::new(Config::default(), utxo_store, tx_meta_store, Arc::new(AcceptAllVerifier));
        (validator, dir)
    }

    fn funded_tx(validator: &TxValidator, fee: u64) -> Tx {
        let prev_txid = Hash::double_sha256(b"funding");
        let locking_script = ScriptBytes::from_slice(&[0x76, 0xa9]);
        let entry = UtxoEntry::new(TransactionOutpoint::new(prev_txid, 0), locking_script.clone(), 10_000, false, 0);
        validator.utxo_store.create(entry.clone()).unwrap();
        Tx::new(
            1,
            vec![TxInput::new(
                entry.outpoint,
                locking_script,
                10_000,
                ScriptBytes::from_slice(&[0x51]),
                0xffffffff,
            )],
            vec![TxOutput::new(10_000 - fee, ScriptBytes::from_slice(&[0x76, 0xa9]))],
            0,
        )
    }

    #[test]
    fn test_validate_success_reserves_inputs_and_creates_outputs() {
        let (validator, _dir) = harness();
        let tx = funded_tx(&validator, 100);
        let handoff = RecordingHandoff { accept: true, submitted: Mutex::new(vec![]) };
        validator.validate(&tx, 10, &handoff).unwrap();
        assert!(validator.tx_meta_store.exists(tx.id()).unwrap());
        assert!(validator.utxo_store.exists(TransactionOutpoint::new(tx.id(), 0)).unwrap());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let (validator, _dir) = harness();
        let tx = funded_tx(&validator, 100);
        let handoff = RecordingHandoff { accept: true, submitted: Mutex::new(vec![]) };
        validator.validate(&tx, 10, &handoff).unwrap();
        validator.validate(&tx, 10, &handoff).unwrap();
        assert_eq!(handoff.submitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handoff_failure_reverses_everything() {
        let (validator, _dir) = harness();
        let tx = funded_tx(&validator, 100);
        let handoff = RecordingHandoff { accept: false, submitted: Mutex::new(vec![]) };
        let err = validator.validate(&tx, 10, &handoff).unwrap_err();
        assert!(matches!(err, NodeError::Processing(_)));
        assert!(!validator.tx_meta_store.exists(tx.id()).unwrap());
        assert!(!validator.utxo_store.exists(TransactionOutpoint::new(tx.id(), 0)).unwrap());
        // Input should be unspent again, i.e. spendable by a different tx now.
        let original_input = &tx.inputs[0];
        let outcome = validator
            .utxo_store
            .spend(
                original_input.previous_outpoint,
                nodecore_consensus_core::utxo::compute_utxo_hash(
                    original_input.previous_outpoint.txid,
                    original_input.previous_outpoint.vout,
                    &original_input.previous_script,
                    original_input.previous_satoshis,
                ),
                Hash::double_sha256(b"other-spender"),
                10,
                100,
            )
            .unwrap();
        assert!(matches!(outcome, SpendOutcome::Spent));
    }

    #[test]
    fn test_validate_records_spend_against_producing_tx_meta() {
        let (validator, _dir) = harness();
        let prev_txid = Hash::double_sha256(b"funding");
        validator.tx_meta_store.insert(TxMeta::new(prev_txid, 0, 0, vec![], false, 1)).unwrap();
        let tx = funded_tx(&validator, 100);
        let handoff = RecordingHandoff { accept: true, submitted: Mutex::new(vec![]) };
        validator.validate(&tx, 10, &handoff).unwrap();
        let prev_meta = validator.tx_meta_store.get(prev_txid).unwrap();
        assert_eq!(prev_meta.spent_outputs, 1);
        assert!(prev_meta.tombstone_eligible_since.is_some());
    }

    #[test]
    fn test_handoff_failure_reverses_producing_tx_meta_spend() {
        let (validator, _dir) = harness();
        let prev_txid = Hash::double_sha256(b"funding");
        validator.tx_meta_store.insert(TxMeta::new(prev_txid, 0, 0, vec![], false, 1)).unwrap();
        let tx = funded_tx(&validator, 100);
        let handoff = RecordingHandoff { accept: false, submitted: Mutex::new(vec![]) };
        validator.validate(&tx, 10, &handoff).unwrap_err();
        let prev_meta = validator.tx_meta_store.get(prev_txid).unwrap();
        assert_eq!(prev_meta.spent_outputs, 0);
        assert!(prev_meta.tombstone_eligible_since.is_none());
    }

    #[test]
    fn test_fee_too_low_rejected_before_any_spend() {
        let (validator, _dir) = harness();
        let tx = funded_tx(&validator, 0);
        let handoff = RecordingHandoff { accept: true, submitted: Mutex::new(vec![]) };
        let err = validator.validate(&tx, 10, &handoff).unwrap_err();
        assert!(matches!(err, NodeError::InvalidTx(_)));
    }
}
