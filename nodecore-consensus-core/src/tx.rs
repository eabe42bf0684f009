use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type TransactionId = Hash;

/// Locator for a transaction output: the transaction that created it plus its
/// output index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub txid: TransactionId,
    pub vout: u32,
}

impl TransactionOutpoint {
    pub fn new(txid: TransactionId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

/// Fixed-layout key form of a [`TransactionOutpoint`] (txid ∥ vout, big-endian
/// vout so lexicographic DB ordering matches index order), used wherever a
/// `Copy + AsRef<[u8]>` key is required, e.g. the UTXO store's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutpointKey([u8; 36]);

impl From<TransactionOutpoint> for OutpointKey {
    fn from(outpoint: TransactionOutpoint) -> Self {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(outpoint.txid.as_bytes());
        bytes[32..].copy_from_slice(&outpoint.vout.to_be_bytes());
        Self(bytes)
    }
}

impl AsRef<[u8]> for OutpointKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A typical locking/unlocking script. Most scripts are well under this
/// inline capacity; larger ones spill to the heap transparently.
pub type ScriptBytes = SmallVec<[u8; 40]>;

/// A transaction input: which output it spends, the extended-format
/// previous-script and previous-satoshis carried for isolated validation
/// (so the validator need not look up the UTXO to check script rules before
/// the UTXO-context checks run), the unlocking script, and the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_outpoint: TransactionOutpoint,
    pub previous_script: ScriptBytes,
    pub previous_satoshis: u64,
    pub unlocking_script: ScriptBytes,
    pub sequence: u32,
}

impl TxInput {
    pub fn new(
        previous_outpoint: TransactionOutpoint,
        previous_script: ScriptBytes,
        previous_satoshis: u64,
        unlocking_script: ScriptBytes,
        sequence: u32,
    ) -> Self {
        Self { previous_outpoint, previous_script, previous_satoshis, unlocking_script, sequence }
    }
}

/// A transaction output: satoshis plus a locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: ScriptBytes,
}

impl TxOutput {
    pub fn new(satoshis: u64, locking_script: ScriptBytes) -> Self {
        Self { satoshis, locking_script }
    }
}

/// An immutable transaction, identified by its double-hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Tx {
    pub fn new(version: u32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u32) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// A tx is coinbase iff it has exactly one input whose previous-outpoint
    /// hash is all-zero.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_outpoint.txid.is_zero()
    }

    /// Serialized byte size, used for size-limit and fee-rate checks.
    pub fn serialized_size(&self) -> usize {
        let inputs_size: usize = self
            .inputs
            .iter()
            .map(|i| 32 + 4 + i.previous_script.len() + i.previous_satoshis.to_le_bytes().len() + i.unlocking_script.len() + 4)
            .sum();
        let outputs_size: usize = self.outputs.iter().map(|o| 8 + o.locking_script.len()).sum();
        4 + inputs_size + outputs_size + 4
    }

    /// Double-SHA256 over the canonical serialization, computed fresh each
    /// call; callers that need it repeatedly should cache it themselves.
    pub fn id(&self) -> TransactionId {
        let mut buf = Vec::with_capacity(self.serialized_size());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(input.previous_outpoint.txid.as_bytes());
            buf.extend_from_slice(&input.previous_outpoint.vout.to_le_bytes());
            buf.extend_from_slice(&(input.unlocking_script.len() as u32).to_le_bytes());
            buf.extend_from_slice(&input.unlocking_script);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.satoshis.to_le_bytes());
            buf.extend_from_slice(&(output.locking_script.len() as u32).to_le_bytes());
            buf.extend_from_slice(&output.locking_script);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        Hash::double_sha256(&buf)
    }

    /// Sum of output satoshis, used for isolated value-range checks.
    pub fn total_output_value(&self) -> u128 {
        self.outputs.iter().map(|o| o.satoshis as u128).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Tx {
        Tx::new(
            1,
            vec![TxInput::new(
                TransactionOutpoint::new(Hash::double_sha256(b"parent"), 0),
                ScriptBytes::from_slice(&[0x51]),
                5_000,
                ScriptBytes::from_slice(&[0x00, 0x01]),
                0xffffffff,
            )],
            vec![TxOutput::new(4_900, ScriptBytes::from_slice(&[0x76, 0xa9]))],
            0,
        )
    }

    #[test]
    fn test_not_coinbase() {
        assert!(!sample_tx().is_coinbase());
    }

    #[test]
    fn test_coinbase_detection() {
        let coinbase = Tx::new(
            1,
            vec![TxInput::new(TransactionOutpoint::new(Hash::ZERO, 0xffffffff), ScriptBytes::new(), 0, ScriptBytes::from_slice(&[0x03]), 0)],
            vec![TxOutput::new(5_000_000_000, ScriptBytes::new())],
            0,
        );
        assert!(coinbase.is_coinbase());
    }

    #[test]
    fn test_id_is_deterministic() {
        let tx = sample_tx();
        assert_eq!(tx.id(), tx.id());
    }
}
