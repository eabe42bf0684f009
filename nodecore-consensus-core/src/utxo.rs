use crate::hash::Hash;
use crate::tx::{ScriptBytes, TransactionId, TransactionOutpoint};
use serde::{Deserialize, Serialize};

/// An unspent output located by `(txid, vout)`. The `utxo_hash` is a
/// deterministic checksum of `(txid, vout, locking_script, satoshis)`,
/// presented alongside the spending tx id on every spend to guard against a
/// caller acting on stale UTXO data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub outpoint: TransactionOutpoint,
    pub locking_script: ScriptBytes,
    pub satoshis: u64,
    pub is_coinbase: bool,
    /// Height of the block that created this output; used for the coinbase
    /// maturity check.
    pub block_height: u32,
}

impl UtxoEntry {
    pub fn new(outpoint: TransactionOutpoint, locking_script: ScriptBytes, satoshis: u64, is_coinbase: bool, block_height: u32) -> Self {
        Self { outpoint, locking_script, satoshis, is_coinbase, block_height }
    }

    /// The checksum presented on every `spend` call.
    pub fn utxo_hash(&self) -> Hash {
        compute_utxo_hash(self.outpoint.txid, self.outpoint.vout, &self.locking_script, self.satoshis)
    }

    /// Whether this output may be spent given the current best-chain tip height.
    pub fn is_spendable_at(&self, tip_height: u32, coinbase_maturity: u32) -> bool {
        if !self.is_coinbase {
            return true;
        }
        tip_height >= self.block_height.saturating_add(coinbase_maturity)
    }
}

/// `utxo_hash = H(txid ∥ vout ∥ locking_script ∥ satoshis)`.
pub fn compute_utxo_hash(txid: TransactionId, vout: u32, locking_script: &[u8], satoshis: u64) -> Hash {
    let mut buf = Vec::with_capacity(32 + 4 + locking_script.len() + 8);
    buf.extend_from_slice(txid.as_bytes());
    buf.extend_from_slice(&vout.to_le_bytes());
    buf.extend_from_slice(locking_script);
    buf.extend_from_slice(&satoshis.to_le_bytes());
    Hash::double_sha256(&buf)
}

/// A request to spend a single utxo, carrying the checksum the caller last
/// observed plus the id of the transaction attempting the spend.
#[derive(Debug, Clone, Copy)]
pub struct SpendRequest {
    pub outpoint: TransactionOutpoint,
    pub utxo_hash: Hash,
    pub spending_txid: TransactionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_hash_is_deterministic() {
        let entry = UtxoEntry::new(
            TransactionOutpoint::new(Hash::double_sha256(b"tx"), 1),
            ScriptBytes::from_slice(&[0x76, 0xa9]),
            5_000,
            false,
            10,
        );
        assert_eq!(entry.utxo_hash(), entry.utxo_hash());
    }

    #[test]
    fn test_coinbase_maturity() {
        let entry = UtxoEntry::new(TransactionOutpoint::new(Hash::ZERO, 0), ScriptBytes::new(), 5_000_000_000, true, 100);
        assert!(!entry.is_spendable_at(150, 100));
        assert!(entry.is_spendable_at(200, 100));
    }

    #[test]
    fn test_non_coinbase_always_spendable() {
        let entry = UtxoEntry::new(TransactionOutpoint::new(Hash::ZERO, 0), ScriptBytes::new(), 100, false, 100);
        assert!(entry.is_spendable_at(100, 100));
    }
}
