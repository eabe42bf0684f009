use crate::hash::{merkle_root, Hash};
use crate::header::BlockHeader;
use crate::tx::Tx;
use serde::{Deserialize, Serialize};

/// header + coinbase tx + ordered list of subtree root hashes + transaction
/// count + size. Non-coinbase transactions are stored by reference (via
/// subtrees and the blob store), never inlined here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub coinbase: Tx,
    pub subtree_hashes: Vec<Hash>,
    pub tx_count: u64,
    pub size_bytes: u64,
}

impl Block {
    pub fn new(header: BlockHeader, coinbase: Tx, subtree_hashes: Vec<Hash>, tx_count: u64, size_bytes: u64) -> Self {
        Self { header, coinbase, subtree_hashes, tx_count, size_bytes }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Recomputes the merkle root over the block's subtree root hashes, with
    /// the coinbase txid substituted into subtree 0's leaf-0 placeholder.
    /// Callers that have the substituted first subtree hash already in hand
    /// should pass it via `first_subtree_root_with_coinbase`; otherwise this
    /// folds `subtree_hashes` as-is.
    pub fn compute_merkle_root(&self, first_subtree_root_with_coinbase: Option<Hash>) -> Hash {
        if self.subtree_hashes.is_empty() {
            return Hash::ZERO;
        }
        let mut roots = self.subtree_hashes.clone();
        if let Some(substituted) = first_subtree_root_with_coinbase {
            roots[0] = substituted;
        }
        merkle_root(&roots)
    }

    pub fn matches_declared_merkle_root(&self, first_subtree_root_with_coinbase: Option<Hash>) -> bool {
        self.header.merkle_root == self.compute_merkle_root(first_subtree_root_with_coinbase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{ScriptBytes, TransactionOutpoint, TxInput, TxOutput};

    fn coinbase_tx() -> Tx {
        Tx::new(
            1,
            vec![TxInput::new(TransactionOutpoint::new(Hash::ZERO, 0xffffffff), ScriptBytes::new(), 0, ScriptBytes::from_slice(&[0x03]), 0xffffffff)],
            vec![TxOutput::new(5_000_000_000, ScriptBytes::new())],
            0,
        )
    }

    #[test]
    fn test_merkle_root_matches_when_substituted() {
        let subtree0 = Hash::double_sha256(b"subtree0-with-placeholder");
        let subtree1 = Hash::double_sha256(b"subtree1");
        let substituted = Hash::double_sha256(b"subtree0-with-coinbase");
        let computed = merkle_root(&[substituted, subtree1]);
        let header = BlockHeader::new(1, Hash::ZERO, computed, 0, 0x1d00ffff, 0);
        let block = Block::new(header, coinbase_tx(), vec![subtree0, subtree1], 2, 400);
        assert!(block.matches_declared_merkle_root(Some(substituted)));
    }

    #[test]
    fn test_merkle_root_mismatch_detected() {
        let subtree0 = Hash::double_sha256(b"subtree0");
        let header = BlockHeader::new(1, Hash::ZERO, Hash::double_sha256(b"wrong"), 0, 0x1d00ffff, 0);
        let block = Block::new(header, coinbase_tx(), vec![subtree0], 1, 200);
        assert!(!block.matches_declared_merkle_root(None));
    }
}
