use crate::bloom::TxidBloomFilter;
use nodecore_consensus_core::errors::{BlockRuleError, NodeError, NodeResult};
use nodecore_consensus_core::hash::{merkle_root, Hash};
use nodecore_consensus_core::tx::TransactionId;
use nodecore_subtree_processor::SubtreeBlobStore;
use nodecore_utxo::{TxMeta, TxMetaStore};
use std::sync::Arc;

/// Resolves a txid the subtree validator does not recognize by fetching it
/// (and whatever validation is required) from the peer that announced the
/// block. Kept as a trait seam since peer transport is out of scope here;
/// [`NullMissingTxResolver`] is the degenerate case used when no such
/// collaborator is wired (every unknown txid is a hard failure).
pub trait MissingTxResolver: Send + Sync {
    fn resolve(&self, txid: TransactionId, origin: Option<&str>) -> NodeResult<TxMeta>;
}

pub struct NullMissingTxResolver;

impl MissingTxResolver for NullMissingTxResolver {
    fn resolve(&self, txid: TransactionId, _origin: Option<&str>) -> NodeResult<TxMeta> {
        Err(NodeError::NotFound(format!("tx {txid} unknown and no peer resolver configured")))
    }
}

/// Per-subtree validation outcome: the bloom filter built over its leaves
/// (handed back to the caller for the batched set-mined update) and the
/// non-coinbase txids it mined, to fold into that same batch.
pub struct SubtreeOutcome {
    pub filter: TxidBloomFilter,
    pub mined_txids: Vec<TransactionId>,
}

/// Verifies that every leaf of every subtree in a block is a known,
/// consensus-valid transaction, fetching anything missing through a
/// [`MissingTxResolver`], and builds a per-subtree bloom filter as it goes.
pub struct SubtreeValidator {
    blob_store: Arc<dyn SubtreeBlobStore>,
    tx_meta: Arc<TxMetaStore>,
    resolver: Arc<dyn MissingTxResolver>,
}

impl SubtreeValidator {
    pub fn new(blob_store: Arc<dyn SubtreeBlobStore>, tx_meta: Arc<TxMetaStore>, resolver: Arc<dyn MissingTxResolver>) -> Self {
        Self { blob_store, tx_meta, resolver }
    }

    /// Whether the blob store holds the leaves for subtree `root`, without
    /// running full validation.
    pub fn subtree_exists(&self, root: Hash) -> NodeResult<bool> {
        match self.blob_store.load_leaves(root) {
            Ok(_) => Ok(true),
            Err(NodeError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Loads subtree 0's leaves and recomputes its root with leaf 0 replaced
    /// by `coinbase_id`, regardless of what leaf 0 actually holds. Used to
    /// bind the block's declared coinbase into the header's merkle root
    /// without trusting the block's own claimed subtree-0 root.
    pub fn first_subtree_root_with_coinbase(&self, root: Hash, coinbase_id: TransactionId) -> NodeResult<Hash> {
        let mut leaves = self.blob_store.load_leaves(root)?;
        if let Some(leaf) = leaves.first_mut() {
            leaf.txid = coinbase_id;
        }
        let leaf_hashes: Vec<Hash> = leaves.iter().map(|l| l.txid).collect();
        Ok(merkle_root(&leaf_hashes))
    }

    /// Validates one subtree at position `index` within the block (index 0
    /// carries the coinbase in leaf 0). `expected_coinbase_id` must be
    /// `Some` when `index == 0`; the stored leaf 0 is asserted to equal it,
    /// so the subtree's bookkeeping can never silently diverge from the
    /// block's declared coinbase. `origin` is the peer that announced the
    /// block, passed through to the resolver. Returns an error if the
    /// subtree's own root doesn't match its loaded leaves (blob-store
    /// integrity) or any leaf cannot be resolved.
    pub fn validate_subtree(&self, root: Hash, index: usize, origin: Option<&str>, expected_coinbase_id: Option<TransactionId>) -> NodeResult<SubtreeOutcome> {
        let leaves = self.blob_store.load_leaves(root)?;
        let leaf_hashes: Vec<Hash> = leaves.iter().map(|l| l.txid).collect();
        if merkle_root(&leaf_hashes) != root {
            return Err(NodeError::InvalidBlock(BlockRuleError::MerkleRootMismatch { header: root, computed: merkle_root(&leaf_hashes) }));
        }

        let mut filter = TxidBloomFilter::new(leaves.len());
        let mut mined_txids = Vec::with_capacity(leaves.len());
        for (leaf_index, leaf) in leaves.iter().enumerate() {
            let is_coinbase_slot = index == 0 && leaf_index == 0;
            filter.insert(leaf.txid);
            if is_coinbase_slot {
                let expected = expected_coinbase_id.expect("subtree 0 always carries a coinbase at leaf 0");
                if leaf.txid != expected {
                    return Err(NodeError::InvalidBlock(BlockRuleError::CoinbaseNotCommitted { expected, found: leaf.txid }));
                }
                // The coinbase never passes through the tx validator; the
                // caller installs its own tx-meta record directly.
                continue;
            }
            if !self.tx_meta.exists(leaf.txid)? {
                let resolved = self.resolver.resolve(leaf.txid, origin)?;
                self.tx_meta.insert(resolved)?;
            }
            mined_txids.push(leaf.txid);
        }
        Ok(SubtreeOutcome { filter, mined_txids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::subtree::SubtreeLeaf;
    use parking_lot::RwLock;
    use std::collections::HashMap;
    use std::sync::Arc;

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

    fn temp_tx_meta() -> (Arc<TxMetaStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = nodecore_database::prelude::open_db(dir.path(), true, 128);
        (Arc::new(TxMetaStore::new(db, 1_000)), dir)
    }

    #[test]
    fn test_validates_known_non_coinbase_leaves() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let txid = Hash::double_sha256(b"tx0");
        tx_meta.insert(TxMeta::new(txid, 10, 200, vec![], false, 1)).unwrap();
        let leaves = vec![SubtreeLeaf::new(txid, 10, 200)];
        let root = merkle_root(&[txid]);
        blob.put(root, leaves);

        let validator = SubtreeValidator::new(blob, tx_meta, Arc::new(NullMissingTxResolver));
        let outcome = validator.validate_subtree(root, 1, None, None).unwrap();
        assert_eq!(outcome.mined_txids, vec![txid]);
        assert!(outcome.filter.might_contain(txid));
    }

    #[test]
    fn test_coinbase_slot_skipped_for_non_coinbase_lookup() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let coinbase_txid = Hash::double_sha256(b"coinbase");
        let leaves = vec![SubtreeLeaf::new(coinbase_txid, 0, 0)];
        let root = merkle_root(&[coinbase_txid]);
        blob.put(root, leaves);

        let validator = SubtreeValidator::new(blob, tx_meta, Arc::new(NullMissingTxResolver));
        let outcome = validator.validate_subtree(root, 0, None, Some(coinbase_txid)).unwrap();
        assert!(outcome.mined_txids.is_empty());
    }

    #[test]
    fn test_coinbase_slot_mismatch_rejected() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let stored_txid = Hash::double_sha256(b"stored-coinbase");
        let declared_txid = Hash::double_sha256(b"declared-coinbase");
        let leaves = vec![SubtreeLeaf::new(stored_txid, 0, 0)];
        let root = merkle_root(&[stored_txid]);
        blob.put(root, leaves);

        let validator = SubtreeValidator::new(blob, tx_meta, Arc::new(NullMissingTxResolver));
        let err = validator.validate_subtree(root, 0, None, Some(declared_txid)).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(nodecore_consensus_core::errors::BlockRuleError::CoinbaseNotCommitted { .. })));
    }

    #[test]
    fn test_first_subtree_root_with_coinbase_substitutes_leaf_zero() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let placeholder = Hash::ZERO;
        let coinbase_txid = Hash::double_sha256(b"real-coinbase");
        let root = merkle_root(&[placeholder]);
        blob.put(root, vec![SubtreeLeaf::new(placeholder, 0, 0)]);

        let validator = SubtreeValidator::new(blob, tx_meta, Arc::new(NullMissingTxResolver));
        let substituted = validator.first_subtree_root_with_coinbase(root, coinbase_txid).unwrap();
        assert_eq!(substituted, merkle_root(&[coinbase_txid]));
        assert_ne!(substituted, root);
    }

    #[test]
    fn test_missing_tx_resolved_via_resolver() {
        struct AlwaysResolves;
        impl MissingTxResolver for AlwaysResolves {
            fn resolve(&self, txid: TransactionId, _origin: Option<&str>) -> NodeResult<TxMeta> {
                Ok(TxMeta::new(txid, 5, 100, vec![], false, 1))
            }
        }

        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let txid = Hash::double_sha256(b"unknown-tx");
        let root = merkle_root(&[txid]);
        blob.put(root, vec![SubtreeLeaf::new(txid, 5, 100)]);

        let validator = SubtreeValidator::new(blob, tx_meta.clone(), Arc::new(AlwaysResolves));
        let outcome = validator.validate_subtree(root, 1, Some("peer-1"), None).unwrap();
        assert_eq!(outcome.mined_txids, vec![txid]);
        assert!(tx_meta.exists(txid).unwrap());
    }

    #[test]
    fn test_unresolvable_missing_tx_fails() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let (tx_meta, _dir) = temp_tx_meta();
        let txid = Hash::double_sha256(b"ghost-tx");
        let root = merkle_root(&[txid]);
        blob.put(root, vec![SubtreeLeaf::new(txid, 5, 100)]);

        let validator = SubtreeValidator::new(blob, tx_meta, Arc::new(NullMissingTxResolver));
        assert!(validator.validate_subtree(root, 1, None, None).is_err());
    }
}
