use nodecore_consensus_core::errors::NodeResult;
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::subtree::SubtreeLeaf;

/// Raw tx and subtree byte storage is an external collaborator (per scope);
/// this is the seam the subtree processor reads through to recover a mined
/// block's leaves during move-up/move-down, and writes through the moment a
/// subtree completes so later move-up/move-down and block-validator lookups
/// can find it. A real implementation resolves `root` against
/// content-addressed blob storage.
pub trait SubtreeBlobStore: Send + Sync {
    fn load_leaves(&self, root: Hash) -> NodeResult<Vec<SubtreeLeaf>>;

    /// Persists a completed subtree's leaves under its root hash. Write-once:
    /// a root's leaves never change once the subtree that produced them has
    /// closed.
    fn save_leaves(&self, root: Hash, leaves: &[SubtreeLeaf]) -> NodeResult<()>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryBlobStore {
        subtrees: RwLock<HashMap<Hash, Vec<SubtreeLeaf>>>,
    }

    impl InMemoryBlobStore {
        pub fn put(&self, root: Hash, leaves: Vec<SubtreeLeaf>) {
            self.subtrees.write().insert(root, leaves);
        }
    }

    impl SubtreeBlobStore for InMemoryBlobStore {
        fn load_leaves(&self, root: Hash) -> NodeResult<Vec<SubtreeLeaf>> {
            self.subtrees
                .read()
                .get(&root)
                .cloned()
                .ok_or_else(|| nodecore_consensus_core::errors::NodeError::NotFound(format!("subtree {root}")))
        }

        fn save_leaves(&self, root: Hash, leaves: &[SubtreeLeaf]) -> NodeResult<()> {
            self.subtrees.write().insert(root, leaves.to_vec());
            Ok(())
        }
    }
}
