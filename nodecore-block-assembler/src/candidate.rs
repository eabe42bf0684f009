use nodecore_consensus_core::constants::subsidy;
use nodecore_consensus_core::hash::{merkle_root, Hash};
use nodecore_consensus_core::subtree::Subtree;

/// A mining candidate: everything a miner needs to build a coinbase, fold it
/// through the merkle proof, and search for a header satisfying `bits`.
/// Shape matches the wire `id ∥ prev_hash ∥ coinbase_value ∥ version ∥ bits ∥
/// height ∥ time ∥ merkle_proof` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningCandidate {
    pub id: Hash,
    pub prev_hash: Hash,
    pub coinbase_value: u64,
    pub version: u32,
    pub bits: u32,
    pub height: u32,
    pub time: u32,
    pub merkle_proof: Vec<Hash>,
}

/// Builds a mining candidate from the subtree processor's snapshot. `height`
/// is the height of the block being mined (one past the current tip), `bits`
/// is the difficulty-source value or `Config::fallback_bits`.
pub fn build_candidate(subtrees: &[Subtree], prev_hash: Hash, height: u32, bits: u32, version: u32, now: u32) -> MiningCandidate {
    let coinbase_value: u64 = subtrees.iter().map(|st| st.total_fee()).sum::<u64>() + subsidy(height);
    let (merkle_proof, top_root) = coinbase_merkle_proof(subtrees);
    let id = Hash::double_sha256(&[top_root.as_bytes().as_slice(), prev_hash.as_bytes().as_slice(), &now.to_le_bytes()].concat());
    MiningCandidate { id, prev_hash, coinbase_value, version, bits, height, time: now, merkle_proof }
}

/// The merkle proof needed to fold the coinbase's own hash up to the block's
/// merkle root: first the branch within subtree 0 from its leaf-0 placeholder
/// slot, then the branch across the top-level tree of subtree roots from
/// subtree 0's position. Concatenated, a miner can recompute the full block
/// merkle root from the coinbase txid alone by applying each hash in order.
/// Returns the proof alongside the top-level tree's root (subtree roots
/// folded together), used as the `candidate_id` input.
fn coinbase_merkle_proof(subtrees: &[Subtree]) -> (Vec<Hash>, Hash) {
    let top_roots: Vec<Hash> = subtrees.iter().map(|st| st.root_hash()).collect();
    let top_root = merkle_root(&top_roots);

    let mut proof = Vec::new();
    if let Some(first) = subtrees.first() {
        let leaf_hashes: Vec<Hash> = first.leaves().iter().map(|l| l.txid).collect();
        proof.extend(merkle_branch(&leaf_hashes, 0));
    }
    proof.extend(merkle_branch(&top_roots, 0));
    (proof, top_root)
}

/// Sibling hashes needed to fold the leaf at `index` up to the root of the
/// tree over `leaves`, using the same pairwise double-SHA256 fold and
/// odd-length duplication rule as [`merkle_root`].
fn merkle_branch(leaves: &[Hash], mut index: usize) -> Vec<Hash> {
    if leaves.len() <= 1 {
        return Vec::new();
    }
    let mut level = leaves.to_vec();
    let mut branch = Vec::new();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
        branch.push(level[sibling]);
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(pair[0].as_bytes());
                buf[32..].copy_from_slice(pair[1].as_bytes());
                Hash::double_sha256(&buf)
            })
            .collect();
        index /= 2;
    }
    branch
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::subtree::SubtreeLeaf;

    fn leaf(label: &str) -> SubtreeLeaf {
        SubtreeLeaf::new(Hash::double_sha256(label.as_bytes()), 10, 200)
    }

    #[test]
    fn test_merkle_branch_single_leaf_is_empty() {
        let root = Hash::double_sha256(b"solo");
        assert!(merkle_branch(&[root], 0).is_empty());
    }

    #[test]
    fn test_merkle_branch_folds_back_to_root() {
        let leaves = vec![Hash::double_sha256(b"a"), Hash::double_sha256(b"b"), Hash::double_sha256(b"c")];
        let branch = merkle_branch(&leaves, 0);
        let mut acc = leaves[0];
        for sibling in &branch {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(acc.as_bytes());
            buf[32..].copy_from_slice(sibling.as_bytes());
            acc = Hash::double_sha256(&buf);
        }
        assert_eq!(acc, merkle_root(&leaves));
    }

    #[test]
    fn test_coinbase_value_sums_fees_plus_subsidy() {
        let mut st0 = Subtree::new(4);
        st0.push(leaf("tx0"));
        st0.push(leaf("tx1"));
        let candidate = build_candidate(&[st0], Hash::ZERO, 1, 0x1d00ffff, 1, 1_700_000_000);
        assert_eq!(candidate.coinbase_value, 20 + subsidy(1));
    }

    #[test]
    fn test_candidate_id_changes_with_clock() {
        let st0 = Subtree::new(2);
        let a = build_candidate(&[st0.clone()], Hash::ZERO, 1, 0x1d00ffff, 1, 100);
        let b = build_candidate(&[st0], Hash::ZERO, 1, 0x1d00ffff, 1, 101);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_proof_includes_both_levels_for_multiple_subtrees() {
        let mut st0 = Subtree::new(2);
        st0.push(leaf("tx0"));
        let mut st1 = Subtree::new_empty(2);
        st1.push(leaf("tx1"));
        st1.push(leaf("tx2"));
        let candidate = build_candidate(&[st0, st1], Hash::ZERO, 1, 0x1d00ffff, 1, 100);
        // one subtree-0 internal sibling (2 leaves) + one top-level sibling (2 roots)
        assert_eq!(candidate.merkle_proof.len(), 2);
    }
}
