use nodecore_consensus_core::errors::{BlockRuleError, NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;

/// Given the active chain's hashes (newest first, bounded to `max_rollback`
/// entries) and a candidate chain's hashes (also newest first), finds how
/// many entries of each must roll back/forward to reach their common
/// ancestor. Returns `(current_rollback_count, new_chain_depth)`: the first
/// `current_rollback_count` entries of `current_newest_first` are the blocks
/// to move down (in that order), and the first `new_chain_depth` entries of
/// `new_newest_first`, reversed, are the blocks to move up.
pub fn find_common_ancestor_split(
    current_newest_first: &[Hash],
    new_newest_first: &[Hash],
    max_rollback: u32,
) -> NodeResult<(usize, usize)> {
    let bound = (max_rollback as usize + 1).min(current_newest_first.len());
    for (up_idx, candidate_hash) in new_newest_first.iter().enumerate() {
        if let Some(down_idx) = current_newest_first[..bound].iter().position(|h| h == candidate_hash) {
            return Ok((down_idx, up_idx));
        }
    }
    Err(NodeError::InvalidBlock(BlockRuleError::NoCommonAncestor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::hash::Hash;

    fn h(label: &str) -> Hash {
        Hash::double_sha256(label.as_bytes())
    }

    #[test]
    fn test_finds_ancestor_one_block_each_side() {
        let current = vec![h("tip_a"), h("common")];
        let new = vec![h("tip_b"), h("common")];
        let (down, up) = find_common_ancestor_split(&current, &new, 10).unwrap();
        assert_eq!(down, 1);
        assert_eq!(up, 1);
    }

    #[test]
    fn test_no_common_ancestor_within_bound_errors() {
        let current = vec![h("a"), h("b")];
        let new = vec![h("c"), h("d")];
        let err = find_common_ancestor_split(&current, &new, 1).unwrap_err();
        assert!(matches!(err, NodeError::InvalidBlock(BlockRuleError::NoCommonAncestor)));
    }

    #[test]
    fn test_shared_tip_means_no_rollback_needed() {
        let current = vec![h("tip")];
        let new = vec![h("tip")];
        let (down, up) = find_common_ancestor_split(&current, &new, 5).unwrap();
        assert_eq!(down, 0);
        assert_eq!(up, 0);
    }
}
