use crate::hash::Hash;
use crate::header::BlockHeader;
use serde::{Deserialize, Serialize};

pub type BlockNodeId = u64;

/// Persistent header-DAG entry. `parent_id == 0` iff `height == 0` (genesis).
/// A node's `chain_work` equals its parent's plus the header's own
/// proof-of-work contribution; a node is invalid iff it or any ancestor is
/// invalid, tracked incrementally via the `invalid` flag rather than
/// re-walked on every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: BlockNodeId,
    pub parent_id: BlockNodeId,
    pub header: BlockHeader,
    pub height: u32,
    pub chain_work: u128,
    /// Id of the peer that announced this block, used only as a tip-selection tiebreaker.
    pub peer_id: u32,
    pub tx_count: u64,
    pub size_bytes: u64,
    pub coinbase_bytes: Vec<u8>,
    pub subtree_hashes: Vec<Hash>,
    pub invalid: bool,
    pub mined_set: bool,
    pub subtrees_set: bool,
}

impl BlockNode {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.parent_id == 0 && self.height == 0
    }
}

/// Ordering used to pick the best chain tip: chain-work descending, then
/// peer-reported arrival order ascending, then node id ascending — giving a
/// total order so tip selection is deterministic across ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipCandidate {
    pub chain_work: u128,
    pub peer_id: u32,
    pub id: BlockNodeId,
}

impl PartialOrd for TipCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TipCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.chain_work
            .cmp(&other.chain_work)
            .then_with(|| other.peer_id.cmp(&self.peer_id))
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tip_candidate_prefers_higher_chain_work() {
        let a = TipCandidate { chain_work: 100, peer_id: 0, id: 1 };
        let b = TipCandidate { chain_work: 200, peer_id: 0, id: 2 };
        assert!(b > a);
    }

    #[test]
    fn test_tip_candidate_breaks_tie_by_lower_peer_id() {
        let a = TipCandidate { chain_work: 100, peer_id: 5, id: 1 };
        let b = TipCandidate { chain_work: 100, peer_id: 1, id: 2 };
        assert!(b > a);
    }

    #[test]
    fn test_tip_candidate_breaks_final_tie_by_lower_id() {
        let a = TipCandidate { chain_work: 100, peer_id: 0, id: 5 };
        let b = TipCandidate { chain_work: 100, peer_id: 0, id: 1 };
        assert!(b > a);
    }
}
