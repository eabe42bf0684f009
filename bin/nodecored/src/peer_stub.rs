use nodecore_block_validator::PeerClient;
use nodecore_consensus_core::block::Block;
use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::header::BlockHeader;

/// Peer-transport stand-in: every peer request fails cleanly. P2P networking
/// is out of scope for this binary; wiring a real transport means replacing
/// this with an implementation that actually talks to peers, not changing
/// any caller.
pub struct OfflinePeerClient;

impl PeerClient for OfflinePeerClient {
    fn fetch_headers(&self, _locator: &[Hash], peer: u32) -> NodeResult<Vec<BlockHeader>> {
        Err(NodeError::Service(format!("no peer transport configured, cannot fetch headers from peer {peer}")))
    }

    fn fetch_block(&self, hash: Hash, peer: u32) -> NodeResult<Block> {
        Err(NodeError::Service(format!("no peer transport configured, cannot fetch block {hash} from peer {peer}")))
    }
}
