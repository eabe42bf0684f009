use log::warn;
use nodecore_chain_store::BlockchainStore;
use nodecore_consensus_core::block::Block;
use nodecore_consensus_core::errors::{BlockRuleError, NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::header::BlockHeader;

const HEADER_BATCH: usize = 2_000;

/// Peer transport is out of scope here; this is the seam the catch-up walk
/// reads and writes through. A real implementation resolves these against
/// the wire protocol's `getheaders`/`getdata` exchange.
pub trait PeerClient: Send + Sync {
    fn fetch_headers(&self, locator: &[Hash], peer: u32) -> NodeResult<Vec<BlockHeader>>;
    fn fetch_block(&self, hash: Hash, peer: u32) -> NodeResult<Block>;
}

/// Walks backward from the peer's tip requesting headers in batches until a
/// header already known to `store` is reached (or the zero-hash is, which
/// fails with [`BlockRuleError::CatchupExhausted`]), then fetches the
/// intervening blocks forward with `pool`-bounded concurrency. Returns the
/// fetched blocks oldest-first, ready to be streamed through the normal
/// validation pipeline one at a time by the caller.
pub fn run(store: &BlockchainStore, peer_client: &dyn PeerClient, pool: &rayon::ThreadPool, peer: u32) -> NodeResult<Vec<Block>> {
    let missing_headers = walk_headers_backward(store, peer_client, peer)?;
    if missing_headers.is_empty() {
        return Ok(Vec::new());
    }

    let hashes: Vec<Hash> = missing_headers.iter().map(|h| h.hash()).collect();
    let blocks: Vec<NodeResult<Block>> = pool.install(|| {
        use rayon::prelude::*;
        hashes.par_iter().map(|hash| peer_client.fetch_block(*hash, peer)).collect()
    });

    let mut fetched = Vec::with_capacity(blocks.len());
    for (hash, result) in hashes.into_iter().zip(blocks) {
        match result {
            Ok(block) => fetched.push(block),
            Err(err) => {
                warn!("catch-up block fetch failed for {hash}: {err}");
                return Err(err);
            }
        }
    }
    Ok(fetched)
}

/// Requests header batches starting from our own locator, walking further
/// back each round, until a returned header's `prev_hash` is already known
/// to the store. Returns the unknown headers oldest-first.
fn walk_headers_backward(store: &BlockchainStore, peer_client: &dyn PeerClient, peer: u32) -> NodeResult<Vec<BlockHeader>> {
    let mut locator = match store.best_tip_node()? {
        Some(tip) => nodecore_chain_store::block_locator(store, tip.hash())?,
        None => Vec::new(),
    };
    let mut unknown: Vec<BlockHeader> = Vec::new();

    loop {
        let batch = peer_client.fetch_headers(&locator, peer)?;
        if batch.is_empty() {
            return Err(NodeError::InvalidBlock(BlockRuleError::CatchupExhausted));
        }

        for header in &batch {
            unknown.insert(0, *header);
            if store.exists(header.prev_hash)? {
                return Ok(unknown);
            }
            if header.prev_hash.is_zero() {
                // Walked back to a foreign genesis with no parent of its own;
                // no common ancestor exists within what the peer will offer.
                return Err(NodeError::InvalidBlock(BlockRuleError::CatchupExhausted));
            }
        }

        locator = vec![batch.last().unwrap().prev_hash];
    }
}
