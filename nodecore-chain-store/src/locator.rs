use crate::store::BlockchainStore;
use nodecore_consensus_core::errors::NodeResult;
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::node::BlockNode;

/// Reference block locator: the requested block, its 10 immediate
/// ancestors, then every `2^i`-step ancestor until genesis, always ending
/// with genesis. Capped at `12 + floor(log2(height - 10))` entries.
pub fn block_locator(store: &BlockchainStore, from: Hash) -> NodeResult<Vec<Hash>> {
    let start = store.get_by_hash(from)?;
    let cap = locator_cap(start.height);

    let mut hashes = Vec::with_capacity(cap);
    let mut current = start;
    hashes.push(current.hash());

    let mut step = 1u32;
    let mut steps_at_current_size = 0u32;
    loop {
        if current.is_genesis() {
            break;
        }
        if hashes.len() >= cap {
            break;
        }
        let ancestor = walk_back(store, &current, step)?;
        hashes.push(ancestor.hash());
        current = ancestor;

        steps_at_current_size += 1;
        // First 10 steps are single-block; after that the stride doubles
        // every step, reaching genesis in O(log height) entries.
        if hashes.len() > 10 {
            step *= 2;
        }
        let _ = steps_at_current_size;
    }

    if !current.is_genesis() {
        let genesis = walk_to_genesis(store, &current)?;
        hashes.push(genesis.hash());
    }

    Ok(hashes)
}

fn locator_cap(height: u32) -> usize {
    if height <= 10 {
        return (height as usize) + 1;
    }
    let extra = (height - 10) as f64;
    12 + (extra.log2().floor() as usize)
}

fn walk_back(store: &BlockchainStore, from: &BlockNode, steps: u32) -> NodeResult<BlockNode> {
    let mut node = from.clone();
    for _ in 0..steps {
        if node.is_genesis() {
            break;
        }
        node = store.get_by_id(node.parent_id)?;
    }
    Ok(node)
}

fn walk_to_genesis(store: &BlockchainStore, from: &BlockNode) -> NodeResult<BlockNode> {
    let mut node = from.clone();
    while !node.is_genesis() {
        node = store.get_by_id(node.parent_id)?;
    }
    Ok(node)
}
