use nodecore_consensus_core::node::BlockNodeId;
use serde::{Deserialize, Serialize};

/// Fixed-layout big-endian key form of a [`BlockNodeId`], giving
/// `CachedDbAccess` the `Copy + AsRef<[u8]>` key it needs while keeping
/// ids in ascending lexicographic DB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdKey([u8; 8]);

impl From<BlockNodeId> for IdKey {
    fn from(id: BlockNodeId) -> Self {
        Self(id.to_be_bytes())
    }
}

impl From<IdKey> for BlockNodeId {
    fn from(key: IdKey) -> Self {
        BlockNodeId::from_be_bytes(key.0)
    }
}

impl AsRef<[u8]> for IdKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Fixed-layout big-endian key form of an active-chain height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeightKey([u8; 4]);

impl From<u32> for HeightKey {
    fn from(height: u32) -> Self {
        Self(height.to_be_bytes())
    }
}

impl AsRef<[u8]> for HeightKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
