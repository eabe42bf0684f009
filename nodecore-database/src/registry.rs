/// Byte prefixes for every logical store multiplexed onto the single RocksDB
/// instance. Each prefix is handed to a [`crate::prelude::CachedDbAccess`] or
/// [`crate::prelude::CachedDbItem`] and never changes once a node has data on
/// disk — adding a store means adding a variant here, never renumbering one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StorePrefix {
    /// Full `BlockHeader` bytes, keyed by block-node id.
    Headers = 0,
    /// `BlockNode` DAG entries (parent id, height, chain-work, flags), keyed by block-node id.
    BlockNodes = 1,
    /// Block hash -> block-node id.
    HashIndex = 2,
    /// Active-chain height -> block-node id.
    HeightIndex = 3,
    /// Singleton keys: best tip, schema version, block assembler state.
    State = 4,
    /// `UtxoEntry`, keyed by `TransactionOutpoint`.
    Utxo = 5,
    /// `TxMeta`, keyed by txid.
    TxMeta = 6,
    /// Completed `Subtree` blobs, keyed by subtree root hash.
    Subtrees = 7,
    /// Outstanding utxo spend reservations, keyed by outpoint.
    UtxoReservations = 8,
}

impl StorePrefix {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            StorePrefix::Headers => b"headers",
            StorePrefix::BlockNodes => b"blocknodes",
            StorePrefix::HashIndex => b"hashidx",
            StorePrefix::HeightIndex => b"heightidx",
            StorePrefix::State => b"state",
            StorePrefix::Utxo => b"utxo",
            StorePrefix::TxMeta => b"txmeta",
            StorePrefix::Subtrees => b"subtrees",
            StorePrefix::UtxoReservations => b"utxo-reserve",
        }
    }
}

/// Well-known keys within [`StorePrefix::State`].
pub mod state_keys {
    pub const BEST_TIP: &[u8] = b"state/best-tip";
    pub const BLOCK_ASSEMBLER_TIP: &[u8] = b"state/block-assembler-tip";
}
