use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display, Formatter};
use std::str::{self, FromStr};

pub const HASH_SIZE: usize = 32;

/// A 32-byte content identifier, used for tx ids, block hashes, utxo hashes
/// and subtree root hashes alike.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Default, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE]);

    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(slice);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }

    /// The double-SHA256 digest used throughout for tx ids, header hashes,
    /// utxo-hash checksums and mining-candidate ids.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        Self::from_slice(&second)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(hash_str)?;
        if bytes.len() != HASH_SIZE {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self::from_slice(&bytes))
    }
}

/// Computes the standard pairwise double-SHA256 Merkle root over an ordered
/// list of leaf hashes, duplicating the last element of each odd-length level.
/// Used both to fold a subtree's txids into its root and to fold a block's
/// subtree root hashes into the header's merkle root.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }
    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = [0u8; HASH_SIZE * 2];
                buf[..HASH_SIZE].copy_from_slice(pair[0].as_bytes());
                buf[HASH_SIZE..].copy_from_slice(pair[1].as_bytes());
                Hash::double_sha256(&buf)
            })
            .collect();
    }
    level[0]
}
