use std::{
    fmt::{Debug, Display},
    str,
};

const SEP: u8 = b'/';

/// A `<prefix>/<key bytes>` composite RocksDB key. Every store prefixes its
/// keys this way so that a single column-family-free DB can host many
/// logical stores side by side, matching the per-store prefix convention
/// in [`crate::registry`].
#[derive(Clone)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey: Copy + AsRef<[u8]>>(prefix: &[u8], key: TKey) -> Self {
        Self {
            path: prefix.iter().chain(std::iter::once(&SEP)).chain(key.as_ref().iter()).copied().collect(),
            prefix_len: prefix.len() + 1,
        }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, key) = self.path.split_at(self.prefix_len);
        if let Ok(s) = str::from_utf8(prefix) {
            f.write_str(s)?;
        } else {
            f.write_str(&faster_hex::hex_string(&prefix[..prefix.len() - 1]))?;
            f.write_str("/")?;
        }
        f.write_str(&faster_hex::hex_string(key))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
