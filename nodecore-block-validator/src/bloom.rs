use nodecore_consensus_core::hash::Hash;

/// A bit-array bloom filter over txids, built per-subtree during validation
/// so the set-mined batch update can cheaply rule out "definitely not in
/// this subtree" before touching the tx-meta store. Uses Kirsch-Mitzenmacher
/// double hashing: `h_i(x) = h1(x) + i*h2(x)`, derived from the first two
/// 64-bit halves of the txid's own double-SHA256, so no extra hash family
/// is needed beyond the one already used throughout this codebase.
pub struct TxidBloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl TxidBloomFilter {
    /// Sizes the filter for `expected_items` at a false-positive rate of
    /// roughly 1%, per the standard `m = -n ln(p) / (ln 2)^2` formula.
    pub fn new(expected_items: usize) -> Self {
        let n = expected_items.max(1) as f64;
        let m = (-(n * 0.01_f64.ln()) / (std::f64::consts::LN_2 * std::f64::consts::LN_2)).ceil() as u64;
        let num_bits = m.max(64);
        let num_hashes = ((num_bits as f64 / n) * std::f64::consts::LN_2).round().clamp(1.0, 16.0) as u32;
        let words = num_bits.div_ceil(64) as usize;
        Self { bits: vec![0u64; words], num_bits, num_hashes }
    }

    fn hash_pair(txid: Hash) -> (u64, u64) {
        let bytes = txid.as_bytes();
        let h1 = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let h2 = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        (h1, h2 | 1) // force h2 odd so repeated addition cycles through all bits
    }

    pub fn insert(&mut self, txid: Hash) {
        let (h1, h2) = Self::hash_pair(txid);
        for i in 0..self.num_hashes as u64 {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    pub fn might_contain(&self, txid: Hash) -> bool {
        let (h1, h2) = Self::hash_pair(txid);
        (0..self.num_hashes as u64).all(|i| {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_items_are_found() {
        let mut filter = TxidBloomFilter::new(100);
        let txids: Vec<Hash> = (0..50).map(|i| Hash::double_sha256(format!("tx{i}").as_bytes())).collect();
        for txid in &txids {
            filter.insert(*txid);
        }
        for txid in &txids {
            assert!(filter.might_contain(*txid));
        }
    }

    #[test]
    fn test_absent_item_usually_reported_absent() {
        let mut filter = TxidBloomFilter::new(100);
        for i in 0..50 {
            filter.insert(Hash::double_sha256(format!("present{i}").as_bytes()));
        }
        let false_positives = (0..200).filter(|i| filter.might_contain(Hash::double_sha256(format!("absent{i}").as_bytes()))).count();
        assert!(false_positives < 20, "false positive rate too high: {false_positives}/200");
    }
}
