use serde::{Deserialize, Serialize};

use crate::constants::{BIP34_ACTIVATION_HEIGHT, COINBASE_MATURITY, UAHF_FORK_HEIGHT};

/// Every tunable named by the spec, combined the way `kaspad`'s CLI args
/// combine with its TOML config: flags override the file, the file overrides
/// these defaults. Fields with no sane default (e.g. `data_dir`) are plain
/// `Option`s so a missing value surfaces as a `Configuration` error at
/// startup rather than a silent zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RocksDB data directory. Required; no default.
    pub data_dir: Option<String>,

    /// Fixed leaf capacity of every subtree; must be a power of two.
    pub subtree_capacity: usize,

    /// Minimum age (in blocks) a tx must accumulate before a reorg may
    /// discard the subtree state built around it without error.
    pub min_age: u32,

    /// Maximum number of blocks a reorg may roll back before it errors
    /// with `NoCommonAncestor`.
    pub max_rollback: u32,

    /// Number of retries on subtree blob-store I/O before treating the
    /// failure as fatal.
    pub max_subtree_io_retries: u32,

    /// Maximum permitted drift between a block's timestamp and local time,
    /// in seconds.
    pub future_time_bound_secs: u32,

    /// Bounded worker-pool size used for catch-up block fetches; when `None`,
    /// defaults to `NumCPU / 2`.
    pub catchup_concurrency: Option<usize>,

    /// Policy maxima.
    pub max_tx_size: usize,
    pub max_sig_ops: u32,
    pub max_script_len: usize,

    /// Minimum relay fee rate, in satoshis per byte.
    pub min_relay_fee_per_byte: u64,

    pub uahf_fork_height: u32,
    pub bip34_activation_height: u32,
    pub coinbase_maturity: u32,

    /// Number of blocks queued on the block-found channel before new
    /// announcements are diverted to the catch-up backlog.
    pub block_found_backlog_threshold: usize,

    /// Whether the block validator applies a block optimistically before
    /// all ancestor dependencies are confirmed valid.
    pub optimistic_mode: bool,

    /// `nBits` used for a mining candidate when no difficulty source is
    /// configured.
    pub fallback_bits: u32,

    pub log_filters: String,
    pub log_dir: Option<String>,

    /// Seconds a tx-meta record must stay tombstone-eligible before the
    /// sweep deletes it.
    pub tombstone_ttl_secs: u32,

    /// Interval between tombstone sweep passes, in seconds.
    pub tombstone_sweep_interval_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            subtree_capacity: 1 << 20,
            min_age: 100,
            max_rollback: 1_000,
            max_subtree_io_retries: 5,
            future_time_bound_secs: 2 * 60 * 60,
            catchup_concurrency: None,
            max_tx_size: 1_000_000,
            max_sig_ops: 20_000,
            max_script_len: 10_000,
            min_relay_fee_per_byte: 1,
            uahf_fork_height: UAHF_FORK_HEIGHT,
            bip34_activation_height: BIP34_ACTIVATION_HEIGHT,
            coinbase_maturity: COINBASE_MATURITY,
            block_found_backlog_threshold: 64,
            optimistic_mode: true,
            fallback_bits: 0x1d00ffff,
            log_filters: "info".to_string(),
            log_dir: None,
            tombstone_ttl_secs: 24 * 60 * 60,
            tombstone_sweep_interval_secs: 10 * 60,
        }
    }
}

impl Config {
    /// Resolves the catch-up worker pool size, defaulting to `NumCPU / 2` (minimum 1).
    pub fn resolved_catchup_concurrency(&self) -> usize {
        self.catchup_concurrency.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
            (cpus / 2).max(1)
        })
    }
}
