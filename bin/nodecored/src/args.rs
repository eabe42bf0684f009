use clap::Parser;

/// Command-line surface for the daemon. Anything not given here falls
/// through to the TOML config file and, below that, to [`Config::default`]
/// (`nodecore_consensus_core::config::Config`) — the same three-tier
/// override order `kaspad` uses for its own CLI/file/default stack.
#[derive(Parser, Debug)]
#[command(name = "nodecored", version, about = "Nodecore full-node core engine")]
pub struct Args {
    /// RocksDB data directory. Overrides `data_dir` in the config file.
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Path to a TOML config file. Optional; the daemon runs on pure
    /// defaults if omitted.
    #[arg(short, long)]
    pub config: Option<String>,

    /// `RUST_LOG`-style filter expression, e.g. `info,nodecore_chain_store=debug`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory for rotating log files; console-only when omitted.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Disables optimistic block validation (validate fully before persisting).
    #[arg(long)]
    pub no_optimistic: bool,

    /// Per-store RocksDB row-cache entry count.
    #[arg(long, default_value_t = 10_000)]
    pub cache_size: u64,
}
