mod args;
mod blob_store;
mod config;
mod daemon;
mod peer_stub;
mod tombstone_sweeper;

use clap::Parser;
use daemon::Daemon;
use log::info;
use nodecore_core::signals::Signals;

fn main() {
    nodecore_core::panic::configure_panic();

    let args = args::Args::parse();

    let cfg = match config::load_config(&args) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    nodecore_core::log::init_logger(cfg.log_dir.as_deref(), &cfg.log_filters);
    info!("nodecored starting, data_dir={:?}", cfg.data_dir);

    let cache_size = args.cache_size;
    let (daemon, shutdown_rx) = match Daemon::start(cfg, cache_size) {
        Ok(parts) => parts,
        Err(err) => {
            eprintln!("failed to start: {err}");
            std::process::exit(1);
        }
    };

    let signals = Signals::new(daemon.clone());
    signals.init();

    let _ = shutdown_rx.recv();
    info!("shutdown signal received, stopping");
    drop(daemon);
    info!("nodecored stopped");
}
