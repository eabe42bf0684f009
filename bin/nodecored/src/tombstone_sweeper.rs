use crossbeam_channel::{bounded, Sender};
use log::{debug, info};
use nodecore_core::time::unix_now_secs_u32;
use nodecore_utxo::TxMetaStore;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Periodically deletes tx-meta records whose tombstone TTL has elapsed.
/// Runs on its own worker thread, the same spawn/channel/`Drop`-join shape
/// every other pipeline component in this daemon uses, sized down to a
/// single timer tick instead of a command queue since it has no callers.
pub struct TombstoneSweeper {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TombstoneSweeper {
    pub fn start(tx_meta_store: Arc<TxMetaStore>, ttl_secs: u32, interval_secs: u32) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = Duration::from_secs(interval_secs.max(1) as u64);

        let handle = std::thread::Builder::new()
            .name("tombstone-sweeper".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        match tx_meta_store.sweep_tombstoned(unix_now_secs_u32(), ttl_secs) {
                            Ok(0) => debug!("tombstone sweep: nothing expired"),
                            Ok(n) => info!("tombstone sweep: removed {n} expired tx-meta records"),
                            Err(err) => log::warn!("tombstone sweep failed: {err}"),
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            })
            .expect("failed to spawn tombstone sweeper worker thread");

        Self { stop_tx, handle: Some(handle) }
    }
}

impl Drop for TombstoneSweeper {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
