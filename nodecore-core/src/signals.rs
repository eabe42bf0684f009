use std::sync::Arc;

/// Implemented by anything that can be asked to shut down exactly once.
pub trait Shutdown {
    fn shutdown(self: &Arc<Self>);
}

/// Installs a Ctrl+C handler that triggers an orderly shutdown of `core` on
/// the first signal, and a hard exit on a repeated signal.
pub struct Signals<T: Shutdown + Send + Sync + 'static> {
    target: Arc<T>,
    iterations: std::sync::atomic::AtomicU64,
}

impl<T: Shutdown + Send + Sync + 'static> Signals<T> {
    pub fn new(target: Arc<T>) -> Arc<Signals<T>> {
        Arc::new(Signals { target, iterations: std::sync::atomic::AtomicU64::new(0) })
    }

    pub fn init(self: &Arc<Self>) {
        use std::sync::atomic::Ordering;

        let signals = self.clone();
        ctrlc::set_handler(move || {
            let v = signals.iterations.load(Ordering::SeqCst);
            if v >= 1 {
                crate::warn!("second interrupt received, halting immediately");
                std::process::exit(1);
            }
            signals.iterations.store(v + 1, Ordering::SeqCst);
            crate::info!("interrupt received, shutting down (press again to halt)");
            signals.target.shutdown();
        })
        .expect("error installing signal handler");
    }
}
