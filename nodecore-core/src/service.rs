use crate::core::Core;
use std::{sync::Arc, thread::JoinHandle};

/// A long-lived subsystem managed by [`Core`]: something that owns a
/// background thread started on demand rather than at construction time.
/// The five pipeline components each spawn their worker thread eagerly in
/// their own constructor instead (so they're usable standalone, e.g. in
/// tests, without a `Core`); the daemon binary holds them directly and
/// drives shutdown itself rather than through this trait. `Service` is for
/// subsystems, like the RPC/metrics listeners, whose lifecycle should
/// genuinely be deferred to `start`.
pub trait Service: Send + Sync {
    fn ident(self: Arc<Self>) -> &'static str;
    fn start(self: Arc<Self>, core: Arc<Core>) -> Vec<JoinHandle<()>>;
    fn stop(self: Arc<Self>);
}
