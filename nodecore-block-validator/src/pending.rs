use nodecore_consensus_core::hash::Hash;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Tracks blocks currently being validated on the control thread, so an
/// arrival whose parent is mid-validation can wait for it instead of either
/// racing ahead or being rejected as unknown. Polling with capped backoff
/// rather than a condvar wake keeps this consistent with the rest of the
/// crate's worker-thread/channel idiom: there is no single waiter to signal,
/// since `begin`/`end` happen on the one control thread while the wait
/// itself blocks a request thread.
pub struct PendingSet {
    inner: Mutex<HashSet<Hash>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashSet::new()) }
    }

    pub fn is_pending(&self, hash: Hash) -> bool {
        self.inner.lock().contains(&hash)
    }

    pub fn begin(&self, hash: Hash) {
        self.inner.lock().insert(hash);
    }

    pub fn end(&self, hash: Hash) {
        self.inner.lock().remove(&hash);
    }

    /// Waits for `hash` to leave the pending set, backing off exponentially
    /// from `INITIAL_BACKOFF_MS` up to a 10s cap. Returns `false` if `hash`
    /// is still pending when the deadline elapses.
    pub fn wait_until_done(&self, hash: Hash, deadline: Duration) -> bool {
        let start = std::time::Instant::now();
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        loop {
            if !self.is_pending(hash) {
                return true;
            }
            if start.elapsed() >= deadline {
                return false;
            }
            std::thread::sleep(backoff.min(MAX_BACKOFF));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_marks_pending_end_clears() {
        let set = PendingSet::new();
        let hash = Hash::double_sha256(b"a");
        assert!(!set.is_pending(hash));
        set.begin(hash);
        assert!(set.is_pending(hash));
        set.end(hash);
        assert!(!set.is_pending(hash));
    }

    #[test]
    fn test_wait_until_done_returns_true_once_cleared() {
        let set = PendingSet::new();
        let hash = Hash::double_sha256(b"a");
        set.begin(hash);
        set.end(hash);
        assert!(set.wait_until_done(hash, Duration::from_millis(500)));
    }

    #[test]
    fn test_wait_until_done_times_out_while_still_pending() {
        let set = PendingSet::new();
        let hash = Hash::double_sha256(b"a");
        set.begin(hash);
        assert!(!set.wait_until_done(hash, Duration::from_millis(30)));
    }
}
