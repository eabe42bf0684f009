use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::subtree::{Subtree, SubtreeLeaf};
use std::collections::{HashSet, VecDeque};

/// `Running` processes `add`/`move_up`/`move_down` immediately. In
/// `Reorging`, incoming `add` leaves buffer into a side queue instead of
/// being folded into the in-flight subtrees, and are drained once the
/// processor returns to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Running,
    Reorging,
}

/// Owns every in-flight subtree: zero or more completed subtrees followed by
/// one partial subtree still accepting leaves. The oldest entry is always
/// the one carrying the coinbase placeholder at leaf 0.
pub struct InFlight {
    capacity: usize,
    subtrees: VecDeque<Subtree>,
    side_queue: Vec<SubtreeLeaf>,
    pub state: ProcessorState,
}

impl InFlight {
    pub fn new(capacity: usize) -> Self {
        let mut subtrees = VecDeque::new();
        subtrees.push_back(Subtree::new(capacity));
        Self { capacity, subtrees, side_queue: Vec::new(), state: ProcessorState::Running }
    }

    /// Appends a leaf to the live front subtree, rotating in a fresh one
    /// when it fills. Buffers into the side queue instead while reorging.
    /// Returns the root and leaves of a subtree that just completed and
    /// rotated out of the front, for the caller to persist to blob storage.
    pub fn add_leaf(&mut self, leaf: SubtreeLeaf) -> Option<(Hash, Vec<SubtreeLeaf>)> {
        if self.state == ProcessorState::Reorging {
            self.side_queue.push(leaf);
            return None;
        }
        self.add_leaf_immediate(leaf)
    }

    fn add_leaf_immediate(&mut self, leaf: SubtreeLeaf) -> Option<(Hash, Vec<SubtreeLeaf>)> {
        let front = self.subtrees.back_mut().expect("in-flight queue always has a live front subtree");
        front.push(leaf);
        if front.is_complete() {
            let completed = front.clone();
            self.subtrees.push_back(Subtree::new_empty(self.capacity));
            return Some((completed.root_hash(), completed.leaves().to_vec()));
        }
        None
    }

    /// Drains leaves buffered while reorging, applied in arrival order once
    /// the processor returns to `Running`. Returns every subtree that
    /// completed during the drain, in completion order, for persistence.
    pub fn drain_side_queue(&mut self) -> Vec<(Hash, Vec<SubtreeLeaf>)> {
        let buffered = std::mem::take(&mut self.side_queue);
        buffered.into_iter().filter_map(|leaf| self.add_leaf_immediate(leaf)).collect()
    }

    /// Drops every leaf in `mined` from every in-flight subtree, then
    /// retires any subtree left holding only the placeholder (it has been
    /// fully mined into the block), finally ensuring exactly one subtree —
    /// the new oldest — carries the placeholder.
    pub fn strip_mined(&mut self, mined: &HashSet<nodecore_consensus_core::tx::TransactionId>) {
        for subtree in self.subtrees.iter_mut() {
            subtree.retain(|leaf| !mined.contains(&leaf.txid));
        }

        while self.subtrees.len() > 1 {
            let oldest = self.subtrees.front().expect("checked non-empty above");
            if oldest.has_placeholder_front() && oldest.len() == 1 {
                self.subtrees.pop_front();
            } else {
                break;
            }
        }

        self.ensure_placeholder_front();
    }

    /// Prepends `leaves`, chunked to `capacity` with the first chunk
    /// reserving a slot for the placeholder, ahead of the current in-flight
    /// subtrees — reintroducing a rolled-back block's transactions.
    pub fn reintroduce(&mut self, leaves: Vec<SubtreeLeaf>) {
        if leaves.is_empty() {
            return;
        }
        if let Some(current_front) = self.subtrees.front_mut() {
            current_front.remove_placeholder_front();
        }

        let mut rebuilt: VecDeque<Subtree> = VecDeque::new();
        let mut chunk = Subtree::new_empty(self.capacity);
        for leaf in leaves {
            if chunk.is_complete() {
                rebuilt.push_back(chunk);
                chunk = Subtree::new_empty(self.capacity);
            }
            chunk.push(leaf);
        }
        rebuilt.push_back(chunk);

        for subtree in rebuilt.into_iter().rev() {
            self.subtrees.push_front(subtree);
        }
        self.ensure_placeholder_front();
    }

    fn ensure_placeholder_front(&mut self) {
        if self.subtrees.is_empty() {
            self.subtrees.push_back(Subtree::new(self.capacity));
            return;
        }
        let front = self.subtrees.front_mut().expect("checked non-empty above");
        if !front.has_placeholder_front() {
            front.insert_placeholder_front();
        }
    }

    /// Snapshot of every in-flight subtree, oldest first, for mining
    /// candidate construction. The oldest entry carries the placeholder.
    pub fn snapshot(&self) -> Vec<Subtree> {
        self.subtrees.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecore_consensus_core::hash::Hash;

    fn leaf(label: &str) -> SubtreeLeaf {
        SubtreeLeaf::new(Hash::double_sha256(label.as_bytes()), 10, 200)
    }

    #[test]
    fn test_new_has_single_front_with_placeholder() {
        let flight = InFlight::new(4);
        assert_eq!(flight.snapshot().len(), 1);
        assert!(flight.snapshot()[0].has_placeholder_front());
    }

    #[test]
    fn test_add_rotates_on_completion() {
        let mut flight = InFlight::new(2);
        flight.add_leaf(leaf("tx0"));
        assert_eq!(flight.snapshot().len(), 2);
        assert!(flight.snapshot()[0].is_complete());
        assert!(!flight.snapshot()[1].has_placeholder_front());
    }

    #[test]
    fn test_reorging_buffers_adds_into_side_queue() {
        let mut flight = InFlight::new(4);
        flight.state = ProcessorState::Reorging;
        flight.add_leaf(leaf("tx0"));
        assert_eq!(flight.snapshot()[0].len(), 1);
        flight.state = ProcessorState::Running;
        flight.drain_side_queue();
        assert_eq!(flight.snapshot()[0].len(), 2);
    }

    #[test]
    fn test_strip_mined_retires_fully_consumed_oldest_and_shifts_placeholder() {
        let mut flight = InFlight::new(2);
        let a = leaf("tx0");
        let b = leaf("tx1");
        flight.add_leaf(a);
        flight.add_leaf(b);
        let mut mined = HashSet::new();
        mined.insert(a.txid);
        flight.strip_mined(&mined);
        let snap = flight.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].has_placeholder_front());
        assert_eq!(snap[0].leaves()[1].txid, b.txid);
    }

    #[test]
    fn test_reintroduce_prepends_and_restores_placeholder() {
        let mut flight = InFlight::new(4);
        flight.add_leaf(leaf("tx0"));
        let restored = vec![leaf("old0"), leaf("old1")];
        flight.reintroduce(restored);
        let snap = flight.snapshot();
        assert!(snap[0].has_placeholder_front());
        assert_eq!(snap[0].leaves()[1].txid, Hash::double_sha256(b"old0"));
        assert_eq!(snap[0].leaves()[2].txid, Hash::double_sha256(b"old1"));
    }
}
