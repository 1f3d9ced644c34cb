//! Typed histories and the host-side input queue
//!
//! A predicting client keeps two parallel ring histories keyed by tick: the
//! inputs it has applied and the snapshots those inputs produced. The host
//! keeps, per remote controller, a small queue of inputs waiting to be
//! simulated, fed by redundant `{current, previous}` pairs so that a single
//! lost packet usually costs nothing.

use std::collections::VecDeque;

use presage_core::{Snapshot, Stamped, Tick};
use presage_history::{RingHistory, StaleTick};
use tracing::trace;

/// Ring history of the inputs a local controller has simulated
#[derive(Debug, Clone)]
pub struct InputHistory<I> {
    records: RingHistory<I>,
}

impl<I: Clone> InputHistory<I> {
    /// Create a history holding at most `capacity` inputs
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RingHistory::new(capacity),
        }
    }

    /// Record an input under its tick
    pub fn record(&mut self, input: &Stamped<I>) -> Result<(), StaleTick> {
        self.records.push(input.tick, input.value.clone())
    }

    /// Clone out every input with tick strictly greater than `tick`
    ///
    /// This is the replay set for a reconciliation rooted at `tick`.
    pub fn after(&self, tick: Tick) -> Vec<Stamped<I>> {
        self.records
            .iter_after(tick)
            .map(|e| Stamped::new(e.tick, e.value.clone()))
            .collect()
    }

    /// Drop inputs with tick at or below `tick`
    pub fn clear_through(&mut self, tick: Tick) {
        self.records.clear_through(tick);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of buffered inputs
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no inputs are buffered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ring history of the snapshots a local controller has predicted
#[derive(Debug, Clone)]
pub struct StateBuffer<S> {
    records: RingHistory<Snapshot<S>>,
}

impl<S: Clone> StateBuffer<S> {
    /// Create a buffer holding at most `capacity` snapshots
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RingHistory::new(capacity),
        }
    }

    /// Record a snapshot under its own tick
    pub fn record(&mut self, snapshot: Snapshot<S>) -> Result<(), StaleTick> {
        self.records.push(snapshot.tick, snapshot)
    }

    /// Get the snapshot captured at exactly `tick`
    pub fn get(&self, tick: Tick) -> Option<&Snapshot<S>> {
        self.records.get(tick)
    }

    /// Drop snapshots with tick at or below `tick`
    pub fn clear_through(&mut self, tick: Tick) {
        self.records.clear_through(tick);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of buffered snapshots
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no snapshots are buffered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Host-side queue of inputs awaiting simulation for one remote controller
///
/// Arrival order is untrusted; the queue only accepts ticks newer than
/// anything it has already seen, and it folds the redundant previous input
/// in first so a gap left by one lost packet closes without a filler.
#[derive(Debug, Clone)]
pub struct InputQueue<I> {
    queue: VecDeque<Stamped<I>>,
    last_queued_tick: Option<Tick>,
    capacity: usize,
}

impl<I> InputQueue<I> {
    /// Create a queue holding at most `capacity` inputs
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            last_queued_tick: None,
            capacity,
        }
    }

    fn accept(&mut self, input: Stamped<I>) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.last_queued_tick = Some(input.tick);
        self.queue.push_back(input);
    }

    fn is_new(&self, tick: Tick) -> bool {
        self.last_queued_tick.is_none_or(|last| tick > last)
    }

    /// Fold one received `{input, previous}` pair into the queue
    ///
    /// The previous input is enqueued first if it is new; then the current
    /// one. Anything at or below the newest queued tick is ignored.
    pub fn observe(&mut self, input: Stamped<I>, previous: Option<Stamped<I>>) {
        if let Some(previous) = previous {
            if self.is_new(previous.tick) {
                self.accept(previous);
            }
        }
        if self.is_new(input.tick) {
            self.accept(input);
        } else {
            trace!(tick = input.tick, "ignoring replayed input");
        }
    }

    /// Take the oldest queued input
    pub fn pop(&mut self) -> Option<Stamped<I>> {
        self.queue.pop_front()
    }

    /// Number of queued inputs
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all queued inputs and forget the tick watermark
    pub fn clear(&mut self) {
        self.queue.clear();
        self.last_queued_tick = None;
    }
}
