//! Build gate
//!
//! Reads issued while a build is in flight must not touch the output store
//! until the build completes with output. The gate holds those reads as
//! deferred thunks in a FIFO queue. The queue slot doubles as the build
//! state: no queue means idle, a queue (possibly empty) means building.

use std::collections::VecDeque;

/// A deferred read operation, invoked once when the gate is released
pub type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of reads blocked on the next completed build with output
#[derive(Default)]
pub struct BuildGate {
    queue: Option<VecDeque<Thunk>>,
}

impl BuildGate {
    /// Create a gate in the idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the building state. Re-entrant: an invalidation while already
    /// building must not lose a non-empty queue.
    pub fn open(&mut self) {
        if self.queue.is_none() {
            self.queue = Some(VecDeque::new());
        }
    }

    /// Whether a build is currently in flight
    pub fn is_building(&self) -> bool {
        self.queue.is_some()
    }

    /// Number of reads currently blocked
    pub fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, VecDeque::len)
    }

    /// Defer a read until the gate is released. Only meaningful while
    /// building; an enqueue against an idle gate is a caller bug.
    pub fn enqueue(&mut self, thunk: Thunk) {
        debug_assert!(self.queue.is_some(), "enqueue on an idle gate");
        self.queue.get_or_insert_with(VecDeque::new).push_back(thunk);
    }

    /// Return to idle, handing back the queued thunks in insertion order.
    /// The caller invokes them outside any state lock so a thunk failure
    /// surfaces only through that read's own completion channel.
    pub fn release(&mut self) -> VecDeque<Thunk> {
        self.queue.take().unwrap_or_default()
    }
}

impl std::fmt::Debug for BuildGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildGate")
            .field("building", &self.is_building())
            .field("pending", &self.pending())
            .finish()
    }
}
