#![forbid(unsafe_code)]

//! The change queue: a [`Coordinator`] driving two-phase batches.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use cellflow_core::{BufferedValue, Coordinator};
//! use cellflow_runtime::ChangeQueue;
//!
//! let queue = Rc::new(ChangeQueue::new());
//! let speed: BufferedValue<u32> = BufferedValue::bound(0, &queue);
//!
//! speed.change(30);
//! assert_eq!(speed.now(), 0);
//! assert_eq!(speed.then(), 30);
//!
//! let report = queue.run_batch();
//! assert_eq!(report.entries, 1);
//! assert_eq!(speed.now(), 30);
//! ```
//!
//! # Re-entrancy
//!
//! Observers may enqueue while a batch runs: nothing is borrowed while
//! observers execute. What happens to those entries is decided by the
//! configured [`DrainPolicy`]. Calling `run_batch` from inside a batch is a
//! programming error and panics.
//!
//! # Failure Modes
//!
//! - **Observer panics**: the panic propagates out of `run_batch`. Entries
//!   of the interrupted round that were not committed return to the front
//!   of the queue, so the next batch announces and commits each of them
//!   once. Rounds that completed earlier in a fixpoint batch stay committed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use cellflow_core::{BatchReport, CellRef, Coordinator, dispatch};

use crate::config::{DrainPolicy, QueueConfig};
use crate::error::Result;

/// FIFO queue of pending cell notifications.
pub struct ChangeQueue {
    config: QueueConfig,
    pending: RefCell<VecDeque<CellRef>>,
    running: Cell<bool>,
    batches: Cell<u64>,
}

impl ChangeQueue {
    /// Queue with the default (snapshot) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(QueueConfig::default())
    }

    /// Queue with a validated configuration.
    pub fn with_config(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QueueConfig) -> Self {
        Self {
            pending: RefCell::new(VecDeque::with_capacity(config.initial_capacity)),
            config,
            running: Cell::new(false),
            batches: Cell::new(0),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Entries waiting for the next batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether no entries are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Whether a batch is executing right now.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Number of `run_batch` calls completed so far.
    #[must_use]
    pub fn batches_run(&self) -> u64 {
        self.batches.get()
    }

    fn take_round(&self) -> Round<'_> {
        Round {
            pending: &self.pending,
            entries: self.pending.borrow_mut().drain(..).collect(),
        }
    }
}

impl Default for ChangeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("policy", &self.config.policy)
            .field("pending", &self.pending.try_borrow().map(|p| p.len()).ok())
            .field("running", &self.running.get())
            .field("batches", &self.batches.get())
            .finish()
    }
}

/// Clears the running flag even when an observer panics.
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Entries taken from the queue for one round.
///
/// Whatever is left uncommitted when the round is dropped (an observer
/// panicked) goes back to the front of the queue in its original order.
struct Round<'a> {
    pending: &'a RefCell<VecDeque<CellRef>>,
    entries: VecDeque<CellRef>,
}

impl Drop for Round<'_> {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let requeued = self.entries.len();
        let mut pending = self.pending.borrow_mut();
        while let Some(entry) = self.entries.pop_back() {
            pending.push_front(entry);
        }
        tracing::warn!(requeued, "cellflow.batch interrupted; uncommitted entries requeued");
    }
}

impl Coordinator for ChangeQueue {
    fn enqueue(&self, cell: CellRef) {
        self.pending.borrow_mut().push_back(cell);
    }

    /// # Panics
    ///
    /// Panics when called from inside a running batch.
    fn run_batch(&self) -> BatchReport {
        assert!(
            !self.running.replace(true),
            "run_batch called from inside a running batch"
        );
        let _running = RunningGuard(&self.running);

        let span = tracing::debug_span!(
            "cellflow.batch",
            policy = self.config.policy.as_str(),
            rounds = tracing::field::Empty,
            entries = tracing::field::Empty,
            deferred = tracing::field::Empty
        );
        let _enter = span.enter();

        let mut report = BatchReport::default();
        loop {
            let mut round = self.take_round();
            if round.entries.is_empty() {
                break;
            }
            report.absorb(dispatch(&mut round.entries));
            drop(round);

            if self.config.policy == DrainPolicy::Snapshot {
                break;
            }
            if report.rounds >= self.config.max_rounds {
                let remaining = self.len();
                if remaining > 0 {
                    tracing::warn!(
                        max_rounds = self.config.max_rounds,
                        remaining,
                        "cellflow.batch hit the round limit; deferring the rest"
                    );
                }
                break;
            }
        }
        report.deferred = self.len();

        span.record("rounds", report.rounds);
        span.record("entries", report.entries);
        span.record("deferred", report.deferred);
        self.batches.set(self.batches.get() + 1);
        report
    }
}
