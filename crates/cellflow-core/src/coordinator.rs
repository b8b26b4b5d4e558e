#![forbid(unsafe_code)]

//! The change-coordinator contract.
//!
//! Cells do not notify anyone on their own. A change operation hands a
//! [`CellRef`] to a [`Coordinator`]; the host decides when the coordinator
//! runs a batch (once per frame, once per event-loop tick, ...).
//!
//! # Batch invariant
//!
//! Within one round, phase 1 (`announce`) runs for **every** queued entry, in
//! enqueue order, before phase 2 (`commit`) runs for any entry, in the same
//! order. [`dispatch`] implements exactly this and is what coordinators are
//! expected to call; it must not be replaced by per-entry announce+commit.
//!
//! # Failure Modes
//!
//! - **Observer panics during announce**: the panic propagates out of
//!   [`dispatch`]. Every entry that has not been committed is still in the
//!   round, in order, so the coordinator can return it to its queue and a
//!   later batch announces and commits it.
//! - **Buffered cell with no pending value at commit**: fatal, see
//!   [`BufferedValue`](crate::BufferedValue).

use std::collections::VecDeque;
use std::rc::Rc;

use crate::cell::CellRef;

/// Collector of pending notifications and driver of two-phase batches.
pub trait Coordinator {
    /// Queue a cell for the next batch. Duplicates are kept.
    fn enqueue(&self, cell: CellRef);

    /// Run the queued entries through announce, then commit.
    fn run_batch(&self) -> BatchReport;
}

impl<C: Coordinator + ?Sized> Coordinator for Rc<C> {
    fn enqueue(&self, cell: CellRef) {
        (**self).enqueue(cell);
    }

    fn run_batch(&self) -> BatchReport {
        (**self).run_batch()
    }
}

impl<C: Coordinator + ?Sized> Coordinator for &C {
    fn enqueue(&self, cell: CellRef) {
        (**self).enqueue(cell);
    }

    fn run_batch(&self) -> BatchReport {
        (**self).run_batch()
    }
}

/// Counters describing a completed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Two-phase rounds executed.
    pub rounds: usize,
    /// Queue entries announced and committed.
    pub entries: usize,
    /// Observer invocations delivered during announce.
    pub notifications: usize,
    /// Entries still queued when the batch returned.
    pub deferred: usize,
}

impl BatchReport {
    /// Fold the counters of a later round into this report.
    pub fn absorb(&mut self, round: BatchReport) {
        self.rounds += round.rounds;
        self.entries += round.entries;
        self.notifications += round.notifications;
        self.deferred = round.deferred;
    }

    /// Whether the batch had nothing to do.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.entries == 0
    }
}

/// Run one two-phase round over `round`.
///
/// Announces every entry in queue order, then pops and commits every entry
/// in the same order. `round` is empty on return. If an observer panics,
/// `round` still holds the uncommitted entries when the panic leaves this
/// function.
pub fn dispatch(round: &mut VecDeque<CellRef>) -> BatchReport {
    if round.is_empty() {
        return BatchReport::default();
    }

    let entries = round.len();
    let mut notifications = 0;
    for entry in round.iter() {
        let delivered = entry.announce();
        tracing::trace!(
            cell = %entry.id(),
            kind = entry.kind().as_str(),
            delivered,
            "cellflow.announce"
        );
        notifications += delivered;
    }

    while let Some(entry) = round.pop_front() {
        entry.commit();
    }

    BatchReport {
        rounds: 1,
        entries,
        notifications,
        deferred: 0,
    }
}
