#![forbid(unsafe_code)]

//! Buffered cells: values committed only after announcement.
//!
//! A [`BufferedValue`] keeps a committed value ("now") and a buffer of
//! pending values. A change only inserts into the buffer. When a batch runs,
//! every queued cell is announced first; observers can read both
//! [`now`](BufferedValue::now) and [`then`](BufferedValue::then). Only after
//! all announces of the round does each entry commit, moving the buffer head
//! into "now".
//!
//! Because no commit happens before the last announce of a round, observers
//! of different cells changing in the same batch all see a consistent
//! "before" / "about to become" pair.
//!
//! # Several changes before one batch
//!
//! Each change adds one buffer entry and one queue entry. Within the batch,
//! every announce for the cell peeks the *shared* buffer head, which is the
//! same value for all of them since nothing has been committed yet. The
//! commits then pop the buffer once per entry, so with the FIFO buffer the
//! last queued value ends up committed.
//!
//! # Invariants
//!
//! 1. "now" only changes inside `commit`.
//! 2. The buffer only grows in `change_to` and only shrinks in `commit`.
//! 3. After a batch that dispatched every entry of a cell, its buffer is empty.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::buffer::{Fifo, PendingBuffer};
use crate::cell::{CellId, CellKind, CellRef, ObservableCell, sealed};
use crate::coordinator::Coordinator;
use crate::observer::{Observer, ObserverList};
use crate::sequence::{SequenceKind, VecKind};

struct BufferedInner<T: 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> {
    committed: RefCell<T>,
    pending: RefCell<B>,
    observers: ObserverList<BufferedValue<T, B, K>, K>,
    coordinator: Option<Weak<dyn Coordinator>>,
}

/// Observable cell with a two-phase commit.
///
/// Cloning a `BufferedValue` creates a new handle to the **same** cell.
pub struct BufferedValue<T: 'static, B: PendingBuffer<T> + 'static = Fifo<T>, K: SequenceKind = VecKind>
{
    inner: Rc<BufferedInner<T, B, K>>,
}

impl<T: 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> Clone for BufferedValue<T, B, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, B, K> fmt::Debug for BufferedValue<T, B, K>
where
    T: fmt::Debug + 'static,
    B: PendingBuffer<T> + 'static,
    K: SequenceKind,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("BufferedValue");
        dbg.field("id", &self.id());
        match self.inner.committed.try_borrow() {
            Ok(v) => dbg.field("now", &*v),
            Err(_) => dbg.field("now", &"<borrowed>"),
        };
        match self.inner.pending.try_borrow() {
            Ok(p) => dbg.field("then", &p.first()).field("pending", &p.len()),
            Err(_) => dbg.field("then", &"<borrowed>"),
        };
        dbg.field("observers", &self.inner.observers.live_count())
            .finish()
    }
}

impl<T: Default + 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> Default
    for BufferedValue<T, B, K>
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> BufferedValue<T, B, K> {
    /// Create an unbound cell whose committed value is `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::build(initial, None)
    }

    /// Create a cell whose [`change`](Self::change) enqueues with `coordinator`.
    #[must_use]
    pub fn bound<C: Coordinator + 'static>(initial: T, coordinator: &Rc<C>) -> Self {
        let coordinator = Rc::downgrade(coordinator) as Weak<dyn Coordinator>;
        Self::build(initial, Some(coordinator))
    }

    fn build(initial: T, coordinator: Option<Weak<dyn Coordinator>>) -> Self {
        Self {
            inner: Rc::new(BufferedInner {
                committed: RefCell::new(initial),
                pending: RefCell::new(B::default()),
                observers: ObserverList::new(),
                coordinator,
            }),
        }
    }

    /// Buffer `value` and queue the cell with `coordinator`.
    ///
    /// The committed value is left untouched until the batch commits.
    pub fn change_to<C: Coordinator + ?Sized>(&self, value: T, coordinator: &C) {
        let depth = {
            let mut pending = self.inner.pending.borrow_mut();
            pending.insert(value);
            pending.len()
        };
        tracing::trace!(cell = %self.id(), kind = "buffered", depth, "cellflow.enqueue");
        coordinator.enqueue(CellRef::new(self.clone()));
    }

    /// [`change_to`](Self::change_to) using the coordinator bound at
    /// construction.
    ///
    /// # Panics
    ///
    /// Panics if the cell was created without a coordinator, or if that
    /// coordinator has been dropped.
    pub fn change(&self, value: T) {
        let Some(bound) = self.inner.coordinator.as_ref() else {
            panic!(
                "{} has no default coordinator; use change_to or BufferedValue::bound",
                self.id()
            );
        };
        let Some(coordinator) = bound.upgrade() else {
            panic!("{} outlived its bound coordinator", self.id());
        };
        self.change_to(value, &*coordinator);
    }

    /// Whether [`change`](Self::change) may be used: the cell was bound and
    /// its coordinator is still alive.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner
            .coordinator
            .as_ref()
            .is_some_and(|c| c.strong_count() > 0)
    }

    /// The committed value.
    #[must_use]
    pub fn now(&self) -> T
    where
        T: Clone,
    {
        self.inner.committed.borrow().clone()
    }

    /// Access the committed value by reference.
    pub fn with_now<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let committed = self.inner.committed.borrow();
        f(&committed)
    }

    /// The value the next commit will install.
    ///
    /// # Panics
    ///
    /// Panics if no change is pending.
    #[must_use]
    pub fn then(&self) -> T
    where
        T: Clone,
    {
        self.with_then(T::clone)
    }

    /// The value the next commit will install, or `None` if nothing is pending.
    #[must_use]
    pub fn try_then(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.pending.borrow().first().cloned()
    }

    /// Access the pending head by reference.
    ///
    /// # Panics
    ///
    /// Panics if no change is pending, or if the closure changes this same
    /// cell (re-entrant borrow).
    pub fn with_then<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let pending = self.inner.pending.borrow();
        match pending.first() {
            Some(head) => f(head),
            None => panic!("{} has no pending value to read", self.id()),
        }
    }

    /// Number of buffered, uncommitted values.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Whether at least one value is waiting to be committed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }
}

impl<T: 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> ObservableCell
    for BufferedValue<T, B, K>
{
    fn id(&self) -> CellId {
        CellId::of(&self.inner)
    }

    fn register_weak(&self, observer: Weak<dyn Observer<Self>>) {
        self.inner.observers.register(observer);
    }

    fn unregister_ptr(&self, target: *const ()) -> usize {
        self.inner.observers.unregister(target)
    }

    fn observer_count(&self) -> usize {
        self.inner.observers.live_count()
    }
}

impl<T: 'static, B: PendingBuffer<T> + 'static, K: SequenceKind> sealed::Dispatch
    for BufferedValue<T, B, K>
{
    fn cell_id(&self) -> CellId {
        self.id()
    }

    fn cell_kind(&self) -> CellKind {
        CellKind::Buffered
    }

    fn announce(&self) -> usize {
        self.inner.observers.notify(self)
    }

    fn commit(&self) {
        let head = self.inner.pending.borrow_mut().drop_first();
        let Some(next) = head else {
            panic!("{} committed with an empty pending buffer", self.id());
        };
        *self.inner.committed.borrow_mut() = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
