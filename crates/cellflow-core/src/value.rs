#![forbid(unsafe_code)]

//! Immediate cells.
//!
//! A [`Value<T>`] applies a change synchronously: after `change_to` returns,
//! every reader sees the new value. Only the notification is deferred until
//! the coordinator runs a batch. This lets producers apply many unrelated
//! mutations and fire all announcements together later without changing when
//! the data becomes authoritative.
//!
//! Cloning a `Value` creates a new handle to the **same** cell.
//!
//! # Failure Modes
//!
//! - **Change from inside [`with`](Value::with)**: the value is borrowed for the
//!   duration of the closure, so calling `change_to` on the same cell from
//!   inside it panics (re-entrant borrow).
//! - **[`change`](Value::change) on an unbound cell**: panics; there is no
//!   implicit process-wide coordinator.
//! - **[`change`](Value::change) after the bound coordinator was dropped**:
//!   panics. A cell holds its coordinator weakly, since the coordinator's
//!   queue holds the cell strongly.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::cell::{CellId, CellKind, CellRef, ObservableCell, sealed};
use crate::coordinator::Coordinator;
use crate::observer::{Observer, ObserverList};
use crate::sequence::{SequenceKind, VecKind};

struct ValueInner<T: 'static, K: SequenceKind> {
    value: RefCell<T>,
    observers: ObserverList<Value<T, K>, K>,
    coordinator: Option<Weak<dyn Coordinator>>,
}

/// Observable cell whose value updates immediately and whose observers are
/// notified in the next batch.
pub struct Value<T: 'static, K: SequenceKind = VecKind> {
    inner: Rc<ValueInner<T, K>>,
}

impl<T: 'static, K: SequenceKind> Clone for Value<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static, K: SequenceKind> fmt::Debug for Value<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Value");
        dbg.field("id", &self.id());
        match self.inner.value.try_borrow() {
            Ok(v) => dbg.field("value", &*v),
            Err(_) => dbg.field("value", &"<borrowed>"),
        };
        dbg.field("observers", &self.inner.observers.live_count())
            .finish()
    }
}

impl<T: Default + 'static, K: SequenceKind> Default for Value<T, K> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: 'static, K: SequenceKind> Value<T, K> {
    /// Create an unbound cell holding `initial`.
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
            inner: Rc::new(ValueInner {
                value: RefCell::new(initial),
                observers: ObserverList::new(),
                coordinator,
            }),
        }
    }

    /// Overwrite the stored value now and queue the announcement with
    /// `coordinator`.
    pub fn change_to<C: Coordinator + ?Sized>(&self, value: T, coordinator: &C) {
        *self.inner.value.borrow_mut() = value;
        tracing::trace!(cell = %self.id(), kind = "immediate", "cellflow.enqueue");
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
                "{} has no default coordinator; use change_to or Value::bound",
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

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the closure changes this same cell (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.borrow();
        f(&value)
    }
}

impl<T: 'static, K: SequenceKind> ObservableCell for Value<T, K> {
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

impl<T: 'static, K: SequenceKind> sealed::Dispatch for Value<T, K> {
    fn cell_id(&self) -> CellId {
        self.id()
    }

    fn cell_kind(&self) -> CellKind {
        CellKind::Immediate
    }

    fn announce(&self) -> usize {
        self.inner.observers.notify(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
