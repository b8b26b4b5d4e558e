#![forbid(unsafe_code)]

//! The cell base contract.
//!
//! Every cell kind offers observer registration through [`ObservableCell`]
//! and takes part in dispatch through a sealed two-phase interface:
//!
//! 1. **announce**: call every registered observer with the cell.
//! 2. **commit**: finalize any deferred state (no-op for immediate cells).
//!
//! Coordinators never see concrete cell types. They receive a [`CellRef`],
//! an opaque handle that exposes only the two phases plus identity. The
//! handle owns a strong reference, so a queued cell stays alive until its
//! entry has been dispatched or dropped.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::observer::{Observer, Subscription};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identity of a cell: the address of its shared storage.
///
/// Two handles to the same cell have the same id. An id may be reused after
/// every handle to a cell has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

impl CellId {
    pub(crate) fn of<T: ?Sized>(storage: &Rc<T>) -> Self {
        Self(Rc::as_ptr(storage) as *const () as usize)
    }

    /// Raw address value.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell@{:#x}", self.0)
    }
}

/// Which dispatch rule a cell follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Value updated at change time; only the notification is deferred.
    Immediate,
    /// Value committed after the announce phase of its batch.
    Buffered,
}

impl CellKind {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Buffered => "buffered",
        }
    }
}

// ─── Observer registration ───────────────────────────────────────────────────

/// Observer registration shared by every cell kind.
pub trait ObservableCell: Sized + 'static {
    /// Identity of this cell.
    fn id(&self) -> CellId;

    /// Append a weak observer reference.
    ///
    /// # Panics
    ///
    /// Panics if the observer has already been dropped.
    fn register_weak(&self, observer: Weak<dyn Observer<Self>>);

    /// Remove every registration of the observer at `target`.
    fn unregister_ptr(&self, target: *const ()) -> usize;

    /// Number of live registrations.
    fn observer_count(&self) -> usize;

    /// Register `observer` without taking ownership of it.
    ///
    /// The same observer may be registered more than once; it is then
    /// notified once per registration.
    fn register_observer<O: Observer<Self> + 'static>(&self, observer: &Rc<O>) {
        let weak = Rc::downgrade(observer) as Weak<dyn Observer<Self>>;
        self.register_weak(weak);
    }

    /// Remove every registration of `observer`. Returns how many were removed.
    fn unregister_observer<O: Observer<Self> + 'static>(&self, observer: &Rc<O>) -> usize {
        self.unregister_ptr(Rc::as_ptr(observer) as *const ())
    }

    /// Register a closure observer whose lifetime is tied to the returned guard.
    fn subscribe(&self, f: impl Fn(&Self) + 'static) -> Subscription {
        let observer = Rc::new(f);
        self.register_observer(&observer);
        Subscription::new(observer)
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

pub(crate) mod sealed {
    use super::{CellId, CellKind};

    /// Two-phase dispatch entry points. Only cells in this crate implement it.
    pub trait Dispatch {
        fn cell_id(&self) -> CellId;
        fn cell_kind(&self) -> CellKind;
        fn announce(&self) -> usize;
        fn commit(&self) {}
    }
}

/// Opaque, type-erased handle to a cell waiting in a coordinator queue.
pub struct CellRef {
    cell: Box<dyn sealed::Dispatch>,
}

impl CellRef {
    pub(crate) fn new(cell: impl sealed::Dispatch + 'static) -> Self {
        Self {
            cell: Box::new(cell),
        }
    }

    /// Identity of the referenced cell.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CellId {
        self.cell.cell_id()
    }

    /// Dispatch rule of the referenced cell.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CellKind {
        self.cell.cell_kind()
    }

    /// Phase 1: notify every observer of the cell, in registration order.
    ///
    /// Returns the number of observers invoked.
    pub fn announce(&self) -> usize {
        self.cell.announce()
    }

    /// Phase 2: finalize the cell's deferred state.
    ///
    /// # Panics
    ///
    /// For buffered cells, panics if no pending value is left to commit.
    pub fn commit(&self) {
        self.cell.commit();
    }
}

impl fmt::Debug for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRef")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish()
    }
}
