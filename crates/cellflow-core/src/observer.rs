#![forbid(unsafe_code)]

//! Observers, observer lists, and composition adapters.
//!
//! An [`Observer<C>`] is anything that wants to hear about a change of a cell
//! of type `C`. Cells keep observers as `Weak` references: registering never
//! extends an observer's lifetime, and an observer that has been dropped is
//! skipped during announce and pruned lazily afterwards.
//!
//! # Composition over multiple implementations
//!
//! An object that listens to several cells would otherwise need one
//! `Observer` implementation per cell type, and could not tell two cells of
//! the same type apart. [`MemberObserver`] solves both: the object keeps one
//! adapter per subscription, each bound to a distinct method.
//!
//! ```ignore
//! struct Mirror {
//!     left: Rc<MemberObserver<Mirror, Value<i32>>>,
//!     right: Rc<MemberObserver<Mirror, Value<i32>>>,
//! }
//!
//! let mirror = Rc::new_cyclic(|me| Mirror {
//!     left: MemberObserver::attached(me.clone(), Mirror::on_left, &left_cell),
//!     right: MemberObserver::attached(me.clone(), Mirror::on_right, &right_cell),
//! });
//! ```
//!
//! # Invariants
//!
//! 1. Observers are notified in registration order.
//! 2. Duplicate registrations are kept and notified once per registration.
//! 3. An observer registered while an announce is running is first notified
//!    by the next announce.
//! 4. The observers of an announce are fixed when it starts. One that an
//!    earlier observer unregisters during the pass is still notified by it,
//!    unless it has been dropped by then.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::sequence::{Sequence, SequenceKind, VecKind};

/// Callback capability invoked during the announce phase.
pub trait Observer<C> {
    /// Called with the cell that changed.
    fn on_change(&self, cell: &C);
}

impl<C, F: Fn(&C)> Observer<C> for F {
    fn on_change(&self, cell: &C) {
        self(cell)
    }
}

// ---------------------------------------------------------------------------
// ObserverList
// ---------------------------------------------------------------------------

/// Ordered, non-owning list of observers of a cell of type `C`.
pub struct ObserverList<C: 'static, K: SequenceKind = VecKind> {
    slots: RefCell<K::Seq<Weak<dyn Observer<C>>>>,
}

impl<C: 'static, K: SequenceKind> Default for ObserverList<C, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static, K: SequenceKind> fmt::Debug for ObserverList<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("registered", &self.slots.borrow().len())
            .field("live", &self.live_count())
            .finish()
    }
}

impl<C: 'static, K: SequenceKind> ObserverList<C, K> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Default::default()),
        }
    }

    /// Append an observer.
    ///
    /// # Panics
    ///
    /// Panics if `observer` no longer points at a live value.
    pub fn register(&self, observer: Weak<dyn Observer<C>>) {
        assert!(
            observer.strong_count() > 0,
            "cannot register an observer that has already been dropped"
        );
        self.slots.borrow_mut().push_back(observer);
    }

    /// Remove every registration whose target lives at `target`.
    ///
    /// Returns the number of registrations removed.
    pub fn unregister<T: ?Sized>(&self, target: *const T) -> usize {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain_items(|w| !std::ptr::addr_eq(w.as_ptr(), target));
        before - slots.len()
    }

    /// Number of registrations whose observer is still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let mut live = 0;
        self.slots.borrow().for_each_ordered(|w| {
            if w.strong_count() > 0 {
                live += 1;
            }
        });
        live
    }

    /// Invoke every live observer with `cell`, in registration order.
    ///
    /// Works on a snapshot, so observers may register, unregister, or enqueue
    /// further changes while being notified. Dead registrations are pruned
    /// once the pass completes. Returns the number of observers invoked.
    pub fn notify(&self, cell: &C) -> usize {
        let snapshot = {
            let slots = self.slots.borrow();
            let mut snapshot = Vec::with_capacity(slots.len());
            slots.for_each_ordered(|w| snapshot.push(w.clone()));
            snapshot
        };

        let mut delivered = 0;
        let mut saw_dead = false;
        for weak in &snapshot {
            match weak.upgrade() {
                Some(observer) => {
                    observer.on_change(cell);
                    delivered += 1;
                }
                None => saw_dead = true,
            }
        }

        if saw_dead {
            self.slots
                .borrow_mut()
                .retain_items(|w| w.strong_count() > 0);
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// MemberObserver
// ---------------------------------------------------------------------------

/// Adapter that forwards a change to a method of an owning object.
///
/// Holds the owner weakly, so an owner may keep its adapters as fields
/// without forming a reference cycle. Once the owner is gone the adapter
/// silently does nothing.
pub struct MemberObserver<O: 'static, C: 'static> {
    owner: Weak<O>,
    method: fn(&O, &C),
}

impl<O: 'static, C: 'static> MemberObserver<O, C> {
    /// Create an adapter without registering it anywhere.
    #[must_use]
    pub fn new(owner: Weak<O>, method: fn(&O, &C)) -> Rc<Self> {
        Rc::new(Self { owner, method })
    }

    /// Create an adapter and register it with `cell`.
    #[must_use]
    pub fn attached(owner: Weak<O>, method: fn(&O, &C), cell: &C) -> Rc<Self>
    where
        C: crate::cell::ObservableCell,
    {
        let adapter = Self::new(owner, method);
        cell.register_observer(&adapter);
        adapter
    }

    /// Whether the owning object is still alive.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

impl<O: 'static, C: 'static> Observer<C> for MemberObserver<O, C> {
    fn on_change(&self, cell: &C) {
        if let Some(owner) = self.owner.upgrade() {
            (self.method)(&owner, cell);
        }
    }
}

impl<O: 'static, C: 'static> fmt::Debug for MemberObserver<O, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberObserver")
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard for a closure observer.
///
/// The guard owns the closure; the cell only holds it weakly. Dropping the
/// guard stops delivery before the next announce.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _observer: Rc<dyn Any>,
}

impl Subscription {
    pub(crate) fn new(observer: Rc<dyn Any>) -> Self {
        Self {
            _observer: observer,
        }
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
