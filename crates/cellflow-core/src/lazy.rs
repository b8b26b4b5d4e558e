#![forbid(unsafe_code)]

//! On-demand memoized values for use as cell payloads.
//!
//! # Design
//!
//! [`Lazy<T>`] pairs a producer with a one-shot cache. The first
//! [`get()`](Lazy::get) runs the producer and stores the result; later calls
//! return the cached value. A cell holding `Lazy<T>` can therefore announce
//! an expensive value without computing it: only observers that actually
//! read it pay for it.
//!
//! # Invariants
//!
//! 1. The producer runs at most once per `Lazy` instance.
//! 2. A clone made after realization carries the cached value and never runs
//!    the producer; a clone made before realization does not share the cache
//!    and will run the producer on its own first access.
//!
//! # Failure Modes
//!
//! - **Producer panics**: the cache stays empty, the next `get()` retries.
//! - **Producer reads the same `Lazy`**: re-entrant initialization panics.

use std::cell::OnceCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// A value computed on first access and cached afterwards.
pub struct Lazy<T> {
    slot: OnceCell<T>,
    producer: Rc<dyn Fn() -> T>,
}

impl<T: 'static> Lazy<T> {
    /// Wrap a producer. Nothing is computed yet.
    pub fn new(producer: impl Fn() -> T + 'static) -> Self {
        Self {
            slot: OnceCell::new(),
            producer: Rc::new(producer),
        }
    }

    /// An already-realized value.
    #[must_use]
    pub fn from_value(value: T) -> Self
    where
        T: Clone,
    {
        let slot = OnceCell::from(value.clone());
        Self {
            slot,
            producer: Rc::new(move || value.clone()),
        }
    }
}

impl<T> Lazy<T> {
    /// Get the value, running the producer on first access.
    pub fn get(&self) -> &T {
        self.slot.get_or_init(|| (self.producer)())
    }

    /// Whether the producer has already run for this instance.
    #[must_use]
    pub fn is_realized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Take the value out, computing it if necessary.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self.slot.into_inner() {
            Some(value) => value,
            None => (self.producer)(),
        }
    }
}

impl<T: Clone> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> Deref for Lazy<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(value) => f.debug_tuple("Lazy").field(value).finish(),
            None => f.write_str("Lazy(<unrealized>)"),
        }
    }
}
