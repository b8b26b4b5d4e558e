#![forbid(unsafe_code)]

//! Core: deferred-notification cells, observers, and the coordinator contract.
//!
//! This crate provides the building blocks of the batch dispatch protocol:
//!
//! - [`Value`]: an immediate cell. Changes apply at once; observers hear
//!   about them during the next batch.
//! - [`BufferedValue`]: a buffered cell. Changes wait in a [`PendingBuffer`]
//!   and are committed only after every queued cell has been announced.
//! - [`Observer`], [`MemberObserver`], [`Subscription`]: ways to listen.
//! - [`Coordinator`] and [`dispatch`]: the contract a batch driver fulfils.
//! - [`Lazy`]: a memoized payload type.
//!
//! # Architecture
//!
//! Cells are `Rc` handles to shared storage, so they are cheap to clone and
//! confined to one thread. Observers are held through `Weak` references.
//! A coordinator receives [`CellRef`]s, opaque strong handles that keep a
//! queued cell alive until it has been dispatched. A bound cell holds its
//! coordinator weakly, so queue entries never keep their queue alive.
//!
//! # Invariants
//!
//! 1. A change never invokes an observer directly.
//! 2. Within one round, every announce precedes every commit; both phases
//!    follow enqueue order.
//! 3. Observers are notified in registration order, once per registration.
//! 4. A buffered cell's committed value only changes during commit.

pub mod buffer;
pub mod buffered;
pub mod cell;
pub mod coordinator;
pub mod lazy;
pub mod observer;
pub mod sequence;
pub mod value;

#[cfg(test)]
mod testing;

pub use buffer::{Fifo, Lifo, PendingBuffer, Priority};
pub use buffered::BufferedValue;
pub use cell::{CellId, CellKind, CellRef, ObservableCell};
pub use coordinator::{BatchReport, Coordinator, dispatch};
pub use lazy::Lazy;
pub use observer::{MemberObserver, Observer, ObserverList, Subscription};
pub use sequence::{DequeKind, ListKind, Sequence, SequenceKind, VecKind};
pub use value::Value;
