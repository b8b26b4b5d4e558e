#![forbid(unsafe_code)]

//! Pending-change buffers for [`BufferedValue`](crate::BufferedValue).
//!
//! A buffer decides which queued value a buffered cell reports as "then" and
//! which value the next commit installs. The ordering policy changes what
//! "next" means but never the two-phase protocol itself.
//!
//! | buffer       | `first()` / `drop_first()` target         |
//! |--------------|-------------------------------------------|
//! | [`Fifo`]     | oldest inserted value                     |
//! | [`Lifo`]     | newest inserted value                     |
//! | [`Priority`] | greatest value; equal values oldest-first |
//!
//! # Invariants
//!
//! 1. `first()` returns the element `drop_first()` would remove.
//! 2. `len()` grows by one per `insert` and shrinks by one per successful
//!    `drop_first`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Ordering policy over not-yet-committed values.
pub trait PendingBuffer<T>: Default {
    /// Queue a value.
    fn insert(&mut self, value: T);

    /// Peek at the value the next commit will install.
    fn first(&self) -> Option<&T>;

    /// Remove and return the head.
    fn drop_first(&mut self) -> Option<T>;

    /// Number of queued values.
    fn len(&self) -> usize;

    /// Whether no value is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Fifo
// ---------------------------------------------------------------------------

/// First-in, first-out buffer. The reference policy.
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    items: VecDeque<T>,
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> PendingBuffer<T> for Fifo<T> {
    fn insert(&mut self, value: T) {
        self.items.push_back(value);
    }

    fn first(&self) -> Option<&T> {
        self.items.front()
    }

    fn drop_first(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ---------------------------------------------------------------------------
// Lifo
// ---------------------------------------------------------------------------

/// Last-in, first-out buffer.
///
/// With several changes queued in one batch, the newest value is committed
/// first and the oldest value ends up as the committed value.
#[derive(Debug, Clone)]
pub struct Lifo<T> {
    items: Vec<T>,
}

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> PendingBuffer<T> for Lifo<T> {
    fn insert(&mut self, value: T) {
        self.items.push(value);
    }

    fn first(&self) -> Option<&T> {
        self.items.last()
    }

    fn drop_first(&mut self) -> Option<T> {
        self.items.pop()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Heap entry: orders by value, then by insertion sequence (older wins).
#[derive(Debug, Clone)]
struct Ranked<T> {
    value: T,
    seq: u64,
}

impl<T: Ord> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Ranked<T> {}

impl<T: Ord> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Max-priority buffer: the greatest pending value is "next".
///
/// Equal values leave in insertion order. Wrap payloads in
/// [`std::cmp::Reverse`] for smallest-first behavior.
#[derive(Debug, Clone)]
pub struct Priority<T: Ord> {
    heap: BinaryHeap<Ranked<T>>,
    next_seq: u64,
}

impl<T: Ord> Default for Priority<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Ord> PendingBuffer<T> for Priority<T> {
    fn insert(&mut self, value: T) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Ranked { value, seq });
    }

    fn first(&self) -> Option<&T> {
        self.heap.peek().map(|r| &r.value)
    }

    fn drop_first(&mut self) -> Option<T> {
        self.heap.pop().map(|r| r.value)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}
