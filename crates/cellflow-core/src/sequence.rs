#![forbid(unsafe_code)]

//! Backing collections for observer lists.
//!
//! A cell never names its observer container directly. It is parameterized by
//! a [`SequenceKind`], a type-level family that picks the concrete collection
//! for any element type. This keeps the cell logic identical whether the
//! observers live in a `Vec`, a `VecDeque`, or a `LinkedList`.
//!
//! # Invariants
//!
//! 1. `push_back` appends; `for_each_ordered` visits items in insertion order.
//! 2. `retain_items` preserves the relative order of the kept items.

use std::collections::{LinkedList, VecDeque};

/// Minimal ordered-sequence contract used by observer lists.
pub trait Sequence<T>: Default {
    /// Append an item at the back.
    fn push_back(&mut self, item: T);

    /// Number of stored items.
    fn len(&self) -> usize;

    /// Whether the sequence holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every item front to back.
    fn for_each_ordered(&self, f: impl FnMut(&T));

    /// Keep only the items for which `keep` returns `true`.
    fn retain_items(&mut self, keep: impl FnMut(&T) -> bool);
}

impl<T> Sequence<T> for Vec<T> {
    fn push_back(&mut self, item: T) {
        self.push(item);
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn for_each_ordered(&self, f: impl FnMut(&T)) {
        self.iter().for_each(f);
    }

    fn retain_items(&mut self, keep: impl FnMut(&T) -> bool) {
        self.retain(keep);
    }
}

impl<T> Sequence<T> for VecDeque<T> {
    fn push_back(&mut self, item: T) {
        VecDeque::push_back(self, item);
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn for_each_ordered(&self, f: impl FnMut(&T)) {
        self.iter().for_each(f);
    }

    fn retain_items(&mut self, keep: impl FnMut(&T) -> bool) {
        self.retain(keep);
    }
}

impl<T> Sequence<T> for LinkedList<T> {
    fn push_back(&mut self, item: T) {
        LinkedList::push_back(self, item);
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn for_each_ordered(&self, f: impl FnMut(&T)) {
        self.iter().for_each(f);
    }

    fn retain_items(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let old = std::mem::take(self);
        *self = old.into_iter().filter(|item| keep(item)).collect();
    }
}

/// Type-level selector for the collection a cell stores its observers in.
pub trait SequenceKind: 'static {
    /// The concrete collection for element type `T`.
    type Seq<T>: Sequence<T>;
}

/// Array-backed observer storage (the default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VecKind;

impl SequenceKind for VecKind {
    type Seq<T> = Vec<T>;
}

/// Ring-buffer observer storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DequeKind;

impl SequenceKind for DequeKind {
    type Seq<T> = VecDeque<T>;
}

/// Linked-list observer storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListKind;

impl SequenceKind for ListKind {
    type Seq<T> = LinkedList<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<S: Sequence<u32>>(seq: &S) -> Vec<u32> {
        let mut out = Vec::new();
        seq.for_each_ordered(|v| out.push(*v));
        out
    }

    fn exercise<K: SequenceKind>() {
        let mut seq = <K::Seq<u32> as Default>::default();
        assert!(seq.is_empty());
        for v in [3, 1, 4, 1, 5, 9, 2, 6] {
            seq.push_back(v);
        }
        assert_eq!(seq.len(), 8);
        assert_eq!(collect(&seq), vec![3, 1, 4, 1, 5, 9, 2, 6]);

        seq.retain_items(|v| *v != 1);
        assert_eq!(collect(&seq), vec![3, 4, 5, 9, 2, 6]);
    }

    #[test]
    fn vec_kind_keeps_insertion_order() {
        exercise::<VecKind>();
    }

    #[test]
    fn deque_kind_keeps_insertion_order() {
        exercise::<DequeKind>();
    }

    #[test]
    fn list_kind_keeps_insertion_order() {
        exercise::<ListKind>();
    }

    #[test]
    fn retain_everything_is_identity() {
        let mut seq: LinkedList<u32> = [1, 2, 3].into_iter().collect();
        seq.retain_items(|_| true);
        assert_eq!(collect(&seq), vec![1, 2, 3]);
    }
}
