//! Snapshot coordinator used by this crate's unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::cell::CellRef;
use crate::coordinator::{BatchReport, Coordinator, dispatch};

#[derive(Debug, Default)]
pub(crate) struct TestQueue {
    entries: RefCell<VecDeque<CellRef>>,
}

impl TestQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn drain(&self) -> VecDeque<CellRef> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl Coordinator for TestQueue {
    fn enqueue(&self, cell: CellRef) {
        self.entries.borrow_mut().push_back(cell);
    }

    fn run_batch(&self) -> BatchReport {
        let mut batch = self.drain();
        let mut report = dispatch(&mut batch);
        report.deferred = self.len();
        report
    }
}
