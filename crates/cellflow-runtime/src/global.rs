#![forbid(unsafe_code)]

//! Per-thread default change queue.
//!
//! Cells created with `bound` carry their coordinator explicitly. Hosts that
//! prefer a single ambient queue install one per thread here and bind cells
//! to [`handle()`]:
//!
//! ```
//! use cellflow_core::Value;
//! use cellflow_runtime::{QueueConfig, global};
//!
//! let queue = global::install(QueueConfig::default()).unwrap();
//! let count: Value<u32> = Value::bound(0, &global::handle());
//! count.change(1);
//! assert_eq!(queue.len(), 1);
//!
//! let report = global::shutdown().unwrap();
//! assert_eq!(report.entries, 1);
//! ```
//!
//! Nothing is installed implicitly. Cells are `!Send`, so a queue never
//! needs to be shared across threads.

use std::cell::RefCell;
use std::rc::Rc;

use cellflow_core::{BatchReport, Coordinator};

use crate::config::QueueConfig;
use crate::error::{Result, RuntimeError};
use crate::queue::ChangeQueue;

thread_local! {
    static GLOBAL: RefCell<Option<Rc<ChangeQueue>>> = const { RefCell::new(None) };
}

/// Install this thread's queue.
///
/// Fails with [`RuntimeError::AlreadyInstalled`] if one exists, and with a
/// validation error for an unusable configuration.
pub fn install(config: QueueConfig) -> Result<Rc<ChangeQueue>> {
    GLOBAL.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(RuntimeError::AlreadyInstalled);
        }
        let policy = config.policy;
        let queue = Rc::new(ChangeQueue::with_config(config)?);
        *slot = Some(Rc::clone(&queue));
        tracing::debug!(policy = policy.as_str(), "cellflow.global.install");
        Ok(queue)
    })
}

/// This thread's queue, if installed.
#[must_use]
pub fn current() -> Option<Rc<ChangeQueue>> {
    GLOBAL.with(|slot| slot.borrow().clone())
}

/// Whether a queue is installed on this thread.
#[must_use]
pub fn is_installed() -> bool {
    GLOBAL.with(|slot| slot.borrow().is_some())
}

/// This thread's queue.
///
/// # Panics
///
/// Panics if [`install`] has not been called on this thread.
#[must_use]
pub fn handle() -> Rc<ChangeQueue> {
    match current() {
        Some(queue) => queue,
        None => panic!("no global change queue installed on this thread; call global::install first"),
    }
}

/// Run a batch on this thread's queue, if installed.
pub fn run_batch() -> Option<BatchReport> {
    current().map(|queue| queue.run_batch())
}

/// Flush pending entries with a final batch, then uninstall.
///
/// Returns `None` when nothing was installed. Cells hold their queue weakly,
/// so once the last other handle is gone, `change` on a cell bound to the
/// old queue panics. Use `change_to` with a new coordinator instead.
pub fn shutdown() -> Option<BatchReport> {
    let queue = current()?;
    let report = queue.run_batch();
    GLOBAL.with(|slot| slot.borrow_mut().take());
    tracing::debug!(
        entries = report.entries,
        deferred = report.deferred,
        "cellflow.global.shutdown"
    );
    Some(report)
}
