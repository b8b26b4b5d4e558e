#![forbid(unsafe_code)]

//! cellflow public facade crate.
//!
//! Observable cells whose notifications are collected by a coordinator and
//! delivered in batches: every queued cell is announced before any buffered
//! cell commits its next value.
//!
//! ```
//! use std::rc::Rc;
//! use cellflow::prelude::*;
//!
//! let queue = Rc::new(ChangeQueue::new());
//! let temperature: BufferedValue<f32> = BufferedValue::bound(20.0, &queue);
//! let _alarm = temperature.subscribe(|t: &BufferedValue<f32>| {
//!     assert!(t.then() > t.now());
//! });
//!
//! temperature.change(23.5);
//! queue.run_batch();
//! assert_eq!(temperature.now(), 23.5);
//! ```

pub use cellflow_core::{
    BatchReport, BufferedValue, CellId, CellKind, CellRef, Coordinator, Lazy, MemberObserver,
    ObservableCell, Observer, Subscription, Value,
};

#[cfg(feature = "runtime")]
pub use cellflow_runtime::{ChangeQueue, DrainPolicy, QueueConfig, RuntimeError, global};

pub mod prelude {
    pub use cellflow_core as core;
    #[cfg(feature = "runtime")]
    pub use cellflow_runtime as runtime;

    pub use cellflow_core::{
        BufferedValue, Coordinator, Lazy, MemberObserver, ObservableCell, Observer, Subscription,
        Value,
    };
    #[cfg(feature = "runtime")]
    pub use cellflow_runtime::{ChangeQueue, DrainPolicy, QueueConfig};
}
