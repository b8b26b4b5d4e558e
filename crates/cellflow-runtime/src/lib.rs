#![forbid(unsafe_code)]

//! Runtime: the batch coordinator for cellflow cells.
//!
//! [`ChangeQueue`] implements [`cellflow_core::Coordinator`]. Cells enqueue
//! themselves on change; the host calls [`run_batch`](cellflow_core::Coordinator::run_batch)
//! when it is ready to deliver notifications (end of a frame, an event-loop
//! tick, a test step).
//!
//! # Modules
//!
//! - [`queue`]: the FIFO change queue and its drain loop.
//! - [`config`]: drain policy and limits, with environment and TOML sources.
//! - [`global`]: an optional per-thread default queue.
//! - [`error`]: runtime error type.
//!
//! # Tracing
//!
//! Each batch runs inside a `cellflow.batch` debug span that records
//! `rounds`, `entries`, and `deferred`. Per-entry enqueue and announce
//! events are emitted at trace level by `cellflow-core`. Hitting the
//! fixpoint round limit is reported with `warn!`.

pub mod config;
pub mod error;
pub mod global;
pub mod queue;

pub use config::{DrainPolicy, ENV_DRAIN_POLICY, ENV_MAX_ROUNDS, QueueConfig};
pub use error::{Result, RuntimeError};
pub use queue::ChangeQueue;
