//! # wpool-core
//!
//! Platform-agnostic value types for the `wpool` worker-pool engine:
//! task records, worker status, pool attributes, the error taxonomy, the
//! bounded FIFO, and a small kernel-style logging facility. No threads, no
//! OS calls — see `wpool-runtime` for the concurrent queue and worker
//! engine built on top of these types.

pub mod attributes;
pub mod error;
pub mod fifo;
pub mod info;
pub mod log;
pub mod status;
pub mod task;

pub use attributes::{Attributes, MAX_THREADS};
pub use error::{PoolResult, WPoolError};
pub use fifo::Fifo;
pub use info::WorkerInfo;
pub use status::{CancelType, CreatePolicy, ShutdownMode, Status, TaskType};
pub use task::Task;
