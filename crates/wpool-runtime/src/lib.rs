//! # wpool-runtime
//!
//! OS-facing implementation of the worker-pool engine: the concurrent
//! queue (mutex + condvars + deferred signaling), the worker thread loop,
//! per-thread signal delivery, and the `WorkerPool` itself. Built on the
//! platform-agnostic value types in `wpool-core`.

pub mod pool;
pub mod queue;
pub mod signal;
pub mod worker;

pub use pool::{WorkerInfoSnapshot, WorkerPool};
pub use queue::ConcurrentQueue;
