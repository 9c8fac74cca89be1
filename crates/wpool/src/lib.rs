//! # wpool
//!
//! A general-purpose, bounded worker pool: a fixed-size array of OS
//! threads pulling from a shared FIFO task queue, with per-worker
//! locking for dedicated work, introspection, and two shutdown modes.
//!
//! ## Quick start
//!
//! ```ignore
//! use wpool::{PoolBuilder, ShutdownMode};
//!
//! let pool = PoolBuilder::new()
//!     .thread_count(8)
//!     .queue_size(64)
//!     .build()
//!     .expect("pool attributes were valid");
//!
//! pool.add_work(|| {
//!     println!("hello from a worker");
//!     0
//! }).expect("queue had room");
//!
//! pool.wait().expect("pool was not destroyed mid-wait");
//! pool.destroy(ShutdownMode::Graceful).unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Caller                                │
//! │      add_work(), lock_thread(), wait(), destroy()           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WorkerPool                              │
//! │        PoolShared: ConcurrentQueue + worker array            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  Worker   │      │  Worker   │      │  Worker   │
//!    │  Thread   │      │  Thread   │      │  Thread   │
//!    └───────────┘      └───────────┘      └───────────┘
//! ```
//!
//! `wpool-core` holds the platform-agnostic value types (`Task`,
//! `Attributes`, `Status`, the error taxonomy, the bounded `Fifo`);
//! `wpool-runtime` is the OS-facing engine (the concurrent queue, the
//! worker thread loop, per-thread signal delivery); this crate is the
//! thin public facade over both.

pub use wpool_core::{
    Attributes, CancelType, CreatePolicy, PoolResult, ShutdownMode, Status, TaskType, WPoolError,
    WorkerInfo, MAX_THREADS,
};
pub use wpool_core::{wp_debug, wp_error, wp_info, wp_warn};

pub use wpool_runtime::{WorkerInfoSnapshot, WorkerPool};

mod builder;
pub use builder::PoolBuilder;
