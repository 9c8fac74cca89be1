//! Error taxonomy for the worker-pool engine

use core::fmt;

/// Result type for worker-pool operations
pub type PoolResult<T> = Result<T, WPoolError>;

/// Errors that can occur in worker-pool operations
///
/// Each variant corresponds to a familiar POSIX-style exit code; the
/// mapping is noted per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WPoolError {
    /// Bad argument, or the pool/queue has already been destroyed. (EINVAL)
    InvalidArgument,

    /// Allocation failed while growing a pool-owned structure. (ENOMEM)
    OutOfMemory,

    /// Resource temporarily unavailable: thread spawn failed, no idle
    /// worker to lock, or a wait was cancelled via `cancel_wait`. (EAGAIN)
    WouldBlock,

    /// Queue is at capacity and the caller asked not to block. (EOVERFLOW)
    QueueFull,

    /// A timed wait's deadline passed before the condition held. (ETIMEDOUT)
    TimedOut,

    /// The pool is being destroyed; any blocking call in flight unblocks
    /// with this error. Takes precedence over `WouldBlock`/`TimedOut`. (EINTR)
    Interrupted,

    /// No worker exists at the given index. (ENOENT)
    NoSuchWorker,

    /// The operation is not supported for the current configuration
    /// (e.g. querying `is_full` on an UNLIMITED queue, or signaling a
    /// thread on a platform without per-thread signal delivery). (ENOTSUP)
    NotSupported,

    /// Unlock attempted by a thread that does not hold the manual lock. (EPERM)
    PermissionDenied,

    /// Restart requested for a worker that is not STOPPED/BLOCKED. (EALREADY)
    AlreadyRunning,

    /// The current thread already holds the CQ's manual lock; recursive
    /// re-entry would deadlock. Rust's `Mutex` has no notion of an
    /// error-checking recursive lock, so this is surfaced explicitly
    /// instead of actually deadlocking.
    WouldDeadlock,
}

impl fmt::Display for WPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument or pool destroyed"),
            Self::OutOfMemory => write!(f, "allocation failed"),
            Self::WouldBlock => write!(f, "resource temporarily unavailable"),
            Self::QueueFull => write!(f, "queue is full"),
            Self::TimedOut => write!(f, "operation timed out"),
            Self::Interrupted => write!(f, "pool is being destroyed"),
            Self::NoSuchWorker => write!(f, "no such worker"),
            Self::NotSupported => write!(f, "operation not supported"),
            Self::PermissionDenied => write!(f, "unlock by non-owner"),
            Self::AlreadyRunning => write!(f, "worker already running"),
            Self::WouldDeadlock => write!(f, "recursive manual lock would deadlock"),
        }
    }
}

impl std::error::Error for WPoolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", WPoolError::QueueFull), "queue is full");
        assert_eq!(format!("{}", WPoolError::Interrupted), "pool is being destroyed");
    }

    #[test]
    fn test_error_is_copy_eq() {
        let e = WPoolError::TimedOut;
        let e2 = e;
        assert_eq!(e, e2);
    }
}
