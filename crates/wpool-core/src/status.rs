//! Worker status and task-type value types

use core::fmt;

/// Lifecycle status of a worker thread
///
/// See the module docs for the full transition table. Workers start in
/// `Starting`, settle into `Idle`/`Running`, and may additionally visit
/// `Locked` (dedicated-task mode), `Blocked` (error latch), or terminally
/// `Destroying`/`Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Never started, or restarted-and-not-yet-running-again
    Stopped = 0,

    /// Reserved for a dedicated task via `lock_thread`; does not consume
    /// from the shared queue
    Locked = 1,

    /// Spawned but hasn't reached its first wait point yet
    Starting = 2,

    /// Idle, waiting on the shared queue for a task
    Idle = 3,

    /// Executing a task
    Running = 4,

    /// Latched after a routine returned non-zero with block-on-error enabled
    Blocked = 5,

    /// Terminal: the worker is tearing down and will not run again
    Destroying = 6,
}

impl Status {
    /// Whether this worker may currently accept (i.e. would be selected
    /// to run) a shared-queue task
    #[inline]
    pub const fn consumes_queue(&self) -> bool {
        matches!(self, Status::Idle)
    }

    /// Whether this worker is eligible for `restart_thread`
    #[inline]
    pub const fn is_restartable(&self) -> bool {
        matches!(self, Status::Stopped | Status::Blocked)
    }

    /// Whether this worker is eligible for `lock_thread`
    #[inline]
    pub const fn is_lockable(&self) -> bool {
        matches!(self, Status::Idle | Status::Stopped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Stopped => "STOPPED",
            Status::Locked => "LOCKED",
            Status::Starting => "STARTING",
            Status::Idle => "IDLE",
            Status::Running => "RUNNING",
            Status::Blocked => "BLOCKED",
            Status::Destroying => "DESTROYING",
        };
        write!(f, "{}", s)
    }
}

/// The kind of task record enqueued on a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// No particular affinity; any IDLE worker may run it
    Unspecified,

    /// Submitted through the ordinary `add_work`/`timed_add_work` path
    Worker,

    /// Installed directly into a LOCKED worker's dedicated slot; never
    /// visible on the shared queue
    Dedicated,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Unspecified => "UNSPECIFIED",
            TaskType::Worker => "WORKER",
            TaskType::Dedicated => "DEDICATED",
        };
        write!(f, "{}", s)
    }
}

/// `destroy`'s shutdown mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Drain the queue and let running tasks finish before tearing down
    Graceful,

    /// Request immediate cancellation of all worker threads
    Forceful,
}

/// How `destroy(Forceful)` cancels in-flight worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelType {
    /// Workers notice cancellation only at their own safe points
    /// (queue waits, dedicated-task waits, restart waits)
    Deferred,

    /// Cancellation is requested immediately via the platform's thread
    /// signaling primitive, in addition to the deferred safe points
    Async,
}

/// Policy governing when worker threads are spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// All workers are spawned during `create`; a spawn failure aborts
    /// pool construction
    Strict,

    /// Workers are spawned lazily, on an `add_work` that finds no idle
    /// worker available; a spawn failure does not un-enqueue the task
    Lazy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", Status::Idle), "IDLE");
        assert_eq!(format!("{}", Status::Blocked), "BLOCKED");
    }

    #[test]
    fn test_status_predicates() {
        assert!(Status::Idle.consumes_queue());
        assert!(!Status::Locked.consumes_queue());

        assert!(Status::Blocked.is_restartable());
        assert!(Status::Stopped.is_restartable());
        assert!(!Status::Idle.is_restartable());

        assert!(Status::Idle.is_lockable());
        assert!(Status::Stopped.is_lockable());
        assert!(!Status::Running.is_lockable());
    }
}
