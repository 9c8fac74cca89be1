//! Worker info snapshots

use crate::status::{Status, TaskType};
use core::fmt;

/// A point-in-time snapshot of a worker's public state
///
/// Returned by `thread_status`/`thread_status_all`. `error` is non-zero
/// if and only if `status == Status::Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerInfo {
    pub index: u32,
    pub status: Status,
    pub task_type: TaskType,
    pub error: i32,
}

impl WorkerInfo {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            status: Status::Starting,
            task_type: TaskType::Unspecified,
            error: 0,
        }
    }
}

impl fmt::Display for WorkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}: {} (error: {})", self.index, self.status, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let mut info = WorkerInfo::new(2);
        info.status = Status::Running;
        assert_eq!(format!("{}", info), "worker 2: RUNNING (error: 0)");
    }

    #[test]
    fn test_new_defaults() {
        let info = WorkerInfo::new(0);
        assert_eq!(info.status, Status::Starting);
        assert_eq!(info.error, 0);
    }
}
