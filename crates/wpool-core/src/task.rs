//! Task records

use crate::status::TaskType;

/// A unit of work submitted to a pool
///
/// The routine is a boxed `FnOnce() -> i32`, the Rust-native rendering of
/// an untyped `routine(opaque) -> int` callback: the submitter's
/// captured state is owned by the closure itself, so the pool neither
/// copies nor frees anything on the caller's behalf. Ownership transfers
/// to the CQ at submission, then to the worker for the duration of
/// execution, then is dropped on completion.
pub struct Task {
    routine: Box<dyn FnOnce() -> i32 + Send + 'static>,
    task_type: TaskType,
}

impl Task {
    /// Build a task of the given type from a routine
    pub fn new<F>(routine: F, task_type: TaskType) -> Self
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        Self {
            routine: Box::new(routine),
            task_type,
        }
    }

    /// Build an ordinary `WORKER`-typed task
    pub fn worker<F>(routine: F) -> Self
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        Self::new(routine, TaskType::Worker)
    }

    /// Build a `DEDICATED`-typed task for a locked worker's private slot
    pub fn dedicated<F>(routine: F) -> Self
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        Self::new(routine, TaskType::Dedicated)
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Consume the task, running its routine to completion
    pub fn run(self) -> i32 {
        (self.routine)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("task_type", &self.task_type).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_runs_routine() {
        let task = Task::worker(|| 42);
        assert_eq!(task.run(), 42);
    }

    #[test]
    fn test_task_type_preserved() {
        let task = Task::dedicated(|| 0);
        assert_eq!(task.task_type(), TaskType::Dedicated);
    }

    #[test]
    fn test_task_captures_environment() {
        let captured = std::sync::Arc::new(std::sync::atomic::AtomicI32::new(0));
        let c = captured.clone();
        let task = Task::worker(move || {
            c.store(7, std::sync::atomic::Ordering::SeqCst);
            0
        });
        task.run();
        assert_eq!(captured.load(std::sync::atomic::Ordering::SeqCst), 7);
    }
}
