//! The worker thread loop.
//!
//! Each worker is an OS thread running [`run`]. Per-worker mutable state
//! (status, latched error, task type, the dedicated-task slot) lives in
//! [`WorkerSlot`], owned by the pool; the worker receives its index and a
//! clone of the pool's shared `Arc` context rather than a raw pointer back
//! to the owning pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use wpool_core::{wp_debug, wp_warn, Status, Task, TaskType};

use crate::pool::PoolShared;

/// How long a worker's shared-queue wait blocks before it re-checks
/// whether it has been transitioned to LOCKED/DESTROYING out from under
/// it. There is no way to interrupt a parked `ConcurrentQueue` wait from
/// `lock_thread` without adding a second cross-cutting signal, so the
/// worker loop polls at this granularity instead — a deliberate
/// throughput/latency tradeoff, not an oversight.
pub(crate) const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct WorkerData {
    status: Status,
    error: i32,
    task_type: TaskType,
    dedicated: Option<Task>,
}

/// Pool-owned per-worker state and control structures.
pub(crate) struct WorkerSlot {
    pub index: u32,
    data: Mutex<WorkerData>,
    /// Signaled on any status change, dedicated-task arrival, or restart —
    /// one condvar is enough since every waiter rechecks its own
    /// predicate on wake.
    cv: Condvar,
    pub should_exit: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Raw OS thread handle for signal delivery (`pthread_t` on Unix,
    /// cast to `usize` to stay `Send + Sync`). `None` until the worker
    /// has actually spawned, or always `None` on platforms without
    /// per-thread signal delivery.
    os_thread: Mutex<Option<usize>>,
}

impl WorkerSlot {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            data: Mutex::new(WorkerData {
                status: Status::Stopped,
                error: 0,
                task_type: TaskType::Unspecified,
                dedicated: None,
            }),
            cv: Condvar::new(),
            should_exit: AtomicBool::new(false),
            handle: Mutex::new(None),
            os_thread: Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        self.data.lock().unwrap().status
    }

    pub fn error(&self) -> i32 {
        self.data.lock().unwrap().error
    }

    pub fn task_type(&self) -> TaskType {
        self.data.lock().unwrap().task_type
    }

    pub fn has_handle(&self) -> bool {
        self.handle.lock().unwrap().is_some()
    }

    pub fn set_handle(&self, handle: JoinHandle<()>) {
        *self.handle.lock().unwrap() = Some(handle);
    }

    pub fn take_handle(&self) -> Option<JoinHandle<()>> {
        self.handle.lock().unwrap().take()
    }

    pub fn set_os_thread(&self, raw: usize) {
        *self.os_thread.lock().unwrap() = Some(raw);
    }

    pub fn os_thread(&self) -> Option<usize> {
        *self.os_thread.lock().unwrap()
    }

    /// Lock-then-IDLE-or-STOPPED check used by `lock_thread`'s scan.
    /// Transitions to `Locked` and returns `true` iff this worker was
    /// eligible.
    pub fn try_lock_if_lockable(&self) -> bool {
        let mut data = self.data.lock().unwrap();
        if data.status.is_lockable() {
            data.status = Status::Locked;
            self.cv.notify_all();
            true
        } else {
            false
        }
    }

    pub fn unlock(&self) -> bool {
        let mut data = self.data.lock().unwrap();
        if data.status == Status::Locked {
            data.status = Status::Idle;
            self.cv.notify_all();
            true
        } else {
            false
        }
    }

    /// Install a dedicated task. Requires the worker to already be
    /// `Locked`.
    pub fn install_dedicated(&self, task: Task) -> bool {
        let mut data = self.data.lock().unwrap();
        if data.status != Status::Locked {
            return false;
        }
        data.dedicated = Some(task);
        self.cv.notify_all();
        true
    }

    pub fn restart(&self) -> Result<(), ()> {
        let mut data = self.data.lock().unwrap();
        if !data.status.is_restartable() {
            return Err(());
        }
        data.status = Status::Starting;
        data.error = 0;
        data.dedicated = None;
        self.cv.notify_all();
        Ok(())
    }

    pub fn mark_destroying(&self) {
        let mut data = self.data.lock().unwrap();
        data.status = Status::Destroying;
        self.cv.notify_all();
    }

    /// Wake this worker's condvar without changing its status — used by
    /// teardown to unblock a worker parked in `run_locked`/`run_blocked`
    /// after `should_exit` has been set.
    pub fn wake(&self) {
        self.cv.notify_all();
    }
}

/// The worker's main loop: STARTING -> IDLE, then IDLE/RUNNING/LOCKED/
/// BLOCKED, until DESTROYING.
pub(crate) fn run(shared: std::sync::Arc<PoolShared>, index: usize) {
    let slot = &shared.workers[index];
    wpool_core::log::set_worker_id(index as u32);

    {
        let mut data = slot.data.lock().unwrap();
        // A fresh Lazy spawn normally starts STOPPED -> IDLE here; but
        // `lock_thread` may have already transitioned this slot straight
        // to LOCKED before spawning it for the first time, so don't
        // clobber that.
        if data.status != Status::Locked {
            data.status = Status::Idle;
        }
    }

    loop {
        if shared.is_destroying() || slot.should_exit.load(Ordering::Acquire) {
            slot.mark_destroying();
            return;
        }

        let current = slot.status();
        match current {
            Status::Destroying => return,
            Status::Locked => run_locked(&shared, slot),
            Status::Blocked => run_blocked(&shared, slot),
            _ => run_idle(&shared, slot),
        }
    }
}

fn run_locked(shared: &PoolShared, slot: &WorkerSlot) {
    let maybe_task = {
        let mut data = slot.data.lock().unwrap();
        data.dedicated.take()
    };

    if let Some(task) = maybe_task {
        {
            let mut data = slot.data.lock().unwrap();
            data.status = Status::Running;
            data.task_type = TaskType::Dedicated;
        }
        shared.running_count.fetch_add(1, Ordering::SeqCst);
        let code = task.run();
        shared.running_count.fetch_sub(1, Ordering::SeqCst);
        {
            // Dedicated tasks ignore block-on-error and always return to
            // LOCKED; `error` stays 0 to preserve "error != 0 iff BLOCKED".
            let mut data = slot.data.lock().unwrap();
            if code != 0 {
                wp_debug!("dedicated task on worker {} returned {}", slot.index, code);
            }
            data.error = 0;
            data.status = Status::Locked;
        }
        slot.cv.notify_all();
        shared.notify_waiters();
        return;
    }

    let data = slot.data.lock().unwrap();
    let _ = slot
        .cv
        .wait_timeout_while(data, WORKER_POLL_INTERVAL, |d| {
            d.status == Status::Locked
                && d.dedicated.is_none()
                && !shared.is_destroying()
                && !slot.should_exit.load(Ordering::Acquire)
        })
        .unwrap();
}

fn run_blocked(shared: &PoolShared, slot: &WorkerSlot) {
    let data = slot.data.lock().unwrap();
    let _ = slot
        .cv
        .wait_timeout_while(data, WORKER_POLL_INTERVAL, |d| {
            d.status == Status::Blocked && !shared.is_destroying() && !slot.should_exit.load(Ordering::Acquire)
        })
        .unwrap();
}

fn run_idle(shared: &PoolShared, slot: &WorkerSlot) {
    {
        let mut data = slot.data.lock().unwrap();
        if data.status != Status::Locked {
            data.status = Status::Idle;
        }
    }

    match shared.queue.timed_wait_for_not_empty(WORKER_POLL_INTERVAL) {
        Ok(mut locked) => {
            let task = locked.pop_head();
            // Mark the task as running *before* releasing the queue's
            // manual lock, so there is no window where the queue looks
            // empty (to `WorkerPool::wait`) but the popped task hasn't
            // been counted as in-flight yet.
            if task.is_some() {
                shared.running_count.fetch_add(1, Ordering::SeqCst);
            }
            locked.unlock();
            let Some(task) = task else { return };

            let task_type = task.task_type();
            let still_idle = {
                let mut data = slot.data.lock().unwrap();
                if data.status == Status::Idle {
                    data.status = Status::Running;
                    data.task_type = task_type;
                    true
                } else {
                    false
                }
            };

            if !still_idle {
                // A concurrent `lock_thread` flipped this worker to LOCKED
                // while it was parked waiting on the queue, after the task
                // had already been popped. LOCKED workers must not consume
                // from the shared queue, so hand the task back rather than
                // running it here.
                shared.running_count.fetch_sub(1, Ordering::SeqCst);
                if let Err(e) = shared.queue.enqueue(task) {
                    wp_warn!("worker {} could not return task to queue: {}", slot.index, e);
                }
                return;
            }

            let code = task.run();
            shared.running_count.fetch_sub(1, Ordering::SeqCst);

            let mut data = slot.data.lock().unwrap();
            if code != 0 && shared.attrs.get_block_on_err() {
                data.error = code;
                data.status = Status::Blocked;
            } else {
                data.error = 0;
                data.status = Status::Idle;
            }
            drop(data);
            slot.cv.notify_all();
            shared.notify_waiters();
        }
        Err(wpool_core::WPoolError::TimedOut) => {}
        Err(wpool_core::WPoolError::Interrupted) => {}
        Err(e) => {
            wp_warn!("worker {} queue wait failed: {}", slot.index, e);
        }
    }
}

/// Spawn the OS thread backing worker `index`. On Unix, records the raw
/// `pthread_t` for later signal delivery.
pub(crate) fn spawn(shared: std::sync::Arc<PoolShared>, index: usize) -> std::io::Result<()> {
    let slot_index = index;
    let spawned = shared.clone();
    let builder = std::thread::Builder::new().name(format!("wpool-worker-{}", index));
    let handle = builder.spawn(move || run(spawned, slot_index))?;

    #[cfg(unix)]
    {
        use std::os::unix::thread::JoinHandleExt;
        shared.workers[index].set_os_thread(handle.as_pthread_t() as usize);
    }

    shared.workers[index].set_handle(handle);
    Ok(())
}
