//! The worker pool: owns the concurrent queue plus the worker array,
//! and exposes the full lifecycle/control surface.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use wpool_core::{
    wp_error, wp_warn, Attributes, CancelType, CreatePolicy, PoolResult, ShutdownMode, Status,
    Task, TaskType, WPoolError, WorkerInfo,
};

use crate::queue::ConcurrentQueue;
use crate::signal;
use crate::worker::{self, WorkerSlot, WORKER_POLL_INTERVAL};

/// State backing `WorkerPool::wait`/`timed_wait`/`cancel_wait`, guarded by
/// `PoolShared::wait_mutex`. Mirrors the CQ's `waiting_for_cond`/
/// `cancel_epoch` pair (queue.rs) rather than a single flag: a lone
/// `AtomicBool` consumed via `swap(false)` would only release one parked
/// waiter per `cancel_wait()` and, if set with nobody parked, would wrongly
/// latch onto the *next* caller's first `wait()`. Bumping an epoch and
/// having each waiter compare it against the epoch it started under wakes
/// every waiter active at cancellation time and leaves later callers alone.
struct WaitState {
    waiting: usize,
    cancel_epoch: u64,
}

/// Shared context handed to every worker thread (a clone of the `Arc`,
/// never a raw pointer back to the owning `WorkerPool`).
pub(crate) struct PoolShared {
    pub queue: ConcurrentQueue,
    pub attrs: Attributes,
    pub workers: Vec<WorkerSlot>,
    destroying: AtomicBool,
    pub running_count: AtomicUsize,
    wait_mutex: Mutex<WaitState>,
    wait_cv: Condvar,
    snapshot: Mutex<Vec<WorkerInfo>>,
}

impl PoolShared {
    pub fn is_destroying(&self) -> bool {
        self.destroying.load(Ordering::Acquire)
    }

    /// Wake anyone blocked in `wait`/`timed_wait` to re-check whether the
    /// pool has gone quiescent.
    pub fn notify_waiters(&self) {
        self.wait_cv.notify_all();
    }
}

/// A pool-owned snapshot of every worker's public status, refreshed (not
/// reallocated) on each `thread_status_all` call and handed back as a
/// borrow the caller must not — and, since it's a guard, cannot — free.
pub struct WorkerInfoSnapshot<'a> {
    guard: MutexGuard<'a, Vec<WorkerInfo>>,
}

impl<'a> std::ops::Deref for WorkerInfoSnapshot<'a> {
    type Target = [WorkerInfo];
    fn deref(&self) -> &[WorkerInfo] {
        &self.guard
    }
}

/// The worker pool itself: `create`, `add_work`, per-thread locking and
/// signaling, introspection, and shutdown.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Allocate a pool and spawn its workers per `attr`'s create policy.
    /// `Strict` spawns all `thread_count` workers up front, failing the
    /// whole construction (`WouldBlock`) if any spawn fails; `Lazy`
    /// leaves every worker unspawned (`Status::Stopped`) until `add_work`
    /// or `lock_thread`/`restart_thread` first needs one.
    pub fn create(attrs: Attributes) -> PoolResult<Self> {
        attrs.validate()?;
        // Idempotent; cheap enough to call unconditionally rather than
        // only when `cancel_type == Async`, so a pool is never caught
        // without the handler if `destroy` runs against different
        // attributes than `create` was inspected with.
        signal::install_cancel_handler();
        let n = attrs.get_thread_count() as usize;
        let create_policy = attrs.get_create_policy();
        let capacity = attrs.get_queue_capacity().map(|c| c as usize);

        let mut workers = Vec::with_capacity(n);
        for i in 0..n {
            workers.push(WorkerSlot::new(i as u32));
        }

        let shared = Arc::new(PoolShared {
            queue: ConcurrentQueue::new(capacity),
            attrs,
            workers,
            destroying: AtomicBool::new(false),
            running_count: AtomicUsize::new(0),
            wait_mutex: Mutex::new(WaitState {
                waiting: 0,
                cancel_epoch: 0,
            }),
            wait_cv: Condvar::new(),
            snapshot: Mutex::new(Vec::with_capacity(n)),
        });

        if create_policy == CreatePolicy::Strict {
            for i in 0..n {
                worker::spawn(shared.clone(), i).map_err(|e| {
                    wp_error!("strict spawn of worker {} failed: {}", i, e);
                    WPoolError::WouldBlock
                })?;
            }
        }

        Ok(Self { shared })
    }

    fn slot(&self, idx: u32) -> PoolResult<&WorkerSlot> {
        self.shared
            .workers
            .get(idx as usize)
            .ok_or(WPoolError::NoSuchWorker)
    }

    fn maybe_spawn_lazy(&self) {
        if self.shared.attrs.get_create_policy() != CreatePolicy::Lazy {
            return;
        }
        let any_idle = self.shared.workers.iter().any(|s| s.status() == Status::Idle);
        if any_idle {
            return;
        }
        if let Some(slot) = self.shared.workers.iter().find(|s| !s.has_handle()) {
            if let Err(e) = worker::spawn(self.shared.clone(), slot.index as usize) {
                // Spawn failure does not un-enqueue an already-queued
                // task; the task just waits for an existing worker.
                wp_warn!("lazy spawn of worker {} failed: {}", slot.index, e);
            }
        }
    }

    /// Enqueue a `WORKER`-typed task. Blocks on a full queue only if
    /// `block_on_add` is enabled, using `timed_wait`'s `timeout` when
    /// `timed_wait` is also enabled.
    pub fn add_work<F>(&self, routine: F) -> PoolResult<()>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        if self.shared.is_destroying() {
            return Err(WPoolError::Interrupted);
        }
        self.maybe_spawn_lazy();
        let timeout = if self.shared.attrs.get_timed_wait() {
            Some(self.shared.attrs.get_timeout())
        } else {
            None
        };
        self.enqueue_blocking(Task::worker(routine), self.shared.attrs.get_block_on_add(), timeout)
    }

    /// Enqueue a `WORKER`-typed task, always blocking up to `timeout`
    /// regardless of the pool's `block_on_add`/`timed_wait` attributes.
    pub fn timed_add_work<F>(&self, routine: F, timeout: Duration) -> PoolResult<()>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        if self.shared.is_destroying() {
            return Err(WPoolError::Interrupted);
        }
        self.maybe_spawn_lazy();
        self.enqueue_blocking(Task::worker(routine), true, Some(timeout))
    }

    fn enqueue_blocking(&self, task: Task, block_on_full: bool, timeout: Option<Duration>) -> PoolResult<()> {
        let mut locked = self.shared.queue.lock()?;
        if !locked.is_full() {
            locked.push_tail(task).expect("capacity just checked under the manual lock");
            locked.unlock();
            self.shared.notify_waiters();
            return Ok(());
        }
        locked.unlock();
        if !block_on_full {
            return Err(WPoolError::QueueFull);
        }

        let mut waited = match timeout {
            Some(d) => self.shared.queue.timed_wait_for_not_full(d)?,
            None => self.shared.queue.wait_for_not_full()?,
        };
        waited.push_tail(task)?;
        waited.unlock();
        self.shared.notify_waiters();
        Ok(())
    }

    /// Transition the lowest-indexed `IDLE`/`STOPPED` worker to `LOCKED`
    /// and return its index. Spawns the worker first if it had never
    /// started (`Lazy` policy left it `Stopped`).
    ///
    /// Concurrent callers across multiple threads are undefined — this
    /// is a single-submitter operation.
    pub fn lock_thread(&self) -> PoolResult<u32> {
        if self.shared.is_destroying() {
            return Err(WPoolError::Interrupted);
        }
        for slot in &self.shared.workers {
            if slot.try_lock_if_lockable() {
                if !slot.has_handle() {
                    worker::spawn(self.shared.clone(), slot.index as usize)
                        .map_err(|_| WPoolError::WouldBlock)?;
                }
                return Ok(slot.index);
            }
        }
        Err(WPoolError::WouldBlock)
    }

    /// `LOCKED` -> `IDLE`. Silently ignores a worker that isn't `LOCKED`.
    pub fn unlock_thread(&self, idx: u32) -> PoolResult<()> {
        let slot = self.slot(idx)?;
        slot.unlock();
        self.shared.notify_waiters();
        Ok(())
    }

    /// Install a task into a `LOCKED` worker's private dedicated slot.
    pub fn add_dedicated<F>(&self, routine: F, idx: u32) -> PoolResult<()>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        let slot = self.slot(idx)?;
        if slot.install_dedicated(Task::new(routine, TaskType::Dedicated)) {
            Ok(())
        } else {
            Err(WPoolError::InvalidArgument)
        }
    }

    pub fn thread_status(&self, idx: u32) -> PoolResult<WorkerInfo> {
        let slot = self.slot(idx)?;
        Ok(WorkerInfo {
            index: slot.index,
            status: slot.status(),
            task_type: slot.task_type(),
            error: slot.error(),
        })
    }

    /// Refill the pool-owned snapshot buffer in place and hand back a
    /// borrow of it.
    pub fn thread_status_all(&self) -> WorkerInfoSnapshot<'_> {
        let mut buf = self.shared.snapshot.lock().unwrap();
        buf.clear();
        for slot in &self.shared.workers {
            buf.push(WorkerInfo {
                index: slot.index,
                status: slot.status(),
                task_type: slot.task_type(),
                error: slot.error(),
            });
        }
        WorkerInfoSnapshot { guard: buf }
    }

    /// `STOPPED`/`BLOCKED` -> `STARTING` -> `IDLE`; clears the latched
    /// error. `AlreadyRunning` if the worker isn't in a restartable state.
    pub fn restart_thread(&self, idx: u32) -> PoolResult<()> {
        let slot = self.slot(idx)?;
        slot.restart().map_err(|_| WPoolError::AlreadyRunning)?;
        if !slot.has_handle() {
            worker::spawn(self.shared.clone(), idx as usize).map_err(|_| WPoolError::WouldBlock)?;
        }
        Ok(())
    }

    /// Restart every restartable (`STOPPED`/`BLOCKED`) worker.
    pub fn refresh(&self) -> PoolResult<()> {
        if self.shared.is_destroying() {
            return Err(WPoolError::Interrupted);
        }
        for slot in &self.shared.workers {
            if slot.status().is_restartable() {
                let _ = self.restart_thread(slot.index);
            }
        }
        Ok(())
    }

    fn all_quiescent(&self) -> bool {
        self.shared.queue.is_empty().unwrap_or(true)
            && self.shared.running_count.load(Ordering::SeqCst) == 0
    }

    fn wait_inner(&self, timeout: Option<Duration>) -> PoolResult<()> {
        let mut guard = self.shared.wait_mutex.lock().unwrap();
        guard.waiting += 1;
        let started_epoch = guard.cancel_epoch;
        let start = Instant::now();

        let result = loop {
            if self.shared.is_destroying() {
                break Err(WPoolError::Interrupted);
            }
            if guard.cancel_epoch != started_epoch {
                break Err(WPoolError::WouldBlock);
            }
            if self.all_quiescent() {
                break Ok(());
            }
            let slice = match timeout {
                None => WORKER_POLL_INTERVAL,
                Some(d) => {
                    let elapsed = start.elapsed();
                    if elapsed >= d {
                        break Err(WPoolError::TimedOut);
                    }
                    (d - elapsed).min(WORKER_POLL_INTERVAL)
                }
            };
            let (next, _) = self.shared.wait_cv.wait_timeout(guard, slice).unwrap();
            guard = next;
        };

        guard.waiting -= 1;
        result
    }

    /// Block until the queue is empty and no worker is `RUNNING`, using
    /// `timed_wait`'s attribute-configured `timeout` when `timed_wait` is
    /// enabled.
    pub fn wait(&self) -> PoolResult<()> {
        let timeout = if self.shared.attrs.get_timed_wait() {
            Some(self.shared.attrs.get_timeout())
        } else {
            None
        };
        self.wait_inner(timeout)
    }

    /// As `wait`, but always bounded by `timeout` regardless of the
    /// `timed_wait` attribute.
    pub fn timed_wait(&self, timeout: Duration) -> PoolResult<()> {
        self.wait_inner(Some(timeout))
    }

    /// Wake every `wait`/`timed_wait` caller currently parked with
    /// `WouldBlock`. A no-op if nobody is waiting.
    pub fn cancel_wait(&self) {
        let mut guard = self.shared.wait_mutex.lock().unwrap();
        if guard.waiting == 0 {
            return;
        }
        guard.cancel_epoch = guard.cancel_epoch.wrapping_add(1);
        drop(guard);
        self.shared.notify_waiters();
    }

    /// Deliver `sig` to worker `idx` if (and only if) it is currently
    /// `RUNNING`. `NotSupported` on platforms without per-thread signal
    /// delivery.
    pub fn signal(&self, idx: u32, sig: i32) -> PoolResult<()> {
        let slot = self.slot(idx)?;
        if slot.status() != Status::Running {
            return Ok(());
        }
        match slot.os_thread() {
            Some(raw) => signal::send_signal(raw, sig),
            None => Err(WPoolError::NotSupported),
        }
    }

    /// `signal` applied to every currently `RUNNING` worker. Individual
    /// delivery failures are swallowed — there is no single caller to
    /// report them to.
    pub fn signal_all(&self, sig: i32) -> PoolResult<()> {
        for slot in &self.shared.workers {
            if slot.status() == Status::Running {
                if let Some(raw) = slot.os_thread() {
                    if let Err(e) = signal::send_signal(raw, sig) {
                        wp_warn!("signal_all: worker {} not signaled: {}", slot.index, e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drain the queue and wait for every running task to finish, then
    /// tear the pool down.
    fn destroy_graceful(&self) {
        loop {
            if self.all_quiescent() {
                break;
            }
            std::thread::sleep(WORKER_POLL_INTERVAL);
        }
        self.teardown(false);
    }

    /// Request immediate cancellation of every worker. `cancel_type ==
    /// Async` additionally signals `RUNNING` workers with
    /// `signal::CANCEL_SIGNAL` (a no-op-handler-installed, default-Ignore
    /// signal — never a `Term`-default one); either way, workers notice at
    /// their own safe points (queue waits, dedicated-task waits, restart
    /// waits) via `should_exit`.
    fn destroy_forceful(&self) {
        for slot in &self.shared.workers {
            slot.should_exit.store(true, Ordering::SeqCst);
        }
        if self.shared.attrs.get_cancel_type() == CancelType::Async {
            #[cfg(unix)]
            self.signal_all(signal::CANCEL_SIGNAL).ok();
        }
        self.teardown(true);
    }

    fn teardown(&self, forceful: bool) {
        if self.shared.destroying.swap(true, Ordering::SeqCst) {
            // Already torn down by a concurrent `destroy` call.
            return;
        }
        self.shared.queue.destroy();
        self.shared.notify_waiters();
        for slot in &self.shared.workers {
            slot.should_exit.store(true, Ordering::SeqCst);
            slot.wake();
        }
        for slot in &self.shared.workers {
            let Some(handle) = slot.take_handle() else { continue };
            if forceful {
                // A worker mid-task (not parked at a queue/dedicated/restart
                // wait) can't be interrupted — only the task's own
                // cooperation ends it. Reap it on a detached thread instead
                // of blocking this call on however long that task takes.
                let index = slot.index;
                std::thread::spawn(move || {
                    if handle.join().is_err() {
                        wp_error!("worker {} panicked during forceful destroy", index);
                    }
                });
            } else if handle.join().is_err() {
                wp_error!("worker {} panicked during destroy", slot.index);
            }
        }
        if forceful {
            let _ = self.shared.queue.clear(drop);
        }
    }

    /// `Graceful`: drain the queue and wait for in-flight tasks, then
    /// tear down. `Forceful`: cancel every worker immediately, then tear
    /// down. Rust's `ShutdownMode` has exactly these two variants, so an
    /// unrecognized shutdown mode is structurally unreachable here.
    ///
    /// Takes `&self`, not `self`, so one thread may call `destroy` while
    /// another is still blocked inside `add_work`/`wait` on the same
    /// pool — both observe the same `Arc<WorkerPool>`. A second call
    /// after the first completes is a no-op.
    pub fn destroy(&self, mode: ShutdownMode) -> PoolResult<()> {
        match mode {
            ShutdownMode::Graceful => self.destroy_graceful(),
            ShutdownMode::Forceful => self.destroy_forceful(),
        }
        Ok(())
    }
}
