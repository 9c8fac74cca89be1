//! The concurrent queue (CQ): the bounded FIFO plus the mutex/condvar
//! machinery backing it.
//!
//! One primary mutex guards the FIFO and a set of deferred-signal flags.
//! Four condvars correspond to the four conditions callers can wait on
//! (`is_empty`, `is_full`, `not_empty`, `not_full`). State changes set the
//! matching `sig_*` flag instead of broadcasting directly; the flags are
//! drained — in the fixed order is-empty, is-full, not-empty, not-full —
//! either immediately (the common case) or when a caller-held manual lock
//! is released, whichever applies. See `ManualLock` below.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

use wpool_core::{Fifo, PoolResult, Task, WPoolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predicate {
    IsEmpty,
    IsFull,
    NotEmpty,
    NotFull,
}

impl Predicate {
    fn holds(&self, fifo: &Fifo<Task>) -> bool {
        match self {
            Predicate::IsEmpty => fifo.is_empty(),
            Predicate::IsFull => fifo.is_full(),
            Predicate::NotEmpty => !fifo.is_empty(),
            Predicate::NotFull => !fifo.is_full(),
        }
    }
}

struct QueueState {
    fifo: Fifo<Task>,
    sig_is_empty: bool,
    sig_is_full: bool,
    sig_not_empty: bool,
    sig_not_full: bool,
    destroying: bool,
    cancel_wait: bool,
    /// Bumped every time `cancel_wait()` fires; waiters record the epoch
    /// active when they started waiting so the last waiter of a given
    /// cancellation round — not just any waiter that happens to observe
    /// `waiting_for_cond == 0` — clears the flag (see DESIGN.md).
    cancel_epoch: u64,
    waiting_for_cond: usize,
}

/// The concurrent queue: mutex, four condvars, deferred signals, manual
/// lock, destruction flag, cancel-wait flag, waiter counters.
pub struct ConcurrentQueue {
    state: Mutex<QueueState>,
    cond_is_empty: Condvar,
    cond_is_full: Condvar,
    cond_not_empty: Condvar,
    cond_not_full: Condvar,
    lock_free: Condvar,
    owner: Mutex<Option<ThreadId>>,
    waiting_for_lock: AtomicUsize,
}

impl ConcurrentQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        let fifo = match capacity {
            Some(cap) => Fifo::new(cap),
            None => Fifo::unlimited(),
        };
        Self {
            state: Mutex::new(QueueState {
                fifo,
                sig_is_empty: false,
                sig_is_full: false,
                sig_not_empty: false,
                sig_not_full: false,
                destroying: false,
                cancel_wait: false,
                cancel_epoch: 0,
                waiting_for_cond: 0,
            }),
            cond_is_empty: Condvar::new(),
            cond_is_full: Condvar::new(),
            cond_not_empty: Condvar::new(),
            cond_not_full: Condvar::new(),
            lock_free: Condvar::new(),
            owner: Mutex::new(None),
            waiting_for_lock: AtomicUsize::new(0),
        }
    }

    fn is_unlimited(&self) -> bool {
        self.state.lock().unwrap().fifo.capacity().is_none()
    }

    /// Internal `lock_queue`: bump `waiting_for_lock`, acquire the mutex,
    /// re-check destruction after acquisition. Detects same-thread
    /// recursive re-entry (the caller already holds the manual lock) and
    /// returns `WouldDeadlock` instead of blocking forever on a
    /// non-reentrant `std::sync::Mutex`.
    fn lock_queue(&self) -> PoolResult<MutexGuard<'_, QueueState>> {
        let current = thread::current().id();
        if *self.owner.lock().unwrap() == Some(current) {
            return Err(WPoolError::WouldDeadlock);
        }
        self.waiting_for_lock.fetch_add(1, Ordering::SeqCst);
        let guard = self.state.lock().unwrap();
        let remaining = self.waiting_for_lock.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.lock_free.notify_all();
        }
        if guard.destroying {
            return Err(WPoolError::Interrupted);
        }
        Ok(guard)
    }

    /// Drain the four `sig_*` flags in fixed order (is-empty, is-full,
    /// not-empty, not-full) and clear them.
    fn drain(&self, state: &mut QueueState) {
        if state.sig_is_empty {
            state.sig_is_empty = false;
            self.cond_is_empty.notify_all();
        }
        if state.sig_is_full {
            state.sig_is_full = false;
            self.cond_is_full.notify_all();
        }
        if state.sig_not_empty {
            state.sig_not_empty = false;
            self.cond_not_empty.notify_all();
        }
        if state.sig_not_full {
            state.sig_not_full = false;
            self.cond_not_full.notify_all();
        }
    }

    fn cond_for(&self, pred: Predicate) -> &Condvar {
        match pred {
            Predicate::IsEmpty => &self.cond_is_empty,
            Predicate::IsFull => &self.cond_is_full,
            Predicate::NotEmpty => &self.cond_not_empty,
            Predicate::NotFull => &self.cond_not_full,
        }
    }

    // ---- mutation, immediate-broadcast path (no manual lock held) ----

    /// Enqueue a task. Sets `sig_not_empty`, plus `sig_is_full` if the
    /// queue is now at capacity, and broadcasts immediately.
    pub fn enqueue(&self, task: Task) -> PoolResult<()> {
        let mut state = self.lock_queue()?;
        state.fifo.push_tail(task)?;
        state.sig_not_empty = true;
        if state.fifo.is_full() {
            state.sig_is_full = true;
        }
        self.drain(&mut state);
        Ok(())
    }

    /// Dequeue the head task, or `None` if empty. Sets `sig_not_full`,
    /// plus `sig_is_empty` if the queue is now empty, and broadcasts
    /// immediately.
    pub fn dequeue(&self) -> PoolResult<Option<Task>> {
        let mut state = self.lock_queue()?;
        let task = state.fifo.pop_head();
        if task.is_some() {
            state.sig_not_full = true;
            if state.fifo.is_empty() {
                state.sig_is_empty = true;
            }
        }
        self.drain(&mut state);
        Ok(task)
    }

    pub fn len(&self) -> PoolResult<usize> {
        Ok(self.lock_queue()?.fifo.length())
    }

    pub fn is_empty(&self) -> PoolResult<bool> {
        Ok(self.lock_queue()?.fifo.is_empty())
    }

    /// Drop every queued task (running `disposer` on each, FIFO order).
    pub fn clear<F: FnMut(Task)>(&self, disposer: F) -> PoolResult<()> {
        let mut state = self.lock_queue()?;
        state.fifo.clear(disposer);
        state.sig_not_full = true;
        state.sig_is_empty = true;
        self.drain(&mut state);
        Ok(())
    }

    // ---- waiting ----

    fn wait_for(&self, pred: Predicate, timeout: Option<Duration>) -> PoolResult<ManualLock<'_>> {
        if pred == Predicate::IsFull && self.is_unlimited() {
            return Err(WPoolError::NotSupported);
        }

        let mut state = self.state.lock().unwrap();
        if state.destroying {
            return Err(WPoolError::Interrupted);
        }
        state.waiting_for_cond += 1;
        let started_epoch = state.cancel_epoch;

        let mut timed_out = false;
        while !pred.holds(&state.fifo) && !state.destroying && !state.cancel_wait {
            match timeout {
                None => {
                    state = self.cond_for(pred).wait(state).unwrap();
                }
                Some(d) if d.is_zero() => {
                    state = self.cond_for(pred).wait(state).unwrap();
                }
                Some(d) => {
                    let (next, wait_result) = self.cond_for(pred).wait_timeout(state, d).unwrap();
                    state = next;
                    if wait_result.timed_out() && !pred.holds(&state.fifo) {
                        timed_out = true;
                        break;
                    }
                }
            }
        }

        state.waiting_for_cond -= 1;
        // Latch cancel_wait until every waiter active at this cancellation
        // epoch has observed it, not just until the counter happens to hit
        // zero — otherwise a waiter that arrives after cancel_wait() fires
        // but before the last pre-existing waiter clears it would also
        // see WouldBlock, even though it never asked to be cancelled.
        if state.cancel_wait && state.cancel_epoch == started_epoch && state.waiting_for_cond == 0 {
            state.cancel_wait = false;
        }

        let result = if state.destroying {
            Err(WPoolError::Interrupted)
        } else if state.cancel_wait {
            Err(WPoolError::WouldBlock)
        } else if timed_out {
            Err(WPoolError::TimedOut)
        } else {
            Ok(())
        };

        match result {
            Ok(()) => {
                *self.owner.lock().unwrap() = Some(thread::current().id());
                Ok(ManualLock {
                    cq: self,
                    guard: Some(state),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn wait_for_not_empty(&self) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::NotEmpty, None)
    }

    pub fn timed_wait_for_not_empty(&self, timeout: Duration) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::NotEmpty, Some(timeout))
    }

    pub fn wait_for_not_full(&self) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::NotFull, None)
    }

    pub fn timed_wait_for_not_full(&self, timeout: Duration) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::NotFull, Some(timeout))
    }

    pub fn wait_for_is_empty(&self) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::IsEmpty, None)
    }

    pub fn timed_wait_for_is_empty(&self, timeout: Duration) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::IsEmpty, Some(timeout))
    }

    pub fn wait_for_is_full(&self) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::IsFull, None)
    }

    pub fn timed_wait_for_is_full(&self, timeout: Duration) -> PoolResult<ManualLock<'_>> {
        self.wait_for(Predicate::IsFull, Some(timeout))
    }

    /// Acquire the manual lock directly, without waiting on any
    /// particular predicate — the idiomatic equivalent of the CQ's public
    /// `lock()`.
    pub fn lock(&self) -> PoolResult<ManualLock<'_>> {
        let guard = self.lock_queue()?;
        *self.owner.lock().unwrap() = Some(thread::current().id());
        Ok(ManualLock {
            cq: self,
            guard: Some(guard),
        })
    }

    /// Wake every waiter in every `wait_for_*` with `WouldBlock`. A no-op
    /// (returns without broadcasting) if nobody is waiting.
    pub fn cancel_wait(&self) {
        let mut state = self.state.lock().unwrap();
        if state.waiting_for_cond == 0 {
            return;
        }
        state.cancel_wait = true;
        state.cancel_epoch = state.cancel_epoch.wrapping_add(1);
        self.cond_is_empty.notify_all();
        self.cond_is_full.notify_all();
        self.cond_not_empty.notify_all();
        self.cond_not_full.notify_all();
    }

    /// Tear the queue down: set the destruction flag, wake every waiter
    /// with `Interrupted`, then block until no thread remains mid
    /// `lock_queue`.
    pub fn destroy(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.destroying {
                return;
            }
            state.destroying = true;
            self.cond_is_empty.notify_all();
            self.cond_is_full.notify_all();
            self.cond_not_empty.notify_all();
            self.cond_not_full.notify_all();
        }
        let guard = self.state.lock().unwrap();
        let _guard = self
            .lock_free
            .wait_while(guard, |_| self.waiting_for_lock.load(Ordering::SeqCst) != 0)
            .unwrap();
    }
}

/// A held manual lock on the CQ: the RAII realization of its public
/// `lock()`/`unlock()` pair. While alive, the caller may perform
/// any number of mutations through the methods below without triggering a
/// broadcast on every one — the pending `sig_*` flags accumulate and are
/// drained (in is-empty/is-full/not-empty/not-full order) only when this
/// guard drops, matching "a manually-locked CQ receives no broadcasts
/// until `unlock` is called."
pub struct ManualLock<'a> {
    cq: &'a ConcurrentQueue,
    guard: Option<MutexGuard<'a, QueueState>>,
}

impl<'a> ManualLock<'a> {
    /// Always `Some` from construction until `Drop` takes it; every
    /// public constructor (`lock()`, a successful `wait_for`) hands over
    /// the guard it already holds so the manual lock is physically held
    /// for its entire lifetime, with no window where another caller could
    /// slip in between acquisition and first use.
    fn guard(&mut self) -> &mut QueueState {
        self.guard.as_mut().expect("ManualLock guard taken before drop")
    }

    pub fn push_tail(&mut self, task: Task) -> PoolResult<()> {
        let state = self.guard();
        state.fifo.push_tail(task)?;
        state.sig_not_empty = true;
        if state.fifo.is_full() {
            state.sig_is_full = true;
        }
        Ok(())
    }

    pub fn pop_head(&mut self) -> Option<Task> {
        let state = self.guard();
        let task = state.fifo.pop_head();
        if task.is_some() {
            state.sig_not_full = true;
            if state.fifo.is_empty() {
                state.sig_is_empty = true;
            }
        }
        task
    }

    pub fn peek_head_is_some(&mut self) -> bool {
        self.guard().fifo.peek_head().is_some()
    }

    pub fn length(&mut self) -> usize {
        self.guard().fifo.length()
    }

    pub fn is_full(&mut self) -> bool {
        self.guard().fifo.is_full()
    }

    /// Release the manual lock explicitly, draining any deferred signals.
    /// Equivalent to dropping the guard; provided for callers that want an
    /// explicit `unlock()` call for callers that prefer it spelled out.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<'a> Drop for ManualLock<'a> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            self.cq.drain(&mut guard);
        }
        *self.cq.owner.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn noop_task() -> Task {
        Task::worker(|| 0)
    }

    #[test]
    fn test_enqueue_dequeue_fifo_order() {
        let cq = ConcurrentQueue::new(Some(4));
        cq.enqueue(Task::worker(|| 1)).unwrap();
        cq.enqueue(Task::worker(|| 2)).unwrap();
        cq.enqueue(Task::worker(|| 3)).unwrap();
        assert_eq!(cq.dequeue().unwrap().unwrap().run(), 1);
        assert_eq!(cq.dequeue().unwrap().unwrap().run(), 2);
        assert_eq!(cq.dequeue().unwrap().unwrap().run(), 3);
    }

    #[test]
    fn test_overflow_returns_queue_full() {
        let cq = ConcurrentQueue::new(Some(1));
        cq.enqueue(noop_task()).unwrap();
        assert_eq!(cq.enqueue(noop_task()), Err(WPoolError::QueueFull));
    }

    #[test]
    fn test_is_full_on_unlimited_is_not_supported() {
        let cq = ConcurrentQueue::new(None);
        assert_eq!(cq.wait_for_is_full(), Err(WPoolError::NotSupported));
    }

    #[test]
    fn test_timed_wait_for_not_empty_times_out() {
        let cq = ConcurrentQueue::new(Some(4));
        let err = cq.timed_wait_for_not_empty(Duration::from_millis(20));
        assert_eq!(err.unwrap_err(), WPoolError::TimedOut);
    }

    #[test]
    fn test_cancel_wait_unblocks_with_would_block() {
        let cq = Arc::new(ConcurrentQueue::new(Some(1)));
        cq.enqueue(noop_task()).unwrap();
        let waiter = {
            let cq = cq.clone();
            thread::spawn(move || cq.wait_for_not_full())
        };
        thread::sleep(Duration::from_millis(20));
        cq.cancel_wait();
        let result = waiter.join().unwrap();
        assert_eq!(result.unwrap_err(), WPoolError::WouldBlock);
    }

    #[test]
    fn test_cancel_wait_with_no_waiters_is_noop() {
        let cq = ConcurrentQueue::new(Some(4));
        cq.cancel_wait();
    }

    #[test]
    fn test_manual_lock_defers_broadcast() {
        let cq = Arc::new(ConcurrentQueue::new(Some(4)));
        let woke = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let mut locked = cq.lock().unwrap();
        locked.push_tail(noop_task()).unwrap();

        let waiter = {
            let cq = cq.clone();
            let woke = woke.clone();
            thread::spawn(move || {
                cq.wait_for_not_empty().unwrap();
                woke.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert!(!woke.load(Ordering::SeqCst), "waiter woke before unlock");

        locked.unlock();
        waiter.join().unwrap();
        assert!(woke.load(Ordering::SeqCst));
    }

    #[test]
    fn test_recursive_lock_is_would_deadlock() {
        let cq = ConcurrentQueue::new(Some(4));
        let _outer = cq.lock().unwrap();
        assert_eq!(cq.enqueue(noop_task()), Err(WPoolError::WouldDeadlock));
    }

    #[test]
    fn test_destroy_wakes_waiters_with_interrupted() {
        let cq = Arc::new(ConcurrentQueue::new(Some(1)));
        cq.enqueue(noop_task()).unwrap();
        let waiter = {
            let cq = cq.clone();
            thread::spawn(move || cq.wait_for_not_full())
        };
        thread::sleep(Duration::from_millis(20));
        cq.destroy();
        assert_eq!(waiter.join().unwrap().unwrap_err(), WPoolError::Interrupted);
    }

    #[test]
    fn test_clear_sets_not_full_and_is_empty() {
        let cq = ConcurrentQueue::new(Some(2));
        cq.enqueue(noop_task()).unwrap();
        cq.enqueue(noop_task()).unwrap();
        let mut disposed = 0;
        cq.clear(|_| disposed += 1).unwrap();
        assert_eq!(disposed, 2);
        assert!(cq.is_empty().unwrap());
    }
}
