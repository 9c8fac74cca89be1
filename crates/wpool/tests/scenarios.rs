//! Black-box end-to-end scenarios, run only against the public `wpool`
//! API (no access to runtime internals).

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use wpool::{CreatePolicy, PoolBuilder, ShutdownMode, Status, WPoolError};

/// S1 — Basic dispatch: 100 tasks that increment a shared counter and
/// sleep briefly; `wait()` returns once all have completed.
#[test]
fn s1_basic_dispatch() {
    let pool = PoolBuilder::new().build().unwrap();
    let counter = Arc::new(AtomicI32::new(0));
    for _ in 0..100 {
        let counter = counter.clone();
        pool.add_work(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            0
        })
        .unwrap();
    }
    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 100);
    pool.destroy(ShutdownMode::Graceful).unwrap();
}

/// S2 — Backpressure: one worker, a 2-slot queue, `block_on_add`
/// disabled. Four back-to-back submissions: the first runs immediately,
/// the next two fill the queue, the fourth overflows.
#[test]
fn s2_backpressure_overflow() {
    let pool = PoolBuilder::new()
        .thread_count(1)
        .queue_size(2)
        .block_on_add(false)
        .build()
        .unwrap();

    let release = Arc::new(Barrier::new(2));
    let r = release.clone();
    pool.add_work(move || {
        r.wait();
        0
    })
    .unwrap();

    // Wait for the lazily-spawned worker to actually dequeue the barrier
    // task before filling the 2-slot queue below — otherwise the queue may
    // still hold the barrier task itself, leaving room for only one (not
    // two) follow-up submissions.
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if pool.thread_status(0).unwrap().status == Status::Running {
            break;
        }
        assert!(Instant::now() < deadline, "worker never started the barrier task");
        std::thread::sleep(Duration::from_millis(5));
    }

    pool.add_work(|| 0).unwrap();
    pool.add_work(|| 0).unwrap();
    assert_eq!(pool.add_work(|| 0), Err(WPoolError::QueueFull));

    release.wait();
    pool.wait().unwrap();
    pool.destroy(ShutdownMode::Graceful).unwrap();
}

/// S3 — Timed submission: one worker busy on a long task, a 1-slot
/// queue already occupied; `timed_add_work` with a short timeout fails
/// with `TimedOut`, then succeeds once room frees up.
#[test]
fn s3_timed_submission() {
    let pool = PoolBuilder::new()
        .thread_count(1)
        .queue_size(1)
        .build()
        .unwrap();

    pool.add_work(|| {
        std::thread::sleep(Duration::from_millis(400));
        0
    })
    .unwrap();
    pool.add_work(|| 0).unwrap();

    let err = pool.timed_add_work(|| 0, Duration::from_millis(50));
    assert_eq!(err, Err(WPoolError::TimedOut));

    let ok = pool.timed_add_work(|| 0, Duration::from_secs(2));
    assert!(ok.is_ok());

    pool.wait().unwrap();
    pool.destroy(ShutdownMode::Graceful).unwrap();
}

/// S4 — Error latching: a task returning non-zero latches its worker
/// into BLOCKED with the error code; queued work waits until
/// `restart_thread` clears the latch.
#[test]
fn s4_error_latching_and_restart() {
    let pool = PoolBuilder::new()
        .thread_count(1)
        .block_on_err(true)
        .build()
        .unwrap();

    pool.add_work(|| 7).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let info = pool.thread_status(0).unwrap();
        if info.status == Status::Blocked {
            assert_eq!(info.error, 7);
            break;
        }
        assert!(Instant::now() < deadline, "worker never latched BLOCKED");
        std::thread::sleep(Duration::from_millis(5));
    }

    let ran = Arc::new(AtomicUsize::new(0));
    let r = ran.clone();
    pool.add_work(move || {
        r.fetch_add(1, Ordering::SeqCst);
        0
    })
    .unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 0, "queued task ran before restart");

    pool.restart_thread(0).unwrap();
    pool.wait().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(pool.thread_status(0).unwrap().status, Status::Idle);

    pool.destroy(ShutdownMode::Graceful).unwrap();
}

/// S5 — Dedicated task: lock a worker, install a task into its private
/// slot, observe it runs without disturbing `error`, then unlock.
#[test]
fn s5_dedicated_task() {
    let pool = PoolBuilder::new().build().unwrap();
    let idx = pool.lock_thread().unwrap();
    assert_eq!(idx, 0);
    assert_eq!(pool.thread_status(idx).unwrap().status, Status::Locked);

    let result = Arc::new(std::sync::Mutex::new(String::new()));
    let r = result.clone();
    pool.add_dedicated(
        move || {
            *r.lock().unwrap() = "abc".chars().rev().collect();
            0
        },
        idx,
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if *result.lock().unwrap() == "cba" {
            break;
        }
        assert!(Instant::now() < deadline, "dedicated task never ran");
        std::thread::sleep(Duration::from_millis(5));
    }

    let info = pool.thread_status(idx).unwrap();
    assert_eq!(info.status, Status::Locked);
    assert_eq!(info.error, 0);

    pool.unlock_thread(idx).unwrap();
    assert_eq!(pool.thread_status(idx).unwrap().status, Status::Idle);
    pool.destroy(ShutdownMode::Graceful).unwrap();
}

/// S6 — Destruction cancels waiters: a full 1-slot queue with its only
/// worker busy; a second thread parked on `add_work` (queue full, no
/// room) must be released with an error once a third thread calls
/// `destroy(FORCEFUL)`, and `destroy` itself must return promptly rather
/// than waiting out the long-running task.
#[test]
fn s6_destruction_cancels_waiters() {
    let pool = Arc::new(
        PoolBuilder::new()
            .thread_count(1)
            .queue_size(1)
            .block_on_add(true)
            .create_policy(CreatePolicy::Strict)
            .build()
            .unwrap(),
    );

    pool.add_work(|| {
        std::thread::sleep(Duration::from_secs(10));
        0
    })
    .unwrap();
    pool.add_work(|| 0).unwrap();

    let waiter_pool = pool.clone();
    let waiter = std::thread::spawn(move || waiter_pool.add_work(|| 0));

    std::thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    pool.destroy(ShutdownMode::Forceful).unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));

    let waiter_result = waiter.join().unwrap();
    assert_eq!(waiter_result, Err(wpool::WPoolError::Interrupted));
}
