use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wpool::{PoolBuilder, ShutdownMode};

fn submit_and_drain(thread_count: u32, queue_size: u32, task_count: usize) {
    let pool = PoolBuilder::new()
        .thread_count(thread_count)
        .queue_size(queue_size)
        .block_on_add(true)
        .build()
        .expect("valid attributes");

    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..task_count {
        let done = done.clone();
        pool.add_work(move || {
            done.fetch_add(1, Ordering::Relaxed);
            0
        })
        .expect("block_on_add never overflows");
    }
    pool.wait().expect("pool was not destroyed mid-run");
    black_box(done.load(Ordering::Relaxed));
    pool.destroy(ShutdownMode::Graceful).expect("graceful shutdown");
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_work -> wait round trip");

    for &(threads, queue) in &[(1u32, 16u32), (4, 16), (4, 64), (8, 64)] {
        group.bench_function(format!("{threads} threads, queue {queue}"), |b| {
            b.iter(|| submit_and_drain(threads, queue, 1_000));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
