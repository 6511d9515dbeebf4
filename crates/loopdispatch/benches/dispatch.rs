use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossbeam::channel;
use futures::executor::block_on;
use loopdispatch::runtime::launch;
use loopdispatch::toolkit::{EventLoopOptions, LoopThread};
use loopdispatch::LoopDispatcher;
use std::sync::Arc;

fn bench_callback_round_trip(c: &mut Criterion) {
    let loop_thread = LoopThread::spawn(EventLoopOptions::named("bench-callback")).unwrap();
    let dispatcher = LoopDispatcher::new(loop_thread.event_loop().handle());
    let (tx, rx) = channel::unbounded();

    c.bench_function("dispatch_callback_round_trip", |b| {
        b.iter(|| {
            let tx = tx.clone();
            dispatcher
                .dispatch_callback(Box::new(move || tx.send(black_box(1u64)).unwrap()))
                .unwrap();
            rx.recv().unwrap()
        });
    });
}

fn bench_callback_batches(c: &mut Criterion) {
    let loop_thread = LoopThread::spawn(EventLoopOptions::named("bench-batch")).unwrap();
    let dispatcher = LoopDispatcher::new(loop_thread.event_loop().handle());
    let mut group = c.benchmark_group("dispatch_batch");

    for size in [16u64, 256, 4096] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let (tx, rx) = channel::unbounded();
                for i in 0..size {
                    let tx = tx.clone();
                    dispatcher
                        .dispatch_callback(Box::new(move || tx.send(i).unwrap()))
                        .unwrap();
                }
                drop(tx);
                rx.iter().count()
            });
        });
    }

    group.finish();
}

fn bench_job_join(c: &mut Criterion) {
    let loop_thread = LoopThread::spawn(EventLoopOptions::named("bench-job")).unwrap();
    let base = Arc::new(LoopDispatcher::new(loop_thread.event_loop().handle()));
    let immediate = Arc::new(base.immediate());
    let mut group = c.benchmark_group("job_join");

    group.bench_function("queued", |b| {
        b.iter(|| block_on(launch(base.clone(), async { black_box(7) }).join()).unwrap());
    });
    group.bench_function("immediate", |b| {
        b.iter(|| block_on(launch(immediate.clone(), async { black_box(7) }).join()).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_callback_round_trip,
    bench_callback_batches,
    bench_job_join
);
criterion_main!(benches);
