use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use pipeline_common::WorkQueue;
use tokio::sync::mpsc;

const NUM_MESSAGES: usize = 200_000;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn work_queue_benchmark(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("work_queue", |b| {
        b.to_async(&rt).iter(|| async {
            let queue = Arc::new(WorkQueue::new("bench", "bench"));
            let producer = {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for i in 0..NUM_MESSAGES {
                        queue.enqueue(i).unwrap();
                    }
                    queue.mark_complete().unwrap();
                })
            };
            while let Some(item) = queue.dequeue().await {
                black_box(item.payload);
            }
            producer.await.unwrap();
        })
    });
}

fn tokio_unbounded_benchmark(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("tokio_unbounded", |b| {
        b.to_async(&rt).iter(|| async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let producer = tokio::spawn(async move {
                for i in 0..NUM_MESSAGES {
                    tx.send(i).unwrap();
                }
            });
            while let Some(i) = rx.recv().await {
                black_box(i);
            }
            producer.await.unwrap();
        })
    });
}

criterion_group!(benches, work_queue_benchmark, tokio_unbounded_benchmark);
criterion_main!(benches);
