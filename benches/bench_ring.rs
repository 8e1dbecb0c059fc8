//! Criterion benchmark for the SPSC ring buffer
//!
//! Run: cargo bench --bench bench_ring

use std::hint::black_box;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use tradeflow::ring;

const TOTAL_EVENTS: u64 = 1_000_000;
const CAPACITY: usize = 64 * 1024;

/// One producer thread, consumer on the bench thread, spin on full/empty
fn cross_thread_round_trip(events: u64) -> u64 {
    let (mut tx, mut rx) = ring::<u64>(CAPACITY).unwrap();

    let producer = thread::spawn(move || {
        for v in 0..events {
            let mut item = v;
            loop {
                match tx.try_push(item) {
                    Ok(()) => break,
                    Err(back) => {
                        item = back;
                        std::hint::spin_loop();
                    }
                }
            }
        }
    });

    let mut popped = 0u64;
    while popped < events {
        match rx.try_pop() {
            Some(v) => {
                black_box(v);
                popped += 1;
            }
            None => std::hint::spin_loop(),
        }
    }

    producer.join().unwrap();
    popped
}

/// Same-thread push/pop pairs; measures the uncontended fast path
fn single_thread_pairs(events: u64) -> u64 {
    let (mut tx, mut rx) = ring::<u64>(CAPACITY).unwrap();
    for v in 0..events {
        let _ = tx.try_push(v);
        black_box(rx.try_pop());
    }
    events
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_ring");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));

    group.bench_function("cross_thread", |b| {
        b.iter(|| cross_thread_round_trip(TOTAL_EVENTS));
    });
    group.bench_function("single_thread_pairs", |b| {
        b.iter(|| single_thread_pairs(TOTAL_EVENTS));
    });

    group.finish();
}

criterion_group!(benches, bench_spsc);
criterion_main!(benches);
