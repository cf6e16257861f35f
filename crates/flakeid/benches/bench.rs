use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use flakeid::{
    DEFAULT_EPOCH, IdGenStatus, Layout, MonotonicClock, SnowflakeGenerator, TimeSource, parse_id,
};
use std::{thread::scope, time::Instant};

struct FixedMockTime {
    millis: i64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> i64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

/// Hot path: a frozen clock and a fresh generator, so every poll is `Ready`.
fn bench_poll_fixed_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll/fixed");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let time = FixedMockTime {
                    millis: DEFAULT_EPOCH + 1,
                };
                let generator = SnowflakeGenerator::with_layout(0, Layout::DEFAULT, time).unwrap();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id().unwrap() {
                        IdGenStatus::Ready { id } => {
                            black_box(id);
                        }
                        IdGenStatus::Pending { .. } => unreachable!(),
                    }
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Realistic path: the wall clock, waiting whenever a millisecond fills up.
fn bench_next_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_id");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    let generator = SnowflakeGenerator::new(0).unwrap();
    group.bench_function(format!("system/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(generator.next_id().unwrap());
            }
        });
    });

    let generator =
        SnowflakeGenerator::with_layout(0, Layout::DEFAULT, MonotonicClock::new()).unwrap();
    group.bench_function(format!("monotonic/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(generator.next_id().unwrap());
            }
        });
    });

    group.finish();
}

/// Contention: every thread shares one generator.
fn bench_next_id_threaded(c: &mut Criterion) {
    let threads = num_cpus::get();
    let mut group = c.benchmark_group("next_id/threaded");
    group.throughput(Throughput::Elements((TOTAL_IDS * threads) as u64));

    let generator = SnowflakeGenerator::new(0).unwrap();
    group.bench_function(format!("threads/{threads}/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            scope(|s| {
                for _ in 0..threads {
                    s.spawn(|| {
                        for _ in 0..TOTAL_IDS {
                            black_box(generator.next_id().unwrap());
                        }
                    });
                }
            });
        });
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let ids: Vec<i64> = (0..TOTAL_IDS as i64).map(|i| (i << 22) | i).collect();
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for id in &ids {
                black_box(parse_id(*id));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_poll_fixed_time,
    bench_next_id,
    bench_next_id_threaded,
    bench_parse
);
criterion_main!(benches);
