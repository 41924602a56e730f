//! Criterion micro-benchmarks for the event calendar.

use criterion::{criterion_group, criterion_main, Criterion};
use mote_core::MoleculeId;
use mote_engine::{Calendar, EventKind};
use std::hint::black_box;

/// Deterministic spread of event times over 100 buckets.
fn times(n: u64) -> Vec<f64> {
    (0..n)
        .map(|i| (i.wrapping_mul(6364136223846793007) % 100_000) as f64 * 1e-9)
        .collect()
}

/// Benchmark: schedule then drain 10K events.
fn bench_schedule_drain_10k(c: &mut Criterion) {
    let ts = times(10_000);
    c.bench_function("calendar_schedule_drain_10k", |b| {
        b.iter(|| {
            let mut cal = Calendar::new(1e-6);
            for (i, &t) in ts.iter().enumerate() {
                cal.schedule(EventKind::Diffuse(MoleculeId(i as u64)), t).unwrap();
            }
            while let Some(ev) = cal.pop_next().unwrap() {
                black_box(ev);
            }
        });
    });
}

/// Benchmark: steady state, each pop reschedules one step later.
fn bench_steady_state_10k(c: &mut Criterion) {
    let ts = times(10_000);
    let mut cal = Calendar::new(1e-6);
    for (i, &t) in ts.iter().enumerate() {
        cal.schedule(EventKind::Diffuse(MoleculeId(i as u64)), t).unwrap();
    }
    c.bench_function("calendar_steady_state_10k", |b| {
        b.iter(|| {
            for _ in 0..10_000 {
                let ev = cal.pop_next().unwrap().unwrap();
                cal.schedule(ev.kind, ev.time + 1e-6).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_schedule_drain_10k, bench_steady_state_10k);
criterion_main!(benches);
