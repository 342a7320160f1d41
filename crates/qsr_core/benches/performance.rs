//! Performance benchmarks for qsr_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qsr_core::clock::{EventKind, EventSubject, SimulationClock};
use qsr_core::ecs::Channel;
use qsr_core::scenario::{ArrivalProcess, Staffing};
use qsr_core::SimConfig;

fn bench_day_run(c: &mut Criterion) {
    let days = vec![
        ("quiet", Some(20.0)),
        ("default", None),
        ("rush", Some(200.0)),
    ];

    let mut group = c.benchmark_group("day_run");
    for (name, walk_in_per_hour) in days {
        let mut config = SimConfig::default().with_staffing(Staffing {
            cashiers: 3,
            cooks: 4,
            espresso_machines: 2,
            packers: 3,
            pickup_windows: 3,
        });
        if let Some(walk_in_per_hour) = walk_in_per_hour {
            config = config.with_arrivals(
                Channel::WalkIn,
                ArrivalProcess::poisson(walk_in_per_hour),
            );
        }
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| black_box(qsr_core::run(config, 42)));
        });
    }
    group.finish();
}

fn bench_event_queue(c: &mut Criterion) {
    c.bench_function("event_queue_push_pop_10k", |b| {
        b.iter(|| {
            let mut clock = SimulationClock::default();
            for i in 0..10_000u64 {
                // interleave timestamps so the heap actually reorders
                let at = (i * 7_919) % 10_000;
                let _ = clock.schedule(at, EventKind::Arrival, EventSubject::Channel(Channel::WalkIn));
            }
            while let Some(event) = clock.pop_next() {
                black_box(event);
            }
        });
    });
}

criterion_group!(benches, bench_day_run, bench_event_queue);
criterion_main!(benches);
