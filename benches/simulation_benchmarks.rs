//! Simulation benchmarks with 95% confidence intervals.
//!
//! Run with: cargo bench
//!
//! Groups:
//! - `canning_line`: complete runs of both presets over growing horizons
//! - `engine`: raw dispatch cost of the kernel primitives

#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use canline::config::LineConfig;
use canline::engine::{SimEngine, SimTime};
use canline::line::simulate;
use canline::SimError;

/// Full line runs; the horizon scales the event count linearly.
fn bench_canning_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("canning_line");
    group.sample_size(20);
    group.confidence_level(0.95);

    for horizon in [3_600.0, 21_600.0, 86_400.0] {
        for (name, preset) in [
            ("low", LineConfig::low_capacity()),
            ("high", LineConfig::high_capacity()),
        ] {
            let config = LineConfig { horizon, ..preset };
            group.bench_with_input(
                BenchmarkId::new(name, horizon as u64),
                &config,
                |b, config| b.iter(|| black_box(simulate(config).unwrap().counters)),
            );
        }
    }

    group.finish();
}

/// Contended facility: every job queues behind the previous one.
fn bench_engine_facility(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.sample_size(50);

    for jobs in [1_000_u32, 10_000] {
        group.bench_with_input(BenchmarkId::new("facility_queue", jobs), &jobs, |b, &jobs| {
            b.iter(|| {
                let mut engine = SimEngine::new();
                let press = engine.add_facility("press");
                for _ in 0..jobs {
                    let sim = engine.handle();
                    engine.spawn("job", async move {
                        sim.seize(press).await?;
                        sim.hold(SimTime::from_secs(1.0)).await?;
                        sim.release(press)
                    });
                }
                let outcome = engine.run_until(SimTime::from_secs(f64::from(jobs) + 1.0)).unwrap();
                black_box(outcome.events_processed)
            });
        });

        group.bench_with_input(BenchmarkId::new("hold_only", jobs), &jobs, |b, &jobs| {
            b.iter(|| {
                let mut engine = SimEngine::new();
                for i in 0..jobs {
                    let sim = engine.handle();
                    engine.spawn("sleeper", async move {
                        sim.hold(SimTime::from_secs(f64::from(i % 97))).await?;
                        Ok::<(), SimError>(())
                    });
                }
                let outcome = engine.run_until(SimTime::from_secs(100.0)).unwrap();
                black_box(outcome.events_processed)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_canning_line, bench_engine_facility);
criterion_main!(benches);
