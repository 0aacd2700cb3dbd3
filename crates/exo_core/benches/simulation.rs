//! Engine benchmarks for exo_core.
//!
//! Run with: `cargo bench -p exo_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use exo_core::config::EngineConfig;
use exo_core::geometry;
use exo_core::orbit;
use exo_core::pathfinding::plan_path;
use exo_test_utils::fixtures;
use glam::Vec3;

/// Full ticks over a populated engine.
pub fn tick_benchmark(c: &mut Criterion) {
    c.bench_function("tick_8_colonies", |b| {
        b.iter_batched(
            || {
                let mut engine = fixtures::engine();
                engine.initialise(8).unwrap();
                for _ in 0..200 {
                    engine.tick(0.2);
                }
                engine
            },
            |mut engine| {
                engine.tick(black_box(0.2));
                engine
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("tick_skirmish", |b| {
        b.iter_batched(
            || fixtures::skirmish().0,
            |mut engine| {
                for _ in 0..10 {
                    engine.tick(black_box(0.5));
                }
                engine
            },
            BatchSize::SmallInput,
        )
    });
}

/// Path planning through a line of planets.
pub fn path_benchmark(c: &mut Criterion) {
    let (mut engine, _, _) = fixtures::skirmish();
    engine.initialise(6).unwrap();
    let config = EngineConfig::default();
    let obstacles = orbit::world_obstacles(engine.colonies(), &config.orbit);
    let start = Vec3::new(-120.0, 0.0, 0.0);
    let end = Vec3::new(120.0, 0.0, 0.0);

    c.bench_function("plan_path", |b| {
        b.iter(|| plan_path(black_box(start), black_box(end), &obstacles, None, &config.orbit))
    });

    c.bench_function("segment_intersects_sphere", |b| {
        b.iter(|| {
            geometry::segment_intersects_sphere(
                black_box(start),
                black_box(end),
                black_box(Vec3::new(0.0, 3.0, 0.0)),
                black_box(12.0),
            )
        })
    });
}

criterion_group!(benches, tick_benchmark, path_benchmark);
criterion_main!(benches);
