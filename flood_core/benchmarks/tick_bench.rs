use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use flood_core::mapgen::build_demo_terrain;
use flood_core::{
    build_headless_app_with, run_tick, FloodParameters, FloodSimulationConfig,
    FloodSimulationEngine, WeatherCategory, WeatherState,
};

fn storm_engine(size: u32) -> FloodSimulationEngine {
    let terrain = build_demo_terrain(size, size, 7);
    let sources = terrain.river_positions();
    let mut engine = FloodSimulationEngine::seeded(FloodParameters::builtin(), terrain, sources, 7);
    engine.seed_sources();
    // Grow a realistic frontier before measuring.
    for _ in 0..size {
        engine.update_tick(WeatherCategory::Storm, 1.0);
    }
    engine.drain_events();
    engine
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_tick");

    for size in [16u32, 32, 64, 128] {
        group.bench_with_input(BenchmarkId::new("storm", size), &size, |b, &size| {
            b.iter_batched(
                || storm_engine(size),
                |mut engine| {
                    engine.update_tick(WeatherCategory::Storm, 1.0);
                    engine.drain_events()
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("dry", size), &size, |b, &size| {
            b.iter_batched(
                || storm_engine(size),
                |mut engine| {
                    engine.update_tick(WeatherCategory::Clear, 0.0);
                    engine.drain_events()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_app_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("app_tick");

    for size in [16u32, 48] {
        group.bench_with_input(BenchmarkId::new("grid", size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let mut app = build_headless_app_with(FloodSimulationConfig {
                        grid_size: (size, size).into(),
                        seed_sources_on_startup: true,
                        ..FloodSimulationConfig::default()
                    });
                    app.insert_resource(WeatherState::typical(WeatherCategory::HeavyRain));
                    app
                },
                |mut app| {
                    run_tick(&mut app);
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_block_index(c: &mut Criterion) {
    let terrain = build_demo_terrain(128, 128, 3);
    let params = Arc::new(FloodParameters {
        blocking_radius: 2,
        ..FloodParameters::default()
    });
    c.bench_function("block_index_rebuild_128", |b| {
        let mut engine =
            FloodSimulationEngine::seeded(Arc::clone(&params), terrain.clone(), Vec::new(), 1);
        b.iter(|| engine.rebuild_block_index())
    });
}

criterion_group!(tick_benches, bench_engine_tick, bench_app_tick, bench_block_index);
criterion_main!(tick_benches);
