use std::sync::Arc;

use flood_core::mapgen::build_demo_terrain;
use flood_core::{
    FloodEvent, FloodParameters, FloodSimulationEngine, Position, TerrainClassifier, TerrainGrid,
    WeatherCategory,
};

const SCHEDULE: [(WeatherCategory, f32); 6] = [
    (WeatherCategory::Storm, 1.0),
    (WeatherCategory::HeavyRain, 0.8),
    (WeatherCategory::ModerateRain, 0.5),
    (WeatherCategory::LightRain, 0.25),
    (WeatherCategory::Clear, 0.1),
    (WeatherCategory::Clear, 0.0),
];

fn weather_at(tick: usize) -> (WeatherCategory, f32) {
    SCHEDULE[(tick / 7) % SCHEDULE.len()]
}

fn demo_engine(seed: u64) -> FloodSimulationEngine {
    let terrain = build_demo_terrain(24, 16, seed);
    let sources = terrain.river_positions();
    FloodSimulationEngine::seeded(FloodParameters::builtin(), terrain, sources, seed)
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn flooded_cells_stay_inside_the_grid() {
    let mut engine = demo_engine(5);
    for tick in 0..250 {
        let (weather, rain) = weather_at(tick);
        let report = engine.update_tick(weather, rain);
        assert_eq!(report.count, engine.count());
        for position in engine.all_flooded_positions() {
            assert!(
                engine.terrain().in_bounds(position),
                "tick {tick}: {position} escaped the grid"
            );
        }
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let mut first = demo_engine(9);
    let mut second = demo_engine(9);
    for tick in 0..120 {
        let (weather, rain) = weather_at(tick);
        let a = first.update_tick(weather, rain);
        let b = second.update_tick(weather, rain);
        assert_eq!(a, b, "reports diverged at tick {tick}");
        assert_eq!(first.drain_events(), second.drain_events());
        assert_eq!(first.state_hash(), second.state_hash());
    }
}

#[test]
fn expansion_is_bounded_by_the_rounded_rate() {
    let mut engine = demo_engine(13);
    for tick in 0..150 {
        let (weather, rain) = weather_at(tick);
        let expected_max = engine.parameters().profile(weather).expansion_count();
        let report = engine.update_tick(weather, rain);
        assert!(report.expanded <= expected_max, "tick {tick}: {report:?}");
        assert!(report.jumped <= 1);
        assert!(report.spawned <= engine.sources().len());
    }
}

#[test]
fn tile_events_reconcile_with_the_tick_delta() {
    let mut engine = demo_engine(21);
    for tick in 0..100 {
        let (weather, rain) = weather_at(tick);
        let report = engine.update_tick(weather, rain);
        let events = engine.drain_events();

        let added = events
            .iter()
            .filter(|e| matches!(e, FloodEvent::TileAdded(_)))
            .count() as i64;
        let removed = events
            .iter()
            .filter(|e| matches!(e, FloodEvent::TileRemoved(_)))
            .count() as i64;
        assert_eq!(added - removed, report.delta, "tick {tick}");
        assert_eq!(added as usize, report.added());
        assert_eq!(removed as usize, report.shrunk);
        assert_eq!(events.last(), Some(&FloodEvent::SizeChanged(report.count)));
        if report.delta != 0 {
            assert!(events.contains(&FloodEvent::Changed(report.delta)));
        }
    }
}

#[test]
fn no_spawning_below_minimum_rain() {
    let mut engine = demo_engine(3);
    let report = engine.update_tick(WeatherCategory::Storm, 0.1);
    assert_eq!(report.spawned, 0);
    assert_eq!(engine.count(), 0);
}

#[test]
fn certain_spawn_floods_every_source() {
    let params = Arc::new(FloodParameters {
        flood_spawn_chance: 1.0,
        ..FloodParameters::default()
    });
    let terrain = build_demo_terrain(16, 12, 4);
    let sources = terrain.river_positions();
    let mut engine = FloodSimulationEngine::seeded(params, terrain, sources.clone(), 4);

    let report = engine.update_tick(WeatherCategory::HeavyRain, 0.75);
    assert_eq!(report.spawned, sources.len());
    assert!(sources.iter().all(|&source| engine.is_flooded(source)));
}

#[test]
fn dry_clear_tick_recedes_everything() {
    let mut engine = demo_engine(17);
    engine.seed_sources();
    for _ in 0..10 {
        engine.update_tick(WeatherCategory::Storm, 1.0);
    }
    assert!(engine.count() > 0);

    // 0.25 + 0.01 + 0.8 exceeds certainty for every cell.
    let report = engine.update_tick(WeatherCategory::Clear, 0.0);
    assert_eq!(report.count, 0);
    assert_eq!(report.delta, -(report.previous_count as i64));
    assert_eq!(engine.previous_delta(), report.delta);
}

#[test]
fn immune_sources_survive_a_drought() {
    let params = Arc::new(FloodParameters {
        sources_immune_to_shrinkage: true,
        ..FloodParameters::default()
    });
    let terrain = build_demo_terrain(16, 12, 8);
    let sources = terrain.river_positions();
    let mut engine = FloodSimulationEngine::seeded(params, terrain, sources.clone(), 8);
    engine.seed_sources();
    engine.update_tick(WeatherCategory::Storm, 1.0);

    engine.update_tick(WeatherCategory::Clear, 0.0);
    assert_eq!(engine.count(), sources.len());
    assert!(sources.iter().all(|&source| engine.is_flooded(source)));
}

#[test]
fn edges_of_a_flooded_block_recede_faster_than_its_interior() {
    let terrain = TerrainGrid::new(5, 5);
    let mut engine =
        FloodSimulationEngine::seeded(FloodParameters::builtin(), terrain, Vec::new(), 1);
    for y in 1..=3 {
        for x in 1..=3 {
            assert!(engine.flood_at(Position::new(x, y)));
        }
    }
    let profile = *engine.parameters().profile(WeatherCategory::LightRain);

    let interior = engine.shrink_chance(Position::new(2, 2), &profile, 0.5);
    let corner = engine.shrink_chance(Position::new(1, 1), &profile, 0.5);
    let side = engine.shrink_chance(Position::new(2, 1), &profile, 0.5);
    assert!(approx(interior, 0.05 + 0.01));
    assert!(approx(corner, 0.05 + 0.01 + 0.05));
    assert!(approx(side, corner));

    let dry_interior = engine.shrink_chance(Position::new(2, 2), &profile, 0.0);
    assert!(approx(dry_interior, 0.05 + 0.01 + 0.8));
}

#[test]
fn spread_chance_depends_on_terrain_class() {
    let terrain = TerrainGrid::from_ascii(&["#..~.", "....."]).expect("valid map");
    let engine = FloodSimulationEngine::seeded(FloodParameters::builtin(), terrain, Vec::new(), 1);
    let profile = *engine.parameters().profile(WeatherCategory::HeavyRain);
    let base = 0.7 * 1.2;

    let near_rock = engine
        .spread_chance(Position::new(1, 0), &profile)
        .expect("in bounds");
    let land = engine
        .spread_chance(Position::new(2, 0), &profile)
        .expect("in bounds");
    let river = engine
        .spread_chance(Position::new(3, 0), &profile)
        .expect("in bounds");
    assert!(approx(near_rock, base * 0.1));
    assert!(approx(land, base * 0.5));
    assert!(approx(river, base));
    assert_eq!(engine.spread_chance(Position::new(5, 0), &profile), None);
}
