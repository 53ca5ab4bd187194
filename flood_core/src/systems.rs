use std::sync::Arc;

use bevy::prelude::*;

use crate::{
    events::{FloodEvent, TickOutcome},
    flood_config::FloodConfigHandle,
    metrics::{collect_flood_metrics, FloodMetrics},
    position::Position,
    resources::{FloodEngine, LastFloodReport, SimulationTick, SkippedTicks},
    weather::WeatherState,
};

/// Host-issued edits applied before the next tick runs.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodCommand {
    ClearAll { preserve_sources: bool },
    ResetToSources,
    FloodAt(Position),
    DrainAt(Position),
}

/// Wires the flood engine into the `Update` schedule.
///
/// Expects [`FloodEngine`] and [`FloodConfigHandle`] to be inserted by the
/// host; [`WeatherState`] is optional and its absence skips ticks.
pub struct FloodSimulationPlugin;

impl Plugin for FloodSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FloodEvent>()
            .add_event::<FloodCommand>()
            .init_resource::<SimulationTick>()
            .init_resource::<SkippedTicks>()
            .init_resource::<LastFloodReport>()
            .init_resource::<FloodMetrics>()
            .add_systems(
                Update,
                (
                    sync_flood_config,
                    apply_flood_commands,
                    run_flood_tick,
                    collect_flood_metrics,
                )
                    .chain(),
            );
    }
}

pub fn sync_flood_config(handle: Res<FloodConfigHandle>, mut engine: ResMut<FloodEngine>) {
    if !handle.is_changed() || Arc::ptr_eq(&handle.0, engine.parameters()) {
        return;
    }
    engine.set_parameters(handle.get());
    tracing::info!(
        target: "flood::config",
        blocking_radius = handle.0.blocking_radius,
        blocked_cells = engine.block_index().len(),
        "flood_config.applied"
    );
}

pub fn apply_flood_commands(
    mut commands: EventReader<FloodCommand>,
    mut engine: ResMut<FloodEngine>,
) {
    for command in commands.read() {
        let changed = match *command {
            FloodCommand::ClearAll { preserve_sources } => engine.clear_all(preserve_sources),
            FloodCommand::ResetToSources => engine.reset_to_sources(),
            FloodCommand::FloodAt(position) => usize::from(engine.flood_at(position)),
            FloodCommand::DrainAt(position) => usize::from(engine.drain_at(position)),
        };
        tracing::debug!(
            target: "flood::commands",
            ?command,
            changed,
            "flood_command.applied"
        );
    }
}

pub fn run_flood_tick(
    weather: Option<Res<WeatherState>>,
    mut engine: ResMut<FloodEngine>,
    mut tick: ResMut<SimulationTick>,
    mut skipped: ResMut<SkippedTicks>,
    mut last_report: ResMut<LastFloodReport>,
    mut events: EventWriter<FloodEvent>,
) {
    match engine.tick_with_provider(weather.as_deref()) {
        TickOutcome::Completed(report) => {
            tick.0 += 1;
            tracing::debug!(
                target: "flood::engine",
                tick = tick.0,
                weather = %report.weather,
                count = report.count,
                delta = report.delta,
                "flood_tick.completed"
            );
            last_report.0 = Some(report);
        }
        TickOutcome::Skipped => {
            skipped.0 += 1;
            tracing::warn!(
                target: "flood::engine",
                skipped = skipped.0,
                "flood_tick.skipped=no_weather"
            );
        }
    }
    // Command edits are drained here too, so they reach readers in order.
    events.send_batch(engine.drain_events());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::FloodSimulationEngine,
        flood_config::{FloodParameters, WeatherFloodProfile, WeatherProfileTable},
        terrain::TerrainGrid,
        weather::WeatherCategory,
    };

    fn still_params() -> FloodParameters {
        FloodParameters {
            random_expansion_chance: 0.0,
            base_shrinkage_chance: 0.0,
            edge_shrinkage_bonus: 0.0,
            flood_spawn_chance: 1.0,
            rain_intensity_spawn_bonus: 0.0,
            weather_profiles: WeatherProfileTable::new(vec![WeatherFloodProfile::new(
                WeatherCategory::HeavyRain,
                0.0,
                1.0,
                0.0,
            )]),
            ..FloodParameters::default()
        }
    }

    fn test_app(params: FloodParameters, weather: Option<WeatherState>) -> App {
        let params = Arc::new(params);
        let terrain = TerrainGrid::from_ascii(&[".....", ".....", "..~..", ".....", "....."])
            .expect("valid map");
        let engine = FloodSimulationEngine::seeded(
            Arc::clone(&params),
            terrain,
            [Position::new(2, 2)],
            11,
        );
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(FloodConfigHandle::new(params))
            .insert_resource(FloodEngine(engine))
            .add_plugins(FloodSimulationPlugin);
        if let Some(weather) = weather {
            app.insert_resource(weather);
        }
        app
    }

    #[test]
    fn missing_weather_skips_without_mutation() {
        let mut app = test_app(still_params(), None);
        app.update();
        assert_eq!(app.world.resource::<SimulationTick>().0, 0);
        assert_eq!(app.world.resource::<SkippedTicks>().0, 1);
        assert_eq!(app.world.resource::<FloodEngine>().count(), 0);
        assert!(app.world.resource::<LastFloodReport>().0.is_none());
        assert_eq!(app.world.resource::<FloodMetrics>().skipped_ticks, 1);
    }

    #[test]
    fn heavy_rain_spawns_sources_and_publishes_events() {
        let weather = WeatherState::typical(WeatherCategory::HeavyRain);
        let mut app = test_app(still_params(), Some(weather));
        app.update();

        assert_eq!(app.world.resource::<SimulationTick>().0, 1);
        assert!(app.world.resource::<FloodEngine>().is_flooded(Position::new(2, 2)));
        let report = app.world.resource::<LastFloodReport>().0.expect("tick ran");
        assert_eq!(report.spawned, 1);
        assert_eq!(report.delta, 1);

        let metrics = app.world.resource::<FloodMetrics>();
        assert_eq!(metrics.total_added, 1);
        assert_eq!(metrics.flooded_cells, 1);
        assert_eq!(metrics.peak_flooded, 1);
        assert_eq!(metrics.last_delta, 1);
    }

    #[test]
    fn commands_apply_before_the_tick() {
        let weather = WeatherState::typical(WeatherCategory::HeavyRain);
        let mut app = test_app(still_params(), Some(weather));
        app.world.send_event(FloodCommand::FloodAt(Position::new(0, 0)));
        app.world.send_event(FloodCommand::FloodAt(Position::new(9, 9)));
        app.update();

        let engine = app.world.resource::<FloodEngine>();
        assert!(engine.is_flooded(Position::new(0, 0)));
        assert!(!engine.is_flooded(Position::new(9, 9)));
        // First tick counts as a weather change, so the source still spawns.
        assert_eq!(engine.count(), 2);

        app.world.send_event(FloodCommand::ClearAll {
            preserve_sources: true,
        });
        app.update();
        let engine = app.world.resource::<FloodEngine>();
        assert_eq!(engine.count(), 1);
        assert!(engine.is_flooded(Position::new(2, 2)));
        assert_eq!(app.world.resource::<FloodMetrics>().total_removed, 1);
    }

    #[test]
    fn replaced_config_reaches_the_engine() {
        let weather = WeatherState::typical(WeatherCategory::HeavyRain);
        let mut app = test_app(still_params(), Some(weather));
        app.update();

        let updated = Arc::new(FloodParameters {
            blocking_radius: 2,
            ..still_params()
        });
        app.world
            .resource_mut::<FloodConfigHandle>()
            .replace(Arc::clone(&updated));
        app.update();

        let engine = app.world.resource::<FloodEngine>();
        assert!(Arc::ptr_eq(engine.parameters(), &updated));
    }
}
