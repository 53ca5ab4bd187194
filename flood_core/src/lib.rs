//! Weather-driven flood propagation for a tile grid.
//!
//! [`FloodSimulationEngine`] owns the flooded set and advances it one tick at
//! a time. [`build_headless_app`] wraps it in a Bevy [`App`] driven by
//! [`run_tick`].

pub mod engine;
pub mod events;
pub mod flood_config;
pub mod hashing;
pub mod mapgen;
pub mod metrics;
pub mod position;
mod resources;
pub mod state;
mod systems;
pub mod terrain;
pub mod weather;

use bevy::prelude::*;

pub use engine::{roll, FloodSimulationEngine, DEFAULT_FLOOD_SEED};
pub use events::{FloodEvent, FloodEventSink, FloodTickReport, TickOutcome};
pub use flood_config::{
    load_flood_config, load_flood_config_from_env, FloodConfigError, FloodConfigHandle,
    FloodConfigMetadata, FloodParameters, WeatherFloodProfile, WeatherProfileTable,
};
pub use metrics::FloodMetrics;
pub use position::Position;
pub use resources::{
    FloodEngine, FloodSimulationConfig, LastFloodReport, SimulationTick, SkippedTicks,
};
pub use state::FloodState;
pub use systems::{FloodCommand, FloodSimulationPlugin};
pub use terrain::{TerrainBlockIndex, TerrainClassifier, TerrainGrid, TileFlags};
pub use weather::{WeatherCategory, WeatherProvider, WeatherState};

/// Construct a Bevy [`App`] running the flood pipeline over demo terrain
/// generated from [`FloodSimulationConfig::default`].
pub fn build_headless_app() -> App {
    build_headless_app_with(FloodSimulationConfig::default())
}

/// As [`build_headless_app`], with an explicit startup configuration. River
/// tiles become the flood sources.
pub fn build_headless_app_with(config: FloodSimulationConfig) -> App {
    let (params, metadata) = load_flood_config_from_env();
    let terrain = mapgen::build_demo_terrain(config.grid_size.x, config.grid_size.y, config.seed);
    let sources = terrain.river_positions();
    let mut engine = FloodSimulationEngine::seeded(params, terrain, sources, config.seed);
    if config.seed_sources_on_startup {
        engine.seed_sources();
    }

    let mut app = build_app_with_engine(engine);
    app.insert_resource(metadata).insert_resource(config);
    app
}

/// Wrap an existing engine. The app starts with clear weather.
pub fn build_app_with_engine(engine: FloodSimulationEngine) -> App {
    let mut app = App::new();
    app.insert_resource(FloodConfigHandle::new(engine.parameters().clone()))
        .insert_resource(FloodEngine(engine))
        .insert_resource(WeatherState::default())
        .add_plugins(MinimalPlugins)
        .add_plugins(FloodSimulationPlugin);
    app
}

/// Execute a single flood tick.
///
/// Runs the chained systems installed by [`FloodSimulationPlugin`]
/// (config sync → commands → tick → metrics).
pub fn run_tick(app: &mut App) {
    app.update();
}
