use bevy::{math::UVec2, prelude::*};

use crate::{
    engine::{FloodSimulationEngine, DEFAULT_FLOOD_SEED},
    events::FloodTickReport,
};

/// Startup configuration for the headless flood simulation.
#[derive(Resource, Debug, Clone)]
pub struct FloodSimulationConfig {
    pub grid_size: UVec2,
    /// Seeds both the demo terrain and the engine RNG.
    pub seed: u64,
    /// Flood every source before the first tick.
    pub seed_sources_on_startup: bool,
}

impl Default for FloodSimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: UVec2::new(48, 32),
            seed: DEFAULT_FLOOD_SEED,
            seed_sources_on_startup: false,
        }
    }
}

/// Number of flood ticks that ran (skipped ticks excluded).
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTick(pub u64);

/// Ticks skipped because no weather was available.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkippedTicks(pub u64);

/// The engine owned by the Bevy world.
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct FloodEngine(pub FloodSimulationEngine);

/// Report of the most recent completed tick.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct LastFloodReport(pub Option<FloodTickReport>);
