use bevy::prelude::*;

use crate::{
    events::FloodEvent,
    resources::{FloodEngine, SimulationTick, SkippedTicks},
};

#[derive(Resource, Default, Debug, Clone, PartialEq, Eq)]
pub struct FloodMetrics {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub flooded_cells: usize,
    pub peak_flooded: usize,
    pub last_delta: i64,
    pub total_added: u64,
    pub total_removed: u64,
    pub state_hash: u64,
}

pub fn collect_flood_metrics(
    engine: Res<FloodEngine>,
    tick: Res<SimulationTick>,
    skipped: Res<SkippedTicks>,
    mut metrics: ResMut<FloodMetrics>,
    mut events: EventReader<FloodEvent>,
) {
    metrics.ticks = tick.0;
    metrics.skipped_ticks = skipped.0;

    for event in events.read() {
        match event {
            FloodEvent::TileAdded(_) => metrics.total_added += 1,
            FloodEvent::TileRemoved(_) => metrics.total_removed += 1,
            _ => {}
        }
    }

    metrics.flooded_cells = engine.count();
    metrics.peak_flooded = metrics.peak_flooded.max(metrics.flooded_cells);
    metrics.last_delta = engine.previous_delta();
    metrics.state_hash = engine.state_hash();
}
