use bevy::prelude::Event;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::position::Position;
use crate::weather::WeatherCategory;

/// Change notifications produced by the flood engine.
///
/// Per-cell events fire for every individual mutation. The aggregate events
/// fire once per tick after all phases; `Expanded`, `Shrank` and `Changed`
/// only when the net change is nonzero.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloodEvent {
    TileAdded(Position),
    TileRemoved(Position),
    SizeChanged(usize),
    Expanded(usize),
    Shrank(usize),
    Changed(i64),
}

impl FloodEvent {
    pub fn is_tile_event(&self) -> bool {
        matches!(self, FloodEvent::TileAdded(_) | FloodEvent::TileRemoved(_))
    }
}

/// Receiver of drained flood events.
pub trait FloodEventSink {
    fn publish(&mut self, event: FloodEvent);
}

impl FloodEventSink for Vec<FloodEvent> {
    fn publish(&mut self, event: FloodEvent) {
        self.push(event);
    }
}

/// Forwards onto a channel. A disconnected receiver drops the event.
impl FloodEventSink for Sender<FloodEvent> {
    fn publish(&mut self, event: FloodEvent) {
        let _ = self.send(event);
    }
}

/// Result of a tick that ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloodTickReport {
    pub weather: WeatherCategory,
    pub rain_intensity: f32,
    pub previous_count: usize,
    pub count: usize,
    pub delta: i64,
    /// Sources flooded during the spawn phase.
    pub spawned: usize,
    /// Frontier cells flooded during expansion.
    pub expanded: usize,
    /// 1 when the long-range jump flooded a cell.
    pub jumped: usize,
    pub shrunk: usize,
}

impl FloodTickReport {
    pub fn added(&self) -> usize {
        self.spawned + self.expanded + self.jumped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Completed(FloodTickReport),
    /// No weather provider was available; the state is unchanged.
    Skipped,
}

impl TickOutcome {
    pub fn report(&self) -> Option<&FloodTickReport> {
        match self {
            TickOutcome::Completed(report) => Some(report),
            TickOutcome::Skipped => None,
        }
    }
}
