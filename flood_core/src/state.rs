use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Current inundation plus the river/source cells it grows from.
///
/// Sets are ordered so that iteration, and therefore RNG consumption during
/// a tick, is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodState {
    flooded: BTreeSet<Position>,
    sources: BTreeSet<Position>,
}

impl FloodState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        Self {
            flooded: BTreeSet::new(),
            sources: sources.into_iter().collect(),
        }
    }

    /// Returns whether `position` was newly flooded.
    pub fn add(&mut self, position: Position) -> bool {
        self.flooded.insert(position)
    }

    /// Returns whether `position` was flooded before the call.
    pub fn remove(&mut self, position: Position) -> bool {
        self.flooded.remove(&position)
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.flooded.contains(&position)
    }

    /// Owned copy of the flooded set.
    pub fn snapshot(&self) -> BTreeSet<Position> {
        self.flooded.clone()
    }

    pub fn count(&self) -> usize {
        self.flooded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flooded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.flooded.iter()
    }

    pub fn sources(&self) -> &BTreeSet<Position> {
        &self.sources
    }

    pub fn is_source(&self, position: Position) -> bool {
        self.sources.contains(&position)
    }

    /// An edge tile has at least one 4-neighbour that is not flooded.
    pub fn is_edge(&self, position: Position) -> bool {
        position
            .neighbors4()
            .iter()
            .any(|neighbor| !self.flooded.contains(neighbor))
    }

    /// Floods every source. Returns the newly flooded cells.
    pub fn seed_from_sources(&mut self) -> Vec<Position> {
        let sources: Vec<Position> = self.sources.iter().copied().collect();
        sources.into_iter().filter(|&p| self.add(p)).collect()
    }

    /// Removes every flooded cell, keeping sources when `preserve_sources`.
    /// Returns the removed cells.
    pub fn clear_all(&mut self, preserve_sources: bool) -> Vec<Position> {
        let removed: Vec<Position> = self
            .flooded
            .iter()
            .copied()
            .filter(|p| !(preserve_sources && self.sources.contains(p)))
            .collect();
        for position in &removed {
            self.flooded.remove(position);
        }
        removed
    }

    /// Drops flooded cells and sources for which `keep` is false, e.g. after
    /// the grid shrinks. Returns the removed flooded cells.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<Position>
    where
        F: FnMut(Position) -> bool,
    {
        self.sources.retain(|p| keep(*p));
        let removed: Vec<Position> = self
            .flooded
            .iter()
            .copied()
            .filter(|p| !keep(*p))
            .collect();
        for position in &removed {
            self.flooded.remove(position);
        }
        removed
    }

    /// Clears everything and floods exactly the sources.
    /// Returns `(removed, added)` relative to the prior state.
    pub fn reset_to_sources(&mut self) -> (Vec<Position>, Vec<Position>) {
        let removed = self.clear_all(true);
        let added = self.seed_from_sources();
        (removed, added)
    }
}
