//! Stochastic flood propagation.
//!
//! [`FloodSimulationEngine::update_tick`] runs four ordered phases against a
//! single [`FloodState`]:
//!
//! 1. spawn: rainy ticks re-seed river/source cells,
//! 2. expansion: frontier growth plus an occasional long-range jump,
//! 3. shrinkage: batch recession, faster on edges and in dry weather,
//! 4. accounting: net delta and aggregate events.
//!
//! All randomness comes from the injected RNG, consumed in phase order, so a
//! seeded engine is fully reproducible. Nothing in here logs; hosts read the
//! returned report and drained events instead.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    events::{FloodEvent, FloodEventSink, FloodTickReport, TickOutcome},
    flood_config::{FloodParameters, WeatherFloodProfile, MAX_RANDOM_EXPANSION_DISTANCE},
    hashing::flood_state_hash,
    position::{Position, CARDINAL_OFFSETS},
    state::FloodState,
    terrain::{TerrainBlockIndex, TerrainClassifier, TerrainGrid},
    weather::{WeatherCategory, WeatherProvider},
};

pub const DEFAULT_FLOOD_SEED: u64 = 42;

/// Bernoulli trial. Always consumes exactly one draw; `chance` is clamped to
/// `[0, 1]` and NaN never succeeds.
#[inline]
pub fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f32) -> bool {
    let chance = if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    };
    rng.gen::<f32>() < chance
}

#[derive(Debug)]
pub struct FloodSimulationEngine<T = TerrainGrid, R = ChaCha8Rng> {
    params: Arc<FloodParameters>,
    terrain: T,
    block_index: TerrainBlockIndex,
    state: FloodState,
    rng: R,
    last_weather: Option<WeatherCategory>,
    previous_count: usize,
    previous_delta: i64,
    ticks: u64,
    pending: Vec<FloodEvent>,
}

impl<T: TerrainClassifier> FloodSimulationEngine<T, ChaCha8Rng> {
    /// Engine driven by a `ChaCha8Rng` seeded from `seed`.
    pub fn seeded<I>(params: Arc<FloodParameters>, terrain: T, sources: I, seed: u64) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        Self::with_rng(params, terrain, sources, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<T: TerrainClassifier, R: Rng> FloodSimulationEngine<T, R> {
    /// Sources outside the grid are dropped so the bounds invariant holds
    /// from the first spawn. Nothing is flooded until [`Self::seed_sources`]
    /// or the first rainy tick.
    pub fn with_rng<I>(params: Arc<FloodParameters>, terrain: T, sources: I, rng: R) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let block_index = TerrainBlockIndex::from_terrain(&terrain, params.blocking_radius);
        let sources: Vec<Position> = sources
            .into_iter()
            .filter(|&p| terrain.in_bounds(p))
            .collect();
        Self {
            params,
            terrain,
            block_index,
            state: FloodState::with_sources(sources),
            rng,
            last_weather: None,
            previous_count: 0,
            previous_delta: 0,
            ticks: 0,
            pending: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Reads weather from `provider`; without one the tick is skipped and
    /// the state left untouched.
    pub fn tick_with_provider<W>(&mut self, provider: Option<&W>) -> TickOutcome
    where
        W: WeatherProvider + ?Sized,
    {
        match provider {
            Some(weather) => TickOutcome::Completed(
                self.update_tick(weather.current_category(), weather.rain_intensity()),
            ),
            None => TickOutcome::Skipped,
        }
    }

    pub fn update_tick(&mut self, weather: WeatherCategory, rain_intensity: f32) -> FloodTickReport {
        let params = Arc::clone(&self.params);
        let profile = *params.profile(weather);
        let rain = if rain_intensity.is_finite() {
            rain_intensity
        } else {
            0.0
        };
        let before = self.state.count();

        let spawned = self.spawn_phase(&params, weather, rain);

        let (expanded, jumped) = if profile.expansion_rate > 0.0 && !self.state.is_empty() {
            self.expansion_phase(&params, &profile)
        } else {
            (0, 0)
        };

        let shrunk = if rain < params.minimum_rain_for_spawning || profile.shrinkage_chance > 0.0
        {
            self.shrink_phase(&params, &profile, rain)
        } else {
            0
        };

        self.last_weather = Some(weather);
        let count = self.state.count();
        let delta = count as i64 - before as i64;
        self.emit_tick_summary(count, delta);
        self.previous_count = before;
        self.previous_delta = delta;
        self.ticks += 1;

        FloodTickReport {
            weather,
            rain_intensity: rain,
            previous_count: before,
            count,
            delta,
            spawned,
            expanded,
            jumped,
            shrunk,
        }
    }

    fn spawn_phase(&mut self, params: &FloodParameters, weather: WeatherCategory, rain: f32) -> usize {
        if rain < params.minimum_rain_for_spawning {
            return 0;
        }
        let weather_changed = self.last_weather != Some(weather);
        if !(self.state.is_empty() || (weather_changed && rain > 0.0)) {
            return 0;
        }

        let chance = params.spawn_chance(rain);
        let sources: Vec<Position> = self.state.sources().iter().copied().collect();
        let mut spawned = 0;
        for source in sources {
            if roll(&mut self.rng, chance) && self.insert(source) {
                spawned += 1;
            }
        }
        spawned
    }

    fn expansion_phase(
        &mut self,
        params: &FloodParameters,
        profile: &WeatherFloodProfile,
    ) -> (usize, usize) {
        // One admission trial per adjacency discovered; duplicates collapse
        // after the trial, keeping discovery order.
        let flooded: Vec<Position> = self.state.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut frontier = Vec::new();
        for cell in &flooded {
            for neighbor in cell.neighbors4() {
                if self.can_spread_to(neighbor, profile) && seen.insert(neighbor) {
                    frontier.push(neighbor);
                }
            }
        }

        let take = profile.expansion_count().min(frontier.len());
        let chosen: Vec<Position> = frontier
            .choose_multiple(&mut self.rng, take)
            .copied()
            .collect();
        let mut expanded = 0;
        for position in chosen {
            if self.insert(position) {
                expanded += 1;
            }
        }

        let mut jumped = 0;
        if roll(&mut self.rng, params.random_expansion_chance) {
            if let Some(target) = self.pick_jump_target(params) {
                if self.can_spread_to(target, profile) && self.insert(target) {
                    jumped = 1;
                }
            }
        }

        (expanded, jumped)
    }

    fn pick_jump_target(&mut self, params: &FloodParameters) -> Option<Position> {
        let count = self.state.count();
        if count == 0 {
            return None;
        }
        let origin_index = self.rng.gen_range(0..count);
        let origin = *self.state.iter().nth(origin_index)?;
        let direction = self.rng.gen_range(0..CARDINAL_OFFSETS.len());
        // Parameters set directly bypass validation, so clamp here as well.
        let max_distance = i32::try_from(params.max_random_expansion_distance)
            .unwrap_or(i32::MAX)
            .clamp(1, MAX_RANDOM_EXPANSION_DISTANCE as i32);
        let distance = self.rng.gen_range(1..=max_distance);
        Some(origin.step(direction, distance))
    }

    fn shrink_phase(
        &mut self,
        params: &FloodParameters,
        profile: &WeatherFloodProfile,
        rain: f32,
    ) -> usize {
        // Evaluated against the pre-pass state; removals land in one batch.
        let cells: Vec<Position> = self.state.iter().copied().collect();
        let mut receded = Vec::new();
        for cell in cells {
            if params.sources_immune_to_shrinkage && self.state.is_source(cell) {
                continue;
            }
            let chance = self.shrink_chance(cell, profile, rain);
            if roll(&mut self.rng, chance) {
                receded.push(cell);
            }
        }
        for &cell in &receded {
            self.erase(cell);
        }
        receded.len()
    }

    fn emit_tick_summary(&mut self, count: usize, delta: i64) {
        if delta > 0 {
            self.pending.push(FloodEvent::Expanded(delta as usize));
        } else if delta < 0 {
            self.pending.push(FloodEvent::Shrank(delta.unsigned_abs() as usize));
        }
        if delta != 0 {
            self.pending.push(FloodEvent::Changed(delta));
        }
        self.pending.push(FloodEvent::SizeChanged(count));
    }

    // ---------------------------------------------------------------------
    // Spread and shrink rules
    // ---------------------------------------------------------------------

    /// Admission chance for `position`, or `None` when it is already
    /// flooded or outside the grid.
    pub fn spread_chance(&self, position: Position, profile: &WeatherFloodProfile) -> Option<f32> {
        if self.state.contains(position) || !self.terrain.in_bounds(position) {
            return None;
        }
        let base = self.params.base_spread_chance * profile.spread_chance_multiplier;
        let chance = if self.block_index.contains(position) {
            base * self.params.terrain_block_multiplier
        } else if self.terrain.is_land(position) && !self.state.is_source(position) {
            base * self.params.land_spread_multiplier
        } else {
            base
        };
        Some(chance)
    }

    /// Rolls [`Self::spread_chance`]. Rejected positions consume no draw.
    pub fn can_spread_to(&mut self, position: Position, profile: &WeatherFloodProfile) -> bool {
        match self.spread_chance(position, profile) {
            Some(chance) => roll(&mut self.rng, chance),
            None => false,
        }
    }

    /// Unclamped recession chance for a flooded cell under `profile`.
    pub fn shrink_chance(&self, position: Position, profile: &WeatherFloodProfile, rain: f32) -> f32 {
        let mut chance = profile.shrinkage_chance + self.params.base_shrinkage_chance;
        if rain < self.params.minimum_rain_for_spawning {
            chance += self.params.dry_shrinkage_bonus;
        }
        if self.state.is_edge(position) {
            chance += self.params.edge_shrinkage_bonus;
        }
        chance
    }

    // ---------------------------------------------------------------------
    // Administrative operations
    // ---------------------------------------------------------------------

    /// Floods every source. Returns how many cells changed.
    pub fn seed_sources(&mut self) -> usize {
        let added = self.state.seed_from_sources();
        self.record_bulk(&[], &added)
    }

    /// Removes every flooded cell, keeping sources when `preserve_sources`.
    pub fn clear_all(&mut self, preserve_sources: bool) -> usize {
        let removed = self.state.clear_all(preserve_sources);
        self.record_bulk(&removed, &[])
    }

    /// Clears the flood and re-seeds exactly from the sources.
    pub fn reset_to_sources(&mut self) -> usize {
        let (removed, added) = self.state.reset_to_sources();
        self.record_bulk(&removed, &added)
    }

    /// Manually floods one in-bounds cell.
    pub fn flood_at(&mut self, position: Position) -> bool {
        if !self.terrain.in_bounds(position) {
            return false;
        }
        let changed = self.insert(position);
        if changed {
            self.pending.push(FloodEvent::SizeChanged(self.state.count()));
        }
        changed
    }

    /// Manually drains one cell.
    pub fn drain_at(&mut self, position: Position) -> bool {
        let changed = self.erase(position);
        if changed {
            self.pending.push(FloodEvent::SizeChanged(self.state.count()));
        }
        changed
    }

    /// Swaps parameters, rebuilding the block index when the radius moved.
    pub fn set_parameters(&mut self, params: Arc<FloodParameters>) {
        let radius_changed = params.blocking_radius != self.params.blocking_radius;
        self.params = params;
        if radius_changed {
            self.rebuild_block_index();
        }
    }

    /// Recomputes the block index from the terrain's current obstacles.
    pub fn rebuild_block_index(&mut self) {
        self.block_index = TerrainBlockIndex::from_terrain(&self.terrain, self.params.blocking_radius);
    }

    /// Installs new terrain, dropping flooded cells and sources that fall
    /// outside it. Returns how many flooded cells were removed.
    pub fn replace_terrain(&mut self, terrain: T) -> usize {
        self.terrain = terrain;
        self.rebuild_block_index();
        let terrain = &self.terrain;
        let removed = self.state.retain(|p| terrain.in_bounds(p));
        self.record_bulk(&removed, &[])
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn is_flooded(&self, position: Position) -> bool {
        self.state.contains(position)
    }

    pub fn all_flooded_positions(&self) -> BTreeSet<Position> {
        self.state.snapshot()
    }

    pub fn count(&self) -> usize {
        self.state.count()
    }

    /// True when no cell along `path` is flooded. An empty path is clear.
    pub fn is_path_clear(&self, path: &[Position]) -> bool {
        path.iter().all(|&p| !self.state.contains(p))
    }

    /// Net change of the last tick.
    pub fn previous_delta(&self) -> i64 {
        self.previous_delta
    }

    /// Flooded count at the start of the last tick.
    pub fn previous_count(&self) -> usize {
        self.previous_count
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_weather(&self) -> Option<WeatherCategory> {
        self.last_weather
    }

    pub fn sources(&self) -> &BTreeSet<Position> {
        self.state.sources()
    }

    pub fn state(&self) -> &FloodState {
        &self.state
    }

    pub fn parameters(&self) -> &Arc<FloodParameters> {
        &self.params
    }

    pub fn terrain(&self) -> &T {
        &self.terrain
    }

    pub fn block_index(&self) -> &TerrainBlockIndex {
        &self.block_index
    }

    pub fn state_hash(&self) -> u64 {
        flood_state_hash(&self.state)
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn pending_event_count(&self) -> usize {
        self.pending.len()
    }

    pub fn drain_events(&mut self) -> Vec<FloodEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn dispatch_events<S>(&mut self, sink: &mut S) -> usize
    where
        S: FloodEventSink + ?Sized,
    {
        let events = self.drain_events();
        let dispatched = events.len();
        for event in events {
            sink.publish(event);
        }
        dispatched
    }

    fn insert(&mut self, position: Position) -> bool {
        let changed = self.state.add(position);
        if changed {
            self.pending.push(FloodEvent::TileAdded(position));
        }
        changed
    }

    fn erase(&mut self, position: Position) -> bool {
        let changed = self.state.remove(position);
        if changed {
            self.pending.push(FloodEvent::TileRemoved(position));
        }
        changed
    }

    fn record_bulk(&mut self, removed: &[Position], added: &[Position]) -> usize {
        self.pending
            .extend(removed.iter().map(|&p| FloodEvent::TileRemoved(p)));
        self.pending
            .extend(added.iter().map(|&p| FloodEvent::TileAdded(p)));
        let changed = removed.len() + added.len();
        if changed > 0 {
            self.pending.push(FloodEvent::SizeChanged(self.state.count()));
        }
        changed
    }
}
