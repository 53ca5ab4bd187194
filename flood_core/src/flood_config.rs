//! Flood parameter schema.
//!
//! Loaded from `flood_config.json` with support for an environment variable
//! override. Validation runs at load time so a bad table never reaches a tick.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weather::WeatherCategory;

pub const BUILTIN_FLOOD_CONFIG: &str = include_str!("data/flood_config.json");

/// Upper bound accepted for `max_random_expansion_distance`.
pub const MAX_RANDOM_EXPANSION_DISTANCE: u32 = 4096;
/// Upper bound accepted for `blocking_radius`; the index grows with r².
pub const MAX_BLOCKING_RADIUS: i32 = 1024;

const CALM_PROFILE: WeatherFloodProfile = WeatherFloodProfile {
    weather: WeatherCategory::Clear,
    expansion_rate: 0.0,
    spread_chance_multiplier: 0.0,
    shrinkage_chance: 0.25,
};

/// Per-weather spread/shrink behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherFloodProfile {
    pub weather: WeatherCategory,
    /// Frontier tiles flooded per tick.
    pub expansion_rate: f32,
    pub spread_chance_multiplier: f32,
    pub shrinkage_chance: f32,
}

impl Default for WeatherFloodProfile {
    fn default() -> Self {
        CALM_PROFILE
    }
}

impl WeatherFloodProfile {
    pub fn new(
        weather: WeatherCategory,
        expansion_rate: f32,
        spread_chance_multiplier: f32,
        shrinkage_chance: f32,
    ) -> Self {
        Self {
            weather,
            expansion_rate,
            spread_chance_multiplier,
            shrinkage_chance,
        }
    }

    /// Built-in profile used to pad tables that omit `weather`.
    pub fn default_for(weather: WeatherCategory) -> Self {
        match weather {
            WeatherCategory::Clear => CALM_PROFILE,
            WeatherCategory::LightRain => Self::new(weather, 1.0, 0.6, 0.05),
            WeatherCategory::ModerateRain => Self::new(weather, 2.0, 0.9, 0.02),
            WeatherCategory::HeavyRain => Self::new(weather, 3.0, 1.2, 0.0),
            WeatherCategory::Storm => Self::new(weather, 5.0, 1.5, 0.0),
        }
    }

    /// Number of frontier draws per tick, `round(expansion_rate)`.
    pub fn expansion_count(&self) -> usize {
        if self.expansion_rate.is_finite() && self.expansion_rate > 0.0 {
            self.expansion_rate.round() as usize
        } else {
            0
        }
    }
}

/// Exactly one profile per [`WeatherCategory`], in declaration order.
///
/// Missing categories are padded with [`WeatherFloodProfile::default_for`];
/// when a category appears twice the first entry wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WeatherFloodProfile>", into = "Vec<WeatherFloodProfile>")]
pub struct WeatherProfileTable {
    profiles: Vec<WeatherFloodProfile>,
}

impl Default for WeatherProfileTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<WeatherFloodProfile>> for WeatherProfileTable {
    fn from(profiles: Vec<WeatherFloodProfile>) -> Self {
        Self::new(profiles)
    }
}

impl From<WeatherProfileTable> for Vec<WeatherFloodProfile> {
    fn from(table: WeatherProfileTable) -> Self {
        table.profiles
    }
}

impl WeatherProfileTable {
    pub fn new(profiles: Vec<WeatherFloodProfile>) -> Self {
        let profiles = WeatherCategory::ALL
            .iter()
            .map(|&weather| {
                profiles
                    .iter()
                    .find(|profile| profile.weather == weather)
                    .copied()
                    .unwrap_or_else(|| WeatherFloodProfile::default_for(weather))
            })
            .collect();
        Self { profiles }
    }

    /// Resolves `weather`, falling back to the first (calm) entry.
    pub fn lookup(&self, weather: WeatherCategory) -> &WeatherFloodProfile {
        self.profiles
            .get(weather.index())
            .filter(|profile| profile.weather == weather)
            .or_else(|| self.profiles.iter().find(|p| p.weather == weather))
            .or_else(|| self.profiles.first())
            .unwrap_or(&CALM_PROFILE)
    }

    pub fn set(&mut self, profile: WeatherFloodProfile) {
        if let Some(slot) = self.profiles.get_mut(profile.weather.index()) {
            *slot = profile;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherFloodProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Global spread/shrink constants plus the weather profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodParameters {
    pub base_spread_chance: f32,
    pub random_expansion_chance: f32,
    pub max_random_expansion_distance: u32,
    pub land_spread_multiplier: f32,
    pub terrain_block_multiplier: f32,
    pub base_shrinkage_chance: f32,
    pub edge_shrinkage_bonus: f32,
    /// Added to the shrink chance while rain is below the spawn threshold.
    pub dry_shrinkage_bonus: f32,
    /// Chebyshev radius around obstacle tiles.
    pub blocking_radius: i32,
    pub flood_spawn_chance: f32,
    pub rain_intensity_spawn_bonus: f32,
    pub minimum_rain_for_spawning: f32,
    /// Keep river/source tiles out of the shrink pass. Manual clears
    /// choose separately.
    pub sources_immune_to_shrinkage: bool,
    pub weather_profiles: WeatherProfileTable,
}

impl Default for FloodParameters {
    fn default() -> Self {
        Self {
            base_spread_chance: 0.7,
            random_expansion_chance: 0.05,
            max_random_expansion_distance: 3,
            land_spread_multiplier: 0.5,
            terrain_block_multiplier: 0.1,
            base_shrinkage_chance: 0.01,
            edge_shrinkage_bonus: 0.05,
            dry_shrinkage_bonus: 0.8,
            blocking_radius: 1,
            flood_spawn_chance: 0.2,
            rain_intensity_spawn_bonus: 0.6,
            minimum_rain_for_spawning: 0.2,
            sources_immune_to_shrinkage: false,
            weather_profiles: WeatherProfileTable::default(),
        }
    }
}

impl FloodParameters {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            FloodParameters::from_json_str(BUILTIN_FLOOD_CONFIG)
                .expect("builtin flood config should parse"),
        )
    }

    /// Parses and validates.
    pub fn from_json_str(json: &str) -> Result<Self, FloodConfigError> {
        let params: FloodParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_file(path: &Path) -> Result<Self, FloodConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| FloodConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        FloodParameters::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, FloodConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn profile(&self, weather: WeatherCategory) -> &WeatherFloodProfile {
        self.weather_profiles.lookup(weather)
    }

    pub fn spawn_chance(&self, rain_intensity: f32) -> f32 {
        self.flood_spawn_chance + rain_intensity * self.rain_intensity_spawn_bonus
    }

    /// Rejects settings that cannot drive a tick: negative or non-finite
    /// rates, a radius outside `0..=MAX_BLOCKING_RADIUS` and a jump distance
    /// outside `1..=MAX_RANDOM_EXPANSION_DISTANCE`.
    pub fn validate(&self) -> Result<(), FloodConfigError> {
        non_negative("base_spread_chance", self.base_spread_chance)?;
        non_negative("random_expansion_chance", self.random_expansion_chance)?;
        non_negative("land_spread_multiplier", self.land_spread_multiplier)?;
        non_negative("terrain_block_multiplier", self.terrain_block_multiplier)?;
        non_negative("base_shrinkage_chance", self.base_shrinkage_chance)?;
        non_negative("edge_shrinkage_bonus", self.edge_shrinkage_bonus)?;
        non_negative("dry_shrinkage_bonus", self.dry_shrinkage_bonus)?;
        non_negative("flood_spawn_chance", self.flood_spawn_chance)?;
        non_negative("rain_intensity_spawn_bonus", self.rain_intensity_spawn_bonus)?;
        non_negative("minimum_rain_for_spawning", self.minimum_rain_for_spawning)?;

        if !(1..=MAX_RANDOM_EXPANSION_DISTANCE).contains(&self.max_random_expansion_distance) {
            return Err(FloodConfigError::invalid(
                "max_random_expansion_distance",
                format!(
                    "must be within 1..={MAX_RANDOM_EXPANSION_DISTANCE}, got {}",
                    self.max_random_expansion_distance
                ),
            ));
        }
        if !(0..=MAX_BLOCKING_RADIUS).contains(&self.blocking_radius) {
            return Err(FloodConfigError::invalid(
                "blocking_radius",
                format!(
                    "must be within 0..={MAX_BLOCKING_RADIUS}, got {}",
                    self.blocking_radius
                ),
            ));
        }

        for profile in self.weather_profiles.iter() {
            let prefix = format!("weather_profiles.{}", profile.weather);
            non_negative(
                &format!("{prefix}.expansion_rate"),
                profile.expansion_rate,
            )?;
            non_negative(
                &format!("{prefix}.spread_chance_multiplier"),
                profile.spread_chance_multiplier,
            )?;
            non_negative(
                &format!("{prefix}.shrinkage_chance"),
                profile.shrinkage_chance,
            )?;
        }
        Ok(())
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), FloodConfigError> {
    if !value.is_finite() {
        return Err(FloodConfigError::invalid(field, "must be finite"));
    }
    if value < 0.0 {
        return Err(FloodConfigError::invalid(
            field,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum FloodConfigError {
    #[error("failed to parse flood config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read flood config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid flood config field `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl FloodConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FloodConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Handle for accessing the flood parameters.
#[derive(Resource, Debug, Clone)]
pub struct FloodConfigHandle(pub Arc<FloodParameters>);

impl FloodConfigHandle {
    pub fn new(config: Arc<FloodParameters>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<FloodParameters> {
        Arc::clone(&self.0)
    }

    pub fn replace(&mut self, config: Arc<FloodParameters>) {
        self.0 = config;
    }
}

/// Where the active flood parameters came from.
#[derive(Resource, Debug, Clone)]
pub struct FloodConfigMetadata {
    path: Option<PathBuf>,
}

impl FloodConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load flood parameters from `FLOOD_CONFIG_PATH` or the crate data file,
/// falling back to the builtin table.
pub fn load_flood_config_from_env() -> (Arc<FloodParameters>, FloodConfigMetadata) {
    let override_path = env::var("FLOOD_CONFIG_PATH").ok().map(PathBuf::from);
    let default_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/flood_config.json");
    load_flood_config(override_path.unwrap_or(default_path))
}

pub fn load_flood_config(path: PathBuf) -> (Arc<FloodParameters>, FloodConfigMetadata) {
    match FloodParameters::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "flood::config",
                path = %path.display(),
                "flood_config.loaded=file"
            );
            (Arc::new(config), FloodConfigMetadata::new(Some(path)))
        }
        Err(err) => {
            tracing::warn!(
                target: "flood::config",
                path = %path.display(),
                error = %err,
                "flood_config.load_failed"
            );
            let config = FloodParameters::builtin();
            tracing::info!(target: "flood::config", "flood_config.loaded=builtin");
            (config, FloodConfigMetadata::new(None))
        }
    }
}
