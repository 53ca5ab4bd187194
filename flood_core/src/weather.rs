use std::fmt;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Weather classification consumed by the flood engine.
///
/// Declaration order is the profile-table order; `Clear` is the calm entry
/// used as the fallback profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeatherCategory {
    Clear,
    LightRain,
    ModerateRain,
    HeavyRain,
    Storm,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 5] = [
        WeatherCategory::Clear,
        WeatherCategory::LightRain,
        WeatherCategory::ModerateRain,
        WeatherCategory::HeavyRain,
        WeatherCategory::Storm,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherCategory::Clear => "Clear",
            WeatherCategory::LightRain => "LightRain",
            WeatherCategory::ModerateRain => "ModerateRain",
            WeatherCategory::HeavyRain => "HeavyRain",
            WeatherCategory::Storm => "Storm",
        }
    }

    /// Case-insensitive parse that also accepts snake/kebab case.
    pub fn parse(value: &str) -> Option<Self> {
        let normalised: String = value
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        WeatherCategory::ALL
            .into_iter()
            .find(|category| category.name().to_lowercase() == normalised)
    }

    /// Rain intensity a simple host can pair with this category.
    pub fn typical_rain_intensity(self) -> f32 {
        match self {
            WeatherCategory::Clear => 0.0,
            WeatherCategory::LightRain => 0.25,
            WeatherCategory::ModerateRain => 0.5,
            WeatherCategory::HeavyRain => 0.75,
            WeatherCategory::Storm => 1.0,
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of the current weather classification and rain intensity.
pub trait WeatherProvider {
    fn current_category(&self) -> WeatherCategory;
    /// Rain intensity in `[0, 1]`.
    fn rain_intensity(&self) -> f32;
    fn is_raining(&self) -> bool {
        self.rain_intensity() > 0.0
    }
}

/// Host-owned weather snapshot. The flood tick system reads it as a resource.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WeatherState {
    category: WeatherCategory,
    rain_intensity: f32,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::new(WeatherCategory::Clear, 0.0)
    }
}

impl WeatherState {
    pub fn new(category: WeatherCategory, rain_intensity: f32) -> Self {
        Self {
            category,
            rain_intensity: sanitise_intensity(rain_intensity),
        }
    }

    /// Category paired with its typical intensity.
    pub fn typical(category: WeatherCategory) -> Self {
        Self::new(category, category.typical_rain_intensity())
    }

    pub fn set(&mut self, category: WeatherCategory, rain_intensity: f32) {
        self.category = category;
        self.rain_intensity = sanitise_intensity(rain_intensity);
    }
}

fn sanitise_intensity(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl WeatherProvider for WeatherState {
    fn current_category(&self) -> WeatherCategory {
        self.category
    }

    fn rain_intensity(&self) -> f32 {
        self.rain_intensity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(WeatherCategory::parse("Storm"), Some(WeatherCategory::Storm));
        assert_eq!(
            WeatherCategory::parse("heavy_rain"),
            Some(WeatherCategory::HeavyRain)
        );
        assert_eq!(
            WeatherCategory::parse("light-rain"),
            Some(WeatherCategory::LightRain)
        );
        assert_eq!(WeatherCategory::parse("hail"), None);
    }

    #[test]
    fn table_order_matches_index() {
        for (idx, category) in WeatherCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), idx);
        }
    }

    #[test]
    fn weather_state_clamps_intensity() {
        let state = WeatherState::new(WeatherCategory::Storm, 1.7);
        assert_eq!(state.rain_intensity(), 1.0);
        assert!(state.is_raining());

        let dry = WeatherState::new(WeatherCategory::Clear, f32::NAN);
        assert_eq!(dry.rain_intensity(), 0.0);
        assert!(!dry.is_raining());
    }
}
