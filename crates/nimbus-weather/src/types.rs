use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::assets;

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    Clear,
    Cloudy,
    Foggy,
    Rainy,
    Snowy,
    ThunderStorm,
    /// Fallback for codes outside every other range.
    Sandstorm,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 7] = [
        Self::Clear,
        Self::Cloudy,
        Self::Foggy,
        Self::Rainy,
        Self::Snowy,
        Self::ThunderStorm,
        Self::Sandstorm,
    ];

    /// Convert WMO weather code to a category.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 | 1 => Self::Clear,
            2 | 3 => Self::Cloudy,
            45 | 48 => Self::Foggy,
            51..=67 | 80..=82 => Self::Rainy,
            71..=77 | 85 | 86 => Self::Snowy,
            95 | 96 | 99 => Self::ThunderStorm,
            _ => Self::Sandstorm,
        }
    }

    /// Asset file name stem
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Foggy => "foggy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::ThunderStorm => "thunderstorm",
            Self::Sandstorm => "sandstorm",
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Cloudy => "Cloudy",
            Self::Foggy => "Fog",
            Self::Rainy => "Rain",
            Self::Snowy => "Snow",
            Self::ThunderStorm => "Thunderstorm",
            Self::Sandstorm => "Unclassified",
        }
    }
}

/// Classify a provider weather code.
pub fn classify(code: i32) -> WeatherCategory {
    WeatherCategory::from_wmo_code(code)
}

/// Daylight or night at the forecast point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    /// Open-Meteo reports `is_day` as 1 or 0.
    pub fn from_is_day(flag: u8) -> Self {
        if flag == 1 {
            Self::Day
        } else {
            Self::Night
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }
}

/// A resolved place. Replaced as a whole, never field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Provider's canonical spelling of the place
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeatherReading {
    /// Local time at the location
    pub timestamp: NaiveDateTime,
    pub temperature_c: f64,
    pub code: i32,
    pub day_phase: DayPhase,
}

impl CurrentWeatherReading {
    pub fn category(&self) -> WeatherCategory {
        classify(self.code)
    }

    pub fn icon_path(&self) -> String {
        assets::icon_path(self.category(), self.day_phase)
    }

    pub fn background_path(&self) -> String {
        assets::background_path(self.category(), self.day_phase)
    }
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    /// Position in the provider's series, 0 = midnight
    pub hour: usize,
    pub temperature_c: f64,
    pub code: i32,
    pub day_phase: DayPhase,
}

impl HourlyReading {
    pub fn category(&self) -> WeatherCategory {
        classify(self.code)
    }

    pub fn icon_path(&self) -> String {
        assets::icon_path(self.category(), self.day_phase)
    }
}

/// Every forecast hour of one day, in provider order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub hours: Vec<HourlyReading>,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Entries at indices 0, step, 2*step, ... with their original hour labels.
    /// A step of 0 is treated as 1.
    pub fn every_nth(&self, step: usize) -> Vec<&HourlyReading> {
        self.hours.iter().step_by(step.max(1)).collect()
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location not found: {place}")]
    LocationNotFound { place: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast request failed: {0}")]
    Fetch(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Asset missing: {}", .0.display())]
    AssetMissing(PathBuf),
    #[error("No location has been resolved yet")]
    NoLocation,
}

impl WeatherError {
    /// Transport failure or malformed forecast payload
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Fetch(_) | Self::Parse(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::LocationNotFound { place } => {
                format!("Couldn't find \"{}\". Check the spelling and try again.", place)
            }
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Fetch(_) | Self::Parse(_) => {
                "Weather data is unavailable right now. Please try again.".to_string()
            }
            Self::AssetMissing(path) => format!("Missing image: {}", path.display()),
            Self::NoLocation => "Search for a place first.".to_string(),
        }
    }
}
