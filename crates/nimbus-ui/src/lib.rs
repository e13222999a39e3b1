//! Presentation layer: drives a weather session from a single foreground
//! thread while network work runs on a shared background runtime.

pub mod bridge;
pub mod error_mapping;
pub mod models;
pub mod services;

pub use models::weather_model::{CurrentView, HourlyTile, WeatherModel};
