//! Weather service for Nimbus
//!
//! Resolves place names and fetches current and hourly conditions from the
//! Open-Meteo APIs, classifies weather codes and picks the matching assets.

pub mod assets;
pub mod geocode;
pub mod provider;
pub mod session;
pub mod types;

pub use assets::{background_path, icon_path, AssetLocator};
pub use geocode::GeoResolver;
pub use provider::WeatherClient;
pub use session::{Applied, WeatherSession};
pub use types::*;
