//! Weather backend: async geocoding and forecast fetching.
//! All network work runs off the foreground thread; results sent via mpsc,
//! tagged with the sequence number of the request that started them.

use std::future::Future;
use std::sync::mpsc::Sender;

use nimbus_weather::{
    CurrentWeatherReading, GeoResolver, HourlySeries, Location, WeatherClient, WeatherError,
};
use tokio::runtime::Handle;

use crate::bridge;

/// Error type for weather operations
#[derive(Debug)]
pub enum WeatherServiceError {
    Weather(WeatherError),
    NotInitialized,
}

impl std::fmt::Display for WeatherServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherServiceError::Weather(e) => write!(f, "Weather error: {}", e),
            WeatherServiceError::NotInitialized => write!(f, "Weather service not initialized"),
        }
    }
}

impl std::error::Error for WeatherServiceError {}

impl From<WeatherError> for WeatherServiceError {
    fn from(e: WeatherError) -> Self {
        WeatherServiceError::Weather(e)
    }
}

impl WeatherServiceError {
    pub fn user_message(&self) -> String {
        match self {
            WeatherServiceError::Weather(e) => e.user_message(),
            WeatherServiceError::NotInitialized => {
                "Weather service is not running. Restart the app.".to_string()
            }
        }
    }
}

/// Messages sent from async operations back to the foreground thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    LocationResolved {
        seq: u64,
        result: Result<Location, WeatherServiceError>,
    },
    CurrentDone {
        seq: u64,
        result: Result<CurrentWeatherReading, WeatherServiceError>,
    },
    HourlyDone {
        seq: u64,
        result: Result<HourlySeries, WeatherServiceError>,
    },
}

impl WeatherServiceMessage {
    pub fn seq(&self) -> u64 {
        match self {
            Self::LocationResolved { seq, .. }
            | Self::CurrentDone { seq, .. }
            | Self::HourlyDone { seq, .. } => *seq,
        }
    }
}

/// Run `work` on `runtime` and send its result through `wrap`.
/// Without a runtime the message carries `NotInitialized` instead.
fn dispatch<T, F>(
    runtime: Option<Handle>,
    tx: &Sender<WeatherServiceMessage>,
    work: F,
    wrap: impl FnOnce(Result<T, WeatherServiceError>) -> WeatherServiceMessage + Send + 'static,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, WeatherError>> + Send + 'static,
{
    let tx = tx.clone();
    let runtime = match runtime {
        Some(r) => r,
        None => {
            let _ = tx.send(wrap(Err(WeatherServiceError::NotInitialized)));
            return;
        }
    };

    runtime.spawn(async move {
        let result = work.await.map_err(WeatherServiceError::from);
        let _ = tx.send(wrap(result));
    });
}

/// Resolve `place` in the background.
/// Sends `LocationResolved` on the channel when complete.
pub fn request_resolve(
    tx: &Sender<WeatherServiceMessage>,
    geocoder: GeoResolver,
    seq: u64,
    place: String,
) {
    dispatch(
        bridge::get_runtime(),
        tx,
        async move { geocoder.resolve(&place).await },
        move |result| WeatherServiceMessage::LocationResolved { seq, result },
    );
}

/// Fetch current conditions in the background.
/// Sends `CurrentDone` on the channel when complete.
pub fn request_current(
    tx: &Sender<WeatherServiceMessage>,
    client: WeatherClient,
    seq: u64,
    latitude: f64,
    longitude: f64,
) {
    dispatch(
        bridge::get_runtime(),
        tx,
        async move { client.fetch_current(latitude, longitude).await },
        move |result| WeatherServiceMessage::CurrentDone { seq, result },
    );
}

/// Fetch the hourly series in the background.
/// Sends `HourlyDone` on the channel when complete.
pub fn request_hourly(
    tx: &Sender<WeatherServiceMessage>,
    client: WeatherClient,
    seq: u64,
    latitude: f64,
    longitude: f64,
) {
    dispatch(
        bridge::get_runtime(),
        tx,
        async move { client.fetch_hourly(latitude, longitude).await },
        move |result| WeatherServiceMessage::HourlyDone { seq, result },
    );
}
