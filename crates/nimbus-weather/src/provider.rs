//! Open-Meteo forecast client: current conditions and the hourly series for today.

use crate::types::{
    CurrentWeatherReading, DayPhase, HourlyReading, HourlySeries, WeatherError,
};
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const CURRENT_FIELDS: &str = "current=temperature_2m,is_day,weather_code";
const HOURLY_FIELDS: &str = "hourly=temperature_2m,weather_code,is_day";
const COMMON_PARAMS: &str = "timezone=auto&forecast_days=1";
/// Open-Meteo uses ISO 8601 local time without seconds.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: f64,
    weather_code: i32,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    temperature_2m: Vec<f64>,
    weather_code: Vec<i32>,
    is_day: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherClient {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(
            OPEN_METEO_FORECAST_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current temperature, weather code and day phase.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeatherReading, WeatherError> {
        let body: CurrentResponse = self.get(latitude, longitude, CURRENT_FIELDS).await?;
        let current = body.current;

        let timestamp = NaiveDateTime::parse_from_str(&current.time, TIME_FORMAT)
            .map_err(|e| WeatherError::Parse(format!("bad time {:?}: {}", current.time, e)))?;

        Ok(CurrentWeatherReading {
            timestamp,
            temperature_c: current.temperature_2m,
            code: current.weather_code,
            day_phase: DayPhase::from_is_day(current.is_day),
        })
    }

    /// Every forecast hour the provider returns for today, index 0 = midnight.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_hourly(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<HourlySeries, WeatherError> {
        let body: HourlyResponse = self.get(latitude, longitude, HOURLY_FIELDS).await?;
        let hourly = body.hourly;

        let len = hourly.temperature_2m.len();
        if hourly.weather_code.len() != len || hourly.is_day.len() != len {
            return Err(WeatherError::Parse(format!(
                "hourly arrays differ in length: temperature_2m={}, weather_code={}, is_day={}",
                len,
                hourly.weather_code.len(),
                hourly.is_day.len()
            )));
        }

        let hours = hourly
            .temperature_2m
            .into_iter()
            .zip(hourly.weather_code)
            .zip(hourly.is_day)
            .enumerate()
            .map(|(hour, ((temperature_c, code), is_day))| HourlyReading {
                hour,
                temperature_c,
                code,
                day_phase: DayPhase::from_is_day(is_day),
            })
            .collect();

        Ok(HourlySeries { hours })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        latitude: f64,
        longitude: f64,
        fields: &str,
    ) -> Result<T, WeatherError> {
        let url = format!(
            "{}/v1/forecast?latitude={}&longitude={}&{}&{}",
            self.base_url, latitude, longitude, fields, COMMON_PARAMS
        );
        tracing::debug!("Forecast request: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Forecast returned status {}", status);
            return Err(WeatherError::Fetch(format!("{}: {}", status, text)));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| WeatherError::Parse(e.to_string()))
    }
}
