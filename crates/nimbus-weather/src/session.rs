//! The weather session: current location plus the latest readings for it.
//!
//! Every user-initiated request takes a sequence number from
//! [`WeatherSession::begin_request`]. Results computed elsewhere (for example
//! on a background task) are handed back through the `apply_*` methods, which
//! drop anything tagged with an older number, so only the most recently
//! requested data ever becomes visible.

use crate::geocode::GeoResolver;
use crate::provider::WeatherClient;
use crate::types::{CurrentWeatherReading, HourlySeries, Location, WeatherError};

/// Outcome of handing a result back to the session.
#[derive(Debug)]
pub enum Applied {
    /// The result was current and is now held by the session.
    Updated,
    /// The result was current but failed; held state is unchanged.
    Failed(WeatherError),
    /// A newer request was issued since; the result was discarded.
    Stale,
}

impl Applied {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    fn into_result(self) -> Result<(), WeatherError> {
        match self {
            Self::Updated | Self::Stale => Ok(()),
            Self::Failed(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherSession {
    geocoder: GeoResolver,
    client: WeatherClient,
    location: Option<Location>,
    current: Option<CurrentWeatherReading>,
    hourly: Option<HourlySeries>,
    latest_request: u64,
}

impl WeatherSession {
    pub fn new(geocoder: GeoResolver, client: WeatherClient) -> Self {
        Self {
            geocoder,
            client,
            location: None,
            current: None,
            hourly: None,
            latest_request: 0,
        }
    }

    pub fn geocoder(&self) -> &GeoResolver {
        &self.geocoder
    }

    pub fn client(&self) -> &WeatherClient {
        &self.client
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn current(&self) -> Option<&CurrentWeatherReading> {
        self.current.as_ref()
    }

    pub fn hourly(&self) -> Option<&HourlySeries> {
        self.hourly.as_ref()
    }

    /// True once a location has been resolved.
    pub fn is_ready(&self) -> bool {
        self.location.is_some()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.location.as_ref().map(|l| (l.latitude, l.longitude))
    }

    /// Issue a new sequence number; results tagged with older numbers become stale.
    pub fn begin_request(&mut self) -> u64 {
        self.latest_request += 1;
        self.latest_request
    }

    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    fn is_latest(&self, seq: u64) -> bool {
        if seq == self.latest_request {
            true
        } else {
            tracing::debug!(
                "Discarding result of request {} (latest is {})",
                seq,
                self.latest_request
            );
            false
        }
    }

    /// Resolve the first location. On failure the session stays without one.
    pub async fn initialize(&mut self, place: &str) -> Result<&Location, WeatherError> {
        if let Some(existing) = &self.location {
            tracing::debug!(
                "Session already at {}, treating initialize as a location change",
                existing.display_name
            );
        }
        self.change_location(place).await
    }

    /// Switch to `place`. On failure the previous location is kept untouched.
    pub async fn change_location(&mut self, place: &str) -> Result<&Location, WeatherError> {
        self.begin_request();
        match self.geocoder.resolve(place).await {
            Ok(location) => Ok(self.store_location(location)),
            Err(e) => {
                self.log_rejected_location(&e);
                Err(e)
            }
        }
    }

    /// Re-fetch current conditions for the held location.
    /// On failure the previous reading stays in place.
    pub async fn refresh_current(&mut self) -> Result<&CurrentWeatherReading, WeatherError> {
        let (latitude, longitude) = self.coordinates().ok_or(WeatherError::NoLocation)?;
        self.begin_request();
        match self.client.fetch_current(latitude, longitude).await {
            Ok(reading) => Ok(self.store_current(reading)),
            Err(e) => {
                tracing::warn!("Current weather refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// Re-fetch the hourly series for the held location.
    /// On failure the previous series stays in place.
    pub async fn refresh_hourly(&mut self) -> Result<&HourlySeries, WeatherError> {
        let (latitude, longitude) = self.coordinates().ok_or(WeatherError::NoLocation)?;
        self.begin_request();
        match self.client.fetch_hourly(latitude, longitude).await {
            Ok(series) => Ok(self.store_hourly(series)),
            Err(e) => {
                tracing::warn!("Hourly weather refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// Fetch current and hourly data concurrently; each result is applied independently.
    pub async fn refresh_all(&mut self) -> (Result<(), WeatherError>, Result<(), WeatherError>) {
        let Some((latitude, longitude)) = self.coordinates() else {
            return (Err(WeatherError::NoLocation), Err(WeatherError::NoLocation));
        };
        let seq = self.begin_request();

        let (current, hourly) = tokio::join!(
            self.client.fetch_current(latitude, longitude),
            self.client.fetch_hourly(latitude, longitude)
        );

        (
            self.apply_current(seq, current).into_result(),
            self.apply_hourly(seq, hourly).into_result(),
        )
    }

    /// Hand back a geocoding result for request `seq`.
    pub fn apply_location(&mut self, seq: u64, result: Result<Location, WeatherError>) -> Applied {
        if !self.is_latest(seq) {
            return Applied::Stale;
        }
        match result {
            Ok(location) => {
                self.store_location(location);
                Applied::Updated
            }
            Err(e) => {
                self.log_rejected_location(&e);
                Applied::Failed(e)
            }
        }
    }

    /// Hand back a current-conditions result for request `seq`.
    pub fn apply_current(
        &mut self,
        seq: u64,
        result: Result<CurrentWeatherReading, WeatherError>,
    ) -> Applied {
        if !self.is_latest(seq) {
            return Applied::Stale;
        }
        match result {
            Ok(reading) => {
                self.store_current(reading);
                Applied::Updated
            }
            Err(e) => {
                tracing::warn!("Current weather refresh failed: {}", e);
                Applied::Failed(e)
            }
        }
    }

    /// Hand back an hourly result for request `seq`.
    pub fn apply_hourly(&mut self, seq: u64, result: Result<HourlySeries, WeatherError>) -> Applied {
        if !self.is_latest(seq) {
            return Applied::Stale;
        }
        match result {
            Ok(series) => {
                self.store_hourly(series);
                Applied::Updated
            }
            Err(e) => {
                tracing::warn!("Hourly weather refresh failed: {}", e);
                Applied::Failed(e)
            }
        }
    }

    /// Readings always belong to the held location, so moving to a
    /// different place drops them until that place's fetches land.
    fn store_location(&mut self, location: Location) -> &Location {
        tracing::info!(
            "Location set to {} ({:.4}, {:.4})",
            location.display_name,
            location.latitude,
            location.longitude
        );
        if self.location.as_ref() != Some(&location) {
            self.current = None;
            self.hourly = None;
        }
        self.location.insert(location)
    }

    fn store_current(&mut self, reading: CurrentWeatherReading) -> &CurrentWeatherReading {
        tracing::info!(
            "Current weather updated: {:.1} °C, code {}",
            reading.temperature_c,
            reading.code
        );
        self.current.insert(reading)
    }

    fn store_hourly(&mut self, series: HourlySeries) -> &HourlySeries {
        tracing::info!("Hourly forecast updated: {} hours", series.len());
        self.hourly.insert(series)
    }

    fn log_rejected_location(&self, error: &WeatherError) {
        match &self.location {
            Some(kept) => tracing::warn!("{}; keeping {}", error, kept.display_name),
            None => tracing::warn!("{}; no location set", error),
        }
    }
}
