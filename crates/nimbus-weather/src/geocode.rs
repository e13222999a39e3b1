//! Forward geocoding: convert a free-text place name to coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use crate::types::{Location, WeatherError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

pub const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Nimbus/0.1.0";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<SearchResult>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

/// Resolves place names through the geocoding search endpoint.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    client: Client,
    base_url: String,
}

impl GeoResolver {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(
            OPEN_METEO_GEOCODING_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve `place` to the provider's best match.
    ///
    /// Every failure (transport, status, empty or malformed result) is
    /// reported as `LocationNotFound`; the cause is logged.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, place: &str) -> Result<Location, WeatherError> {
        let not_found = || WeatherError::LocationNotFound {
            place: place.to_string(),
        };

        let query = search_term(place);
        if query.is_empty() {
            return Err(not_found());
        }

        let url = format!(
            "{}/v1/search?name={}&count=1&language=en&format=json",
            self.base_url, query
        );
        tracing::debug!("Geocoding request: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Geocode request failed: {}", e);
                return Err(not_found());
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Geocode returned status {}", response.status());
            return Err(not_found());
        }

        let body: SearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Geocode parse error: {}", e);
                return Err(not_found());
            }
        };

        let best = body
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(not_found)?;

        tracing::info!(
            "Geocoded {:?} to {} ({:.4}, {:.4})",
            place,
            best.name,
            best.latitude,
            best.longitude
        );

        Ok(Location {
            display_name: best.name,
            latitude: best.latitude,
            longitude: best.longitude,
        })
    }
}

/// Words are percent-encoded individually and joined with `+`.
fn search_term(place: &str) -> String {
    place
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}
