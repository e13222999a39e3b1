use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use nimbus_core::{AppError, Config};
use nimbus_weather::{
    Applied, GeoResolver, HourlyReading, WeatherClient, WeatherError, WeatherSession,
};

use crate::bridge;
use crate::services::weather_service::{self, WeatherServiceError, WeatherServiceMessage};

/// Current conditions, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentView {
    pub heading: String,
    pub temperature_label: String,
    pub description: String,
    pub icon_path: String,
    pub background_path: String,
}

/// One slot of the hourly strip
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyTile {
    pub hour_label: String,
    pub temperature_label: String,
    pub icon_path: String,
}

impl From<&HourlyReading> for HourlyTile {
    fn from(reading: &HourlyReading) -> Self {
        Self {
            hour_label: format!("{}:00", reading.hour),
            temperature_label: temperature_label(reading.temperature_c),
            icon_path: reading.icon_path(),
        }
    }
}

fn temperature_label(celsius: f64) -> String {
    format!("{:.1} °C", celsius)
}

/// Separate weather outcomes, which the session applies, from service faults.
fn split<T>(
    result: Result<T, WeatherServiceError>,
) -> Result<Result<T, WeatherError>, WeatherServiceError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(WeatherServiceError::Weather(e)) => Ok(Err(e)),
        Err(e) => Err(e),
    }
}

/// Owns the weather session on the foreground thread.
///
/// Requests are spawned on the shared runtime; their results come back
/// through [`WeatherModel::poll`] or [`WeatherModel::wait_idle`] and are
/// applied here, never on a background task.
pub struct WeatherModel {
    session: WeatherSession,
    tx: Sender<WeatherServiceMessage>,
    rx: Receiver<WeatherServiceMessage>,
    pending: usize,
    hourly_step: usize,
    error_message: Option<String>,
}

impl WeatherModel {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.weather.request_timeout_secs);
        let geocoder = GeoResolver::with_base_url(&config.weather.geocoding_url, timeout)
            .map_err(WeatherServiceError::from)?;
        let client = WeatherClient::with_base_url(&config.weather.forecast_url, timeout)
            .map_err(WeatherServiceError::from)?;

        if bridge::init_runtime().is_none() {
            return Err(WeatherServiceError::NotInitialized.into());
        }

        let (tx, rx) = mpsc::channel();
        Ok(Self {
            session: WeatherSession::new(geocoder, client),
            tx,
            rx,
            pending: 0,
            hourly_step: config.weather.hourly_step.max(1),
            error_message: None,
        })
    }

    pub fn session(&self) -> &WeatherSession {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    /// Message for the most recent failure, cleared by the next request
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn location_name(&self) -> Option<&str> {
        self.session.location().map(|l| l.display_name.as_str())
    }

    /// Look up `place`; on success current and hourly data are fetched for it.
    pub fn submit_location(&mut self, place: &str) {
        let seq = self.session.begin_request();
        self.error_message = None;
        tracing::debug!("Request {}: resolve {:?}", seq, place);

        weather_service::request_resolve(
            &self.tx,
            self.session.geocoder().clone(),
            seq,
            place.to_string(),
        );
        self.pending += 1;
    }

    /// Re-fetch current and hourly data for the held location.
    pub fn refresh(&mut self) {
        if !self.session.is_ready() {
            self.fail(WeatherError::NoLocation);
            return;
        }
        let seq = self.session.begin_request();
        self.error_message = None;
        self.start_fetches(seq);
    }

    fn start_fetches(&mut self, seq: u64) {
        let Some((latitude, longitude)) = self.session.coordinates() else {
            self.fail(WeatherError::NoLocation);
            return;
        };
        tracing::debug!("Request {}: forecast for ({}, {})", seq, latitude, longitude);

        let client = self.session.client().clone();
        weather_service::request_current(&self.tx, client.clone(), seq, latitude, longitude);
        weather_service::request_hourly(&self.tx, client, seq, latitude, longitude);
        self.pending += 2;
    }

    fn fail(&mut self, error: impl Into<WeatherServiceError>) {
        let error = error.into();
        tracing::warn!("{}", error);
        self.error_message = Some(error.user_message());
    }

    /// Apply every result that has arrived so far. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// Block until no request is outstanding or `timeout` elapses.
    /// Returns true if the model went idle. A timeout too large to
    /// represent as a deadline waits without one.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        while self.pending > 0 {
            let received = match deadline {
                Some(deadline) => self
                    .rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(message) => self.handle(message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
        }
        true
    }

    fn handle(&mut self, message: WeatherServiceMessage) {
        self.pending = self.pending.saturating_sub(1);

        match message {
            WeatherServiceMessage::LocationResolved { seq, result } => match split(result) {
                Ok(result) => match self.session.apply_location(seq, result) {
                    Applied::Updated => self.start_fetches(seq),
                    Applied::Failed(e) => self.fail(e),
                    Applied::Stale => {}
                },
                Err(e) => self.fail_unapplied(seq, e),
            },
            WeatherServiceMessage::CurrentDone { seq, result } => match split(result) {
                Ok(result) => {
                    if let Applied::Failed(e) = self.session.apply_current(seq, result) {
                        self.fail(e);
                    }
                }
                Err(e) => self.fail_unapplied(seq, e),
            },
            WeatherServiceMessage::HourlyDone { seq, result } => match split(result) {
                Ok(result) => {
                    if let Applied::Failed(e) = self.session.apply_hourly(seq, result) {
                        self.fail(e);
                    }
                }
                Err(e) => self.fail_unapplied(seq, e),
            },
        }
    }

    /// A request that never ran; only the latest one is worth reporting.
    fn fail_unapplied(&mut self, seq: u64, error: WeatherServiceError) {
        if seq == self.session.latest_request() {
            self.fail(error);
        } else {
            tracing::debug!("Discarding outdated failure for request {}: {}", seq, error);
        }
    }

    pub fn current_view(&self) -> Option<CurrentView> {
        let location = self.session.location()?;
        let reading = self.session.current()?;

        Some(CurrentView {
            heading: format!(
                "As of {} in {}",
                reading.timestamp.format("%H:%M"),
                location.display_name
            ),
            temperature_label: temperature_label(reading.temperature_c),
            description: reading.category().description().to_string(),
            icon_path: reading.icon_path(),
            background_path: reading.background_path(),
        })
    }

    /// Every `hourly_step`-th hour of today's series
    pub fn hourly_strip(&self) -> Vec<HourlyTile> {
        self.session
            .hourly()
            .map(|series| {
                series
                    .every_nth(self.hourly_step)
                    .into_iter()
                    .map(HourlyTile::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WAIT: Duration = Duration::from_secs(10);

    fn forecast_mocks(latitude: &str, temperature: f64, code: i32) -> Vec<Mock> {
        vec![
            Mock::given(method("GET"))
                .and(path("/v1/forecast"))
                .and(query_param("latitude", latitude))
                .and(query_param("current", "temperature_2m,is_day,weather_code"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "current": {
                        "time": "2024-11-03T21:00",
                        "temperature_2m": temperature,
                        "is_day": 0,
                        "weather_code": code
                    }
                }))),
            Mock::given(method("GET"))
                .and(path("/v1/forecast"))
                .and(query_param("latitude", latitude))
                .and(query_param("hourly", "temperature_2m,weather_code,is_day"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "hourly": {
                        "temperature_2m": (0..24).map(f64::from).collect::<Vec<_>>(),
                        "weather_code": vec![code; 24],
                        "is_day": (0..24).map(|h| u8::from((7..19).contains(&h))).collect::<Vec<_>>()
                    }
                }))),
        ]
    }

    fn place_mock(name: &str, canonical: &str, latitude: f64, longitude: f64) -> Mock {
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"name": canonical, "latitude": latitude, "longitude": longitude}]
            })))
    }

    fn mock_open_meteo() -> MockServer {
        let runtime = bridge::init_runtime().unwrap();
        runtime.block_on(async {
            let server = MockServer::start().await;
            place_mock("vancouver", "Vancouver", 49.25, -123.12)
                .mount(&server)
                .await;
            place_mock("tokyo", "Tokyo", 35.5, 139.5).mount(&server).await;
            place_mock("osaka", "Osaka", 34.5, 135.5).mount(&server).await;
            Mock::given(method("GET"))
                .and(path("/v1/forecast"))
                .and(query_param("latitude", "34.5"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;
            for mock in forecast_mocks("49.25", 7.0, 61)
                .into_iter()
                .chain(forecast_mocks("35.5", 18.4, 0))
            {
                mock.mount(&server).await;
            }
            server
        })
    }

    fn model_for(server: &MockServer) -> WeatherModel {
        let mut config = Config::default();
        config.weather.geocoding_url = server.uri();
        config.weather.forecast_url = server.uri();
        WeatherModel::new(&config).unwrap()
    }

    #[test]
    fn submit_location_populates_views() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);

        model.submit_location("vancouver");
        assert!(model.is_loading());
        assert!(model.wait_idle(WAIT));

        assert_eq!(model.location_name(), Some("Vancouver"));
        assert_eq!(model.error_message(), None);

        let view = model.current_view().unwrap();
        assert_eq!(view.heading, "As of 21:00 in Vancouver");
        assert_eq!(view.temperature_label, "7.0 °C");
        assert_eq!(view.icon_path, "assets/icons/rainy_night.png");
        assert_eq!(view.background_path, "assets/backgrounds/rainy_night.jpeg");

        let strip = model.hourly_strip();
        assert_eq!(strip.len(), 8);
        assert_eq!(strip[0].hour_label, "0:00");
        assert_eq!(strip[0].icon_path, "assets/icons/rainy_night.png");
        assert_eq!(strip[4].hour_label, "12:00");
        assert_eq!(strip[4].temperature_label, "12.0 °C");
        assert_eq!(strip[4].icon_path, "assets/icons/rainy_day.png");
    }

    #[test]
    fn unknown_place_keeps_previous_location_and_reports_error() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        model.submit_location("vancouver");
        assert!(model.wait_idle(WAIT));
        let before = model.session().location().cloned();

        model.submit_location("xyznotaplace123");
        assert!(model.wait_idle(WAIT));

        assert_eq!(model.session().location().cloned(), before);
        assert!(model.error_message().unwrap().contains("xyznotaplace123"));
        assert!(model.current_view().is_some());
    }

    #[test]
    fn only_latest_request_becomes_visible() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);

        model.submit_location("vancouver");
        model.submit_location("tokyo");
        assert!(model.wait_idle(WAIT));

        assert_eq!(model.location_name(), Some("Tokyo"));
        let view = model.current_view().unwrap();
        assert_eq!(view.temperature_label, "18.4 °C");
        assert_eq!(view.icon_path, "assets/icons/clear_night.png");
    }

    #[test]
    fn refresh_without_location_reports_error() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);

        model.refresh();

        assert!(!model.is_loading());
        assert_eq!(model.error_message(), Some("Search for a place first."));
        assert!(model.hourly_strip().is_empty());
    }

    #[test]
    fn refresh_refetches_for_held_location() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        model.submit_location("tokyo");
        assert!(model.wait_idle(WAIT));

        model.refresh();
        assert!(model.is_loading());
        assert!(model.wait_idle(WAIT));
        assert_eq!(model.poll(), 0);
        assert_eq!(model.hourly_strip().len(), 8);
    }

    #[test]
    fn forecast_failure_after_location_change_hides_old_readings() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        model.submit_location("vancouver");
        assert!(model.wait_idle(WAIT));
        assert!(model.current_view().is_some());

        model.submit_location("osaka");
        assert!(model.wait_idle(WAIT));

        assert_eq!(model.location_name(), Some("Osaka"));
        assert!(model.current_view().is_none());
        assert!(model.hourly_strip().is_empty());
        assert_eq!(
            model.error_message(),
            Some("Weather data is unavailable right now. Please try again.")
        );
    }

    #[test]
    fn refresh_during_location_change_drops_the_change() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        model.submit_location("vancouver");
        assert!(model.wait_idle(WAIT));

        model.submit_location("tokyo");
        model.refresh();
        assert!(model.wait_idle(WAIT));

        assert_eq!(model.location_name(), Some("Vancouver"));
        assert_eq!(model.error_message(), None);
        let view = model.current_view().unwrap();
        assert_eq!(view.heading, "As of 21:00 in Vancouver");
        assert_eq!(view.temperature_label, "7.0 °C");
        assert_eq!(model.hourly_strip().len(), 8);
    }

    #[test]
    fn wait_idle_accepts_unbounded_timeout() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        assert!(model.wait_idle(Duration::MAX));

        model.submit_location("tokyo");
        assert!(model.wait_idle(Duration::MAX));
        assert_eq!(model.location_name(), Some("Tokyo"));
    }

    #[test]
    fn service_fault_for_latest_request_is_reported() {
        let server = mock_open_meteo();
        let mut model = model_for(&server);
        let seq = model.session.begin_request();

        model
            .tx
            .send(WeatherServiceMessage::CurrentDone {
                seq: seq - 1,
                result: Err(WeatherServiceError::NotInitialized),
            })
            .unwrap();
        assert_eq!(model.poll(), 1);
        assert_eq!(model.error_message(), None);

        model
            .tx
            .send(WeatherServiceMessage::LocationResolved {
                seq,
                result: Err(WeatherServiceError::NotInitialized),
            })
            .unwrap();
        assert_eq!(model.poll(), 1);
        assert_eq!(
            model.error_message(),
            Some("Weather service is not running. Restart the app.")
        );
        assert!(!model.session().is_ready());
    }
}
