use crate::services::weather_service::WeatherServiceError;
use nimbus_core::{AppError, ReqwestErrorExt, WeatherError};
use nimbus_weather::WeatherError as ServiceWeatherError;

impl From<WeatherServiceError> for AppError {
    fn from(e: WeatherServiceError) -> Self {
        match e {
            WeatherServiceError::Weather(inner) => match inner {
                ServiceWeatherError::LocationNotFound { place } => {
                    AppError::Weather(WeatherError::LocationNotFound(place))
                }
                ServiceWeatherError::Network(err) => AppError::Network(err.into_network_error()),
                ServiceWeatherError::Fetch(s) | ServiceWeatherError::Parse(s) => {
                    AppError::Weather(WeatherError::ApiError(s))
                }
                ServiceWeatherError::AssetMissing(path) => {
                    AppError::Weather(WeatherError::AssetMissing(path.display().to_string()))
                }
                ServiceWeatherError::NoLocation => AppError::Weather(WeatherError::NoLocation),
            },
            WeatherServiceError::NotInitialized => {
                AppError::Weather(WeatherError::ServiceUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn not_found_maps_to_location_not_found() {
        let err = WeatherServiceError::from(ServiceWeatherError::LocationNotFound {
            place: "Atlantis".into(),
        });
        let app: AppError = err.into();
        assert!(matches!(
            app,
            AppError::Weather(WeatherError::LocationNotFound(ref p)) if p == "Atlantis"
        ));
        assert_eq!(app.user_message(), "Location not found. Check and try again.");
    }

    #[test]
    fn fetch_failures_map_to_api_error() {
        let app: AppError = WeatherServiceError::from(ServiceWeatherError::Parse("x".into())).into();
        assert!(matches!(app, AppError::Weather(WeatherError::ApiError(_))));
    }

    #[test]
    fn missing_asset_keeps_path() {
        let app: AppError = WeatherServiceError::from(ServiceWeatherError::AssetMissing(
            PathBuf::from("assets/icons/clear_day.png"),
        ))
        .into();
        assert!(matches!(
            app,
            AppError::Weather(WeatherError::AssetMissing(ref p)) if p.ends_with("clear_day.png")
        ));
    }

    #[test]
    fn not_initialized_maps_to_service_unavailable() {
        let app: AppError = WeatherServiceError::NotInitialized.into();
        assert!(matches!(app, AppError::Weather(WeatherError::ServiceUnavailable)));
    }

    #[test]
    fn no_location_asks_for_a_search() {
        let app: AppError = WeatherServiceError::from(ServiceWeatherError::NoLocation).into();
        assert!(matches!(app, AppError::Weather(WeatherError::NoLocation)));
        assert_eq!(app.user_message(), "Search for a place first.");
    }
}
