pub mod weather_service;

pub use weather_service::{
    request_current as request_weather_current, request_hourly as request_weather_hourly,
    request_resolve as request_weather_resolve, WeatherServiceError, WeatherServiceMessage,
};
