pub mod traits;
pub mod weather;

// Re-exports for convenience
pub use traits::{FixedForecast, LatestForecast};
pub use weather::{
    poll, weather_description, DailyForecast, Error as WeatherError, Forecast, ForecastUpdates,
};

// Core functions
pub fn poll_forecast(
    base_url: url::Url,
    latitude: f64,
    longitude: f64,
    interval: std::time::Duration,
) -> anyhow::Result<weather::ForecastUpdates> {
    weather::poll(base_url, latitude, longitude, interval)
}
