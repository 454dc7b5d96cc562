use crate::weather::{Error, Forecast, ForecastUpdates};
use std::convert::Infallible;

/// Access to the most recent forecast, however it is sourced.
pub trait LatestForecast {
    type Error: std::error::Error + Send + Sync + 'static;

    fn latest(&mut self) -> Result<Forecast, Self::Error>;
}

/// A fixed forecast for tests and offline development.
#[derive(Clone, Debug, Default)]
pub struct FixedForecast(Forecast);

impl FixedForecast {
    pub fn new(forecast: Forecast) -> Self {
        Self(forecast)
    }
}

impl LatestForecast for FixedForecast {
    type Error = Infallible;

    fn latest(&mut self) -> Result<Forecast, Self::Error> {
        Ok(self.0.clone())
    }
}

impl LatestForecast for ForecastUpdates {
    type Error = Error;

    fn latest(&mut self) -> Result<Forecast, Self::Error> {
        self.latest_update()
    }
}
