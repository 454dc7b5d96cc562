use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// One day of forecast: rounded max/min temperature and WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DailyForecast {
    pub max: i32,
    pub min: i32,
    pub code: u16,
}

pub type Forecast = BTreeMap<NaiveDate, DailyForecast>;

/// Poll the forecast API for a constant stream of forecast updates.
///
/// Transport failures are retried automatically; the latest forecast is
/// kept available to subscribers in the meantime.
pub fn poll(
    base_url: Url,
    latitude: f64,
    longitude: f64,
    interval: Duration,
) -> Result<ForecastUpdates> {
    let (forecast_update, forecast_update_receiver) = watch::channel(Err(Error::NotYetAvailable));
    let forecast_update = Arc::new(forecast_update);

    tokio::spawn(async move {
        let client = reqwest::Client::new();

        // The default backoff config is fine for us apart from one thing:
        // `max_elapsed_time`. If we don't get an error within this timeframe,
        // backoff won't actually retry the operation.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: None,
            ..backoff::ExponentialBackoff::default()
        };

        let result = backoff::future::retry_notify::<Infallible, _, _, _, _, _>(
            backoff,
            || {
                let forecast_update = forecast_update.clone();
                let client = client.clone();
                let base_url = base_url.clone();
                async move {
                    loop {
                        let forecast = api::daily_forecast(&client, &base_url, latitude, longitude)
                            .await
                            .map_err(to_backoff)?;

                        let send_result = forecast_update.send(Ok(forecast));

                        if send_result.is_err() {
                            return Err(backoff::Error::Permanent(anyhow!(
                                "receiver disconnected"
                            )));
                        }

                        tokio::time::sleep(interval).await;
                    }
                }
            },
            |error, next: Duration| {
                tracing::info!(%error, "Weather request failed, retrying in {}ms", next.as_millis());
            },
        )
        .await;

        match result {
            Err(e) => {
                tracing::warn!("Forecast updates incurred an unrecoverable error: {:#}", e);

                // in case the retries fail permanently, let the subscribers know
                forecast_update.send(Err(Error::PermanentFailure))
            }
            Ok(never) => match never {},
        }
    });

    Ok(ForecastUpdates {
        inner: forecast_update_receiver,
    })
}

#[derive(Clone, Debug)]
pub struct ForecastUpdates {
    inner: watch::Receiver<ForecastUpdate>,
}

impl ForecastUpdates {
    pub async fn wait_for_update(&mut self) -> Result<ForecastUpdate> {
        self.inner.changed().await?;

        Ok(self.inner.borrow().clone())
    }

    pub fn latest_update(&mut self) -> ForecastUpdate {
        self.inner.borrow().clone()
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("Forecast is not yet available")]
    NotYetAvailable,
    #[error("Permanently failed to retrieve forecast")]
    PermanentFailure,
}

pub type ForecastUpdate = Result<Forecast, Error>;

/// Maps an [`api::Error`] to a backoff error, effectively defining our
/// retry strategy.
fn to_backoff(e: api::Error) -> backoff::Error<anyhow::Error> {
    use backoff::Error::*;

    match e {
        // Transport failures will be retried
        api::Error::Transport(_) => Transient {
            err: anyhow::Error::from(e),
            retry_after: None,
        },

        // A response we cannot make sense of most likely presents a
        // programmer error and retrying will not help
        api::Error::Malformed(_) => Permanent(anyhow::Error::from(e)),
    }
}

/// Human-readable description for a WMO weather interpretation code.
pub fn weather_description(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        95 => "Thunderstorm",
        _ => "Variable",
    }
}

/// Forecast API module.
///
/// Responsible for fetching one daily forecast from the Open-Meteo API and
/// decoding it into per-date entries.
pub mod api {
    use super::{DailyForecast, Forecast};
    use url::Url;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("Request to forecast API failed")]
        Transport(#[from] reqwest::Error),
        #[error("Malformed forecast response: {0}")]
        Malformed(String),
    }

    pub async fn daily_forecast(
        client: &reqwest::Client,
        base_url: &Url,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, Error> {
        let response = client
            .get(base_url.clone())
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("daily", "temperature_2m_max,temperature_2m_min,weathercode".to_owned()),
                ("temperature_unit", "fahrenheit".to_owned()),
                ("timezone", "auto".to_owned()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let response: wire::ForecastResponse = response.json().await?;

        decode(response)
    }

    pub(super) fn decode(response: wire::ForecastResponse) -> Result<Forecast, Error> {
        let daily = response.daily;
        let days = daily.time.len();

        if daily.temperature_2m_max.len() != days
            || daily.temperature_2m_min.len() != days
            || daily.weathercode.len() != days
        {
            return Err(Error::Malformed(
                "daily series have mismatched lengths".to_owned(),
            ));
        }

        let forecast = daily
            .time
            .into_iter()
            .zip(daily.temperature_2m_max)
            .zip(daily.temperature_2m_min)
            .zip(daily.weathercode)
            .map(|(((date, max), min), code)| {
                (
                    date,
                    DailyForecast {
                        max: max.round() as i32,
                        min: min.round() as i32,
                        code,
                    },
                )
            })
            .collect();

        Ok(forecast)
    }

    pub(super) mod wire {
        use chrono::NaiveDate;
        use serde::Deserialize;

        #[derive(Debug, Deserialize)]
        pub struct ForecastResponse {
            pub daily: Daily,
        }

        #[derive(Debug, Deserialize)]
        pub struct Daily {
            pub time: Vec<NaiveDate>,
            pub temperature_2m_max: Vec<f64>,
            pub temperature_2m_min: Vec<f64>,
            pub weathercode: Vec<u16>,
        }
    }
}
