use anyhow::{Context, Result};
use closet_feed::weather::{self, api, weather_description};
use tracing_subscriber::EnvFilter;

/// Fetch and print the daily forecast for a coordinate pair.
///
/// Usage: forecast <latitude> <longitude>
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let latitude: f64 = args
        .next()
        .context("missing <latitude> argument")?
        .parse()
        .context("latitude is not a number")?;
    let longitude: f64 = args
        .next()
        .context("missing <longitude> argument")?
        .parse()
        .context("longitude is not a number")?;

    let base_url = weather::DEFAULT_BASE_URL
        .parse()
        .context("default base url is invalid")?;

    let client = reqwest::Client::new();
    let forecast = api::daily_forecast(&client, &base_url, latitude, longitude).await?;

    for (date, day) in &forecast {
        tracing::info!(
            %date,
            max = day.max,
            min = day.min,
            conditions = weather_description(day.code),
            "forecast"
        );
    }

    Ok(())
}
