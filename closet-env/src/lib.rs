use anyhow::{Context, Result};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WEATHER_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub store: Store,
    pub weather: Weather,
}

impl Config {
    pub fn read<D>(config_file: D) -> Result<Self, ConfigError>
    where
        D: AsRef<OsStr>,
    {
        let config_file = Path::new(&config_file);

        config::Config::builder()
            .add_source(config::File::from(config_file))
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: Store {
                upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            },
            weather: Weather {
                base_url: DEFAULT_WEATHER_BASE_URL
                    .parse()
                    .expect("static url is well formed"),
                latitude: None,
                longitude: None,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Store {
    /// How long a blob upload may take before it is treated as failed.
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

impl Store {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Weather {
    #[serde(default = "default_weather_base_url")]
    pub base_url: Url,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_upload_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_SECS
}

fn default_weather_base_url() -> Url {
    DEFAULT_WEATHER_BASE_URL
        .parse()
        .expect("static url is well formed")
}

#[derive(thiserror::Error, Debug, Clone, Copy)]
#[error("config not initialized")]
pub struct ConfigNotInitialized {}

pub fn read_config(config_path: PathBuf) -> Result<Result<Config, ConfigNotInitialized>> {
    if config_path.exists() {
        info!(
            "Using config file at default path: {}",
            config_path.display()
        );
    } else {
        return Ok(Err(ConfigNotInitialized {}));
    }

    let file = Config::read(&config_path)
        .with_context(|| format!("failed to read config file {}", config_path.display()))?;

    Ok(Ok(file))
}

/// Write a default config file so the next start finds one.
pub fn initial_setup(config_path: PathBuf, config: Config) -> Result<()> {
    info!("Config file not found, writing defaults...");
    ensure_directory_exists(config_path.as_path())?;

    let toml = toml::to_string(&config)?;
    fs::write(&config_path, toml)?;

    info!(
        "Initial setup complete, config file created at {}",
        config_path.as_path().display()
    );
    Ok(())
}

pub fn default_config_path() -> Result<PathBuf> {
    directories_next::ProjectDirs::from("", "", "closet")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .context("Could not determine a config directory for this platform")
}

pub fn ensure_directory_exists(file: &Path) -> Result<(), std::io::Error> {
    if let Some(path) = file.parent() {
        if !path.exists() {
            tracing::info!(
                "Parent directory does not exist, creating recursively: {}",
                file.display()
            );
            return std::fs::create_dir_all(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn config_roundtrip() {
        let temp_dir = tempdir().unwrap().path().to_path_buf();
        let config_path = Path::join(&temp_dir, "config.toml");

        let expected = Config {
            store: Store {
                upload_timeout_secs: 5,
            },
            weather: Weather {
                base_url: "https://api.open-meteo.com/v1/forecast".parse().unwrap(),
                latitude: Some(40.7),
                longitude: Some(-74.0),
            },
        };

        initial_setup(config_path.clone(), expected.clone()).unwrap();
        let actual = read_config(config_path).unwrap().unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn missing_config_file_is_reported_not_fatal() {
        let temp_dir = tempdir().unwrap().path().to_path_buf();
        let config_path = Path::join(&temp_dir, "config.toml");

        let result = read_config(config_path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = Config::default();

        assert_eq!(config.store.upload_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.weather.base_url.as_str(),
            "https://api.open-meteo.com/v1/forecast"
        );
    }
}
