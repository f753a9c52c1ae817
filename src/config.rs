//! Configuration management

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address for the query API
    pub bind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub brti: BrtiConfig,
    pub bitstamp: BitstampConfig,
    pub coinbase: CoinbaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrtiConfig {
    /// Whether a poll loop is started for this source
    pub enabled: bool,
    /// Delay between dispatches in milliseconds
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BitstampConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoinbaseConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Width of the candle backfill window in seconds
    pub candle_window_secs: i64,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path.as_ref().to_str().unwrap()))
            .add_source(config::Environment::with_prefix("TICKSTORE"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Load from default locations, falling back to built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "~/.config/tickstore/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tickstore.db".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for BrtiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 500,
        }
    }
}

impl Default for BitstampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
        }
    }
}

impl Default for CoinbaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
            candle_window_secs: 120,
        }
    }
}
