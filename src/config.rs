//! Configuration types for btc-price-feed

use crate::feed::FeedMeta;
use crate::price::{CoinGeckoConfig, COINGECKO_SIMPLE_PRICE_URL};
use crate::telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// File is not valid TOML for [`Config`]
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub feed: FeedConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

/// Upstream price API configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Endpoint URL without query string
    pub url: String,
    /// Coin identifier
    pub coin_id: String,
    /// Quote currency key
    pub currency: String,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: COINGECKO_SIMPLE_PRICE_URL.to_string(),
            coin_id: "bitcoin".to_string(),
            currency: "usd".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SourceConfig {
    /// Client configuration for the CoinGecko source
    pub fn to_coingecko(&self) -> CoinGeckoConfig {
        CoinGeckoConfig {
            url: self.url.clone(),
            coin_id: self.coin_id.clone(),
            currency: self.currency.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Published feed configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Directory holding the published artifacts
    pub output_dir: PathBuf,
    /// Public base URL used in links and ids
    pub base_url: String,
    /// Entries retained in the feed
    pub max_entries: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            base_url: "http://localhost:8000".to_string(),
            max_entries: 10,
        }
    }
}

/// Poll schedule configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between cycles
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1800,
        }
    }
}

impl ScheduleConfig {
    /// Period between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Static file server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: IpAddr,
    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Values taken from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub port: Option<u16>,
    pub interval_secs: Option<u64>,
    pub max_entries: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply command-line and environment overrides
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.output_dir {
            self.feed.output_dir = dir;
        }
        if let Some(url) = overrides.base_url {
            self.feed.base_url = url;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(secs) = overrides.interval_secs {
            self.schedule.interval_secs = secs;
        }
        if let Some(max) = overrides.max_entries {
            self.feed.max_entries = max;
        }
        if let Some(level) = overrides.log_level {
            self.telemetry.log_level = level;
        }
        if let Some(format) = overrides.log_format {
            self.telemetry.log_format = format;
        }
    }

    /// Check ranges and normalize the base URL
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.feed.max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "feed.max_entries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "source.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        let base_url = self.feed.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "feed.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        self.feed.base_url = base_url;

        Ok(self)
    }

    /// Channel metadata for the published feed
    pub fn feed_meta(&self) -> FeedMeta {
        FeedMeta::new(&self.feed.base_url, self.schedule.interval_secs)
    }
}
