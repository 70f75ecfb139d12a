//! Application configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::MonitorError;
use crate::pagination::MAX_PAGE_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the built map front end, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3045,
            static_dir: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

#[serde_as]
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Tick period when the client does not ask for one
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub default_interval: Duration,
    /// Shortest tick period a client may ask for
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub min_interval: Duration,
    pub default_page_size: u32,
    /// Trailing window of recent activity
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub window: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_millis(5000),
            min_interval: Duration::from_millis(1000),
            default_page_size: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FallbackConfig {
    /// JSON file of `{"<mmsi>": {...static attributes}}`
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AISMONITOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.server.validate()?;
        self.database.validate()?;
        self.stream.validate()?;
        self.fallback.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn address(&self) -> Result<SocketAddr, MonitorError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| MonitorError::ConfigurationError {
                message: format!("Invalid server address: {}", e),
            })
    }

    fn validate(&self) -> Result<(), MonitorError> {
        self.address()?;
        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                warn!(
                    "Static directory {} does not exist, front end will not be served",
                    dir.display()
                );
            }
        }
        Ok(())
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), MonitorError> {
        if self.url.trim().is_empty() {
            return Err(MonitorError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(MonitorError::ConfigurationError {
                message: "Database pool needs at least one connection".to_string(),
            });
        }
        Ok(())
    }
}

impl StreamConfig {
    fn validate(&self) -> Result<(), MonitorError> {
        if self.min_interval.is_zero() {
            return Err(MonitorError::ConfigurationError {
                message: "Minimum stream interval must be greater than zero".to_string(),
            });
        }
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(MonitorError::ConfigurationError {
                message: format!("Default page size must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        if self.window.is_zero() {
            return Err(MonitorError::ConfigurationError {
                message: "Recent activity window must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl FallbackConfig {
    fn validate(&self) -> Result<(), MonitorError> {
        match &self.path {
            Some(path) if !path.is_file() => Err(MonitorError::ConfigurationError {
                message: format!("Fallback file {} does not exist", path.display()),
            }),
            _ => Ok(()),
        }
    }
}
