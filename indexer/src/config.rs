use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;
use crate::error::{IndexerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub poll_interval_secs: u64,
    pub start_height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics are only served when a port is set.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            api_url: "localhost:8748".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/indexer.db"),
            max_connections: 20,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            start_height: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ScannerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| IndexerError::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Override config with CLI arguments
    pub fn apply_cli_overrides(&mut self, args: &Args) {
        if let Some(api_url) = &args.api_url {
            self.chain.api_url = api_url.clone();
        }

        if let Some(database) = &args.database {
            self.database.path = database.clone();
        }

        if let Some(secs) = args.poll_interval_secs {
            self.scanner.poll_interval_secs = secs;
        }

        if let Some(height) = args.start_height {
            self.scanner.start_height = height;
        }

        if let Some(port) = args.metrics_port {
            self.metrics.port = Some(port);
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }

        if args.log_json {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.api_url.trim().is_empty() {
            return Err(IndexerError::Config("chain.api_url must be set".to_string()));
        }
        if self.scanner.poll_interval_secs == 0 {
            return Err(IndexerError::Config("scanner.poll_interval_secs must be positive".to_string()));
        }
        Ok(())
    }
}
