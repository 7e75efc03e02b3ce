//! Configuration for the lead routing service
//!
//! Sources are layered, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables prefixed `LEADROUTE__`, e.g.
//!    `LEADROUTE__DATABASE__URL=sqlite://leads.db`
//! 4. command-line overrides, applied by the binary

use std::net::SocketAddr;
use std::path::Path;

use ::config::{Config, Environment, File};
use lead_engine::DatabaseConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::{ApiError, Result};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEADROUTE";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadRouterConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub logging: LoggingSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` directives still apply on top
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LeadRouterConfig {
    /// Load from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Parsed listener address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.api.bind_address.parse().map_err(|e| {
            ApiError::Config(format!("invalid bind address '{}': {}", self.api.bind_address, e))
        })
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| ApiError::Config(format!("invalid log level: {}", self.logging.level)))
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.bind_address()?;
        self.log_level()?;
        Ok(())
    }
}
