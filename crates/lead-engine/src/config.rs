//! Database configuration

use serde::{Deserialize, Serialize};

use crate::{LeadError, Result};

/// Connection settings for the SQLite store
///
/// # Examples
///
/// ```
/// use lead_engine::DatabaseConfig;
///
/// let config = DatabaseConfig::default();
/// assert_eq!(config.url, "sqlite://leadroute.db");
/// config.validate().expect("defaults are valid");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://leadroute.db` or `sqlite::memory:`
    pub url: String,

    /// Upper bound of pooled connections
    ///
    /// In-memory databases always use a single connection; every pooled
    /// connection would otherwise see its own empty database.
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://leadroute.db".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("sqlite:") {
            return Err(LeadError::configuration(format!(
                "unsupported database url '{}', expected sqlite:",
                self.url
            )));
        }
        if self.max_connections == 0 {
            return Err(LeadError::configuration("max_connections must be at least 1"));
        }
        Ok(())
    }
}
