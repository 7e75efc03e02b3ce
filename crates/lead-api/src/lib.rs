//! # Lead-API
//!
//! REST service over [`lead_engine`]: operator and source administration,
//! contact registration with automatic operator assignment, lead listings
//! and per-operator statistics.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lead_api::{create_router, LeadRouterConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = LeadRouterConfig::default();
//! let router = Arc::new(lead_engine::init(&config.database).await?);
//!
//! let app = create_router(router);
//! let listener = tokio::net::TcpListener::bind(config.bind_address()?).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod logging;

pub use api::{create_router, ApiState, AppError};
pub use crate::config::LeadRouterConfig;
pub use logging::{setup_logging, LoggingConfig};

use thiserror::Error;

/// Service-level errors raised while starting up
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] lead_engine::LeadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for ApiError {
    fn from(err: ::config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
