//! # Lead-Engine
//!
//! Assignment of inbound customer contacts ("leads" reaching out through a
//! source) to human operators.
//!
//! This crate provides:
//! - The lead resolver: idempotent get-or-create of a lead by external id
//! - The operator assignment engine: weighted random choice among active
//!   operators that are under their concurrent-contact cap, with a recheck
//!   of the chosen operator before it is returned
//! - The contact-ingestion workflow running both in one transaction
//! - SQLite persistence (sqlx) with operator, source and weight-set
//!   administration, lead listings and distribution statistics
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  LeadRouter::register_contact (one tx)       │
//! ├──────────────────────┬───────────────────────┤
//! │  resolver            │  AssignmentEngine     │
//! ├──────────────────────┴───────────────────────┤
//! │  RoutingStore (SqliteConnection / tx)        │
//! ├──────────────────────────────────────────────┤
//! │  DatabaseManager: pool, migrations, admin    │
//! └──────────────────────────────────────────────┘
//! ```

pub mod assignment;
pub mod config;
pub mod contacts;
pub mod database;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;

pub use assignment::{AssignmentEngine, RandomDraw, WeightDraw};
pub use config::DatabaseConfig;
pub use contacts::LeadRouter;
pub use database::DatabaseManager;
pub use error::{LeadError, Result};
pub use resolver::resolve_lead;
pub use store::RoutingStore;
pub use types::{Contact, Lead, Operator, Source};

/// Open the database described by `config` and build a router over it
pub async fn init(config: &DatabaseConfig) -> Result<LeadRouter> {
    let database = DatabaseManager::new(config).await?;
    Ok(LeadRouter::new(database))
}
