//! # Async Database Management Module (sqlx + SQLite)
//!
//! Persistence for operators, sources, per-source operator weights, leads
//! and contacts, built on sqlx with SQLite.
//!
//! The module has two faces:
//!
//! - The [`RoutingStore`](crate::store::RoutingStore) implementation for
//!   [`SqliteConnection`](sqlx::SqliteConnection), used by the lead resolver
//!   and the assignment engine inside a caller-owned transaction.
//! - [`DatabaseManager`], which owns the pool and exposes the administrative
//!   and listing operations (operators, sources, weight sets, leads, stats).
//!
//! ## Quick Start
//!
//! ```rust
//! use lead_engine::database::DatabaseManager;
//! use lead_engine::types::CreateOperatorRequest;
//!
//! # async fn example() -> lead_engine::Result<()> {
//! let db = DatabaseManager::new_in_memory().await?;
//! let alice = db.create_operator(CreateOperatorRequest::new("alice", 3)).await?;
//! assert!(alice.active);
//! # Ok(())
//! # }
//! ```

mod leads;
mod operators;
mod routing;
mod sources;
mod stats;
mod transaction;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::Result;

// Re-export commonly used types
pub use sqlx;
pub use transaction::WriteTransaction;

/// Main database manager using sqlx for async operations
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Connect and run the embedded migrations
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        info!("🗄️ Initializing lead database: {}", config.url);

        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory() {
            // The database lives exactly as long as its only connection
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("✅ Lead database ready");
        Ok(Self { pool })
    }

    /// Create an in-memory database for testing
    pub async fn new_in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a new (deferred) database transaction
    ///
    /// Fine for transactions that only read, or that write before they
    /// read. Anything that reads and then writes under concurrency belongs
    /// in [`begin_write`](Self::begin_write).
    pub async fn begin_transaction(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Start a transaction holding the write lock from its first statement
    pub async fn begin_write(&self) -> Result<WriteTransaction> {
        WriteTransaction::begin(&self.pool).await
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
