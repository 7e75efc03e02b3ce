use thiserror::Error;

/// Error types for lead routing operations
///
/// Having no eligible operator is not represented here: the assignment engine
/// answers `Ok(None)` in that case and the contact is stored unassigned.
///
/// # Examples
///
/// ```
/// use lead_engine::{LeadError, Result};
///
/// fn lookup(source_id: i64) -> Result<()> {
///     Err(LeadError::not_found(format!("source {}", source_id)))
/// }
///
/// match lookup(42) {
///     Err(LeadError::NotFound(what)) => assert_eq!(what, "source 42"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum LeadError {
    /// Storage failure from the underlying SQLite database
    ///
    /// Propagated unchanged; nothing in this crate retries storage faults.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Schema migration failed while opening the database
    #[error("Migration error: {0}")]
    Migration(String),

    /// A referenced source, operator or lead does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique key was violated
    ///
    /// Raised for duplicate operator names, source names or codes, and for a
    /// lead external id inserted concurrently by another writer. The latter
    /// is recoverable: resolve the lead again.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Administrative input was rejected
    ///
    /// # Examples
    /// - Non-positive `max_load`
    /// - Negative weight
    /// - Weight set naming operators that do not exist
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for LeadError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.message().to_string())
            }
            _ => Self::Database(err),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for LeadError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for LeadError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl LeadError {
    /// Create a new NotFound error with the provided message
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Conflict error with the provided message
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new Validation error with the provided message
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Configuration error with the provided message
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error is a unique-key conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for lead routing operations
pub type Result<T> = std::result::Result<T, LeadError>;
