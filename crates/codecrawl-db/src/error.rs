//! Error types for the data layer.
//!
//! Every failure surfaces as [`DbError`]. At the [`RunStore`] boundary it
//! is converted into the engine's [`StoreError`] so the game never depends
//! on `sqlx` types.
//!
//! [`RunStore`]: codecrawl_core::RunStore

use codecrawl_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSONB column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value the engine does not recognize.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::Serialization(source) => Self::Corrupt {
                reason: source.to_string(),
            },
            DbError::Corrupt(reason) => Self::Corrupt { reason },
            other => Self::Backend {
                message: other.to_string(),
            },
        }
    }
}
