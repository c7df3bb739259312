//! Error types for the runner.
//!
//! Each variant wraps the error of the layer it came from so the entry
//! point can report where a run failed.

use codecrawl_core::GameError;
use codecrawl_core::config::ConfigError;
use codecrawl_db::DbError;

/// Errors that can occur while driving a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The game configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The database could not be reached or migrated.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The engine refused an action.
    #[error("game error: {0}")]
    Game(#[from] GameError),

    /// An environment variable holds an unusable value.
    #[error("invalid {name}: {value}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}
