//! `PostgreSQL` persistence for the codecrawl roguelike engine.
//!
//! Implements the engine's [`RunStore`](codecrawl_core::RunStore) contract
//! on a single `game_runs` table.
//!
//! # Modules
//!
//! - [`run_store`] -- Connection, migrations, saved-run load and replace-or-insert
//! - [`error`] -- Shared error types

pub mod error;
pub mod run_store;

pub use error::DbError;
pub use run_store::{GameRunRow, PgRunStore};
