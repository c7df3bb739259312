//! Shared type definitions for the codecrawl roguelike engine.
//!
//! This crate is the single source of truth for the data model shared by
//! the item logic, the turn engine, the persistence layer and (through
//! `ts-rs` bindings) the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Record and user identifiers
//! - [`enums`] -- Elements, event kinds, game states, item types, statuses
//! - [`items`] -- Resolved item kinds and placeable item cards
//! - [`structs`] -- Combat entities and play statistics
//! - [`snapshot`] -- Persisted run shapes, including the legacy snapshot

pub mod enums;
pub mod ids;
pub mod items;
pub mod snapshot;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Element, EventKind, GameState, ItemCategory, ItemType, Rarity, RunStatus, TraversalDirection,
    UnknownTag,
};
pub use ids::{RunId, UserId};
pub use items::{ItemKind, NodeItem};
pub use snapshot::{
    LegacyStatsSnapshot, ProgressSnapshot, SavedRun, StatsSnapshot, StoredStatsSnapshot,
};
pub use structs::{Entity, GamePlayStats};
