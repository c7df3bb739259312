//! Game engine for the codecrawl roguelike.
//!
//! Players build a program out of item cards; each turn the program is
//! transpiled, validated and interpreted against the current enemy, and the
//! enemy answers. Between encounters the run moves around a circular event
//! track of battles, shops, rewards and upgrades until the boss.
//!
//! # Modules
//!
//! - [`config`] -- YAML game configuration with built-in balance defaults.
//! - [`combat`] -- Elemental chart and damage formulas.
//! - [`interpreter`] -- Structural validation and program execution.
//! - [`progression`] -- Event track and encounter state machine.
//! - [`rewards`] -- Rarity rolls, shop stock and battle rewards.
//! - [`run`] -- The [`RunState`] aggregate and its between-turn operations.
//! - [`turn`] -- A full turn: player program then enemy counter-turn.
//! - [`session`] -- Shared run access with an in-flight turn guard.
//! - [`persistence`] -- The [`RunStore`] contract and save/load orchestration.
//! - [`narration`] -- Player-facing battle log lines.
//! - [`error`] -- [`GameError`].

pub mod combat;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod narration;
pub mod persistence;
pub mod progression;
pub mod rewards;
pub mod run;
pub mod session;
pub mod turn;

pub use config::GameConfig;
pub use error::GameError;
pub use persistence::{
    LoadOutcome, MemoryRunStore, RunStore, SaveRequest, StoreError, load_run, save_run,
};
pub use progression::{Landing, Progression};
pub use run::{ItemSource, MoveDirection, Presentation, RunResult, RunState};
pub use session::GameSession;
pub use turn::{PlayerPhase, TurnOutcome, TurnReport};
