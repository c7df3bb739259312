//! Item logic for the codecrawl roguelike engine.
//!
//! Items are cards the player arranges into a program. This crate resolves
//! item labels against the static catalog, turns item lists into
//! executable [`Program`]s and defines which items can be upgraded. It does
//! no I/O and holds no state.
//!
//! # Modules
//!
//! - [`catalog`] -- The ordered item definition registry
//! - [`parser`] -- Label resolution and parameter extraction
//! - [`instruction`] -- Instructions, their text form and legacy decoding
//! - [`transpiler`] -- Item list to program conversion
//! - [`upgrade`] -- Upgrade table for stat items
//! - [`error`] -- Parse and decode errors

pub mod catalog;
pub mod error;
pub mod instruction;
pub mod parser;
pub mod transpiler;
pub mod upgrade;

pub use catalog::{CATALOG, ItemDefinition, ParameterSpec};
pub use error::ParseError;
pub use instruction::{BlockEffect, Instruction, Program, Variable};
pub use parser::{
    Parameters, describe, extract_parameters, hydrate, item_from_label, parse_item, resolve,
};
pub use transpiler::transpile;
pub use upgrade::{is_upgradable, upgrade_item, upgraded};
