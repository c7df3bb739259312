//! Combat entities and cumulative play statistics.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Element;

/// A combat participant.
///
/// The player persists across encounters within a run; enemies are
/// recreated at every spawn. `bp` is signed because attacking can drive it
/// below zero within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Current hit points, clamped to `0..=max_hp`.
    pub hp: u32,
    /// Hit point ceiling.
    pub max_hp: u32,
    /// Attack power.
    pub atk: u32,
    /// Behavior points.
    pub bp: i32,
    /// Behavior points at spawn.
    pub max_bp: i32,
    /// Elemental type (enemies only).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub element: Option<Element>,
    /// Attack element declared by the player for the current encounter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub atk_type: Option<Element>,
}

impl Entity {
    /// Create an untyped entity at full health and behavior points.
    pub const fn new(max_hp: u32, atk: u32, max_bp: i32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            atk,
            bp: max_bp,
            max_bp,
            element: None,
            atk_type: None,
        }
    }

    /// Set the elemental type.
    #[must_use]
    pub const fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Whether hit points are exhausted.
    pub const fn is_defeated(&self) -> bool {
        self.hp == 0
    }

    /// Subtract damage, clamping at zero. Returns the damage actually taken.
    pub const fn take_damage(&mut self, amount: u32) -> u32 {
        let taken = if amount > self.hp { self.hp } else { amount };
        self.hp = self.hp.saturating_sub(amount);
        taken
    }

    /// Restore hit points, clamping at `max_hp`.
    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }
}

/// Cumulative counters for reporting. Monotonic within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct GamePlayStats {
    /// Damage dealt to enemies.
    pub total_damage_dealt: u64,
    /// Damage taken from enemies.
    pub total_damage_taken: u64,
    /// Completed turns.
    pub turn_count: u32,
    /// Items moved between program and inventory.
    pub item_swap_count: u32,
    /// Turns skipped by structural validation.
    pub execution_failure_count: u32,
    /// Shop trades.
    pub shop_trade_count: u32,
}
