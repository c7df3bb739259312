//! Enumeration types for the codecrawl engine.
//!
//! Wire representations match what the browser client and the persisted
//! run records use: lowercase tags for elements, events and item types,
//! upper-case tags for game states and run statuses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// Elemental tag carried by enemies and chosen by the player as attack type.
///
/// The three tags form a rock-paper-scissors chart: water beats fire,
/// fire beats grass, grass beats water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Element {
    /// Water. Strong against fire.
    Water,
    /// Fire. Strong against grass.
    Fire,
    /// Grass. Strong against water.
    Grass,
}

impl Element {
    /// All elements in catalog order.
    pub const ALL: [Self; 3] = [Self::Water, Self::Fire, Self::Grass];

    /// The wire tag used in labels and instruction text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Fire => "fire",
            Self::Grass => "grass",
        }
    }

    /// The element this one deals double damage to.
    pub const fn beats(self) -> Self {
        match self {
            Self::Water => Self::Fire,
            Self::Fire => Self::Grass,
            Self::Grass => Self::Water,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known tags of an enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} tag: {tag:?}")]
pub struct UnknownTag {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub tag: String,
}

impl FromStr for Element {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(Self::Water),
            "fire" => Ok(Self::Fire),
            "grass" => Ok(Self::Grass),
            other => Err(UnknownTag {
                kind: "element",
                tag: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Event track
// ---------------------------------------------------------------------------

/// A slot on the circular event track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// The boss marker. Always at index 0.
    Select,
    /// A regular battle.
    Battle,
    /// A shop where items can be traded.
    Shop,
    /// A fixed item reward.
    Reward,
    /// An item upgrade opportunity.
    Upgrade,
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// Top-level mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum GameState {
    /// Title screen before a run exists.
    Start,
    /// Direction selection on the map.
    Map,
    /// Fighting a regular enemy.
    Battle,
    /// Trading at a shop.
    Shop,
    /// Fighting the boss.
    Boss,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Visual and semantic category of an item card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ItemType {
    /// Attacks and attack-power boosts.
    Attack,
    /// Healing.
    Heal,
    /// Behavior-point manipulation.
    Behavior,
    /// Control flow and variables.
    Syntax,
    /// Elemental sensing and typing.
    Element,
    /// Effects that weaken the enemy.
    Debuff,
}

/// Catalog grouping of an item definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Variables, loops, conditionals and block closers.
    Syntax,
    /// Attacks and attack modifiers.
    Attack,
    /// Behavior points.
    Behavior,
    /// Hit points.
    Heal,
    /// Enemy element inspection.
    Element,
}

/// Rarity tier of a generated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// 40% of draws.
    Common,
    /// 30% of draws.
    Uncommon,
    /// 20% of draws.
    Rare,
    /// 7% of draws.
    Epic,
    /// 2.5% of draws.
    Legendary,
    /// 0.5% of draws.
    Mythic,
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Status of a persisted run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum RunStatus {
    /// The run can be resumed.
    InProgress,
    /// The boss was defeated.
    Completed,
    /// The player died.
    GameOver,
}

impl RunStatus {
    /// The tag stored in the status column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::GameOver => "GAME_OVER",
        }
    }

    /// Whether the run has ended.
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = UnknownTag;

    /// Parses a stored status. Older records use `SAVED` for in-progress runs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" | "SAVED" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "GAME_OVER" => Ok(Self::GameOver),
            other => Err(UnknownTag {
                kind: "run status",
                tag: other.to_owned(),
            }),
        }
    }
}

/// Direction the event track is traversed in. Fixed for a run once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum TraversalDirection {
    /// Increasing indices (`+1`).
    Forward,
    /// Decreasing indices (`-1`).
    Backward,
}

impl TraversalDirection {
    /// Signed index step.
    pub const fn step(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

impl From<TraversalDirection> for i8 {
    fn from(direction: TraversalDirection) -> Self {
        match direction {
            TraversalDirection::Forward => 1,
            TraversalDirection::Backward => -1,
        }
    }
}

impl TryFrom<i8> for TraversalDirection {
    type Error = UnknownTag;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Backward),
            other => Err(UnknownTag {
                kind: "traversal direction",
                tag: other.to_string(),
            }),
        }
    }
}
