//! Item cards: the resolved [`ItemKind`] and the placeable [`NodeItem`].

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Element, ItemType};

/// A resolved item, carrying its own typed parameters.
///
/// Every kind renders back to the label it was parsed from, so the label is
/// only needed for display and for resolving items loaded from old saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// `n=X` -- assign the loop counter.
    AssignCounter {
        /// New counter value.
        value: u32,
    },
    /// `n.times do` -- repeat the enclosed block `n` times.
    RepeatCounter,
    /// `atk()` -- attack the enemy.
    Attack,
    /// `atk+=X` -- raise attack power.
    AtkUp {
        /// Attack power gained.
        value: u32,
    },
    /// `end` -- close the innermost block.
    End,
    /// `bp+=X` -- gain behavior points.
    BpUp {
        /// Behavior points gained.
        value: u32,
    },
    /// `hp+=X` -- heal.
    Heal {
        /// Hit points restored.
        value: u32,
    },
    /// `enemyType=searchEnemyTypes()` -- read the enemy's element.
    SenseEnemyType,
    /// `if enemyType=T` -- run the block only against the given element.
    IfEnemyType {
        /// Element compared against the sensed enemy type.
        element: Element,
    },
    /// `atkType=T` -- declare the player's attack element.
    SetAtkType {
        /// Element to attack with.
        element: Element,
    },
}

impl ItemKind {
    /// The visual category shown on the card.
    pub const fn item_type(self) -> ItemType {
        match self {
            Self::Attack | Self::AtkUp { .. } | Self::SetAtkType { .. } => ItemType::Attack,
            Self::Heal { .. } => ItemType::Heal,
            Self::BpUp { .. } => ItemType::Behavior,
            Self::SenseEnemyType => ItemType::Element,
            Self::AssignCounter { .. }
            | Self::RepeatCounter
            | Self::End
            | Self::IfEnemyType { .. } => ItemType::Syntax,
        }
    }

    /// Whether this item opens a block that must be closed by `end`.
    pub const fn opens_block(self) -> bool {
        matches!(self, Self::RepeatCounter | Self::IfEnemyType { .. })
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssignCounter { value } => write!(f, "n={value}"),
            Self::RepeatCounter => f.write_str("n.times do"),
            Self::Attack => f.write_str("atk()"),
            Self::AtkUp { value } => write!(f, "atk+={value}"),
            Self::End => f.write_str("end"),
            Self::BpUp { value } => write!(f, "bp+={value}"),
            Self::Heal { value } => write!(f, "hp+={value}"),
            Self::SenseEnemyType => f.write_str("enemyType=searchEnemyTypes()"),
            Self::IfEnemyType { element } => write!(f, "if enemyType={element}"),
            Self::SetAtkType { element } => write!(f, "atkType={element}"),
        }
    }
}

/// An item card held in the program, the inventory, or the shop.
///
/// `id` is unique within its owning container. Items move between
/// containers by value; no two containers share one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodeItem {
    /// Ownership key within the container.
    pub id: String,
    /// Display label, e.g. `atk+=2`.
    pub label: String,
    /// Visual category.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Raw instruction text carried by legacy items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub code: Option<String>,
    /// Resolved kind. Not persisted; re-derived from the label on load.
    #[serde(skip)]
    #[ts(skip)]
    pub kind: Option<ItemKind>,
}

impl NodeItem {
    /// Create an item from a resolved kind.
    pub fn new(id: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            label: kind.to_string(),
            item_type: kind.item_type(),
            code: None,
            kind: Some(kind),
        }
    }

    /// Create an unresolved item that only carries raw instruction text.
    pub fn opaque(
        id: impl Into<String>,
        label: impl Into<String>,
        item_type: ItemType,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            item_type,
            code: Some(code.into()),
            kind: None,
        }
    }
}
