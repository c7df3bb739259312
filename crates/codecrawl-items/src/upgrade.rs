//! Item upgrade table.
//!
//! Stat items step up one level at a time: `+=1` becomes `+=2`, `+=2`
//! becomes `+=3`. `+=3` is the ceiling and everything else is final.

use codecrawl_types::{ItemKind, NodeItem};

use crate::error::ParseError;

/// Highest value reachable through upgrades.
pub const MAX_UPGRADE_VALUE: u32 = 3;

/// The next level of an item kind, if it has one.
pub const fn upgraded(kind: ItemKind) -> Option<ItemKind> {
    match kind {
        ItemKind::AtkUp { value } if value < MAX_UPGRADE_VALUE => Some(ItemKind::AtkUp {
            value: value.saturating_add(1),
        }),
        ItemKind::Heal { value } if value < MAX_UPGRADE_VALUE => Some(ItemKind::Heal {
            value: value.saturating_add(1),
        }),
        ItemKind::BpUp { value } if value < MAX_UPGRADE_VALUE => Some(ItemKind::BpUp {
            value: value.saturating_add(1),
        }),
        _ => None,
    }
}

/// Whether an item can be upgraded.
pub fn is_upgradable(item: &NodeItem) -> bool {
    item.kind.and_then(upgraded).is_some()
}

/// Produce the upgraded replacement for an item under a new id.
///
/// # Errors
///
/// Returns [`ParseError::NotUpgradable`] if the item has no next level.
pub fn upgrade_item(item: &NodeItem, new_id: impl Into<String>) -> Result<NodeItem, ParseError> {
    item.kind
        .and_then(upgraded)
        .map(|kind| NodeItem::new(new_id, kind))
        .ok_or_else(|| ParseError::NotUpgradable {
            label: item.label.clone(),
        })
}
