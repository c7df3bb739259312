//! Persisted run shapes.
//!
//! A saved run stores the player's program and inventory, a stats snapshot
//! (player entity plus map progress) and the cumulative play log. Older
//! records stored the snapshot as the bare player entity with `progress`
//! attached at the top level; [`StoredStatsSnapshot`] accepts both shapes
//! and [`StoredStatsSnapshot::migrate`] normalizes them once at load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventKind, GameState, RunStatus, TraversalDirection};
use crate::ids::{RunId, UserId};
use crate::items::NodeItem;
use crate::structs::{Entity, GamePlayStats};

/// Map progress at the moment of saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ProgressSnapshot {
    /// Enemies spawned so far in the run.
    pub battle_count: u32,
    /// Current slot on the event track, `-1` while fighting the boss.
    pub current_event_index: i32,
    /// Top-level mode.
    pub game_state: GameState,
    /// The event track of the current cycle.
    pub events: Vec<EventKind>,
    /// Current cycle (1-based).
    pub cycle_count: u32,
    /// Chosen traversal direction. Absent in records written before it was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "1 | -1 | null")]
    pub traversal_direction: Option<TraversalDirection>,
}

/// Current snapshot shape: player nested under `player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatsSnapshot {
    /// Player entity.
    pub player: Entity,
    /// Map progress, absent for runs saved before leaving the map.
    #[serde(default)]
    pub progress: Option<ProgressSnapshot>,
}

/// Legacy snapshot shape: the player entity itself with progress attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyStatsSnapshot {
    /// Player entity fields, flattened to the top level.
    #[serde(flatten)]
    pub player: Entity,
    /// Map progress.
    #[serde(default)]
    pub progress: Option<ProgressSnapshot>,
}

/// Any snapshot shape that may be found in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredStatsSnapshot {
    /// `{ "player": {..}, "progress": {..} }`
    Structured(StatsSnapshot),
    /// `{ "hp": .., "maxHp": .., "progress": {..} }`
    Legacy(LegacyStatsSnapshot),
}

impl StoredStatsSnapshot {
    /// Normalize to the current shape.
    pub fn migrate(self) -> StatsSnapshot {
        match self {
            Self::Structured(snapshot) => snapshot,
            Self::Legacy(LegacyStatsSnapshot { player, progress }) => {
                StatsSnapshot { player, progress }
            }
        }
    }
}

/// A persisted run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SavedRun {
    /// Record id.
    pub id: RunId,
    /// Owner.
    pub user_id: UserId,
    /// Cycle the run was in when saved.
    pub cycle: u32,
    /// Program items in execution order.
    pub program: Vec<NodeItem>,
    /// Held items.
    pub inventory: Vec<NodeItem>,
    /// Player and progress.
    pub stats_snapshot: StatsSnapshot,
    /// Cumulative play statistics.
    pub play_log: GamePlayStats,
    /// Record status.
    pub status: RunStatus,
    /// Last write time.
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Element;

    fn progress() -> ProgressSnapshot {
        ProgressSnapshot {
            battle_count: 3,
            current_event_index: 4,
            game_state: GameState::Shop,
            events: vec![EventKind::Select, EventKind::Battle, EventKind::Shop],
            cycle_count: 2,
            traversal_direction: None,
        }
    }

    #[test]
    fn structured_shape_is_preferred() {
        let snapshot = StatsSnapshot {
            player: Entity::new(120, 20, 10),
            progress: Some(progress()),
        };
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        let stored: Option<StoredStatsSnapshot> = serde_json::from_str(&json).ok();
        assert!(matches!(stored, Some(StoredStatsSnapshot::Structured(_))));
        assert_eq!(stored.map(StoredStatsSnapshot::migrate), Some(snapshot));
    }

    #[test]
    fn legacy_shape_migrates_to_structured() {
        let json = serde_json::json!({
            "hp": 90, "maxHp": 120, "atk": 22, "bp": 10, "maxBp": 10, "atkType": "fire",
            "progress": {
                "battleCount": 3, "currentEventIndex": 4, "gameState": "SHOP",
                "events": ["select", "battle", "shop"], "cycleCount": 2
            }
        });
        let stored: Option<StoredStatsSnapshot> = serde_json::from_value(json).ok();
        assert!(matches!(stored, Some(StoredStatsSnapshot::Legacy(_))));

        let migrated = stored.map(StoredStatsSnapshot::migrate);
        let mut player = Entity::new(120, 22, 10);
        player.hp = 90;
        player.atk_type = Some(Element::Fire);
        assert_eq!(
            migrated,
            Some(StatsSnapshot {
                player,
                progress: Some(progress()),
            })
        );
    }

    #[test]
    fn direction_is_written_as_signed_step() {
        let mut snapshot = progress();
        snapshot.traversal_direction = Some(TraversalDirection::Backward);
        let json = serde_json::to_value(&snapshot).unwrap_or_default();
        assert_eq!(json.get("traversalDirection"), Some(&serde_json::json!(-1)));
    }
}
