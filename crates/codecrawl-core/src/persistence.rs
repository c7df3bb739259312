//! Persistence contract and the save/load orchestration around it.
//!
//! A user has at most one in-progress run record. Saving as in-progress
//! replaces that record in place; finalizing flips its status instead of
//! writing a second record. Nothing is persisted without an authenticated
//! identity.
//!
//! [`RunStore`] is implemented here by [`MemoryRunStore`] for tests and
//! local play, and by the `PostgreSQL` store in `codecrawl-db`.

use std::future::Future;

use chrono::Utc;
use codecrawl_items::hydrate;
use codecrawl_types::{
    GamePlayStats, GameState, NodeItem, RunId, RunStatus, SavedRun, StatsSnapshot, UserId,
};
use rand::rngs::SmallRng;
use tokio::sync::Mutex;

use crate::config::GameConfig;
use crate::progression::Progression;
use crate::run::RunState;

/// Errors reported by a [`RunStore`] or the orchestration around it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No authenticated identity was supplied.
    #[error("persistence requires an authenticated user")]
    Unauthenticated,

    /// The backing store failed.
    #[error("store backend error: {message}")]
    Backend {
        /// Backend error text.
        message: String,
    },

    /// A stored record could not be decoded.
    #[error("stored run is corrupt: {reason}")]
    Corrupt {
        /// What was wrong with it.
        reason: String,
    },
}

/// Everything written by one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Owner.
    pub user_id: UserId,
    /// Cycle at the time of saving.
    pub cycle: u32,
    /// Program items in execution order.
    pub program: Vec<NodeItem>,
    /// Held items.
    pub inventory: Vec<NodeItem>,
    /// Player and map progress.
    pub stats_snapshot: StatsSnapshot,
    /// Cumulative play statistics.
    pub play_log: GamePlayStats,
    /// Status to write.
    pub status: RunStatus,
}

/// Storage for saved runs.
pub trait RunStore: Send + Sync {
    /// The user's most recent record, only if it is still in progress.
    fn load_latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<SavedRun>, StoreError>> + Send;

    /// Replace the user's in-progress record, or create one if none exists.
    ///
    /// Must apply all of the request or none of it.
    fn save_run(
        &self,
        request: SaveRequest,
    ) -> impl Future<Output = Result<SavedRun, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`RunStore`] backed by a vector. Records are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    records: Mutex<Vec<SavedRun>>,
}

impl MemoryRunStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, oldest first.
    pub async fn records(&self) -> Vec<SavedRun> {
        self.records.lock().await.clone()
    }

    /// Insert a record as-is, bypassing the replace rule.
    pub async fn insert(&self, record: SavedRun) {
        self.records.lock().await.push(record);
    }
}

impl RunStore for MemoryRunStore {
    async fn load_latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SavedRun>, StoreError> {
        let records = self.records.lock().await;
        let latest = records
            .iter()
            .filter(|record| record.user_id == *user_id)
            .max_by_key(|record| record.saved_at);
        Ok(latest
            .filter(|record| record.status == RunStatus::InProgress)
            .cloned())
    }

    async fn save_run(&self, request: SaveRequest) -> Result<SavedRun, StoreError> {
        let mut records = self.records.lock().await;
        let existing = records.iter_mut().find(|record| {
            record.user_id == request.user_id && record.status == RunStatus::InProgress
        });
        let id = existing.as_ref().map_or_else(RunId::new, |record| record.id);
        let saved = SavedRun {
            id,
            user_id: request.user_id,
            cycle: request.cycle,
            program: request.program,
            inventory: request.inventory,
            stats_snapshot: request.stats_snapshot,
            play_log: request.play_log,
            status: request.status,
            saved_at: Utc::now(),
        };
        match existing {
            Some(record) => *record = saved.clone(),
            None => records.push(saved.clone()),
        }
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

impl RunState {
    /// Build the save request for this run.
    pub fn save_request(&self, user_id: UserId, status: RunStatus) -> SaveRequest {
        SaveRequest {
            user_id,
            cycle: self.progress.cycle_count,
            program: self.program.clone(),
            inventory: self.inventory.clone(),
            stats_snapshot: StatsSnapshot {
                player: self.player.clone(),
                progress: Some(self.progress.snapshot()),
            },
            play_log: self.stats.clone(),
            status,
        }
    }

    /// Rebuild a run from a saved record.
    ///
    /// Items are re-resolved from their labels. The current slot is
    /// re-entered, since encounters themselves are not saved.
    pub fn from_saved(config: GameConfig, rng: SmallRng, record: SavedRun) -> Self {
        let mut state = Self::new(config, rng);
        let max_cycles = state.config().map.max_cycles;
        state.program = record.program.into_iter().map(hydrate).collect();
        state.inventory = record.inventory.into_iter().map(hydrate).collect();
        state.player = record.stats_snapshot.player;
        state.stats = record.play_log;
        state.progress = record.stats_snapshot.progress.map_or_else(
            || Progression::new(max_cycles),
            |progress| Progression::restore(progress, max_cycles),
        );
        if state.progress.game_state != GameState::Map {
            state.resume_encounter();
        }
        state
    }
}

/// Result of [`load_run`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// An in-progress run was restored.
    Resumed(Box<RunState>),
    /// A new run was started.
    Fresh {
        /// The new run.
        state: Box<RunState>,
        /// Why loading failed, if it did. Absent when there was simply
        /// nothing to resume.
        error: Option<StoreError>,
    },
}

impl LoadOutcome {
    /// The run to play, resumed or fresh.
    pub fn into_state(self) -> RunState {
        match self {
            Self::Resumed(state) | Self::Fresh { state, .. } => *state,
        }
    }
}

/// Save a run for the signed-in user.
///
/// # Errors
///
/// Returns [`StoreError::Unauthenticated`] without touching the store when
/// `identity` is `None`, or the store's error. The in-memory run is never
/// modified.
pub async fn save_run<S: RunStore>(
    store: &S,
    identity: Option<&UserId>,
    state: &RunState,
    status: RunStatus,
) -> Result<SavedRun, StoreError> {
    let user_id = identity.ok_or(StoreError::Unauthenticated)?;
    let request = state.save_request(user_id.clone(), status);
    match store.save_run(request).await {
        Ok(saved) => {
            tracing::info!(
                run_id = %saved.id,
                user = %user_id.as_str(),
                %status,
                cycle = saved.cycle,
                "run saved"
            );
            Ok(saved)
        }
        Err(error) => {
            tracing::error!(%error, user = %user_id.as_str(), "failed to save run");
            Err(error)
        }
    }
}

/// Resume the user's in-progress run, or start fresh.
///
/// Any failure falls back to a fresh run and is reported in the outcome.
pub async fn load_run<S: RunStore>(
    store: &S,
    identity: Option<&UserId>,
    config: GameConfig,
    rng: SmallRng,
) -> LoadOutcome {
    let Some(user_id) = identity else {
        return LoadOutcome::Fresh {
            state: Box::new(RunState::new(config, rng)),
            error: Some(StoreError::Unauthenticated),
        };
    };
    match store.load_latest_in_progress(user_id).await {
        Ok(Some(record)) => {
            tracing::info!(
                run_id = %record.id,
                user = %user_id.as_str(),
                cycle = record.cycle,
                "resuming run"
            );
            LoadOutcome::Resumed(Box::new(RunState::from_saved(config, rng, record)))
        }
        Ok(None) => {
            tracing::info!(user = %user_id.as_str(), "no run in progress, starting fresh");
            LoadOutcome::Fresh {
                state: Box::new(RunState::new(config, rng)),
                error: None,
            }
        }
        Err(error) => {
            tracing::warn!(%error, user = %user_id.as_str(), "failed to load run, starting fresh");
            LoadOutcome::Fresh {
                state: Box::new(RunState::new(config, rng)),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use codecrawl_types::{
        Element, EventKind, ItemKind, StoredStatsSnapshot, TraversalDirection,
    };
    use rand::SeedableRng;

    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(21)
    }

    fn user() -> UserId {
        UserId::new("user-1")
    }

    fn played() -> RunState {
        let mut state = RunState::new(GameConfig::default(), rng());
        state.choose_direction(TraversalDirection::Backward).unwrap();
        state.player.hp = 77;
        state.player.atk = 23;
        state.player.atk_type = Some(Element::Grass);
        state.place_item(2).unwrap();
        state.stats.turn_count = 4;
        state
    }

    /// A store that always fails.
    struct BrokenStore;

    impl RunStore for BrokenStore {
        async fn load_latest_in_progress(
            &self,
            _: &UserId,
        ) -> Result<Option<SavedRun>, StoreError> {
            Err(StoreError::Backend {
                message: "connection refused".to_owned(),
            })
        }

        async fn save_run(&self, _: SaveRequest) -> Result<SavedRun, StoreError> {
            Err(StoreError::Backend {
                message: "connection refused".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn save_then_load_reproduces_the_run() {
        let store = MemoryRunStore::new();
        let state = played();
        save_run(&store, Some(&user()), &state, RunStatus::InProgress)
            .await
            .unwrap();

        let outcome = load_run(&store, Some(&user()), GameConfig::default(), rng()).await;
        assert!(matches!(outcome, LoadOutcome::Resumed(_)));
        let loaded = outcome.into_state();
        assert_eq!(loaded.program, state.program);
        assert_eq!(loaded.inventory, state.inventory);
        assert_eq!(loaded.player, state.player);
        assert_eq!(loaded.progress.snapshot(), state.progress.snapshot());
        assert_eq!(loaded.stats, state.stats);
        assert!(loaded.program.iter().all(|item| item.kind.is_some()));
        assert!(loaded.living_enemy().is_some());
    }

    #[tokio::test]
    async fn in_progress_saves_replace_and_finalizing_flips_status() {
        let store = MemoryRunStore::new();
        let mut state = played();
        let first = save_run(&store, Some(&user()), &state, RunStatus::InProgress)
            .await
            .unwrap();
        state.stats.turn_count = 9;
        let second = save_run(&store, Some(&user()), &state, RunStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.records().await.len(), 1);

        let last = save_run(&store, Some(&user()), &state, RunStatus::GameOver)
            .await
            .unwrap();
        assert_eq!(last.id, first.id);
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().map(|r| r.status), Some(RunStatus::GameOver));

        let outcome = load_run(&store, Some(&user()), GameConfig::default(), rng()).await;
        assert!(matches!(outcome, LoadOutcome::Fresh { error: None, .. }));

        save_run(&store, Some(&user()), &state, RunStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn anonymous_runs_are_never_persisted() {
        let store = MemoryRunStore::new();
        let state = played();
        assert_eq!(
            save_run(&store, None, &state, RunStatus::InProgress).await,
            Err(StoreError::Unauthenticated)
        );
        assert!(store.records().await.is_empty());

        let outcome = load_run(&store, None, GameConfig::default(), rng()).await;
        assert!(matches!(
            outcome,
            LoadOutcome::Fresh {
                error: Some(StoreError::Unauthenticated),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn load_failure_starts_fresh_and_reports() {
        let outcome = load_run(&BrokenStore, Some(&user()), GameConfig::default(), rng()).await;
        assert!(matches!(
            &outcome,
            LoadOutcome::Fresh {
                error: Some(StoreError::Backend { .. }),
                ..
            }
        ));
        assert_eq!(outcome.into_state().progress.game_state, GameState::Map);

        let run = played();
        let result = save_run(&BrokenStore, Some(&user()), &run, RunStatus::InProgress).await;
        assert!(result.is_err());
        assert_eq!(run.stats.turn_count, 4);
    }

    #[tokio::test]
    async fn legacy_snapshot_records_resume() {
        let legacy = serde_json::json!({
            "hp": 64, "maxHp": 120, "atk": 21, "bp": 10, "maxBp": 10,
            "progress": {
                "battleCount": 5, "currentEventIndex": 4, "gameState": "SHOP",
                "events": ["select", "battle", "reward", "battle", "shop", "battle", "reward", "battle"],
                "cycleCount": 2
            }
        });
        let snapshot = serde_json::from_value::<StoredStatsSnapshot>(legacy)
            .unwrap()
            .migrate();
        let store = MemoryRunStore::new();
        store
            .insert(SavedRun {
                id: RunId::new(),
                user_id: user(),
                cycle: 2,
                program: vec![NodeItem::opaque(
                    "old-1",
                    "atk+=2",
                    codecrawl_types::ItemType::Attack,
                    "atk_inc(2);",
                )],
                inventory: Vec::new(),
                stats_snapshot: snapshot,
                play_log: GamePlayStats::default(),
                status: RunStatus::InProgress,
                saved_at: Utc::now(),
            })
            .await;

        let state = load_run(&store, Some(&user()), GameConfig::default(), rng())
            .await
            .into_state();
        assert_eq!(state.player.hp, 64);
        assert_eq!(state.progress.cycle_count, 2);
        assert_eq!(state.progress.game_state, GameState::Shop);
        assert_eq!(state.progress.current_event(), Some(EventKind::Shop));
        assert_eq!(state.progress.direction, Some(TraversalDirection::Forward));
        assert_eq!(state.shop.stock.len(), 6);
        assert_eq!(
            state.program.first().and_then(|item| item.kind),
            Some(ItemKind::AtkUp { value: 2 })
        );
    }
}
