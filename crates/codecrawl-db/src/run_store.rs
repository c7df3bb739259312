//! Saved-run persistence on the `game_runs` table.
//!
//! Program, inventory, snapshot and play log are stored as JSONB in their
//! wire shapes. Snapshots are decoded through [`StoredStatsSnapshot`] so
//! rows written in the legacy flat shape migrate on read, and the legacy
//! `SAVED` status is read as in-progress.

use chrono::{DateTime, Utc};
use codecrawl_core::{RunStore, SaveRequest, StoreError};
use codecrawl_types::{
    GamePlayStats, NodeItem, RunId, RunStatus, SavedRun, StoredStatsSnapshot, UserId,
};
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use crate::error::DbError;

/// Pool size for one engine process.
const MAX_CONNECTIONS: u32 = 5;

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`RunStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    /// Create a store bound to an existing connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url` and bind a store to it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed and
    /// [`DbError::Postgres`] if no connection can be made.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::info!(max_connections = MAX_CONNECTIONS, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Create or update the `game_runs` table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("game_runs migrations applied");
        Ok(())
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// The most recent row for a user, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_row(&self, user_id: &UserId) -> Result<Option<GameRunRow>, DbError> {
        let row = sqlx::query_as::<_, GameRunRow>(
            r"SELECT id, user_id, cycle, program, inventory, stats_snapshot, play_log, status, saved_at
              FROM game_runs
              WHERE user_id = $1
              ORDER BY saved_at DESC
              LIMIT 1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Load the user's latest run if it is still in progress.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row cannot be decoded.
    pub async fn load_in_progress(&self, user_id: &UserId) -> Result<Option<SavedRun>, DbError> {
        let Some(row) = self.latest_row(user_id).await? else {
            return Ok(None);
        };
        let run = row.into_saved_run()?;
        if run.status == RunStatus::InProgress {
            tracing::debug!(run_id = %run.id, user = %user_id.as_str(), "Loaded in-progress run");
            Ok(Some(run))
        } else {
            Ok(None)
        }
    }

    /// Replace the user's in-progress row, or insert one.
    ///
    /// In-progress saves are a single upsert against the partial unique
    /// index on open rows, so concurrent first saves for a user land in
    /// one row. Finalizing flips the open row's status in place and only
    /// inserts a finished row when the user has none open.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if encoding or a statement fails. Nothing is
    /// written in that case.
    pub async fn save(&self, request: SaveRequest) -> Result<SavedRun, DbError> {
        let program = serde_json::to_value(&request.program)?;
        let inventory = serde_json::to_value(&request.inventory)?;
        let snapshot = serde_json::to_value(&request.stats_snapshot)?;
        let play_log = serde_json::to_value(&request.play_log)?;
        let cycle = i32::try_from(request.cycle).unwrap_or(i32::MAX);
        let saved_at = Utc::now();
        let candidate = RunId::new();

        let mut tx = self.pool.begin().await?;

        let finalized: Option<Uuid> = if request.status.is_final() {
            sqlx::query_scalar(FINALIZE_OPEN_RUN)
                .bind(request.user_id.as_str())
                .bind(cycle)
                .bind(&program)
                .bind(&inventory)
                .bind(&snapshot)
                .bind(&play_log)
                .bind(request.status.as_str())
                .bind(saved_at)
                .fetch_optional(&mut *tx)
                .await?
        } else {
            None
        };

        let id = match finalized {
            Some(id) => id,
            None => {
                sqlx::query_scalar(UPSERT_OPEN_RUN)
                    .bind(candidate.into_inner())
                    .bind(request.user_id.as_str())
                    .bind(cycle)
                    .bind(&program)
                    .bind(&inventory)
                    .bind(&snapshot)
                    .bind(&play_log)
                    .bind(request.status.as_str())
                    .bind(saved_at)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;
        let id = RunId::from(id);

        tracing::debug!(
            run_id = %id,
            replaced = id != candidate,
            status = %request.status,
            "Saved run"
        );

        Ok(SavedRun {
            id,
            user_id: request.user_id,
            cycle: request.cycle,
            program: request.program,
            inventory: request.inventory,
            stats_snapshot: request.stats_snapshot,
            play_log: request.play_log,
            status: request.status,
            saved_at,
        })
    }
}

/// Insert a run, or overwrite the user's open row in place.
///
/// The conflict target matches `idx_game_runs_one_open`. A finished row
/// falls outside that index and is always inserted.
const UPSERT_OPEN_RUN: &str = r"
INSERT INTO game_runs
    (id, user_id, cycle, program, inventory, stats_snapshot, play_log, status, saved_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (user_id) WHERE status IN ('IN_PROGRESS', 'SAVED')
DO UPDATE SET
    cycle = EXCLUDED.cycle,
    program = EXCLUDED.program,
    inventory = EXCLUDED.inventory,
    stats_snapshot = EXCLUDED.stats_snapshot,
    play_log = EXCLUDED.play_log,
    status = EXCLUDED.status,
    saved_at = EXCLUDED.saved_at
RETURNING id";

/// Close the user's open row with a final status.
const FINALIZE_OPEN_RUN: &str = r"
UPDATE game_runs
SET cycle = $2, program = $3, inventory = $4, stats_snapshot = $5,
    play_log = $6, status = $7, saved_at = $8
WHERE user_id = $1 AND status IN ('IN_PROGRESS', 'SAVED')
RETURNING id";

impl RunStore for PgRunStore {
    async fn load_latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SavedRun>, StoreError> {
        self.load_in_progress(user_id).await.map_err(StoreError::from)
    }

    async fn save_run(&self, request: SaveRequest) -> Result<SavedRun, StoreError> {
        self.save(request).await.map_err(StoreError::from)
    }
}

/// A row from the `game_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRunRow {
    /// Record id.
    pub id: Uuid,
    /// Owner.
    pub user_id: String,
    /// Cycle at save time.
    pub cycle: i32,
    /// Program items (JSON array).
    pub program: serde_json::Value,
    /// Inventory items (JSON array).
    pub inventory: serde_json::Value,
    /// Player and progress, structured or legacy shape.
    pub stats_snapshot: serde_json::Value,
    /// Cumulative play statistics.
    pub play_log: serde_json::Value,
    /// Status tag.
    pub status: String,
    /// Last write time.
    pub saved_at: DateTime<Utc>,
}

impl GameRunRow {
    /// Decode into a [`SavedRun`], migrating legacy shapes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] for malformed JSON columns and
    /// [`DbError::Corrupt`] for an unknown status or negative cycle.
    pub fn into_saved_run(self) -> Result<SavedRun, DbError> {
        let status: RunStatus = self
            .status
            .parse::<RunStatus>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;
        let cycle = u32::try_from(self.cycle)
            .map_err(|_negative| DbError::Corrupt(format!("negative cycle {}", self.cycle)))?;
        let program: Vec<NodeItem> = serde_json::from_value(self.program)?;
        let inventory: Vec<NodeItem> = serde_json::from_value(self.inventory)?;
        let stats_snapshot =
            serde_json::from_value::<StoredStatsSnapshot>(self.stats_snapshot)?.migrate();
        let play_log: GamePlayStats = serde_json::from_value(self.play_log)?;

        Ok(SavedRun {
            id: RunId::from(self.id),
            user_id: UserId::new(self.user_id),
            cycle,
            program,
            inventory,
            stats_snapshot,
            play_log,
            status,
            saved_at: self.saved_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use codecrawl_types::{Entity, GameState};

    use super::*;

    fn row(status: &str, snapshot: serde_json::Value) -> GameRunRow {
        GameRunRow {
            id: Uuid::now_v7(),
            user_id: "user-1".to_owned(),
            cycle: 2,
            program: serde_json::json!([{ "id": "a", "label": "atk()", "type": "attack" }]),
            inventory: serde_json::json!([]),
            stats_snapshot: snapshot,
            play_log: serde_json::json!({ "turnCount": 7 }),
            status: status.to_owned(),
            saved_at: Utc::now(),
        }
    }

    fn structured() -> serde_json::Value {
        serde_json::json!({
            "player": { "hp": 50, "maxHp": 120, "atk": 20, "bp": 10, "maxBp": 10 },
            "progress": {
                "battleCount": 4, "currentEventIndex": 3, "gameState": "BATTLE",
                "events": ["select", "battle", "reward", "battle", "shop", "battle", "reward", "battle"],
                "cycleCount": 2, "traversalDirection": -1
            }
        })
    }

    #[test]
    fn legacy_saved_status_reads_as_in_progress() {
        let run = row("SAVED", structured()).into_saved_run().unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert_eq!(run.play_log.turn_count, 7);
        assert_eq!(run.program.first().map(|i| i.label.as_str()), Some("atk()"));
    }

    #[test]
    fn legacy_flat_snapshot_migrates() {
        let flat = serde_json::json!({
            "hp": 50, "maxHp": 120, "atk": 20, "bp": 10, "maxBp": 10,
            "progress": {
                "battleCount": 4, "currentEventIndex": 3, "gameState": "BATTLE",
                "events": ["select", "battle"], "cycleCount": 2
            }
        });
        let run = row("IN_PROGRESS", flat).into_saved_run().unwrap();
        let mut player = Entity::new(120, 20, 10);
        player.hp = 50;
        assert_eq!(run.stats_snapshot.player, player);
        assert_eq!(
            run.stats_snapshot.progress.map(|p| p.game_state),
            Some(GameState::Battle)
        );
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let result = row("PAUSED", structured()).into_saved_run();
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let mut bad = row("COMPLETED", structured());
        bad.program = serde_json::json!({ "not": "a list" });
        assert!(matches!(bad.into_saved_run(), Err(DbError::Serialization(_))));
    }

    #[tokio::test]
    async fn unparseable_url_is_a_config_error() {
        let result = PgRunStore::connect("not a database url").await;
        assert!(matches!(result, Err(DbError::Config(_))));
    }
}
