//! Headless entry point for the codecrawl engine.
//!
//! Loads the game configuration, picks a run store, resumes the configured
//! user's in-progress run (or starts a new one), plays it with a scripted
//! driver and saves the result.
//!
//! ```text
//! codecrawl-config.yaml --> GameConfig --+
//!                                        +--> load_run --> autoplay --> save_run
//! DATABASE_URL? --> PgRunStore | Memory -+
//! ```

mod autoplay;
mod config;
mod error;

use anyhow::Context;
use codecrawl_core::{
    GameConfig, GameSession, LoadOutcome, MemoryRunStore, RunStore, load_run, save_run,
};
use codecrawl_db::PgRunStore;
use codecrawl_types::UserId;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::error::RunnerError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the database connection or the run
/// itself fails. A failed save is logged, not returned.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("codecrawl-runner starting");

    let runner = RunnerConfig::from_env()?;
    let game = load_game_config(&runner)
        .with_context(|| format!("loading {}", runner.config_path.display()))?;
    info!(
        config = %runner.config_path.display(),
        user = runner.user.as_ref().map_or("<anonymous>", UserId::as_str),
        turn_budget = runner.turn_budget,
        database = runner.use_database,
        "configuration loaded"
    );

    if runner.use_database {
        let store = connect_database(&game.infrastructure.postgres_url)
            .await
            .context("preparing PostgreSQL")?;
        drive(&store, &runner, game).await?;
        store.close().await;
    } else {
        drive(&MemoryRunStore::new(), &runner, game).await?;
    }

    Ok(())
}

fn load_game_config(runner: &RunnerConfig) -> Result<GameConfig, RunnerError> {
    if runner.config_path.exists() {
        Ok(GameConfig::from_file(&runner.config_path)?)
    } else {
        warn!(
            path = %runner.config_path.display(),
            "config file not found, using built-in defaults"
        );
        Ok(GameConfig::parse("")?)
    }
}

async fn connect_database(url: &str) -> Result<PgRunStore, RunnerError> {
    let store = PgRunStore::connect(url).await?;
    store.migrate().await?;
    info!("database ready");
    Ok(store)
}

async fn drive<S: RunStore>(
    store: &S,
    runner: &RunnerConfig,
    game: GameConfig,
) -> Result<(), RunnerError> {
    let rng = runner
        .seed
        .map_or_else(|| SmallRng::from_rng(&mut rand::rng()), SmallRng::seed_from_u64);
    let identity = runner.user.as_ref();

    let state = match load_run(store, identity, game, rng).await {
        LoadOutcome::Resumed(state) => {
            info!(cycle = state.progress.cycle_count, "resumed saved run");
            state
        }
        LoadOutcome::Fresh { state, error } => {
            if let Some(error) = error {
                warn!(%error, "could not load a saved run");
            }
            info!("started a new run");
            state
        }
    };

    let session = GameSession::new(*state);
    let summary = autoplay::play(&session, runner.turn_budget).await?;
    let state = session.into_inner();

    info!(
        status = %summary.status,
        turns = summary.turns,
        cycle = state.progress.cycle_count,
        battles = state.progress.battle_count,
        player_hp = state.player.hp,
        damage_dealt = state.stats.total_damage_dealt,
        damage_taken = state.stats.total_damage_taken,
        "run finished"
    );

    match save_run(store, identity, &state, summary.status).await {
        Ok(saved) => info!(run_id = %saved.id, "run saved"),
        Err(error) => warn!(%error, "run was not saved"),
    }
    Ok(())
}
