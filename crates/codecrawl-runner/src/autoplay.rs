//! Scripted play of a single run.
//!
//! The driver walks the track forward, takes every reward, upgrades the
//! first eligible item, walks straight through shops and fights every
//! encounter with whatever straight-line items it holds.

use codecrawl_core::run::{Presentation, RunResult};
use codecrawl_core::{GameSession, RunState, TurnOutcome};
use codecrawl_types::{GameState, ItemKind, RunStatus, TraversalDirection};

use crate::error::RunnerError;

/// Actions allowed per turn budgeted, so a stuck run still terminates.
const ACTIONS_PER_TURN: u32 = 8;

/// How the scripted run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaySummary {
    /// Status to save the run with.
    pub status: RunStatus,
    /// Turns played by this driver.
    pub turns: u32,
}

/// Play until the run ends or the turn budget is spent.
pub async fn play(session: &GameSession, turn_budget: u32) -> Result<PlaySummary, RunnerError> {
    let mut turns = 0_u32;
    let mut actions = 0_u32;
    let action_budget = turn_budget.saturating_mul(ACTIONS_PER_TURN);

    while turns < turn_budget && actions < action_budget {
        actions = actions.saturating_add(1);
        if let Some(status) = session.with_state(step_between_turns).await? {
            return Ok(PlaySummary { status, turns });
        }
        let fighting = session
            .with_state(|state| {
                matches!(state.progress.game_state, GameState::Battle | GameState::Boss)
                    && state.presentation == Presentation::None
                    && state.living_enemy().is_some()
            })
            .await;
        if !fighting {
            continue;
        }

        let report = session.run_turn().await?;
        turns = turns.saturating_add(1);
        tracing::debug!(turn = turns, outcome = ?report.outcome, "turn played");
        if report.outcome.is_terminal() {
            let status = if report.outcome == TurnOutcome::Cleared {
                RunStatus::Completed
            } else {
                RunStatus::GameOver
            };
            return Ok(PlaySummary { status, turns });
        }
    }

    Ok(PlaySummary {
        status: RunStatus::InProgress,
        turns,
    })
}

/// Resolve whatever stands between the player and the next turn.
///
/// Returns the final status when the run is already over.
fn step_between_turns(state: &mut RunState) -> Result<Option<RunStatus>, RunnerError> {
    match &state.presentation {
        Presentation::Result(RunResult::Cleared) => return Ok(Some(RunStatus::Completed)),
        Presentation::Result(RunResult::Over) => return Ok(Some(RunStatus::GameOver)),
        Presentation::Reward(_) => {
            state.dismiss_reward()?;
            return Ok(None);
        }
        Presentation::Upgrade => {
            let target = state
                .upgradable_items()
                .first()
                .map(|(source, item)| (*source, item.id.clone()));
            match target {
                Some((source, id)) => state.apply_upgrade(source, &id)?,
                None => state.skip_upgrade()?,
            };
            return Ok(None);
        }
        Presentation::None => {}
    }

    match state.progress.game_state {
        GameState::Start | GameState::Map => {
            state.choose_direction(TraversalDirection::Forward)?;
        }
        GameState::Shop => {
            state.leave_shop()?;
        }
        GameState::Battle | GameState::Boss => {
            if state.living_enemy().is_some() {
                arrange_program(state)?;
            } else {
                state.continue_journey()?;
            }
        }
    }
    Ok(None)
}

/// Move straight-line combat items from the inventory into the program.
///
/// Block openers and closers stay in the inventory so the program always
/// validates.
fn arrange_program(state: &mut RunState) -> Result<(), RunnerError> {
    if state.is_editing_locked() {
        return Ok(());
    }
    while let Some(index) = state.inventory.iter().position(|item| {
        matches!(
            item.kind,
            Some(
                ItemKind::Attack
                    | ItemKind::AtkUp { .. }
                    | ItemKind::Heal { .. }
                    | ItemKind::BpUp { .. }
                    | ItemKind::SetAtkType { .. }
            )
        )
    }) {
        state.place_item(index)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use codecrawl_core::GameConfig;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn session(seed: u64) -> GameSession {
        let config = GameConfig::default().without_pacing();
        GameSession::new(RunState::new(config, SmallRng::seed_from_u64(seed)))
    }

    #[tokio::test]
    async fn scripted_run_respects_the_turn_budget() {
        let session = session(4);
        let summary = play(&session, 5).await.unwrap();
        assert!(summary.turns <= 5);
        let state = session.into_inner();
        assert!(state.progress.direction.is_some());
        assert!(state.program.iter().any(|item| item.kind == Some(ItemKind::Attack)));
    }

    #[tokio::test]
    async fn scripted_runs_reach_an_ending_or_stop_in_progress() {
        for seed in 0..4 {
            let session = session(seed);
            let summary = play(&session, 400).await.unwrap();
            let state = session.into_inner();
            match summary.status {
                RunStatus::GameOver => assert!(state.player.is_defeated()),
                RunStatus::Completed => {
                    assert_eq!(state.progress.game_state, GameState::Boss);
                }
                RunStatus::InProgress => assert!(summary.turns <= 400),
            }
        }
    }

    #[test]
    fn arranging_keeps_blocks_out_of_the_program() {
        let mut state = RunState::new(GameConfig::default(), SmallRng::seed_from_u64(1));
        arrange_program(&mut state).unwrap();
        let labels: Vec<&str> = state.program.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["n=5", "atk()", "atk+=1", "hp+=1", "bp+=1"]);
        assert_eq!(state.inventory.len(), 2);
    }
}
