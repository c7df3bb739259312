//! One full turn: the player's program, then the enemy counter-turn.
//!
//! A turn always resolves. Structural errors skip the player's program and
//! runtime faults end it early; in both cases the enemy still acts. When the
//! encounter does not end this turn, both combatants' behavior points go
//! back to what they were when the turn started and the turn is counted.

use codecrawl_items::transpile;
use codecrawl_types::GameState;

use crate::combat::enemy_damage;
use crate::error::GameError;
use crate::interpreter::{CombatContext, ExecutionFault, ValidationError, execute, pause, validate};
use crate::narration::{NarrationSink, Quiet, Transcript, say};
use crate::rewards::kill_reward;
use crate::run::{Presentation, RunResult, RunState};

/// How the turn left the encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnOutcome {
    /// Both sides are still standing.
    Continue,
    /// A regular enemy fell; a reward is presented.
    EnemyDefeated,
    /// The player fell. Terminal.
    GameOver,
    /// The boss fell. Terminal.
    Cleared,
}

impl TurnOutcome {
    /// Whether the run is over.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Cleared)
    }
}

/// What happened to the player's program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerPhase {
    /// Ran to the end.
    Completed,
    /// Skipped by validation.
    Rejected(ValidationError),
    /// Stopped by a runtime fault.
    Faulted(ExecutionFault),
}

/// The result of [`RunState::run_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Encounter outcome.
    pub outcome: TurnOutcome,
    /// Player phase result.
    pub player_phase: PlayerPhase,
    /// Narration produced this turn. Also appended to the run log.
    pub lines: Vec<String>,
}

impl RunState {
    /// Play one turn against the current enemy.
    ///
    /// Narration is collected into the report and the run log. Use
    /// [`RunState::run_turn_with`] to see it as it happens.
    ///
    /// # Errors
    ///
    /// Refuses to start while a presentation is open, outside battle and
    /// boss mode, after the run is over, or without a living enemy.
    pub async fn run_turn(&mut self) -> Result<TurnReport, GameError> {
        self.run_turn_with(&mut Quiet).await
    }

    /// Play one turn, forwarding each narration line to `sink` as it is
    /// spoken.
    ///
    /// The report and the run log still receive every line. The enemy
    /// stays in the run throughout, so dropping the future mid-turn leaves
    /// the encounter in place with whatever the program had already done.
    /// A dropped turn is not counted and its lines never reach the log.
    ///
    /// # Errors
    ///
    /// Same as [`RunState::run_turn`].
    pub async fn run_turn_with<S: NarrationSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<TurnReport, GameError> {
        match &self.presentation {
            Presentation::None => {}
            Presentation::Result(_) => return Err(GameError::RunOver),
            Presentation::Reward(_) | Presentation::Upgrade => {
                return Err(GameError::PresentationOpen);
            }
        }
        let state = self.progress.game_state;
        if !matches!(state, GameState::Battle | GameState::Boss) {
            return Err(GameError::WrongState {
                action: "run a turn",
                state,
            });
        }
        if self.player.is_defeated() {
            return Err(GameError::RunOver);
        }

        let pacing = self.config().pacing.clone();
        let Some(enemy) = self.enemy.as_mut().filter(|enemy| !enemy.is_defeated()) else {
            return Err(GameError::NoEncounter);
        };
        let player_bp = self.player.bp;
        let enemy_bp = enemy.bp;
        let mut transcript = Transcript::new(sink);
        tracing::info!(
            turn = self.stats.turn_count.saturating_add(1),
            items = self.program.len(),
            "turn started"
        );

        // Player phase
        say(&mut transcript, "Running code...");
        let program = transpile(&self.program);
        let player_phase = match validate(&program) {
            Err(error) => {
                self.stats.execution_failure_count =
                    self.stats.execution_failure_count.saturating_add(1);
                tracing::warn!(%error, "program rejected");
                say(&mut transcript, format!("Error: {error}"));
                PlayerPhase::Rejected(error)
            }
            Ok(()) => {
                let mut ctx = CombatContext {
                    player: &mut self.player,
                    enemy: &mut *enemy,
                    stats: &mut self.stats,
                };
                match execute(&program, &mut ctx, &pacing, &mut transcript).await {
                    Ok(()) => PlayerPhase::Completed,
                    Err(fault) => {
                        tracing::warn!(%fault, "program faulted");
                        say(&mut transcript, format!("Error: {fault}"));
                        PlayerPhase::Faulted(fault)
                    }
                }
            }
        };

        // Enemy counter-turn
        let outcome = if enemy.is_defeated() {
            say(&mut transcript, "Enemy Defeated!");
            if state == GameState::Boss {
                TurnOutcome::Cleared
            } else {
                TurnOutcome::EnemyDefeated
            }
        } else {
            say(&mut transcript, format!("Enemy Turn! BP: {}", enemy.bp));
            pause(pacing.enemy_delay()).await;
            let damage = enemy_damage(enemy);
            let taken = self.player.take_damage(damage);
            self.stats.total_damage_taken = self
                .stats
                .total_damage_taken
                .saturating_add(u64::from(taken));
            say(
                &mut transcript,
                format!("Enemy attacks {} times! Total Damage: {damage}", enemy.bp.max(0)),
            );
            if self.player.is_defeated() {
                say(&mut transcript, "You have been defeated...");
                TurnOutcome::GameOver
            } else {
                TurnOutcome::Continue
            }
        };

        match outcome {
            TurnOutcome::GameOver => self.presentation = Presentation::Result(RunResult::Over),
            TurnOutcome::Cleared => self.presentation = Presentation::Result(RunResult::Cleared),
            TurnOutcome::Continue | TurnOutcome::EnemyDefeated => {
                if outcome == TurnOutcome::EnemyDefeated {
                    let cycle = self.progress.cycle_count;
                    let rewards = self.config().rewards.clone();
                    let items = kill_reward(self.rng(), &rewards, cycle);
                    self.player.atk_type = None;
                    self.presentation = Presentation::Reward(items);
                }
                say(&mut transcript, "Turn End. Resetting BP.");
                self.player.bp = player_bp;
                if let Some(enemy) = self.enemy.as_mut() {
                    enemy.bp = enemy_bp;
                }
                self.stats.turn_count = self.stats.turn_count.saturating_add(1);
            }
        }

        tracing::info!(
            ?outcome,
            player_hp = self.player.hp,
            enemy_hp = self.enemy.as_ref().map_or(0, |e| e.hp),
            "turn resolved"
        );
        let lines = transcript.lines;
        self.log.extend_from_slice(&lines);
        Ok(TurnReport {
            outcome,
            player_phase,
            lines,
        })
    }
}
