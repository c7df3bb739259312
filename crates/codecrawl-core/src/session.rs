//! Shared access to a run with an in-flight turn guard.
//!
//! A turn holds the run for its whole duration, pacing delays included. A
//! second request while one is running is refused, never queued.

use tokio::sync::Mutex;

use crate::error::GameError;
use crate::narration::{NarrationSink, Quiet};
use crate::run::RunState;
use crate::turn::TurnReport;

/// A run shared between the UI and the turn driver.
#[derive(Debug)]
pub struct GameSession {
    state: Mutex<RunState>,
}

impl GameSession {
    /// Wrap a run.
    pub fn new(state: RunState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Play one turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TurnInFlight`] while another turn holds the
    /// run, or whatever [`RunState::run_turn`] refuses with.
    pub async fn run_turn(&self) -> Result<TurnReport, GameError> {
        self.run_turn_with(&mut Quiet).await
    }

    /// Play one turn, streaming narration to `sink` as it is spoken.
    ///
    /// # Errors
    ///
    /// Same as [`GameSession::run_turn`].
    pub async fn run_turn_with<S: NarrationSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<TurnReport, GameError> {
        let mut state = self.state.try_lock().map_err(|_busy| {
            tracing::debug!("turn requested while another is running");
            GameError::TurnInFlight
        })?;
        state.run_turn_with(sink).await
    }

    /// Run a between-turns operation against the state.
    ///
    /// Waits for an in-flight turn to finish first.
    pub async fn with_state<T>(&self, f: impl FnOnce(&mut RunState) -> T) -> T {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    /// Unwrap the run.
    pub fn into_inner(self) -> RunState {
        self.state.into_inner()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use codecrawl_types::{ItemKind, NodeItem, TraversalDirection};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::GameConfig;

    fn session() -> GameSession {
        let mut state = RunState::new(GameConfig::default(), SmallRng::seed_from_u64(8));
        state.choose_direction(TraversalDirection::Forward).unwrap();
        state.player.hp = 1_000;
        state.player.max_hp = 1_000;
        state.program = vec![NodeItem::new("heal", ItemKind::Heal { value: 1 })];
        GameSession::new(state)
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_turns_are_refused() {
        let session = session();
        let (first, second) = tokio::join!(session.run_turn(), session.run_turn());
        assert!(first.is_ok());
        assert_eq!(second, Err(GameError::TurnInFlight));

        let state = session.into_inner();
        assert_eq!(state.stats.turn_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_turns_both_run() {
        let session = session();
        session.run_turn().await.unwrap();
        session.run_turn().await.unwrap();
        let turns = session.with_state(|state| state.stats.turn_count).await;
        assert_eq!(turns, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn streamed_turn_matches_its_report() {
        let session = session();
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        let report = session.run_turn_with(&mut tx).await.unwrap();

        let mut streamed = Vec::new();
        while let Ok(line) = rx.try_recv() {
            streamed.push(line);
        }
        assert_eq!(streamed, report.lines);
    }
}
