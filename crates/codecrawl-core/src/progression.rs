//! Encounter and progression state machine.
//!
//! A run moves around a circular event track of fixed length. Index 0 is
//! always the boss marker (`select`) and is never landed on directly:
//! reaching either end of the track completes a cycle. Before the final
//! cycle the track is rebuilt and traversal restarts at the first real
//! slot; in the final cycle the exit leads to the boss.

use codecrawl_types::{
    Element, Entity, EventKind, GameState, ProgressSnapshot, TraversalDirection,
};
use rand::Rng;

use crate::combat::random_element;
use crate::config::EnemyConfig;
use crate::error::GameError;

/// Slots on the event track, including the boss marker.
pub const TRACK_LEN: usize = 8;

/// Sentinel index while fighting the boss.
pub const BOSS_INDEX: i32 = -1;

const EARLY_TRACK: [EventKind; TRACK_LEN] = [
    EventKind::Select,
    EventKind::Battle,
    EventKind::Reward,
    EventKind::Battle,
    EventKind::Shop,
    EventKind::Battle,
    EventKind::Reward,
    EventKind::Battle,
];

const FINAL_TRACK: [EventKind; TRACK_LEN] = [
    EventKind::Select,
    EventKind::Battle,
    EventKind::Upgrade,
    EventKind::Battle,
    EventKind::Battle,
    EventKind::Upgrade,
    EventKind::Shop,
    EventKind::Battle,
];

/// The event track for a cycle.
///
/// The final cycle moves the shop and turns reward slots into upgrades.
pub fn event_track(cycle: u32, max_cycles: u32) -> Vec<EventKind> {
    if cycle >= max_cycles {
        FINAL_TRACK.to_vec()
    } else {
        EARLY_TRACK.to_vec()
    }
}

/// Where a move on the track ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// A regular slot.
    Event(EventKind),
    /// The boss.
    Boss,
}

/// Stats of a regular enemy, before its element is rolled.
///
/// Monotonically non-decreasing in both `battle_count` and `cycle`.
pub fn enemy_stats(config: &EnemyConfig, battle_count: u32, cycle: u32) -> Entity {
    let cycles_done = cycle.saturating_sub(1);
    let hp = config
        .base_hp
        .saturating_add(config.hp_per_battle.saturating_mul(battle_count))
        .saturating_add(config.hp_per_cycle.saturating_mul(cycles_done));
    let atk = config
        .base_atk
        .saturating_add(config.atk_per_battle.saturating_mul(battle_count))
        .saturating_add(config.atk_per_cycle.saturating_mul(cycles_done));
    let bonus_bp = battle_count.checked_div(config.battles_per_bp).unwrap_or(0);
    let bp = config
        .base_bp
        .saturating_add(i32::try_from(bonus_bp).unwrap_or(i32::MAX));
    Entity::new(hp, atk, bp)
}

/// Position and mode of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    /// Current cycle, starting at 1.
    pub cycle_count: u32,
    /// Enemies spawned so far. Drives enemy scaling.
    pub battle_count: u32,
    /// Current slot, or [`BOSS_INDEX`] during the boss fight.
    pub current_event_index: i32,
    /// Traversal direction, fixed once chosen.
    pub direction: Option<TraversalDirection>,
    /// Top-level mode.
    pub game_state: GameState,
    /// The current cycle's track.
    pub events: Vec<EventKind>,
    max_cycles: u32,
    map_reset: bool,
}

impl Progression {
    /// A fresh run on the map, previewing the first cycle's track.
    pub fn new(max_cycles: u32) -> Self {
        Self {
            cycle_count: 1,
            battle_count: 0,
            current_event_index: 0,
            direction: None,
            game_state: GameState::Map,
            events: event_track(1, max_cycles),
            max_cycles,
            map_reset: false,
        }
    }

    /// Cycle in which the track exit leads to the boss.
    pub const fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    /// Fix the traversal direction and land on the first slot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DirectionAlreadyChosen`] once a direction is
    /// set, or [`GameError::WrongState`] outside the map.
    pub fn choose_direction(
        &mut self,
        direction: TraversalDirection,
    ) -> Result<Landing, GameError> {
        if self.direction.is_some() {
            return Err(GameError::DirectionAlreadyChosen);
        }
        if self.game_state != GameState::Map {
            return Err(GameError::WrongState {
                action: "choose a direction",
                state: self.game_state,
            });
        }
        self.direction = Some(direction);
        self.events = event_track(self.cycle_count, self.max_cycles);
        self.current_event_index = self.first_slot(direction);
        tracing::info!(?direction, "direction chosen");
        Ok(self.land())
    }

    /// Move one slot in the traversal direction.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoDirection`] before a direction is chosen and
    /// [`GameError::WrongState`] during the boss fight.
    pub fn advance(&mut self) -> Result<Landing, GameError> {
        let direction = self.direction.ok_or(GameError::NoDirection)?;
        if self.game_state == GameState::Boss {
            return Err(GameError::WrongState {
                action: "advance",
                state: self.game_state,
            });
        }

        let next = self.current_event_index.saturating_add(direction.step());
        let len = self.track_len();
        if next > 0 && next < len {
            self.current_event_index = next;
            return Ok(self.land());
        }

        if self.cycle_count >= self.max_cycles {
            tracing::info!(cycle = self.cycle_count, "track exit leads to the boss");
            return Ok(self.enter_boss());
        }

        self.cycle_count = self.cycle_count.saturating_add(1);
        self.events = event_track(self.cycle_count, self.max_cycles);
        self.current_event_index = self.first_slot(direction);
        self.map_reset = true;
        tracing::info!(cycle = self.cycle_count, "cycle completed");
        Ok(self.land())
    }

    fn track_len(&self) -> i32 {
        i32::try_from(self.events.len()).unwrap_or(i32::MAX)
    }

    /// First real slot in the given direction.
    fn first_slot(&self, direction: TraversalDirection) -> i32 {
        match direction {
            TraversalDirection::Forward => 1,
            TraversalDirection::Backward => self.track_len().saturating_sub(1),
        }
    }

    fn land(&mut self) -> Landing {
        match self.current_event() {
            Some(EventKind::Select) | None => self.enter_boss(),
            Some(EventKind::Battle) => {
                self.game_state = GameState::Battle;
                Landing::Event(EventKind::Battle)
            }
            Some(EventKind::Shop) => {
                self.game_state = GameState::Shop;
                Landing::Event(EventKind::Shop)
            }
            Some(event) => Landing::Event(event),
        }
    }

    fn enter_boss(&mut self) -> Landing {
        self.game_state = GameState::Boss;
        self.current_event_index = BOSS_INDEX;
        Landing::Boss
    }

    /// The event at the current index.
    pub fn current_event(&self) -> Option<EventKind> {
        usize::try_from(self.current_event_index)
            .ok()
            .and_then(|index| self.events.get(index))
            .copied()
    }

    /// Roll the next regular enemy and count the battle.
    pub fn spawn_enemy<R: Rng + ?Sized>(&mut self, config: &EnemyConfig, rng: &mut R) -> Entity {
        let element: Element = random_element(rng);
        let enemy = enemy_stats(config, self.battle_count, self.cycle_count).with_element(element);
        self.battle_count = self.battle_count.saturating_add(1);
        tracing::info!(
            battle = self.battle_count,
            cycle = self.cycle_count,
            hp = enemy.max_hp,
            atk = enemy.atk,
            bp = enemy.max_bp,
            %element,
            "enemy spawned"
        );
        enemy
    }

    /// Whether the program and inventory are read-only.
    pub fn is_editing_locked(&self) -> bool {
        self.cycle_count >= self.max_cycles && self.game_state == GameState::Battle
    }

    /// Consume the pending map-reset notification.
    pub const fn take_map_reset(&mut self) -> bool {
        let pending = self.map_reset;
        self.map_reset = false;
        pending
    }

    /// Capture for persistence.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            battle_count: self.battle_count,
            current_event_index: self.current_event_index,
            game_state: self.game_state,
            events: self.events.clone(),
            cycle_count: self.cycle_count,
            traversal_direction: self.direction,
        }
    }

    /// Rebuild from a persisted snapshot.
    ///
    /// A malformed track is replaced by the cycle's standard track, and
    /// records saved before the direction was stored resume forward.
    pub fn restore(snapshot: ProgressSnapshot, max_cycles: u32) -> Self {
        let cycle_count = snapshot.cycle_count.max(1);
        let track_ok = snapshot.events.len() == TRACK_LEN
            && snapshot.events.first() == Some(&EventKind::Select)
            && snapshot
                .events
                .iter()
                .skip(1)
                .all(|event| *event != EventKind::Select);
        let events = if track_ok {
            snapshot.events
        } else {
            tracing::warn!(cycle = cycle_count, "saved event track malformed, rebuilding");
            event_track(cycle_count, max_cycles)
        };

        let direction = snapshot.traversal_direction.or_else(|| {
            (snapshot.game_state != GameState::Map).then_some(TraversalDirection::Forward)
        });

        let mut progression = Self {
            cycle_count,
            battle_count: snapshot.battle_count,
            current_event_index: snapshot.current_event_index,
            direction,
            game_state: snapshot.game_state,
            events,
            max_cycles,
            map_reset: false,
        };
        let index_ok = progression.current_event_index == BOSS_INDEX
            || progression.current_event().is_some();
        if !index_ok {
            progression.current_event_index = direction.map_or(0, |d| progression.first_slot(d));
        }
        progression
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn started(direction: TraversalDirection) -> Progression {
        let mut progression = Progression::new(3);
        progression.choose_direction(direction).unwrap();
        progression
    }

    #[test]
    fn new_run_previews_first_track() {
        let progression = Progression::new(3);
        assert_eq!(progression.game_state, GameState::Map);
        assert_eq!(progression.current_event_index, 0);
        assert_eq!(progression.events, EARLY_TRACK.to_vec());
        assert!(progression.direction.is_none());
    }

    #[test]
    fn tracks_keep_the_boss_marker_at_zero() {
        for cycle in 1..=3 {
            let track = event_track(cycle, 3);
            assert_eq!(track.len(), TRACK_LEN);
            assert_eq!(track.first(), Some(&EventKind::Select));
            let markers = track.iter().filter(|e| **e == EventKind::Select).count();
            assert_eq!(markers, 1);
        }
        let last = event_track(3, 3);
        assert!(!last.contains(&EventKind::Reward));
        assert!(last.contains(&EventKind::Upgrade));
    }

    #[test]
    fn forward_visits_every_slot_then_wraps_past_the_boss() {
        let mut progression = started(TraversalDirection::Forward);
        assert_eq!(progression.current_event_index, 1);
        assert_eq!(progression.game_state, GameState::Battle);

        let mut visited = vec![progression.current_event_index];
        for _ in 2..TRACK_LEN {
            progression.advance().unwrap();
            visited.push(progression.current_event_index);
        }
        assert_eq!(visited, vec![1, 2, 3, 4, 5, 6, 7]);

        let landing = progression.advance().unwrap();
        assert_eq!(progression.current_event_index, 1);
        assert_eq!(progression.cycle_count, 2);
        assert_eq!(landing, Landing::Event(EventKind::Battle));
        assert!(progression.take_map_reset());
        assert!(!progression.take_map_reset());
    }

    #[test]
    fn backward_wraps_to_the_last_slot() {
        let mut progression = started(TraversalDirection::Backward);
        assert_eq!(progression.current_event_index, 7);
        for _ in 1..7 {
            progression.advance().unwrap();
        }
        assert_eq!(progression.current_event_index, 1);
        progression.advance().unwrap();
        assert_eq!(progression.current_event_index, 7);
        assert_eq!(progression.cycle_count, 2);
    }

    #[test]
    fn final_cycle_exit_is_the_boss() {
        let mut progression = started(TraversalDirection::Forward);
        for _ in 0..14 {
            progression.advance().unwrap();
        }
        assert_eq!(progression.cycle_count, 3);
        assert_eq!(progression.current_event_index, 1);
        assert_eq!(progression.events, FINAL_TRACK.to_vec());

        for _ in 0..6 {
            progression.advance().unwrap();
        }
        assert_eq!(progression.current_event_index, 7);
        let landing = progression.advance().unwrap();
        assert_eq!(landing, Landing::Boss);
        assert_eq!(progression.game_state, GameState::Boss);
        assert_eq!(progression.current_event_index, BOSS_INDEX);
        assert_eq!(progression.cycle_count, 3);
        assert!(progression.advance().is_err());
    }

    #[test]
    fn direction_is_fixed_once_chosen() {
        let mut progression = started(TraversalDirection::Forward);
        assert_eq!(
            progression.choose_direction(TraversalDirection::Backward),
            Err(GameError::DirectionAlreadyChosen)
        );
        assert_eq!(Progression::new(3).advance(), Err(GameError::NoDirection));
    }

    #[test]
    fn shop_and_reward_slots_set_state() {
        let mut progression = started(TraversalDirection::Forward);
        assert_eq!(progression.advance(), Ok(Landing::Event(EventKind::Reward)));
        assert_eq!(progression.game_state, GameState::Battle);
        progression.advance().unwrap();
        assert_eq!(progression.advance(), Ok(Landing::Event(EventKind::Shop)));
        assert_eq!(progression.game_state, GameState::Shop);
    }

    #[test]
    fn editing_locks_only_in_final_cycle_battles() {
        let mut progression = started(TraversalDirection::Forward);
        assert!(!progression.is_editing_locked());
        progression.cycle_count = 3;
        assert!(progression.is_editing_locked());
        progression.game_state = GameState::Shop;
        assert!(!progression.is_editing_locked());
        progression.game_state = GameState::Boss;
        assert!(!progression.is_editing_locked());
    }

    #[test]
    fn scaling_is_monotonic() {
        let config = EnemyConfig::default();
        for cycle in 1..=3 {
            for battles in 0..20 {
                let here = enemy_stats(&config, battles, cycle);
                let later = enemy_stats(&config, battles.saturating_add(1), cycle);
                let next_cycle = enemy_stats(&config, battles, cycle.saturating_add(1));
                for other in [&later, &next_cycle] {
                    assert!(other.max_hp >= here.max_hp);
                    assert!(other.atk >= here.atk);
                    assert!(other.max_bp >= here.max_bp);
                }
            }
        }
    }

    #[test]
    fn scaling_matches_the_balance_formula() {
        let config = EnemyConfig::default();
        assert_eq!(enemy_stats(&config, 0, 1), Entity::new(10, 20, 5));
        assert_eq!(enemy_stats(&config, 3, 1), Entity::new(34, 26, 6));
        assert_eq!(enemy_stats(&config, 3, 2), Entity::new(44, 29, 6));
    }

    #[test]
    fn spawning_counts_battles() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut progression = started(TraversalDirection::Forward);
        let first = progression.spawn_enemy(&EnemyConfig::default(), &mut rng);
        let second = progression.spawn_enemy(&EnemyConfig::default(), &mut rng);
        assert_eq!(progression.battle_count, 2);
        assert!(first.element.is_some());
        assert!(second.max_hp > first.max_hp);
    }

    #[test]
    fn snapshot_round_trips() {
        let mut progression = started(TraversalDirection::Backward);
        progression.advance().unwrap();
        progression.battle_count = 4;
        let restored = Progression::restore(progression.snapshot(), 3);
        assert_eq!(restored, progression);
    }

    #[test]
    fn restore_repairs_bad_tracks_and_missing_direction() {
        let snapshot = ProgressSnapshot {
            battle_count: 2,
            current_event_index: 12,
            game_state: GameState::Battle,
            events: vec![EventKind::Battle, EventKind::Shop],
            cycle_count: 2,
            traversal_direction: None,
        };
        let restored = Progression::restore(snapshot, 3);
        assert_eq!(restored.events, EARLY_TRACK.to_vec());
        assert_eq!(restored.direction, Some(TraversalDirection::Forward));
        assert_eq!(restored.current_event_index, 1);
    }
}
