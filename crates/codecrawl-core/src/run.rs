//! The run aggregate.
//!
//! [`RunState`] owns everything a run mutates: the combatants, the program
//! and inventory, the shop, the map progression, cumulative statistics and
//! whatever presentation is waiting on the player. Every operation a UI can
//! trigger between turns lives here; the turn itself is in [`crate::turn`].

use codecrawl_items::{is_upgradable, upgrade_item};
use codecrawl_types::{
    Element, Entity, EventKind, GamePlayStats, GameState, ItemKind, NodeItem, TraversalDirection,
};
use rand::rngs::SmallRng;

use crate::combat::random_element;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::progression::{Landing, Progression, enemy_stats};
use crate::rewards::{fixed_reward, item_id, shop_stock};

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunResult {
    /// The boss was defeated.
    Cleared,
    /// The player died.
    Over,
}

/// A modal waiting on the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Presentation {
    /// Nothing is showing.
    #[default]
    None,
    /// Items to be added to the inventory on dismissal.
    Reward(Vec<NodeItem>),
    /// One item may be upgraded.
    Upgrade,
    /// The run is over.
    Result(RunResult),
}

/// Which container an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemSource {
    /// The held items.
    Inventory,
    /// The player's program.
    Program,
}

/// Direction of an adjacent swap in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// Towards the start.
    Up,
    /// Towards the end.
    Down,
}

/// Shop contents and trade log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopState {
    /// Items on offer.
    pub stock: Vec<NodeItem>,
    /// Index of the selected offer.
    pub selected: Option<usize>,
    /// Shopkeeper lines.
    pub log: Vec<String>,
}

/// Everything a run owns.
#[derive(Debug)]
pub struct RunState {
    config: GameConfig,
    rng: SmallRng,
    /// The player.
    pub player: Entity,
    /// The current opponent, if an encounter has spawned.
    pub enemy: Option<Entity>,
    /// Items executed each turn, in order.
    pub program: Vec<NodeItem>,
    /// Held items.
    pub inventory: Vec<NodeItem>,
    /// The shop.
    pub shop: ShopState,
    /// Map position and mode.
    pub progress: Progression,
    /// Cumulative statistics.
    pub stats: GamePlayStats,
    /// Battle log, oldest first.
    pub log: Vec<String>,
    /// Modal waiting on the player.
    pub presentation: Presentation,
}

impl RunState {
    /// A fresh run.
    pub fn new(config: GameConfig, rng: SmallRng) -> Self {
        let max_cycles = config.map.max_cycles;
        let mut state = Self {
            player: config.player.spawn(),
            config,
            rng,
            enemy: None,
            program: Vec::new(),
            inventory: Vec::new(),
            shop: ShopState::default(),
            progress: Progression::new(max_cycles),
            stats: GamePlayStats::default(),
            log: Vec::new(),
            presentation: Presentation::None,
        };
        state.new_game();
        state
    }

    /// The configuration this run plays under.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    pub(crate) const fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Reset to the starting loadout on the map.
    pub fn new_game(&mut self) {
        self.player = self.config.player.spawn();
        self.enemy = None;
        self.program = vec![NodeItem::new(
            item_id(&mut self.rng),
            ItemKind::AssignCounter { value: 5 },
        )];
        self.inventory = [
            ItemKind::Attack,
            ItemKind::AtkUp { value: 1 },
            ItemKind::RepeatCounter,
            ItemKind::Heal { value: 1 },
            ItemKind::End,
            ItemKind::BpUp { value: 1 },
        ]
        .into_iter()
        .map(|kind| NodeItem::new(item_id(&mut self.rng), kind))
        .collect();
        self.shop = ShopState::default();
        self.progress = Progression::new(self.config.map.max_cycles);
        self.stats = GamePlayStats::default();
        self.log.clear();
        self.presentation = Presentation::None;
        tracing::info!("new game");
    }

    /// Whether the editor is read-only.
    pub fn is_editing_locked(&self) -> bool {
        self.progress.is_editing_locked()
    }

    /// Consume the pending map-reset notification.
    pub const fn take_map_reset(&mut self) -> bool {
        self.progress.take_map_reset()
    }

    /// The living enemy, if any.
    pub fn living_enemy(&self) -> Option<&Entity> {
        self.enemy.as_ref().filter(|enemy| !enemy.is_defeated())
    }

    // -----------------------------------------------------------------------
    // Map
    // -----------------------------------------------------------------------

    /// Fix the traversal direction and enter the first slot.
    ///
    /// # Errors
    ///
    /// Fails outside the map, once a direction is set, or while a
    /// presentation is open.
    pub fn choose_direction(
        &mut self,
        direction: TraversalDirection,
    ) -> Result<Landing, GameError> {
        self.ensure_no_presentation()?;
        let landing = self.progress.choose_direction(direction)?;
        self.enter(landing);
        Ok(landing)
    }

    fn advance(&mut self) -> Result<Landing, GameError> {
        let landing = self.progress.advance()?;
        self.enter(landing);
        Ok(landing)
    }

    fn enter(&mut self, landing: Landing) {
        match landing {
            Landing::Event(EventKind::Battle) => {
                let enemy = self.progress.spawn_enemy(&self.config.enemy, &mut self.rng);
                self.announce(&enemy, "An enemy appears!");
                self.enemy = Some(enemy);
            }
            Landing::Event(EventKind::Shop) => self.open_shop(),
            Landing::Event(EventKind::Reward) => {
                self.presentation = Presentation::Reward(fixed_reward(&mut self.rng));
            }
            Landing::Event(EventKind::Upgrade) => self.presentation = Presentation::Upgrade,
            Landing::Event(EventKind::Select) | Landing::Boss => {
                let boss = self.config.boss.spawn();
                self.announce(&boss, "The boss appears!");
                self.enemy = Some(boss);
            }
        }
    }

    /// Re-enter the current slot after loading a saved run.
    ///
    /// Encounters are not persisted: a battle slot rolls a fresh enemy at
    /// the scaling of the battle that was in progress, reward and upgrade
    /// slots present again and a shop restocks.
    pub(crate) fn resume_encounter(&mut self) {
        if self.progress.game_state == GameState::Boss {
            self.enter(Landing::Boss);
            return;
        }
        match self.progress.current_event() {
            Some(EventKind::Battle) => {
                let element = random_element(&mut self.rng);
                let enemy = enemy_stats(
                    &self.config.enemy,
                    self.progress.battle_count.saturating_sub(1),
                    self.progress.cycle_count,
                )
                .with_element(element);
                self.announce(&enemy, "An enemy appears!");
                self.enemy = Some(enemy);
            }
            Some(event @ (EventKind::Shop | EventKind::Reward | EventKind::Upgrade)) => {
                self.enter(Landing::Event(event));
            }
            Some(EventKind::Select) | None => {}
        }
    }

    fn announce(&mut self, enemy: &Entity, headline: &str) {
        let element = enemy.element.map_or("unknown", Element::as_str);
        self.log.push(format!(
            "{headline} (HP: {}, ATK: {}, BP: {}, type: {element})",
            enemy.hp, enemy.atk, enemy.bp
        ));
    }

    fn open_shop(&mut self) {
        self.shop = ShopState {
            stock: shop_stock(&mut self.rng, &self.config.shop),
            selected: None,
            log: vec![self.config.shop.greeting.clone()],
        };
    }

    fn ensure_no_presentation(&self) -> Result<(), GameError> {
        if self.presentation == Presentation::None {
            Ok(())
        } else {
            Err(GameError::PresentationOpen)
        }
    }

    // -----------------------------------------------------------------------
    // Presentations
    // -----------------------------------------------------------------------

    /// Take the presented reward and move on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotPresenting`] if no reward is showing.
    pub fn dismiss_reward(&mut self) -> Result<Landing, GameError> {
        let items = match std::mem::take(&mut self.presentation) {
            Presentation::Reward(items) => items,
            other => {
                self.presentation = other;
                return Err(GameError::NotPresenting { expected: "reward" });
            }
        };
        tracing::debug!(items = items.len(), "reward collected");
        self.inventory.extend(items);
        self.advance()
    }

    /// Items eligible for the upgrade event, from inventory then program.
    pub fn upgradable_items(&self) -> Vec<(ItemSource, &NodeItem)> {
        let inventory = self.inventory.iter().map(|item| (ItemSource::Inventory, item));
        let program = self.program.iter().map(|item| (ItemSource::Program, item));
        inventory
            .chain(program)
            .filter(|(_, item)| is_upgradable(item))
            .collect()
    }

    /// Upgrade one item in place under a fresh id, then move on.
    ///
    /// # Errors
    ///
    /// Fails if no upgrade is presented, the item does not exist, or the
    /// item cannot be upgraded. The presentation stays open on failure.
    pub fn apply_upgrade(
        &mut self,
        source: ItemSource,
        item_id_to_upgrade: &str,
    ) -> Result<Landing, GameError> {
        if self.presentation != Presentation::Upgrade {
            return Err(GameError::NotPresenting { expected: "upgrade" });
        }
        let new_id = item_id(&mut self.rng);
        let container = match source {
            ItemSource::Inventory => &mut self.inventory,
            ItemSource::Program => &mut self.program,
        };
        let slot = container
            .iter_mut()
            .find(|item| item.id == item_id_to_upgrade)
            .ok_or_else(|| GameError::ItemNotFound {
                id: item_id_to_upgrade.to_owned(),
            })?;
        let upgraded = upgrade_item(slot, new_id)?;
        tracing::info!(from = %slot.label, to = %upgraded.label, "item upgraded");
        *slot = upgraded;
        self.presentation = Presentation::None;
        self.advance()
    }

    /// Decline the upgrade and move on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotPresenting`] if no upgrade is showing.
    pub fn skip_upgrade(&mut self) -> Result<Landing, GameError> {
        if self.presentation != Presentation::Upgrade {
            return Err(GameError::NotPresenting { expected: "upgrade" });
        }
        self.presentation = Presentation::None;
        self.advance()
    }

    // -----------------------------------------------------------------------
    // Editor
    // -----------------------------------------------------------------------

    fn ensure_editable(&self) -> Result<(), GameError> {
        if self.is_editing_locked() {
            Err(GameError::EditingLocked)
        } else {
            Ok(())
        }
    }

    /// Move an inventory item to the end of the program.
    ///
    /// # Errors
    ///
    /// Fails while editing is locked or if the index is out of range.
    pub fn place_item(&mut self, inventory_index: usize) -> Result<(), GameError> {
        self.ensure_editable()?;
        let item = take_at(&mut self.inventory, "inventory", inventory_index)?;
        self.program.push(item);
        self.stats.item_swap_count = self.stats.item_swap_count.saturating_add(1);
        Ok(())
    }

    /// Move a program item to the end of the inventory.
    ///
    /// # Errors
    ///
    /// Fails while editing is locked or if the index is out of range.
    pub fn remove_item(&mut self, program_index: usize) -> Result<(), GameError> {
        self.ensure_editable()?;
        let item = take_at(&mut self.program, "program", program_index)?;
        self.inventory.push(item);
        self.stats.item_swap_count = self.stats.item_swap_count.saturating_add(1);
        Ok(())
    }

    /// Swap a program item with its neighbour.
    ///
    /// Moving the first item up or the last item down does nothing.
    ///
    /// # Errors
    ///
    /// Fails while editing is locked or if the index is out of range.
    pub fn move_item(
        &mut self,
        program_index: usize,
        direction: MoveDirection,
    ) -> Result<(), GameError> {
        self.ensure_editable()?;
        let len = self.program.len();
        if program_index >= len {
            return Err(GameError::IndexOutOfRange {
                container: "program",
                index: program_index,
                len,
            });
        }
        let neighbour = match direction {
            MoveDirection::Up => program_index.checked_sub(1),
            MoveDirection::Down => program_index.checked_add(1).filter(|next| *next < len),
        };
        if let Some(neighbour) = neighbour {
            self.program.swap(program_index, neighbour);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shop
    // -----------------------------------------------------------------------

    fn ensure_shop(&self, action: &'static str) -> Result<(), GameError> {
        if self.progress.game_state == GameState::Shop {
            Ok(())
        } else {
            Err(GameError::WrongState {
                action,
                state: self.progress.game_state,
            })
        }
    }

    /// Select an offer.
    ///
    /// # Errors
    ///
    /// Fails outside the shop, while a modal is open, or if the index is
    /// out of range.
    pub fn select_shop_item(&mut self, index: usize) -> Result<(), GameError> {
        self.ensure_shop("select a shop item")?;
        self.ensure_no_presentation()?;
        let len = self.shop.stock.len();
        if index >= len {
            return Err(GameError::IndexOutOfRange {
                container: "shop",
                index,
                len,
            });
        }
        self.shop.selected = Some(index);
        Ok(())
    }

    /// Trade the selected offer for an inventory item.
    ///
    /// # Errors
    ///
    /// Fails outside the shop, while a modal is open, without a selection,
    /// or if the index is out of range.
    pub fn shop_trade(&mut self, inventory_index: usize) -> Result<(), GameError> {
        self.ensure_shop("trade")?;
        self.ensure_no_presentation()?;
        let selected = self.shop.selected.ok_or(GameError::NoShopSelection)?;
        let inventory_len = self.inventory.len();
        let (Some(offer), Some(held)) = (
            self.shop.stock.get_mut(selected),
            self.inventory.get_mut(inventory_index),
        ) else {
            return Err(GameError::IndexOutOfRange {
                container: "inventory",
                index: inventory_index,
                len: inventory_len,
            });
        };
        std::mem::swap(offer, held);
        self.shop.log.push(format!(
            "Traded {} for {}. Pleasure doing business!",
            offer.label, held.label
        ));
        tracing::debug!(given = %offer.label, received = %held.label, "shop trade");
        self.shop.selected = None;
        self.stats.shop_trade_count = self.stats.shop_trade_count.saturating_add(1);
        Ok(())
    }

    /// Leave the shop and move on.
    ///
    /// # Errors
    ///
    /// Fails outside the shop.
    pub fn leave_shop(&mut self) -> Result<Landing, GameError> {
        self.ensure_shop("leave the shop")?;
        self.ensure_no_presentation()?;
        self.shop.selected = None;
        self.advance()
    }

    /// Move on after a defeated enemy when no reward is pending.
    ///
    /// # Errors
    ///
    /// Fails while the enemy is alive or a presentation is open.
    pub fn continue_journey(&mut self) -> Result<Landing, GameError> {
        self.ensure_no_presentation()?;
        if self.living_enemy().is_some() {
            return Err(GameError::WrongState {
                action: "move on mid-battle",
                state: self.progress.game_state,
            });
        }
        self.advance()
    }
}

fn take_at(
    items: &mut Vec<NodeItem>,
    container: &'static str,
    index: usize,
) -> Result<NodeItem, GameError> {
    if index < items.len() {
        Ok(items.remove(index))
    } else {
        Err(GameError::IndexOutOfRange {
            container,
            index,
            len: items.len(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use codecrawl_items::ParseError;
    use rand::SeedableRng;

    use super::*;

    fn fresh() -> RunState {
        RunState::new(GameConfig::default(), SmallRng::seed_from_u64(42))
    }

    fn labels(items: &[NodeItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn new_run_has_the_starting_loadout() {
        let state = fresh();
        assert_eq!(state.player, Entity::new(120, 20, 10));
        assert_eq!(labels(&state.program), vec!["n=5"]);
        assert_eq!(
            labels(&state.inventory),
            vec!["atk()", "atk+=1", "n.times do", "hp+=1", "end", "bp+=1"]
        );
        assert_eq!(state.progress.game_state, GameState::Map);
        assert!(state.enemy.is_none());
    }

    #[test]
    fn new_game_resets_progress_logs_and_modals() {
        let mut state = fresh();
        state.choose_direction(TraversalDirection::Forward).unwrap();
        state.progress.cycle_count = 3;
        state.progress.battle_count = 9;
        state.log.push("old".to_owned());
        state.presentation = Presentation::Result(RunResult::Over);
        state.stats.turn_count = 12;

        state.new_game();
        assert_eq!(state.progress.cycle_count, 1);
        assert_eq!(state.progress.battle_count, 0);
        assert_eq!(state.progress.events, crate::progression::event_track(1, 3));
        assert!(state.log.is_empty());
        assert!(state.shop.log.is_empty());
        assert_eq!(state.presentation, Presentation::None);
        assert_eq!(state.stats, GamePlayStats::default());
        assert!(state.progress.direction.is_none());
    }

    #[test]
    fn first_slot_spawns_an_enemy() {
        let mut state = fresh();
        let landing = state.choose_direction(TraversalDirection::Forward).unwrap();
        assert_eq!(landing, Landing::Event(EventKind::Battle));
        let enemy = state.living_enemy().unwrap();
        assert_eq!(enemy.max_hp, 10);
        assert!(enemy.element.is_some());
        assert_eq!(state.progress.battle_count, 1);
        assert!(state.log.iter().any(|line| line.starts_with("An enemy appears!")));
    }

    #[test]
    fn reward_slot_presents_a_pair_and_dismissal_advances() {
        let mut state = fresh();
        state.choose_direction(TraversalDirection::Forward).unwrap();
        state.enemy.as_mut().unwrap().hp = 0;
        let landing = state.continue_journey().unwrap();
        assert_eq!(landing, Landing::Event(EventKind::Reward));
        assert!(matches!(&state.presentation, Presentation::Reward(items) if items.len() == 2));

        let before = state.inventory.len();
        let landing = state.dismiss_reward().unwrap();
        assert_eq!(landing, Landing::Event(EventKind::Battle));
        assert_eq!(state.inventory.len(), before.saturating_add(2));
        assert_eq!(state.presentation, Presentation::None);
        assert_eq!(state.progress.current_event_index, 3);
    }

    #[test]
    fn cannot_move_on_while_the_enemy_lives() {
        let mut state = fresh();
        state.choose_direction(TraversalDirection::Forward).unwrap();
        assert!(matches!(
            state.continue_journey(),
            Err(GameError::WrongState { .. })
        ));
    }

    #[test]
    fn shop_entry_restocks_and_greets() {
        let mut state = fresh();
        state.choose_direction(TraversalDirection::Backward).unwrap();
        state.enemy.as_mut().unwrap().hp = 0;
        state.continue_journey().unwrap();
        state.dismiss_reward().unwrap();
        state.enemy.as_mut().unwrap().hp = 0;
        let landing = state.continue_journey().unwrap();
        assert_eq!(landing, Landing::Event(EventKind::Shop));
        assert_eq!(state.progress.game_state, GameState::Shop);
        assert_eq!(state.shop.stock.len(), 6);
        assert_eq!(state.shop.log, vec![GameConfig::default().shop.greeting]);
    }

    #[test]
    fn shop_trade_swaps_by_value() {
        let mut state = fresh();
        state.progress.game_state = GameState::Shop;
        state.open_shop();
        let offer = state.shop.stock.first().cloned().unwrap();
        let held = state.inventory.first().cloned().unwrap();

        assert_eq!(state.shop_trade(0), Err(GameError::NoShopSelection));
        state.select_shop_item(0).unwrap();
        state.shop_trade(0).unwrap();

        assert_eq!(state.inventory.first(), Some(&offer));
        assert_eq!(state.shop.stock.first(), Some(&held));
        assert_eq!(state.stats.shop_trade_count, 1);
        assert_eq!(state.shop.log.len(), 2);
        assert!(state.shop.selected.is_none());
    }

    #[test]
    fn shop_actions_need_the_shop() {
        let mut state = fresh();
        assert!(matches!(
            state.select_shop_item(0),
            Err(GameError::WrongState { .. })
        ));
        assert!(matches!(state.leave_shop(), Err(GameError::WrongState { .. })));
    }

    #[test]
    fn place_remove_and_move_edit_the_program() {
        let mut state = fresh();
        state.place_item(0).unwrap();
        assert_eq!(labels(&state.program), vec!["n=5", "atk()"]);
        state.move_item(1, MoveDirection::Up).unwrap();
        assert_eq!(labels(&state.program), vec!["atk()", "n=5"]);
        state.move_item(0, MoveDirection::Up).unwrap();
        assert_eq!(labels(&state.program), vec!["atk()", "n=5"]);
        state.remove_item(1).unwrap();
        assert_eq!(labels(&state.program), vec!["atk()"]);
        assert_eq!(state.inventory.last().map(|i| i.label.as_str()), Some("n=5"));
        assert_eq!(state.stats.item_swap_count, 2);
        assert!(matches!(
            state.place_item(99),
            Err(GameError::IndexOutOfRange { container: "inventory", .. })
        ));
    }

    #[test]
    fn final_cycle_battles_lock_the_editor() {
        let mut state = fresh();
        state.progress.cycle_count = 3;
        state.progress.game_state = GameState::Battle;
        assert_eq!(state.place_item(0), Err(GameError::EditingLocked));
        assert_eq!(state.remove_item(0), Err(GameError::EditingLocked));
        assert_eq!(
            state.move_item(0, MoveDirection::Down),
            Err(GameError::EditingLocked)
        );
        state.progress.game_state = GameState::Shop;
        assert_eq!(state.place_item(0), Ok(()));
    }

    #[test]
    fn upgrade_replaces_the_item_under_a_new_id() {
        let mut state = fresh();
        state.choose_direction(TraversalDirection::Forward).unwrap();
        state.presentation = Presentation::Upgrade;
        let target = state.inventory.get(1).cloned().unwrap();
        assert_eq!(target.label, "atk+=1");

        let candidates: Vec<&str> = state
            .upgradable_items()
            .into_iter()
            .map(|(_, item)| item.label.as_str())
            .collect();
        assert_eq!(candidates, vec!["atk+=1", "hp+=1", "bp+=1"]);

        state.apply_upgrade(ItemSource::Inventory, &target.id).unwrap();
        let upgraded = state.inventory.get(1).unwrap();
        assert_eq!(upgraded.label, "atk+=2");
        assert_ne!(upgraded.id, target.id);
        assert!(matches!(state.presentation, Presentation::Reward(_)));
    }

    #[test]
    fn failed_upgrade_keeps_the_presentation() {
        let mut state = fresh();
        state.presentation = Presentation::Upgrade;
        let plain = state.inventory.first().cloned().unwrap();
        assert_eq!(
            state.apply_upgrade(ItemSource::Inventory, &plain.id),
            Err(GameError::Item {
                source: ParseError::NotUpgradable {
                    label: "atk()".to_owned()
                }
            })
        );
        assert!(matches!(
            state.apply_upgrade(ItemSource::Program, "missing"),
            Err(GameError::ItemNotFound { .. })
        ));
        assert_eq!(state.presentation, Presentation::Upgrade);
    }

    #[test]
    fn dismissing_without_a_reward_fails() {
        let mut state = fresh();
        assert_eq!(
            state.dismiss_reward(),
            Err(GameError::NotPresenting { expected: "reward" })
        );
        assert_eq!(
            state.skip_upgrade(),
            Err(GameError::NotPresenting { expected: "upgrade" })
        );

        for open in [Presentation::Upgrade, Presentation::Result(RunResult::Over)] {
            state.presentation = open.clone();
            assert_eq!(
                state.dismiss_reward(),
                Err(GameError::NotPresenting { expected: "reward" })
            );
            assert_eq!(state.presentation, open);
        }
    }

    #[test]
    fn shop_actions_wait_for_open_modals() {
        let mut state = fresh();
        state.progress.game_state = GameState::Shop;
        state.open_shop();
        state.presentation = Presentation::Upgrade;

        assert_eq!(state.select_shop_item(0), Err(GameError::PresentationOpen));
        state.shop.selected = Some(0);
        let before = state.inventory.clone();
        assert_eq!(state.shop_trade(0), Err(GameError::PresentationOpen));
        assert_eq!(state.inventory, before);
        assert_eq!(state.stats.shop_trade_count, 0);
    }
}
