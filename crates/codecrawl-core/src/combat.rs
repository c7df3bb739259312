//! Combat math: the elemental chart and damage formulas.
//!
//! All arithmetic is integer. Multipliers are expressed in percent so
//! `floor(atk * 0.5)` is computed exactly as `atk * 50 / 100`.

use codecrawl_types::{Element, Entity};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Outcome of an elemental matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effectiveness {
    /// The attack element beats the defender (x2.0).
    Super,
    /// Same element, or either side untyped (x1.0).
    Neutral,
    /// The defender beats the attack element (x0.5).
    Resisted,
}

impl Effectiveness {
    /// Damage multiplier in percent.
    pub const fn percent(self) -> u32 {
        match self {
            Self::Super => 200,
            Self::Neutral => 100,
            Self::Resisted => 50,
        }
    }

    /// Narration emitted for non-neutral matchups.
    pub const fn narration(self) -> Option<&'static str> {
        match self {
            Self::Super => Some("It's super effective!"),
            Self::Neutral => None,
            Self::Resisted => Some("It's not very effective..."),
        }
    }
}

/// Look up the elemental chart.
///
/// Water beats fire, fire beats grass, grass beats water. An untyped
/// attacker or defender is always neutral.
pub fn effectiveness(attack: Option<Element>, defender: Option<Element>) -> Effectiveness {
    match (attack, defender) {
        (Some(attack), Some(defender)) if attack.beats() == defender => Effectiveness::Super,
        (Some(attack), Some(defender)) if defender.beats() == attack => Effectiveness::Resisted,
        _ => Effectiveness::Neutral,
    }
}

/// Pick an element uniformly.
pub fn random_element<R: Rng + ?Sized>(rng: &mut R) -> Element {
    Element::ALL.choose(rng).copied().unwrap_or(Element::Water)
}

/// `floor(atk * multiplier)`.
pub fn attack_damage(atk: u32, effectiveness: Effectiveness) -> u32 {
    let scaled = u64::from(atk).saturating_mul(u64::from(effectiveness.percent()));
    let damage = scaled.checked_div(100).unwrap_or(0);
    u32::try_from(damage).unwrap_or(u32::MAX)
}

/// Counter-turn damage: `atk * bp`. Behavior points act as a hit count.
pub fn enemy_damage(enemy: &Entity) -> u32 {
    let hits = u32::try_from(enemy.bp).unwrap_or(0);
    enemy.atk.saturating_mul(hits)
}
