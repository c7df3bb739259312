//! Reward and shop item generation.
//!
//! Rarity is rolled on a scale of 10 000 basis points against cumulative
//! thresholds (common 40%, uncommon 30%, rare 20%, epic 7%, legendary
//! 2.5%, mythic 0.5%). A rare floor rolls only within the rare-and-above
//! band. Each tier has a fixed pool; one entry is chosen uniformly and
//! entries carrying an element get a uniformly rolled one.

use codecrawl_types::{Element, ItemKind, NodeItem, Rarity};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::combat::random_element;
use crate::config::{RewardConfig, ShopConfig};

/// Size of the rarity roll.
pub const RARITY_SCALE: u32 = 10_000;

/// Cumulative upper bound of each tier, in basis points.
const THRESHOLDS: [(Rarity, u32); 6] = [
    (Rarity::Common, 4_000),
    (Rarity::Uncommon, 7_000),
    (Rarity::Rare, 9_000),
    (Rarity::Epic, 9_700),
    (Rarity::Legendary, 9_950),
    (Rarity::Mythic, RARITY_SCALE),
];

/// Element placeholder in pool entries; replaced on draw.
const ANY: Element = Element::Water;

const COMMON: &[ItemKind] = &[
    ItemKind::Attack,
    ItemKind::End,
    ItemKind::Heal { value: 1 },
    ItemKind::BpUp { value: 1 },
    ItemKind::AssignCounter { value: 1 },
];

const UNCOMMON: &[ItemKind] = &[
    ItemKind::AtkUp { value: 1 },
    ItemKind::RepeatCounter,
    ItemKind::Heal { value: 2 },
    ItemKind::SenseEnemyType,
    ItemKind::AssignCounter { value: 2 },
];

const RARE: &[ItemKind] = &[
    ItemKind::AtkUp { value: 2 },
    ItemKind::BpUp { value: 2 },
    ItemKind::IfEnemyType { element: ANY },
    ItemKind::SetAtkType { element: ANY },
];

const EPIC: &[ItemKind] = &[ItemKind::Heal { value: 3 }, ItemKind::BpUp { value: 3 }];

const LEGENDARY: &[ItemKind] = &[ItemKind::AssignCounter { value: 3 }];

const MYTHIC: &[ItemKind] = &[ItemKind::AtkUp { value: 3 }];

/// The candidate pool of a tier.
pub const fn pool(rarity: Rarity) -> &'static [ItemKind] {
    match rarity {
        Rarity::Common => COMMON,
        Rarity::Uncommon => UNCOMMON,
        Rarity::Rare => RARE,
        Rarity::Epic => EPIC,
        Rarity::Legendary => LEGENDARY,
        Rarity::Mythic => MYTHIC,
    }
}

/// The lower bound of a tier's band.
pub fn tier_floor(rarity: Rarity) -> u32 {
    let mut lower = 0;
    for (tier, upper) in THRESHOLDS {
        if tier == rarity {
            return lower;
        }
        lower = upper;
    }
    lower
}

/// The tier a roll in `0..RARITY_SCALE` falls in.
pub fn rarity_for_roll(roll: u32) -> Rarity {
    THRESHOLDS
        .iter()
        .find(|(_, upper)| roll < *upper)
        .map_or(Rarity::Mythic, |(tier, _)| *tier)
}

/// Roll a tier no lower than `minimum`.
pub fn roll_rarity<R: Rng + ?Sized>(rng: &mut R, minimum: Rarity) -> Rarity {
    let roll = rng.random_range(tier_floor(minimum)..RARITY_SCALE);
    rarity_for_roll(roll)
}

/// A fresh item id.
pub fn item_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid().to_string()
}

/// Draw one item.
pub fn draw_item<R: Rng + ?Sized>(rng: &mut R, minimum: Rarity) -> NodeItem {
    let rarity = roll_rarity(rng, minimum);
    let kind = pool(rarity)
        .choose(rng)
        .copied()
        .unwrap_or(ItemKind::Attack);
    let kind = match kind {
        ItemKind::IfEnemyType { .. } => ItemKind::IfEnemyType {
            element: random_element(rng),
        },
        ItemKind::SetAtkType { .. } => ItemKind::SetAtkType {
            element: random_element(rng),
        },
        other => other,
    };
    NodeItem::new(item_id(rng), kind)
}

/// Shop stock. The first slot is rare or better.
pub fn shop_stock<R: Rng + ?Sized>(rng: &mut R, config: &ShopConfig) -> Vec<NodeItem> {
    (0..config.stock_size)
        .map(|slot| {
            let minimum = if slot == 0 { Rarity::Rare } else { Rarity::Common };
            draw_item(rng, minimum)
        })
        .collect()
}

/// The reward granted by a `reward` slot: a pair, the first rare or better.
pub fn fixed_reward<R: Rng + ?Sized>(rng: &mut R) -> Vec<NodeItem> {
    vec![draw_item(rng, Rarity::Rare), draw_item(rng, Rarity::Common)]
}

/// The reward for defeating a regular enemy.
pub fn kill_reward<R: Rng + ?Sized>(
    rng: &mut R,
    config: &RewardConfig,
    cycle: u32,
) -> Vec<NodeItem> {
    (0..config.kill_items(cycle))
        .map(|_| draw_item(rng, Rarity::Common))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn thresholds_partition_the_scale() {
        assert_eq!(rarity_for_roll(0), Rarity::Common);
        assert_eq!(rarity_for_roll(3_999), Rarity::Common);
        assert_eq!(rarity_for_roll(4_000), Rarity::Uncommon);
        assert_eq!(rarity_for_roll(6_999), Rarity::Uncommon);
        assert_eq!(rarity_for_roll(7_000), Rarity::Rare);
        assert_eq!(rarity_for_roll(9_000), Rarity::Epic);
        assert_eq!(rarity_for_roll(9_700), Rarity::Legendary);
        assert_eq!(rarity_for_roll(9_950), Rarity::Mythic);
        assert_eq!(rarity_for_roll(9_999), Rarity::Mythic);
    }

    #[test]
    fn floors_start_at_their_band() {
        assert_eq!(tier_floor(Rarity::Common), 0);
        assert_eq!(tier_floor(Rarity::Rare), 7_000);
        assert_eq!(tier_floor(Rarity::Mythic), 9_950);
    }

    #[test]
    fn rare_floor_never_rolls_below_rare() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..2_000 {
            assert!(roll_rarity(&mut rng, Rarity::Rare) >= Rarity::Rare);
        }
    }

    #[test]
    fn unrestricted_rolls_reach_the_low_tiers() {
        let mut rng = SmallRng::seed_from_u64(5);
        let commons = (0..1_000)
            .filter(|_| roll_rarity(&mut rng, Rarity::Common) == Rarity::Common)
            .count();
        assert!(commons > 300 && commons < 500, "commons: {commons}");
    }

    #[test]
    fn every_pool_entry_is_a_catalog_item() {
        for rarity in [
            Rarity::Common,
            Rarity::Uncommon,
            Rarity::Rare,
            Rarity::Epic,
            Rarity::Legendary,
            Rarity::Mythic,
        ] {
            assert!(!pool(rarity).is_empty());
            for kind in pool(rarity) {
                assert_eq!(codecrawl_items::parse_item(&kind.to_string()), Some(*kind));
            }
        }
    }

    #[test]
    fn shop_first_slot_is_rare_or_better() {
        let config = ShopConfig::default();
        for seed in 0..50 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let stock = shop_stock(&mut rng, &config);
            assert_eq!(stock.len(), 6);
            let first = stock.first().and_then(|item| item.kind);
            let in_rare_band = [Rarity::Rare, Rarity::Epic, Rarity::Legendary, Rarity::Mythic]
                .iter()
                .any(|tier| {
                    first.is_some_and(|kind| pool(*tier).iter().any(|k| same_shape(*k, kind)))
                });
            assert!(in_rare_band, "seed {seed}: {first:?}");
        }
    }

    fn same_shape(pooled: ItemKind, drawn: ItemKind) -> bool {
        match (pooled, drawn) {
            (ItemKind::IfEnemyType { .. }, ItemKind::IfEnemyType { .. })
            | (ItemKind::SetAtkType { .. }, ItemKind::SetAtkType { .. }) => true,
            _ => pooled == drawn,
        }
    }

    #[test]
    fn kill_rewards_grow_after_the_first_cycle() {
        let mut rng = SmallRng::seed_from_u64(1);
        let config = RewardConfig::default();
        assert_eq!(kill_reward(&mut rng, &config, 1).len(), 1);
        assert_eq!(kill_reward(&mut rng, &config, 2).len(), 2);
        assert_eq!(kill_reward(&mut rng, &config, 3).len(), 2);
    }

    #[test]
    fn fixed_reward_is_a_pair_with_unique_ids() {
        let mut rng = SmallRng::seed_from_u64(9);
        let reward = fixed_reward(&mut rng);
        assert_eq!(reward.len(), 2);
        let ids: Vec<&str> = reward.iter().map(|item| item.id.as_str()).collect();
        assert_ne!(ids.first(), ids.get(1));
    }
}
