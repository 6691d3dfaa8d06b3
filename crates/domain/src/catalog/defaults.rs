//! Built-in content used when configuration is missing or incomplete.

use std::collections::BTreeMap;

use crate::entities::{
    BossEntry, CompositionVariant, MobEntry, RewardEntry, Stage, Theme, TierRewards,
};
use crate::value_objects::Tier::{Epic, Legendary, Rare, Uncommon};
use crate::value_objects::{Tier, TierSettings, ZoneSpawnChances};

/// Theme used when nothing else resolves.
pub const FALLBACK_THEME_ID: &str = "skeleton";

/// Boss used when a boss stage resolves to nothing.
pub const FALLBACK_BOSS_ID: &str = "Bear_Polar";

/// Guaranteed completion drop, suffixed with the tier name.
pub const SHARD_ITEM_PREFIX: &str = "Comet_Shard_";
pub const SHARD_COUNT: u32 = 5;

/// Old config files addressed themes by position in this list.
pub const LEGACY_THEME_IDS: [&str; 18] = [
    "skeleton",
    "goblin",
    "spider",
    "trork",
    "skeleton_sand",
    "sabertooth",
    "outlander",
    "leopard",
    "toad",
    "skeleton_burnt",
    "void",
    "ice",
    "burnt_legendary",
    "lava",
    "earth",
    "undead_rare",
    "undead_legendary",
    "zombie",
];

pub fn legacy_theme_id(index: usize) -> Option<&'static str> {
    LEGACY_THEME_IDS.get(index).copied()
}

fn mobs(entries: &[(&str, u32)]) -> Vec<MobEntry> {
    entries.iter().map(|(id, n)| MobEntry::new(*id, *n)).collect()
}

fn bosses(ids: &[&str]) -> Vec<BossEntry> {
    ids.iter().map(|id| BossEntry::new(*id)).collect()
}

fn legacy(
    id: &str,
    name: &str,
    tiers: &[Tier],
    mob_list: Vec<MobEntry>,
    boss_list: &[&str],
) -> Theme {
    Theme::new(id, name, tiers.iter().copied())
        .with_mobs(mob_list)
        .with_bosses(bosses(boss_list))
}

/// The reference catalog, in selection order.
pub fn default_themes() -> Vec<Theme> {
    vec![
        legacy(
            "skeleton",
            "Skeleton Horde",
            &[Uncommon, Rare],
            mobs(&[("Skeleton_Soldier", 3), ("Skeleton_Archer", 1), ("Skeleton_Archmage", 1)]),
            &["Bear_Polar", "Wolf_Black"],
        ),
        legacy(
            "goblin",
            "Goblin Gang",
            &[Uncommon, Rare],
            mobs(&[("Goblin_Scrapper", 2), ("Goblin_Miner", 2), ("Goblin_Lobber", 1)]),
            &["Bear_Polar", "Wolf_Black"],
        ),
        legacy(
            "spider",
            "Spider Swarm",
            &[Uncommon, Rare],
            mobs(&[("Spider", 5)]),
            &["Spider_Broodmother"],
        ),
        legacy(
            "trork",
            "Trork Warband",
            &[Uncommon, Rare, Epic],
            mobs(&[
                ("Trork_Warrior", 1),
                ("Trork_Hunter", 1),
                ("Trork_Mauler", 1),
                ("Trork_Shaman", 1),
                ("Trork_Brawler", 1),
            ]),
            &["Trork_Chieftain"],
        ),
        legacy(
            "skeleton_sand",
            "Sand Skeleton Legion",
            &[Uncommon, Rare, Epic],
            mobs(&[
                ("Skeleton_Sand_Archer", 1),
                ("Skeleton_Sand_Assassin", 1),
                ("Skeleton_Sand_Guard", 1),
                ("Skeleton_Sand_Mage", 1),
                ("Skeleton_Sand_Ranger", 1),
            ]),
            &["Bear_Grizzly", "Skeleton_Burnt_Alchemist"],
        ),
        legacy(
            "sabertooth",
            "Sabertooth Pack",
            &[Uncommon, Rare, Epic],
            mobs(&[("Tiger_Sabertooth", 4)]),
            &["Bear_Grizzly", "Skeleton_Burnt_Alchemist"],
        ),
        outlander(),
        legacy(
            "leopard",
            "Snow Leopard Pride",
            &[Rare, Epic, Legendary],
            mobs(&[("Leopard_Snow", 5)]),
            &["Werewolf"],
        ),
        legacy(
            "toad",
            "Magma Toads",
            &[Epic, Legendary],
            mobs(&[("Toad_Rhino_Magma", 3)]),
            &["Shadow_Knight", "Zombie_Aberrant"],
        ),
        legacy(
            "skeleton_burnt",
            "Burnt Legion",
            &[Epic, Legendary],
            mobs(&[
                ("Skeleton_Burnt_Archer", 1),
                ("Skeleton_Burnt_Gunner", 1),
                ("Skeleton_Burnt_Knight", 1),
                ("Skeleton_Burnt_Lancer", 2),
            ]),
            &["Skeleton_Burnt_Praetorian"],
        ),
        void(),
        legacy(
            "ice",
            "Legendary Ice",
            &[Epic, Legendary],
            mobs(&[
                ("Yeti", 1),
                ("Bear_Polar", 2),
                ("Golem_Crystal_Frost", 1),
                ("Leopard_Snow", 2),
            ]),
            &["Spirit_Frost"],
        ),
        legacy(
            "lava",
            "Legendary Lava",
            &[Epic, Legendary],
            mobs(&[("Emberwulf", 1), ("Golem_Firesteel", 2), ("Spirit_Ember", 1)]),
            &["Toad_Rhino_Magma"],
        ),
        legacy(
            "earth",
            "Legendary Earth",
            &[Epic, Legendary],
            mobs(&[("Golem_Crystal_Earth", 1), ("Bear_Grizzly", 2), ("Hyena", 4)]),
            &["Hedera"],
        ),
        legacy(
            "undead_rare",
            "Rare Undead",
            &[Uncommon, Rare, Epic],
            mobs(&[("Pig_Undead", 2), ("Cow_Undead", 1), ("Chicken_Undead", 2)]),
            &["Golem_Crystal_Thunder"],
        ),
        legacy(
            "undead_legendary",
            "Legendary Undead",
            &[Epic, Legendary],
            mobs(&[
                ("Pig_Undead", 8),
                ("Cow_Undead", 4),
                ("Chicken_Undead", 6),
                ("Hound_Bleached", 3),
            ]),
            &["Wraith"],
        ),
        legacy(
            "zombie",
            "Zombie Aberration",
            &[Epic, Legendary],
            mobs(&[("Zombie_Aberrant_Small", 5)]),
            &["Zombie_Aberrant"],
        ),
    ]
}

/// Outlanders: Priest appears only as a rolled variant.
fn outlander() -> Theme {
    let table =
        |rare: u32, epic: u32, legendary: u32| [(Rare, rare), (Epic, epic), (Legendary, legendary)];
    let normal = Stage::normal(vec![
        MobEntry::new("Outlander_Berserker", 2).with_tier_counts(table(2, 2, 4)),
        MobEntry::new("Outlander_Cultist", 1).with_tier_counts(table(1, 1, 0)),
        MobEntry::new("Outlander_Hunter", 1).with_tier_counts(table(1, 1, 2)),
        MobEntry::new("Outlander_Stalker", 1).with_tier_counts(table(1, 1, 0)),
        MobEntry::new("Outlander_Brute", 1).with_tier_counts(table(1, 1, 1)),
        MobEntry::new("Outlander_Priest", 1).with_tier_counts(table(0, 0, 0)),
    ])
    .with_variant(
        CompositionVariant::new(Some(Legendary), 0.3)
            .with_count("Outlander_Berserker", 3)
            .with_count("Outlander_Priest", 1),
    )
    .with_variant(
        CompositionVariant::new(Some(Epic), 0.05)
            .with_count("Outlander_Cultist", 0)
            .with_count("Outlander_Priest", 1),
    );

    Theme::new("outlander", "Outlander Cult", [Rare, Epic, Legendary])
        .with_mobs(normal.mobs.clone())
        .with_bosses(bosses(&["Werewolf", "Yeti"]))
        .with_stages(vec![normal, Stage::boss(bosses(&["Werewolf", "Yeti"]))])
}

/// Void: Epic swaps the crawler pack for eyes and spawn.
fn void() -> Theme {
    let normal = Stage::normal(vec![
        MobEntry::new("Crawler_Void", 2).with_tier_counts([(Uncommon, 2), (Rare, 2)]),
        MobEntry::new("Spectre_Void", 2).with_tier_counts([(Uncommon, 2), (Rare, 2)]),
        MobEntry::new("Eye_Void", 2).with_tier_counts([(Epic, 2)]),
        MobEntry::new("Spawn_Void", 3).with_tier_counts([(Epic, 3)]),
    ]);

    Theme::new("void", "Voidspawn", [Uncommon, Rare, Epic])
        .with_mobs(normal.mobs.clone())
        .with_bosses(bosses(&["Spawn_Void"]))
        .with_stages(vec![normal, Stage::boss(bosses(&["Spawn_Void"]))])
}

pub fn default_tier_settings() -> BTreeMap<Tier, TierSettings> {
    Tier::ALL
        .into_iter()
        .map(|tier| (tier, TierSettings::default_for(tier)))
        .collect()
}

pub fn default_zone_chances() -> BTreeMap<String, ZoneSpawnChances> {
    let mut zones: BTreeMap<String, ZoneSpawnChances> = (0..4)
        .map(|zone| (zone.to_string(), ZoneSpawnChances::default_for_zone(zone)))
        .collect();
    zones.insert(
        ZoneSpawnChances::DEFAULT_KEY.to_string(),
        ZoneSpawnChances::default_for_zone(4),
    );
    zones
}

fn entry(id: &str, min: u32, max: u32) -> RewardEntry {
    RewardEntry::new(id, min, max)
}

/// Reference loot tables.
pub fn default_tier_rewards(tier: Tier) -> TierRewards {
    match tier {
        Uncommon => TierRewards::new(
            vec![
                entry("Ingredient_Bar_Copper", 5, 7),
                entry("Ingredient_Leather_Light", 2, 3),
                entry("Potion_Health_Lesser", 1, 2),
                entry("Weapon_Bomb", 3, 4),
                entry("Weapon_Bomb_Potion_Poison", 1, 1),
            ],
            vec![],
        ),
        Rare => TierRewards::new(
            vec![
                entry("Ingredient_Bar_Iron", 5, 7),
                entry("Ingredient_Leather_Medium", 2, 3),
                entry("Potion_Health", 1, 2),
                entry("Ingredient_Fire_Essence", 3, 4),
                entry("Ingredient_Fabric_Scrap_Shadoweave", 5, 5),
                entry("Weapon_Bomb", 4, 5),
                entry("Weapon_Bomb_Potion_Poison", 1, 2),
            ],
            vec![
                entry("Ingredient_Bar_Copper", 2, 4).with_chance(35.0),
                entry("Potion_Health_Lesser", 1, 1).with_chance(35.0),
            ],
        ),
        Epic => TierRewards::new(
            vec![
                entry("Ingredient_Bar_Cobalt", 5, 7).with_chance(50.0),
                entry("Ingredient_Bar_Thorium", 5, 7).with_chance(50.0),
                entry("Ingredient_Leather_Heavy", 2, 3),
                entry("Potion_Health_Greater", 1, 2),
                entry("Ingredient_Fire_Essence", 3, 4),
                entry("Ingredient_Fabric_Scrap_Shadoweave", 5, 5),
                entry("Weapon_Bomb", 5, 6),
                entry("Weapon_Bomb_Potion_Poison", 2, 3),
            ],
            vec![
                entry("Ingredient_Bar_Copper", 2, 4).with_chance(30.0),
                entry("Ingredient_Bar_Iron", 2, 4).with_chance(30.0),
                entry("Potion_Health_Lesser", 1, 1).with_chance(30.0),
                entry("Potion_Health", 1, 1).with_chance(30.0),
            ],
        ),
        Legendary => TierRewards::new(
            vec![
                entry("Ingredient_Bar_Adamantite", 5, 8),
                entry("Ingredient_Leather_Heavy", 3, 4),
                entry("Potion_Health_Greater", 2, 3),
                entry("Ingredient_Fire_Essence", 4, 6),
                entry("Ingredient_Fabric_Scrap_Shadoweave", 8, 10),
                entry("Weapon_Bomb", 6, 8),
                entry("Weapon_Bomb_Potion_Poison", 3, 4),
            ],
            vec![
                entry("Ingredient_Bar_Copper", 3, 5).with_chance(25.0),
                entry("Ingredient_Bar_Iron", 3, 5).with_chance(25.0),
                entry("Ingredient_Bar_Cobalt", 2, 4).with_chance(25.0),
                entry("Ingredient_Bar_Thorium", 2, 4).with_chance(25.0),
                entry("Potion_Health_Lesser", 1, 2).with_chance(25.0),
                entry("Potion_Health", 1, 2).with_chance(25.0),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_validating_builtin_themes_then_none_report_problems() {
        for theme in default_themes() {
            assert!(theme.validate().is_empty(), "{}: {:?}", theme.id, theme.validate());
        }
    }

    #[test]
    fn when_listing_builtin_themes_then_every_tier_has_one() {
        let themes = default_themes();
        for tier in Tier::ALL {
            assert!(themes.iter().any(|t| t.is_available_for(tier)), "tier {}", tier);
        }
    }

    #[test]
    fn when_translating_legacy_index_then_known_ids_come_back() {
        assert_eq!(legacy_theme_id(0), Some("skeleton"));
        assert_eq!(legacy_theme_id(12), Some("burnt_legendary"));
        assert_eq!(legacy_theme_id(17), Some("zombie"));
        assert_eq!(legacy_theme_id(18), None);
    }

    #[test]
    fn when_expanding_outlander_waves_then_priest_only_comes_from_variant() {
        let theme = default_themes()
            .into_iter()
            .find(|t| t.id == "outlander")
            .expect("outlander present");
        let stage = theme.stage(0).expect("normal stage");
        let plain = stage.mob_ids(Legendary, &mut || 0.99);
        assert!(!plain.iter().any(|id| id == "Outlander_Priest"));
        assert_eq!(plain.len(), 7);
        let rolled = stage.mob_ids(Legendary, &mut || 0.0);
        assert_eq!(rolled.iter().filter(|id| *id == "Outlander_Priest").count(), 1);
        assert_eq!(rolled.len(), 7);
    }
}
