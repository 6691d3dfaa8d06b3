//! Theme content model.
//!
//! A theme is a named content pack: the tiers it may appear in, the actors it
//! fields, and optionally an ordered list of stages. Themes without an explicit
//! stage list use the legacy layout of one normal stage followed by one boss
//! stage, both synthesized from the theme-level mob and boss lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::value_objects::{StatMultipliers, Tier};

use super::rewards::TierRewards;

/// Stage count for themes without an explicit stage list.
pub const LEGACY_STAGE_COUNT: usize = 2;

// =============================================================================
// Entries
// =============================================================================

/// A regular actor in a normal stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MobEntry {
    pub id: String,
    pub count: u32,
    /// When present, replaces `count`; a tier missing from the table means zero.
    pub tier_counts: Option<BTreeMap<Tier, u32>>,
    pub multipliers: BTreeMap<Tier, StatMultipliers>,
}

impl MobEntry {
    pub fn new(id: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            count: count.max(1),
            tier_counts: None,
            multipliers: BTreeMap::new(),
        }
    }

    pub fn with_tier_counts(mut self, counts: impl IntoIterator<Item = (Tier, u32)>) -> Self {
        self.tier_counts = Some(counts.into_iter().collect());
        self
    }

    pub fn with_multipliers(mut self, tier: Tier, multipliers: StatMultipliers) -> Self {
        self.multipliers.insert(tier, multipliers);
        self
    }

    pub fn count_for(&self, tier: Tier) -> u32 {
        match &self.tier_counts {
            Some(table) => table.get(&tier).copied().unwrap_or(0),
            None => self.count,
        }
    }

    pub fn multipliers_for(&self, tier: Tier) -> Option<StatMultipliers> {
        self.multipliers.get(&tier).copied()
    }
}

/// A boss actor in a boss stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BossEntry {
    pub id: String,
    pub multipliers: BTreeMap<Tier, StatMultipliers>,
}

impl BossEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            multipliers: BTreeMap::new(),
        }
    }

    pub fn with_multipliers(mut self, tier: Tier, multipliers: StatMultipliers) -> Self {
        self.multipliers.insert(tier, multipliers);
        self
    }

    pub fn multipliers_for(&self, tier: Tier) -> Option<StatMultipliers> {
        self.multipliers.get(&tier).copied()
    }
}

/// A rolled alternative composition for a normal stage.
///
/// When the variant applies (tier matches, roll under `chance`) the listed
/// entries take the given counts instead of their usual ones. Entries not
/// listed are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionVariant {
    /// `None` applies at every tier.
    pub tier: Option<Tier>,
    /// Probability in `[0, 1]`.
    pub chance: f64,
    pub counts: BTreeMap<String, u32>,
}

impl CompositionVariant {
    pub fn new(tier: Option<Tier>, chance: f64) -> Self {
        Self {
            tier,
            chance: chance.clamp(0.0, 1.0),
            counts: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, id: impl Into<String>, count: u32) -> Self {
        self.counts.insert(id.into(), count);
        self
    }

    pub fn applies_to(&self, tier: Tier) -> bool {
        self.tier.map_or(true, |t| t == tier)
    }
}

// =============================================================================
// Stages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StageKind {
    #[default]
    Normal,
    Boss,
}

impl StageKind {
    pub fn is_boss(self) -> bool {
        matches!(self, StageKind::Boss)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Normal => f.write_str("normal"),
            StageKind::Boss => f.write_str("boss"),
        }
    }
}

impl FromStr for StageKind {
    type Err = std::convert::Infallible;

    /// Anything other than "boss" is a normal stage.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("boss") {
            Ok(StageKind::Boss)
        } else {
            Ok(StageKind::Normal)
        }
    }
}

/// One spawn-and-clear phase of an encounter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stage {
    pub kind: StageKind,
    pub mobs: Vec<MobEntry>,
    pub bosses: Vec<BossEntry>,
    pub random_boss_selection: bool,
    pub variants: Vec<CompositionVariant>,
}

impl Stage {
    pub fn normal(mobs: Vec<MobEntry>) -> Self {
        Self {
            kind: StageKind::Normal,
            mobs,
            ..Self::default()
        }
    }

    pub fn boss(bosses: Vec<BossEntry>) -> Self {
        Self {
            kind: StageKind::Boss,
            bosses,
            ..Self::default()
        }
    }

    pub fn with_random_boss_selection(mut self, enabled: bool) -> Self {
        self.random_boss_selection = enabled;
        self
    }

    pub fn with_variant(mut self, variant: CompositionVariant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Expand mob entries into one id per actor.
    ///
    /// `roll` yields values in `[0, 1)`; one roll is consumed per variant that
    /// applies to `tier`, in declaration order, until one hits.
    pub fn mob_ids(&self, tier: Tier, roll: &mut impl FnMut() -> f64) -> Vec<String> {
        let variant = self
            .variants
            .iter()
            .filter(|v| v.applies_to(tier))
            .find(|v| roll() < v.chance);

        let mut ids = Vec::new();
        for mob in &self.mobs {
            let count = variant
                .and_then(|v| v.counts.get(&mob.id).copied())
                .unwrap_or_else(|| mob.count_for(tier));
            ids.extend(std::iter::repeat(mob.id.clone()).take(count as usize));
        }
        ids
    }

    /// Boss ids for this stage.
    ///
    /// With random selection a single boss is picked via `pick(len)`, preferring
    /// bosses that define multipliers for `tier`.
    pub fn boss_ids(&self, tier: Tier, pick: &mut impl FnMut(usize) -> usize) -> Vec<String> {
        if !self.random_boss_selection || self.bosses.len() <= 1 {
            return self.bosses.iter().map(|b| b.id.clone()).collect();
        }

        let tuned: Vec<&BossEntry> = self
            .bosses
            .iter()
            .filter(|b| b.multipliers.contains_key(&tier))
            .collect();
        let pool: Vec<&BossEntry> = if tuned.is_empty() {
            self.bosses.iter().collect()
        } else {
            tuned
        };

        let index = pick(pool.len()).min(pool.len() - 1);
        vec![pool[index].id.clone()]
    }

    pub fn multipliers_for(&self, tier: Tier, actor_id: &str) -> Option<StatMultipliers> {
        let from_mobs = self
            .mobs
            .iter()
            .find(|m| m.id == actor_id)
            .and_then(|m| m.multipliers_for(tier));
        from_mobs.or_else(|| {
            self.bosses
                .iter()
                .find(|b| b.id == actor_id)
                .and_then(|b| b.multipliers_for(tier))
        })
    }
}

// =============================================================================
// Theme
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Theme {
    pub id: String,
    pub display_name: String,
    pub tiers: BTreeSet<Tier>,
    /// Excluded from random selection; only reachable by explicit override.
    pub test_only: bool,
    pub mobs: Vec<MobEntry>,
    pub bosses: Vec<BossEntry>,
    pub random_boss_selection: bool,
    pub stages: Vec<Stage>,
    pub reward_overrides: BTreeMap<Tier, TierRewards>,
}

impl Theme {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        tiers: impl IntoIterator<Item = Tier>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            tiers: tiers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_mobs(mut self, mobs: Vec<MobEntry>) -> Self {
        self.mobs = mobs;
        self
    }

    pub fn with_bosses(mut self, bosses: Vec<BossEntry>) -> Self {
        self.bosses = bosses;
        self
    }

    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_random_boss_selection(mut self, enabled: bool) -> Self {
        self.random_boss_selection = enabled;
        self
    }

    pub fn with_test_only(mut self, test_only: bool) -> Self {
        self.test_only = test_only;
        self
    }

    pub fn with_reward_override(mut self, tier: Tier, rewards: TierRewards) -> Self {
        self.reward_overrides.insert(tier, rewards);
        self
    }

    pub fn is_available_for(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }

    pub fn has_multi_wave(&self) -> bool {
        !self.stages.is_empty()
    }

    pub fn stage_count(&self) -> usize {
        if self.has_multi_wave() {
            self.stages.len()
        } else {
            LEGACY_STAGE_COUNT
        }
    }

    /// Stage at `index`, synthesizing the legacy pair when no list is declared.
    pub fn stage(&self, index: usize) -> Option<Stage> {
        if self.has_multi_wave() {
            return self.stages.get(index).cloned();
        }
        match index {
            0 => Some(Stage::normal(self.mobs.clone())),
            1 => Some(
                Stage::boss(self.bosses.clone())
                    .with_random_boss_selection(self.random_boss_selection),
            ),
            _ => None,
        }
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        (0..self.stage_count())
            .filter_map(|i| self.stage(i).map(|s| s.kind))
            .collect()
    }

    pub fn normal_stage_count(&self) -> usize {
        self.stage_kinds().iter().filter(|k| !k.is_boss()).count()
    }

    pub fn boss_stage_count(&self) -> usize {
        self.stage_kinds().iter().filter(|k| k.is_boss()).count()
    }

    /// Per-stage vectors win for multi-wave themes, then theme-level entries.
    pub fn multipliers_for(
        &self,
        tier: Tier,
        stage_index: usize,
        actor_id: &str,
    ) -> Option<StatMultipliers> {
        let staged = if self.has_multi_wave() {
            self.stages
                .get(stage_index)
                .and_then(|s| s.multipliers_for(tier, actor_id))
        } else {
            None
        };
        staged.or_else(|| {
            self.mobs
                .iter()
                .find(|m| m.id == actor_id)
                .and_then(|m| m.multipliers_for(tier))
                .or_else(|| {
                    self.bosses
                        .iter()
                        .find(|b| b.id == actor_id)
                        .and_then(|b| b.multipliers_for(tier))
                })
        })
    }

    pub fn reward_override(&self, tier: Tier) -> Option<&TierRewards> {
        self.reward_overrides.get(&tier)
    }

    /// Load-time problems, one message each. Empty means the theme is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.id.trim().is_empty() {
            problems.push("Theme is missing an id".to_string());
        }
        if self.display_name.trim().is_empty() {
            problems.push(format!("Theme '{}' has no displayName", self.id));
        }
        if self.tiers.is_empty() {
            problems.push(format!("Theme '{}' has no tiers", self.id));
        }

        if self.has_multi_wave() {
            for (i, stage) in self.stages.iter().enumerate() {
                match stage.kind {
                    StageKind::Normal if stage.mobs.is_empty() => problems.push(format!(
                        "Theme '{}' wave {} (normal) has no mobs",
                        self.id, i
                    )),
                    StageKind::Boss if stage.bosses.is_empty() => problems.push(format!(
                        "Theme '{}' wave {} (boss) has no bosses",
                        self.id, i
                    )),
                    _ => {}
                }
            }
        } else {
            if self.mobs.is_empty() {
                problems.push(format!("Theme '{}' has no mobs", self.id));
            }
            if self.bosses.is_empty() {
                problems.push(format!("Theme '{}' has no bosses", self.id));
            }
        }

        for tier in &self.tiers {
            let resolves = (0..self.stage_count())
                .filter_map(|i| self.stage(i))
                .any(|s| match s.kind {
                    StageKind::Normal => s.mobs.iter().any(|m| m.count_for(*tier) > 0),
                    StageKind::Boss => !s.bosses.is_empty(),
                });
            if !resolves {
                problems.push(format!(
                    "Theme '{}' has no non-empty stage for tier {}",
                    self.id, tier
                ));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never() -> impl FnMut() -> f64 {
        || 0.99
    }

    #[test]
    fn when_tier_table_exists_then_it_overrides_flat_count() {
        let mob = MobEntry::new("Wolf", 2).with_tier_counts([(Tier::Uncommon, 4), (Tier::Epic, 5)]);
        assert_eq!(mob.count_for(Tier::Uncommon), 4);
        assert_eq!(mob.count_for(Tier::Rare), 0);
        assert_eq!(mob.count_for(Tier::Epic), 5);
    }

    #[test]
    fn when_count_is_zero_then_one_is_used() {
        assert_eq!(MobEntry::new("Wolf", 0).count, 1);
    }

    #[test]
    fn when_expanding_stage_then_each_entry_repeats_count_times() {
        let stage = Stage::normal(vec![MobEntry::new("A", 3), MobEntry::new("B", 1)]);
        let ids = stage.mob_ids(Tier::Uncommon, &mut never());
        assert_eq!(ids, vec!["A", "A", "A", "B"]);
    }

    #[test]
    fn when_variant_roll_hits_then_listed_counts_are_replaced() {
        let stage = Stage::normal(vec![
            MobEntry::new("Berserker", 4),
            MobEntry::new("Priest", 1).with_tier_counts(Vec::<(Tier, u32)>::new()),
        ])
        .with_variant(
            CompositionVariant::new(Some(Tier::Legendary), 0.3)
                .with_count("Berserker", 3)
                .with_count("Priest", 1),
        );

        let hit = stage.mob_ids(Tier::Legendary, &mut || 0.1);
        assert_eq!(hit.iter().filter(|id| *id == "Priest").count(), 1);
        assert_eq!(hit.iter().filter(|id| *id == "Berserker").count(), 3);

        let miss = stage.mob_ids(Tier::Legendary, &mut || 0.5);
        assert!(!miss.contains(&"Priest".to_string()));

        let other_tier = stage.mob_ids(Tier::Epic, &mut || 0.0);
        assert_eq!(other_tier.len(), 4);
    }

    #[test]
    fn when_boss_is_random_then_tuned_bosses_are_preferred() {
        let tuned = StatMultipliers::new(2.0, 1.5, 1.2, 1.0);
        let stage = Stage::boss(vec![
            BossEntry::new("Yeti"),
            BossEntry::new("Werewolf").with_multipliers(Tier::Epic, tuned),
        ])
        .with_random_boss_selection(true);

        assert_eq!(stage.boss_ids(Tier::Epic, &mut |_| 0), vec!["Werewolf"]);
        assert_eq!(stage.boss_ids(Tier::Rare, &mut |len| len - 1), vec!["Werewolf"]);
        assert_eq!(stage.boss_ids(Tier::Rare, &mut |_| 0), vec!["Yeti"]);
    }

    #[test]
    fn when_theme_is_legacy_then_normal_then_boss_is_synthesized() {
        let theme = Theme::new("t", "T", [Tier::Uncommon])
            .with_mobs(vec![MobEntry::new("A", 1)])
            .with_bosses(vec![BossEntry::new("B")]);
        assert_eq!(theme.stage_count(), 2);
        assert_eq!(theme.stage(0).map(|s| s.kind), Some(StageKind::Normal));
        assert_eq!(theme.stage(1).map(|s| s.kind), Some(StageKind::Boss));
        assert!(theme.stage(2).is_none());
        assert_eq!(theme.normal_stage_count(), 1);
        assert_eq!(theme.boss_stage_count(), 1);
    }

    #[test]
    fn when_stage_has_no_multipliers_then_theme_level_applies() {
        let stage_mult = StatMultipliers::new(3.0, 1.0, 1.0, 1.0);
        let theme_mult = StatMultipliers::new(1.5, 1.0, 1.0, 1.0);
        let theme = Theme::new("t", "T", [Tier::Rare])
            .with_mobs(vec![MobEntry::new("Ghoul", 1).with_multipliers(Tier::Rare, theme_mult)])
            .with_stages(vec![Stage::normal(vec![
                MobEntry::new("Ghoul", 2).with_multipliers(Tier::Rare, stage_mult)
            ])]);
        assert_eq!(theme.multipliers_for(Tier::Rare, 0, "Ghoul"), Some(stage_mult));
        assert_eq!(theme.multipliers_for(Tier::Rare, 5, "Ghoul"), Some(theme_mult));
        assert_eq!(theme.multipliers_for(Tier::Epic, 0, "Ghoul"), None);
    }

    #[test]
    fn when_stage_is_empty_then_validate_reports_it() {
        let theme = Theme::new("broken", "", [Tier::Epic]).with_stages(vec![
            Stage::normal(vec![]),
            Stage::boss(vec![]),
        ]);
        let problems = theme.validate();
        assert!(problems.iter().any(|p| p.contains("no displayName")));
        assert!(problems.iter().any(|p| p.contains("wave 0 (normal) has no mobs")));
        assert!(problems.iter().any(|p| p.contains("wave 1 (boss) has no bosses")));
    }

    #[test]
    fn when_theme_is_complete_then_validate_is_clean() {
        let theme = Theme::new("ok", "Ok", [Tier::Uncommon])
            .with_mobs(vec![MobEntry::new("A", 1)])
            .with_bosses(vec![BossEntry::new("B")]);
        assert!(theme.validate().is_empty());
    }

    #[test]
    fn when_parsing_stage_kind_then_unknown_means_normal() {
        assert_eq!("BOSS".parse::<StageKind>(), Ok(StageKind::Boss));
        assert_eq!("whatever".parse::<StageKind>(), Ok(StageKind::Normal));
    }
}
