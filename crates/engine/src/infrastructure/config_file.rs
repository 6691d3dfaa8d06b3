//! JSON configuration file adapter.
//!
//! The document is camelCase JSON with tiers and zones keyed by strings
//! ("1".."4", "0".."n", "default"). A missing file is created from the
//! built-in defaults; sections absent from an existing file fall back to
//! their defaults one by one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cometwave_domain::defaults::{self, legacy_theme_id};
use cometwave_domain::{
    BossEntry, CometSettings, CompositionVariant, MobEntry, RewardEntry, SpawnSettings, Stage,
    StageKind, StatMultipliers, Theme, ThemeCatalog, Tier, TierRewards, TierSettings,
    ZoneSpawnChances,
};

use crate::infrastructure::ports::{ConfigError, ConfigSource};

pub struct JsonConfigSource {
    path: PathBuf,
}

impl JsonConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a document that is already in memory.
    pub fn parse(json: &str) -> Result<CometSettings, ConfigError> {
        let stored: ConfigStored =
            serde_json::from_str(json).map_err(ConfigError::malformed)?;
        Ok(stored.into_settings())
    }

    pub fn render(settings: &CometSettings) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(&ConfigStored::from(settings)).map_err(ConfigError::io)
    }
}

impl ConfigSource for JsonConfigSource {
    fn load(&self) -> Result<CometSettings, ConfigError> {
        if !self.path.exists() {
            let settings = CometSettings::default();
            tracing::info!(path = %self.path.display(), "Config file missing, writing defaults");
            if let Err(e) = self.save(&settings) {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to write default config");
            }
            return Ok(settings);
        }

        let json = std::fs::read_to_string(&self.path).map_err(ConfigError::io)?;
        let settings = Self::parse(&json)?;
        tracing::info!(
            path = %self.path.display(),
            themes = settings.catalog.len(),
            "Config loaded"
        );
        Ok(settings)
    }

    fn save(&self, settings: &CometSettings) -> Result<(), ConfigError> {
        let json = Self::render(settings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ConfigError::io)?;
        }
        std::fs::write(&self.path, json).map_err(ConfigError::io)
    }
}

fn tier_from_key(key: &str) -> Option<Tier> {
    let ordinal: u8 = key.trim().parse().ok()?;
    Tier::from_ordinal(ordinal).ok()
}

fn tier_key(tier: Tier) -> String {
    tier.ordinal().to_string()
}

/// Per-tier table keyed by "1".."4"; unknown keys are logged and skipped.
fn tier_table<S, T>(stored: BTreeMap<String, S>, section: &str) -> BTreeMap<Tier, T>
where
    T: From<S>,
{
    let mut table = BTreeMap::new();
    for (key, value) in stored {
        match tier_from_key(&key) {
            Some(tier) => {
                table.insert(tier, T::from(value));
            }
            None => tracing::warn!(section, key = %key, "Ignoring unknown tier key"),
        }
    }
    table
}

// =============================================================================
// Persistence serde models
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigStored {
    spawn_settings: Option<SpawnSettingsStored>,
    tier_settings: Option<BTreeMap<String, TierSettingsStored>>,
    reward_settings: Option<BTreeMap<String, TierRewardsStored>>,
    zone_spawn_chances: Option<BTreeMap<String, ZoneSpawnChances>>,
    themes: Option<BTreeMap<String, ThemeStored>>,
}

impl ConfigStored {
    fn into_settings(self) -> CometSettings {
        let mut settings = CometSettings::default();

        if let Some(spawn) = self.spawn_settings {
            settings.spawn = spawn.into_settings().normalized();
        }

        if let Some(stored) = self.tier_settings {
            settings
                .tier_settings
                .extend(tier_table::<_, TierSettings>(stored, "tierSettings"));
        }

        if let Some(stored) = self.reward_settings {
            settings.tier_rewards = tier_table(stored, "rewardSettings");
        }

        if let Some(zones) = self.zone_spawn_chances {
            settings.zone_chances = zones
                .into_iter()
                .map(|(zone, mut chances)| {
                    if !chances.is_valid() {
                        tracing::warn!(zone = %zone, total = chances.total(), "Zone chances do not sum to 1, normalizing");
                        chances.normalize();
                    }
                    (zone, chances)
                })
                .collect();
            settings
                .zone_chances
                .entry(ZoneSpawnChances::DEFAULT_KEY.to_string())
                .or_insert_with(|| ZoneSpawnChances::default_for_zone(4));
        }

        if let Some(themes) = self.themes {
            let parsed: Vec<Theme> = themes
                .into_iter()
                .map(|(key, theme)| theme.into_theme(&key))
                .collect();
            if parsed.is_empty() {
                tracing::warn!("Config lists no themes, keeping built-in catalog");
            } else {
                settings.catalog = ThemeCatalog::new(parsed);
            }
        }

        settings
    }
}

impl From<&CometSettings> for ConfigStored {
    fn from(settings: &CometSettings) -> Self {
        let rewards = if settings.tier_rewards.is_empty() {
            Tier::ALL
                .into_iter()
                .map(|t| (t, defaults::default_tier_rewards(t)))
                .collect()
        } else {
            settings.tier_rewards.clone()
        };

        Self {
            spawn_settings: Some(SpawnSettingsStored::from(&settings.spawn)),
            tier_settings: Some(
                Tier::ALL
                    .into_iter()
                    .map(|t| (tier_key(t), settings.tier_settings(t).into()))
                    .collect(),
            ),
            reward_settings: Some(
                rewards
                    .iter()
                    .map(|(t, r)| (tier_key(*t), TierRewardsStored::from(r)))
                    .collect(),
            ),
            zone_spawn_chances: Some(settings.zone_chances.clone()),
            themes: Some(
                settings
                    .catalog
                    .iter()
                    .map(|t| (t.id.clone(), ThemeStored::from(t)))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpawnSettingsStored {
    min_delay_seconds: Option<u32>,
    max_delay_seconds: Option<u32>,
    spawn_chance: Option<f64>,
    despawn_time_minutes: Option<f64>,
    min_spawn_distance: Option<u32>,
    max_spawn_distance: Option<u32>,
    natural_spawns_enabled: Option<bool>,
}

impl SpawnSettingsStored {
    fn into_settings(self) -> SpawnSettings {
        let base = SpawnSettings::default();
        SpawnSettings {
            min_delay_seconds: self.min_delay_seconds.unwrap_or(base.min_delay_seconds),
            max_delay_seconds: self.max_delay_seconds.unwrap_or(base.max_delay_seconds),
            spawn_chance: self.spawn_chance.unwrap_or(base.spawn_chance),
            despawn_minutes: self.despawn_time_minutes.unwrap_or(base.despawn_minutes),
            min_spawn_distance: self.min_spawn_distance.unwrap_or(base.min_spawn_distance),
            max_spawn_distance: self.max_spawn_distance.unwrap_or(base.max_spawn_distance),
            natural_spawns_enabled: self
                .natural_spawns_enabled
                .unwrap_or(base.natural_spawns_enabled),
        }
    }
}

impl From<&SpawnSettings> for SpawnSettingsStored {
    fn from(value: &SpawnSettings) -> Self {
        Self {
            min_delay_seconds: Some(value.min_delay_seconds),
            max_delay_seconds: Some(value.max_delay_seconds),
            spawn_chance: Some(value.spawn_chance),
            despawn_time_minutes: Some(value.despawn_minutes),
            min_spawn_distance: Some(value.min_spawn_distance),
            max_spawn_distance: Some(value.max_spawn_distance),
            natural_spawns_enabled: Some(value.natural_spawns_enabled),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TierSettingsStored {
    timeout_seconds: u32,
    min_radius: f64,
    max_radius: f64,
}

impl From<TierSettingsStored> for TierSettings {
    fn from(value: TierSettingsStored) -> Self {
        TierSettings::new(value.timeout_seconds, value.min_radius, value.max_radius)
    }
}

impl From<TierSettings> for TierSettingsStored {
    fn from(value: TierSettings) -> Self {
        Self {
            timeout_seconds: value.timeout_seconds(),
            min_radius: value.min_radius(),
            max_radius: value.max_radius(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TierRewardsStored {
    drops: Vec<RewardEntryStored>,
    bonus_drops: Vec<RewardEntryStored>,
}

impl From<TierRewardsStored> for TierRewards {
    fn from(value: TierRewardsStored) -> Self {
        TierRewards::new(
            value.drops.into_iter().map(Into::into).collect(),
            value.bonus_drops.into_iter().map(Into::into).collect(),
        )
    }
}

impl From<&TierRewards> for TierRewardsStored {
    fn from(value: &TierRewards) -> Self {
        Self {
            drops: value.drops.iter().map(Into::into).collect(),
            bonus_drops: value.bonus_drops.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewardEntryStored {
    id: String,
    #[serde(default = "one")]
    min_count: u32,
    #[serde(default = "one")]
    max_count: u32,
    #[serde(default = "always")]
    chance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

fn one() -> u32 {
    1
}

fn always() -> f64 {
    RewardEntry::ALWAYS
}

impl From<RewardEntryStored> for RewardEntry {
    fn from(value: RewardEntryStored) -> Self {
        let entry =
            RewardEntry::new(value.id, value.min_count, value.max_count).with_chance(value.chance);
        match value.display_name {
            Some(name) => entry.with_display_name(name),
            None => entry,
        }
    }
}

impl From<&RewardEntry> for RewardEntryStored {
    fn from(value: &RewardEntry) -> Self {
        let display_name = value.display_name();
        Self {
            id: value.id.clone(),
            min_count: value.min_count(),
            max_count: value.max_count(),
            chance: value.chance(),
            display_name: (display_name != value.id).then(|| display_name.to_string()),
        }
    }
}

/// Per-tier multiplier vector; omitted fields mean 1.0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct MultipliersStored {
    hp: Option<f64>,
    damage: Option<f64>,
    scale: Option<f64>,
    speed: Option<f64>,
}

impl From<MultipliersStored> for StatMultipliers {
    fn from(value: MultipliersStored) -> Self {
        StatMultipliers::new(
            value.hp.unwrap_or(1.0),
            value.damage.unwrap_or(1.0),
            value.scale.unwrap_or(1.0),
            value.speed.unwrap_or(1.0),
        )
    }
}

impl From<StatMultipliers> for MultipliersStored {
    fn from(value: StatMultipliers) -> Self {
        Self {
            hp: Some(value.hp),
            damage: Some(value.damage),
            scale: Some(value.scale),
            speed: Some(value.speed),
        }
    }
}

fn stats_stored(multipliers: &BTreeMap<Tier, StatMultipliers>) -> BTreeMap<String, MultipliersStored> {
    multipliers
        .iter()
        .map(|(t, m)| (tier_key(*t), (*m).into()))
        .collect()
}

/// Either `"count": 3` or `"count": {"1": 2, "3": 4}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CountStored {
    Flat(u32),
    PerTier(BTreeMap<String, u32>),
}

impl Default for CountStored {
    fn default() -> Self {
        CountStored::Flat(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MobStored {
    id: String,
    #[serde(default)]
    count: CountStored,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    stats: BTreeMap<String, MultipliersStored>,
}

impl From<MobStored> for MobEntry {
    fn from(value: MobStored) -> Self {
        let mut mob = match value.count {
            CountStored::Flat(count) => MobEntry::new(value.id, count),
            CountStored::PerTier(table) => MobEntry::new(value.id, 1).with_tier_counts(
                tier_table::<u32, u32>(table, "count"),
            ),
        };
        mob.multipliers = tier_table(value.stats, "stats");
        mob
    }
}

impl From<&MobEntry> for MobStored {
    fn from(value: &MobEntry) -> Self {
        let count = match &value.tier_counts {
            Some(table) => CountStored::PerTier(
                table.iter().map(|(t, c)| (tier_key(*t), *c)).collect(),
            ),
            None => CountStored::Flat(value.count),
        };
        Self {
            id: value.id.clone(),
            count,
            stats: stats_stored(&value.multipliers),
        }
    }
}

/// Either `"Boss_Id"` or `{"id": "Boss_Id", "stats": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum BossStored {
    Id(String),
    Entry {
        id: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        stats: BTreeMap<String, MultipliersStored>,
    },
}

impl From<BossStored> for BossEntry {
    fn from(value: BossStored) -> Self {
        match value {
            BossStored::Id(id) => BossEntry::new(id),
            BossStored::Entry { id, stats } => {
                let mut boss = BossEntry::new(id);
                boss.multipliers = tier_table(stats, "stats");
                boss
            }
        }
    }
}

impl From<&BossEntry> for BossStored {
    fn from(value: &BossEntry) -> Self {
        if value.multipliers.is_empty() {
            BossStored::Id(value.id.clone())
        } else {
            BossStored::Entry {
                id: value.id.clone(),
                stats: stats_stored(&value.multipliers),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantStored {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tier: Option<u8>,
    chance: f64,
    counts: BTreeMap<String, u32>,
}

impl From<&CompositionVariant> for VariantStored {
    fn from(value: &CompositionVariant) -> Self {
        Self {
            tier: value.tier.map(Tier::ordinal),
            chance: value.chance,
            counts: value.counts.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WaveStored {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mobs: Vec<MobStored>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bosses: Vec<BossStored>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    random_boss_selection: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variants: Vec<VariantStored>,
}

impl WaveStored {
    fn into_stage(self, theme_id: &str) -> Stage {
        let kind: StageKind = self.kind.parse().unwrap_or_default();
        let mut stage = match kind {
            StageKind::Boss => Stage::boss(self.bosses.into_iter().map(Into::into).collect())
                .with_random_boss_selection(self.random_boss_selection),
            StageKind::Normal => Stage::normal(self.mobs.into_iter().map(Into::into).collect()),
        };
        for variant in self.variants {
            let tier = match variant.tier.map(Tier::from_ordinal).transpose() {
                Ok(tier) => tier,
                Err(e) => {
                    tracing::warn!(theme_id, error = %e, "Ignoring variant with invalid tier");
                    continue;
                }
            };
            let mut parsed = CompositionVariant::new(tier, variant.chance);
            for (id, count) in variant.counts {
                parsed = parsed.with_count(id, count);
            }
            stage = stage.with_variant(parsed);
        }
        stage
    }
}

impl From<&Stage> for WaveStored {
    fn from(value: &Stage) -> Self {
        Self {
            kind: value.kind.to_string(),
            mobs: value.mobs.iter().map(Into::into).collect(),
            bosses: value.bosses.iter().map(Into::into).collect(),
            random_boss_selection: value.random_boss_selection,
            variants: value.variants.iter().map(Into::into).collect(),
        }
    }
}

/// Theme-level multiplier block keyed by tier, then by actor id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TierMultipliersStored {
    mobs: BTreeMap<String, MultipliersStored>,
    bosses: BTreeMap<String, MultipliersStored>,
    /// Applies to every boss of the theme.
    boss: Option<MultipliersStored>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ThemeStored {
    display_name: String,
    tiers: Vec<u8>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    test_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    random_boss_selection: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mobs: Vec<MobStored>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bosses: Vec<BossStored>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    waves: Vec<WaveStored>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    stat_multipliers: BTreeMap<String, TierMultipliersStored>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    reward_override: BTreeMap<String, TierRewardsStored>,
}

impl ThemeStored {
    /// Build the domain theme; numeric legacy keys map to their string ids.
    fn into_theme(self, key: &str) -> Theme {
        let id = key
            .parse::<usize>()
            .ok()
            .and_then(legacy_theme_id)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string());

        let tiers: Vec<Tier> = self
            .tiers
            .iter()
            .filter_map(|o| Tier::from_ordinal(*o).ok())
            .collect();
        let stages: Vec<Stage> = self
            .waves
            .into_iter()
            .map(|w| w.into_stage(&id))
            .collect();

        let mut theme = Theme::new(id.clone(), self.display_name, tiers)
            .with_mobs(self.mobs.into_iter().map(Into::into).collect())
            .with_bosses(self.bosses.into_iter().map(Into::into).collect())
            .with_stages(stages)
            .with_random_boss_selection(self.random_boss_selection)
            .with_test_only(self.test_only);

        for (key, block) in self.stat_multipliers {
            let Some(tier) = tier_from_key(&key) else {
                tracing::warn!(theme_id = %id, key = %key, "Ignoring unknown tier in statMultipliers");
                continue;
            };
            apply_theme_multipliers(&mut theme, tier, block);
        }

        for (tier, rewards) in tier_table::<_, TierRewards>(self.reward_override, "rewardOverride") {
            theme = theme.with_reward_override(tier, rewards);
        }
        theme
    }
}

/// The theme-level block fills gaps only; inline entry stats win.
fn apply_theme_multipliers(theme: &mut Theme, tier: Tier, block: TierMultipliersStored) {
    let staged_mobs = theme.stages.iter_mut().flat_map(|s| s.mobs.iter_mut());
    for mob in theme.mobs.iter_mut().chain(staged_mobs) {
        if let Some(m) = block.mobs.get(&mob.id) {
            mob.multipliers.entry(tier).or_insert((*m).into());
        }
    }
    let staged_bosses = theme.stages.iter_mut().flat_map(|s| s.bosses.iter_mut());
    for boss in theme.bosses.iter_mut().chain(staged_bosses) {
        let specific = block.bosses.get(&boss.id).copied().or(block.boss);
        if let Some(m) = specific {
            boss.multipliers.entry(tier).or_insert(m.into());
        }
    }
}

impl From<&Theme> for ThemeStored {
    fn from(value: &Theme) -> Self {
        Self {
            display_name: value.display_name.clone(),
            tiers: value.tiers.iter().map(|t| t.ordinal()).collect(),
            test_only: value.test_only,
            random_boss_selection: value.random_boss_selection,
            mobs: value.mobs.iter().map(Into::into).collect(),
            bosses: value.bosses.iter().map(Into::into).collect(),
            waves: value.stages.iter().map(Into::into).collect(),
            stat_multipliers: BTreeMap::new(),
            reward_override: value
                .reward_overrides
                .iter()
                .map(|(t, r)| (tier_key(*t), r.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_file_is_missing_then_defaults_are_written_and_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comet_config.json");
        let source = JsonConfigSource::new(&path);

        let settings = source.load().unwrap();

        assert_eq!(settings, CometSettings::default());
        assert!(path.exists());
        let reloaded = source.load().unwrap();
        assert_eq!(reloaded.catalog.len(), settings.catalog.len());
        assert_eq!(reloaded.tier_settings(Tier::Epic).timeout_seconds(), 180);
    }

    #[test]
    fn when_document_is_malformed_then_load_reports_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comet_config.json");
        std::fs::write(&path, "{ \"themes\": [").unwrap();

        let err = JsonConfigSource::new(&path).load().unwrap_err();

        assert!(err.is_malformed());
    }

    #[test]
    fn when_sections_are_missing_then_each_falls_back_to_defaults() {
        let settings = JsonConfigSource::parse(
            r#"{ "spawnSettings": { "spawnChance": 0.75, "despawnTimeMinutes": 10 } }"#,
        )
        .unwrap();

        assert_eq!(settings.spawn.spawn_chance, 0.75);
        assert_eq!(settings.spawn.despawn_minutes, 10.0);
        assert_eq!(settings.spawn.min_delay_seconds, 120);
        assert_eq!(settings.catalog, ThemeCatalog::builtin());
        assert_eq!(settings.tier_settings(Tier::Rare).timeout_seconds(), 150);
    }

    #[test]
    fn when_theme_uses_every_entry_form_then_all_are_parsed() {
        let settings = JsonConfigSource::parse(
            r#"{
              "themes": {
                "bandits": {
                  "displayName": "Bandit Camp",
                  "tiers": [2, 3],
                  "waves": [
                    { "type": "normal",
                      "mobs": [
                        { "id": "Bandit", "count": { "2": 3, "3": 5 } },
                        { "id": "Bandit_Archer", "count": 1,
                          "stats": { "3": { "hp": 1.5 } } }
                      ],
                      "variants": [ { "tier": 3, "chance": 0.3, "counts": { "Bandit_Archer": 2 } } ]
                    },
                    { "type": "boss", "bosses": ["Bandit_Chief", { "id": "Bandit_Brute" }],
                      "randomBossSelection": true }
                  ],
                  "rewardOverride": {
                    "3": { "drops": [ { "id": "Gold_Bar", "minCount": 2, "maxCount": 4 } ] }
                  }
                }
              }
            }"#,
        )
        .unwrap();

        let theme = settings.catalog.get("bandits").unwrap();
        assert_eq!(theme.display_name, "Bandit Camp");
        assert!(theme.is_available_for(Tier::Rare));
        assert!(!theme.is_available_for(Tier::Uncommon));
        assert_eq!(theme.stage_count(), 2);

        let normal = theme.stage(0).unwrap();
        assert_eq!(normal.mobs[0].count_for(Tier::Rare), 3);
        assert_eq!(normal.mobs[0].count_for(Tier::Legendary), 0);
        assert_eq!(normal.variants.len(), 1);
        assert_eq!(
            theme.multipliers_for(Tier::Epic, 0, "Bandit_Archer"),
            Some(StatMultipliers::new(1.5, 1.0, 1.0, 1.0))
        );

        let boss = theme.stage(1).unwrap();
        assert!(boss.random_boss_selection);
        assert_eq!(boss.bosses.len(), 2);

        let rewards = theme.reward_override(Tier::Epic).unwrap();
        assert_eq!(rewards.drops[0].min_count(), 2);
        assert_eq!(rewards.drops[0].chance(), RewardEntry::ALWAYS);
    }

    #[test]
    fn when_theme_key_is_legacy_index_then_it_maps_to_string_id() {
        let settings = JsonConfigSource::parse(
            r#"{ "themes": { "1": { "displayName": "Goblins", "tiers": [1],
                 "mobs": [ { "id": "Goblin_Scrapper", "count": 3 } ],
                 "bosses": ["Goblin_Duke"] } } }"#,
        )
        .unwrap();

        let theme = settings.catalog.get("goblin").unwrap();
        assert_eq!(theme.stage_count(), 2);
        assert_eq!(theme.mobs[0].count, 3);
    }

    #[test]
    fn when_theme_level_multipliers_given_then_inline_stats_still_win() {
        let settings = JsonConfigSource::parse(
            r#"{ "themes": { "wolves": { "displayName": "Wolves", "tiers": [4],
                 "mobs": [ { "id": "Wolf", "count": 2, "stats": { "4": { "hp": 3.0 } } } ],
                 "bosses": ["Wolf_Alpha"],
                 "statMultipliers": { "4": {
                    "mobs": { "Wolf": { "hp": 2.0 } },
                    "boss": { "hp": 5.0, "scale": 1.4 } } } } } }"#,
        )
        .unwrap();

        let theme = settings.catalog.get("wolves").unwrap();
        assert_eq!(
            theme.multipliers_for(Tier::Legendary, 0, "Wolf"),
            Some(StatMultipliers::new(3.0, 1.0, 1.0, 1.0))
        );
        assert_eq!(
            theme.multipliers_for(Tier::Legendary, 1, "Wolf_Alpha"),
            Some(StatMultipliers::new(5.0, 1.0, 1.4, 1.0))
        );
    }

    #[test]
    fn when_zone_chances_are_off_then_they_are_normalized_and_default_added() {
        let settings = JsonConfigSource::parse(
            r#"{ "zoneSpawnChances": { "1": { "tier1": 2.0, "tier2": 2.0, "tier3": 0.0, "tier4": 0.0 } } }"#,
        )
        .unwrap();

        let zone = settings.zone_chances(1);
        assert!((zone.tier1 - 0.5).abs() < 1e-9);
        assert!(settings
            .zone_chances
            .contains_key(ZoneSpawnChances::DEFAULT_KEY));
    }

    #[test]
    fn when_saved_then_reload_yields_same_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonConfigSource::new(dir.path().join("nested").join("config.json"));
        let mut settings = CometSettings::default();
        settings.spawn.natural_spawns_enabled = false;

        source.save(&settings).unwrap();
        let reloaded = source.load().unwrap();

        assert!(!reloaded.spawn.natural_spawns_enabled);
        assert_eq!(reloaded.catalog.len(), settings.catalog.len());
        for theme in settings.catalog.iter() {
            assert_eq!(reloaded.catalog.get(&theme.id), Some(theme));
        }
    }
}
