//! Theme catalog and the full game configuration model.
//!
//! A [`CometSettings`] value is an immutable snapshot: reloading builds a new
//! one and swaps it in whole, so readers never observe a half-applied reload.

pub mod defaults;

use std::collections::BTreeMap;

use crate::entities::{Theme, TierRewards};
use crate::value_objects::{Tier, TierSettings, ZoneSpawnChances};

// =============================================================================
// Theme Catalog
// =============================================================================

/// Ordered collection of themes keyed by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
}

impl ThemeCatalog {
    /// Later duplicates replace earlier ones but keep the first position.
    pub fn new(themes: impl IntoIterator<Item = Theme>) -> Self {
        let mut catalog = Self::default();
        for theme in themes {
            catalog.upsert(theme);
        }
        catalog
    }

    pub fn builtin() -> Self {
        Self::new(defaults::default_themes())
    }

    pub fn upsert(&mut self, theme: Theme) {
        match self.themes.iter_mut().find(|t| t.id == theme.id) {
            Some(existing) => *existing = theme,
            None => self.themes.push(theme),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Theme> {
        let index = self.themes.iter().position(|t| t.id == id)?;
        Some(self.themes.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.themes.iter().map(|t| t.id.clone()).collect()
    }

    /// Candidates for natural selection: eligible for `tier` and not test-only.
    pub fn themes_for_tier(&self, tier: Tier) -> Vec<&Theme> {
        self.themes
            .iter()
            .filter(|t| !t.test_only && t.is_available_for(tier))
            .collect()
    }

    /// Operator lookup: exact id, exact display name, partial display name,
    /// partial id. Name comparisons ignore case.
    pub fn find_by_name(&self, query: &str) -> Option<&Theme> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let lowered = query.to_lowercase();

        self.get(query)
            .or_else(|| {
                self.themes
                    .iter()
                    .find(|t| t.display_name.eq_ignore_ascii_case(query))
            })
            .or_else(|| {
                self.themes
                    .iter()
                    .find(|t| t.display_name.to_lowercase().contains(&lowered))
            })
            .or_else(|| {
                self.themes
                    .iter()
                    .find(|t| t.id.to_lowercase().contains(&lowered))
            })
    }

    /// Validation problems per theme id; themes without problems are omitted.
    pub fn validate(&self) -> Vec<(String, Vec<String>)> {
        self.themes
            .iter()
            .map(|t| (t.id.clone(), t.validate()))
            .filter(|(_, problems)| !problems.is_empty())
            .collect()
    }
}

// =============================================================================
// Comet Settings
// =============================================================================

/// Natural spawn and despawn knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnSettings {
    pub min_delay_seconds: u32,
    pub max_delay_seconds: u32,
    /// Probability in `[0, 1]` that a spawn check produces a comet.
    pub spawn_chance: f64,
    pub despawn_minutes: f64,
    pub min_spawn_distance: u32,
    pub max_spawn_distance: u32,
    pub natural_spawns_enabled: bool,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            min_delay_seconds: 120,
            max_delay_seconds: 300,
            spawn_chance: 0.4,
            despawn_minutes: 30.0,
            min_spawn_distance: 30,
            max_spawn_distance: 50,
            natural_spawns_enabled: true,
        }
    }
}

impl SpawnSettings {
    /// Swap inverted ranges and clamp probabilities.
    pub fn normalized(mut self) -> Self {
        if self.max_delay_seconds < self.min_delay_seconds {
            std::mem::swap(&mut self.min_delay_seconds, &mut self.max_delay_seconds);
        }
        if self.max_spawn_distance < self.min_spawn_distance {
            std::mem::swap(&mut self.min_spawn_distance, &mut self.max_spawn_distance);
        }
        self.spawn_chance = self.spawn_chance.clamp(0.0, 1.0);
        if self.despawn_minutes <= 0.0 {
            self.despawn_minutes = Self::default().despawn_minutes;
        }
        self
    }
}

/// Everything the engine reads from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CometSettings {
    pub spawn: SpawnSettings,
    pub catalog: ThemeCatalog,
    pub tier_settings: BTreeMap<Tier, TierSettings>,
    pub tier_rewards: BTreeMap<Tier, TierRewards>,
    pub zone_chances: BTreeMap<String, ZoneSpawnChances>,
}

impl Default for CometSettings {
    fn default() -> Self {
        Self {
            spawn: SpawnSettings::default(),
            catalog: ThemeCatalog::builtin(),
            tier_settings: defaults::default_tier_settings(),
            tier_rewards: BTreeMap::new(),
            zone_chances: defaults::default_zone_chances(),
        }
    }
}

impl CometSettings {
    pub fn tier_settings(&self, tier: Tier) -> TierSettings {
        self.tier_settings
            .get(&tier)
            .copied()
            .unwrap_or_else(|| TierSettings::default_for(tier))
    }

    /// Configured table for `tier`, if the config file supplied one.
    pub fn configured_rewards(&self, tier: Tier) -> Option<&TierRewards> {
        self.tier_rewards.get(&tier).filter(|r| !r.is_empty())
    }

    /// Zone entry, then the "default" entry, then the reference table.
    pub fn zone_chances(&self, zone: u32) -> ZoneSpawnChances {
        self.zone_chances
            .get(&zone.to_string())
            .or_else(|| self.zone_chances.get(ZoneSpawnChances::DEFAULT_KEY))
            .copied()
            .unwrap_or_else(|| ZoneSpawnChances::default_for_zone(zone))
    }
}
