//! Theme resolution: which theme an encounter uses and what each stage spawns.

use std::sync::Arc;

use cometwave_domain::defaults::{FALLBACK_BOSS_ID, FALLBACK_THEME_ID};
use cometwave_domain::{
    cap_ranged, BossEntry, CometSettings, StageKind, StatMultipliers, Theme, ThemeCatalog, Tier,
};

use crate::infrastructure::ports::RandomPort;
use crate::stores::CatalogStore;

/// Whether a caller wants the stage's mobs or its bosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Mob,
    Boss,
}

/// One actor to place, with the stats it should receive on spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSpec {
    pub actor_id: String,
    pub role: ActorRole,
    pub multipliers: StatMultipliers,
}

pub struct ThemeResolver {
    catalog: Arc<CatalogStore>,
    random: Arc<dyn RandomPort>,
}

impl ThemeResolver {
    pub fn new(catalog: Arc<CatalogStore>, random: Arc<dyn RandomPort>) -> Self {
        Self { catalog, random }
    }

    /// Uniform pick among non test-only themes eligible for `tier`.
    ///
    /// An empty candidate set falls back to the built-in catalog instead of
    /// failing the activation.
    pub fn select_theme_in(&self, settings: &CometSettings, tier: Tier) -> String {
        let candidates = settings.catalog.themes_for_tier(tier);
        if candidates.is_empty() {
            let fallback = ThemeCatalog::builtin()
                .themes_for_tier(tier)
                .first()
                .map(|t| t.id.clone())
                .unwrap_or_else(|| FALLBACK_THEME_ID.to_string());
            tracing::warn!(tier = %tier, theme_id = %fallback, "No themes configured for tier, using built-in");
            return fallback;
        }

        let index = self.pick_index(candidates.len());
        candidates[index].id.clone()
    }

    /// Theme by id: configured catalog, then built-ins, then the fallback theme.
    pub fn resolve_theme(&self, settings: &CometSettings, theme_id: &str) -> Theme {
        if let Some(theme) = settings.catalog.get(theme_id) {
            return theme.clone();
        }

        let builtin = ThemeCatalog::builtin();
        if let Some(theme) = builtin.get(theme_id) {
            tracing::debug!(theme_id = %theme_id, "Theme missing from config, using built-in");
            return theme.clone();
        }

        tracing::warn!(theme_id = %theme_id, fallback = FALLBACK_THEME_ID, "Unknown theme id");
        builtin.get(FALLBACK_THEME_ID).cloned().unwrap_or_else(|| {
            Theme::new(FALLBACK_THEME_ID, "Skeleton Horde", Tier::ALL)
                .with_bosses(vec![BossEntry::new(FALLBACK_BOSS_ID)])
        })
    }

    /// Operator lookup for forcing a theme.
    pub async fn find_theme_by_name(&self, query: &str) -> Option<String> {
        let settings = self.catalog.snapshot().await;
        settings.catalog.find_by_name(query).map(|t| t.id.clone())
    }

    /// Expand one stage into individual actors, shuffled, with the ranged cap
    /// applied.
    ///
    /// Asking for the role the stage does not have yields an empty list.
    pub fn stage_actors_for(
        &self,
        theme: &Theme,
        tier: Tier,
        stage_index: usize,
        role: ActorRole,
    ) -> Vec<ActorSpec> {
        let Some(stage) = theme.stage(stage_index) else {
            return Vec::new();
        };

        let mut ids = match (stage.kind, role) {
            (StageKind::Normal, ActorRole::Mob) => {
                stage.mob_ids(tier, &mut || self.random.gen_unit())
            }
            (StageKind::Boss, ActorRole::Boss) => {
                let ids = stage.boss_ids(tier, &mut |len| self.pick_index(len));
                if ids.is_empty() {
                    tracing::warn!(theme_id = %theme.id, stage = stage_index, "Boss stage has no bosses, using fallback");
                    vec![FALLBACK_BOSS_ID.to_string()]
                } else {
                    ids
                }
            }
            _ => return Vec::new(),
        };

        self.shuffle(&mut ids);
        cap_ranged(ids)
            .into_iter()
            .map(|actor_id| ActorSpec {
                multipliers: self.multipliers(theme, tier, stage_index, &actor_id),
                actor_id,
                role,
            })
            .collect()
    }

    /// Identity when nothing is configured for this actor.
    pub fn multipliers(
        &self,
        theme: &Theme,
        tier: Tier,
        stage_index: usize,
        actor_id: &str,
    ) -> StatMultipliers {
        theme
            .multipliers_for(tier, stage_index, actor_id)
            .unwrap_or(StatMultipliers::IDENTITY)
    }

    pub fn role_for(kind: StageKind) -> ActorRole {
        match kind {
            StageKind::Normal => ActorRole::Mob,
            StageKind::Boss => ActorRole::Boss,
        }
    }

    fn pick_index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let max = i32::try_from(len - 1).unwrap_or(i32::MAX);
        usize::try_from(self.random.gen_range(0, max))
            .unwrap_or(0)
            .min(len - 1)
    }

    // Fisher-Yates over the injected random port.
    fn shuffle(&self, ids: &mut [String]) {
        for i in (1..ids.len()).rev() {
            let j = self.pick_index(i + 1);
            ids.swap(i, j);
        }
    }
}
