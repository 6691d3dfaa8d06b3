//! Natural and manual comet spawning.
//!
//! A spawn check picks an online player, derives a tier from the zone they
//! stand in, finds dry ground at a distance, and drops an anchor there.

use std::f64::consts::PI;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex_lite::Regex;

use cometwave_domain::{BlockPos, CometSettings, Notice, OwnerId, Tier, Vec3};

use crate::infrastructure::ports::{PortError, RandomPort, WorldPorts, ZoneInfo};
use crate::stores::{CatalogStore, EncounterRegistry};
use crate::use_cases::lifecycle::EncounterLifecycle;
use crate::use_cases::themes::ThemeResolver;

/// Random targets tried around a player before giving up.
pub const MAX_SITE_PROBES: usize = 16;

/// Closest a new anchor may land to a tracked one.
pub const MIN_ANCHOR_SPACING: f64 = 8.0;

pub const FALLING_NOTICE_SECS: f32 = 3.0;

static ZONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)zone(\d+)").expect("valid regex"));
static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedComet {
    pub pos: BlockPos,
    pub tier: Tier,
    pub owner: OwnerId,
}

/// Result of one natural spawn check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnCheck {
    Disabled,
    ChanceMissed,
    NoPlayers,
    Failed,
    Spawned(SpawnedComet),
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("Owner {0} is not online")]
    OwnerOffline(OwnerId),

    #[error("No dry ground found near owner {0}")]
    NoSite(OwnerId),

    #[error("No theme matches '{0}'")]
    ThemeNotFound(String),

    #[error("Anchor could not be placed: {0}")]
    Port(#[from] PortError),
}

pub struct CometSpawner {
    catalog: Arc<CatalogStore>,
    registry: Arc<EncounterRegistry>,
    themes: Arc<ThemeResolver>,
    lifecycle: Arc<EncounterLifecycle>,
    ports: WorldPorts,
    random: Arc<dyn RandomPort>,
}

impl CometSpawner {
    pub fn new(
        catalog: Arc<CatalogStore>,
        registry: Arc<EncounterRegistry>,
        themes: Arc<ThemeResolver>,
        lifecycle: Arc<EncounterLifecycle>,
        ports: WorldPorts,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            catalog,
            registry,
            themes,
            lifecycle,
            ports,
            random,
        }
    }

    /// Wait before the next natural check, uniform in the configured range.
    pub async fn next_delay(&self) -> Duration {
        let spawn = self.catalog.snapshot().await.spawn.clone();
        let spread = spawn.max_delay_seconds.saturating_sub(spawn.min_delay_seconds);
        let extra = self
            .random
            .gen_range(0, i32::try_from(spread).unwrap_or(i32::MAX));
        let extra = u64::try_from(extra).unwrap_or(0);
        Duration::from_secs(u64::from(spawn.min_delay_seconds) + extra)
    }

    /// One natural spawn check.
    pub async fn check_and_spawn(&self) -> SpawnCheck {
        let settings = self.catalog.snapshot().await;
        if !settings.spawn.natural_spawns_enabled {
            return SpawnCheck::Disabled;
        }
        if self.random.gen_unit() > settings.spawn.spawn_chance {
            return SpawnCheck::ChanceMissed;
        }

        let owners = self.ports.players.online_owners().await;
        if owners.is_empty() {
            return SpawnCheck::NoPlayers;
        }
        let max_index = i32::try_from(owners.len() - 1).unwrap_or(i32::MAX);
        let index = usize::try_from(self.random.gen_range(0, max_index))
            .unwrap_or(0)
            .min(owners.len() - 1);
        let owner = owners[index];

        let zone = self.ports.players.zone_of(owner).await;
        let tier = self.tier_for_zone(&settings, &zone);
        match self.spawn_near(&settings, owner, tier).await {
            Ok(comet) => SpawnCheck::Spawned(comet),
            Err(e) => {
                tracing::debug!(error = %e, owner = %owner, "Natural spawn skipped");
                SpawnCheck::Failed
            }
        }
    }

    /// Operator spawn near `owner`, optionally with a fixed tier and theme.
    pub async fn spawn_for_owner(
        &self,
        owner: OwnerId,
        tier: Option<Tier>,
        theme_query: Option<&str>,
    ) -> Result<SpawnedComet, SpawnError> {
        let theme_id = match theme_query {
            Some(query) => Some(
                self.themes
                    .find_theme_by_name(query)
                    .await
                    .ok_or_else(|| SpawnError::ThemeNotFound(query.to_string()))?,
            ),
            None => None,
        };

        let settings = self.catalog.snapshot().await;
        let tier = match tier {
            Some(tier) => tier,
            None => {
                let zone = self.ports.players.zone_of(owner).await;
                self.tier_for_zone(&settings, &zone)
            }
        };

        let comet = self.spawn_near(&settings, owner, tier).await?;
        if let Some(theme_id) = theme_id {
            self.registry.force_theme(comet.pos, theme_id);
        }
        Ok(comet)
    }

    /// Zone id from a zone or region name: "Zone4_Tier4" is 4, "Region 12" is 12.
    pub fn parse_zone_id(name: &str) -> u32 {
        ZONE_PATTERN
            .captures(name)
            .and_then(|c| c.get(1))
            .or_else(|| NUMBER_PATTERN.find(name))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }

    fn tier_for_zone(&self, settings: &CometSettings, zone: &ZoneInfo) -> Tier {
        let from_region = zone
            .region_name
            .as_deref()
            .map(Self::parse_zone_id)
            .unwrap_or(0);
        let zone_id = match (from_region, zone.zone_name.as_deref()) {
            (0, Some(name)) => Self::parse_zone_id(name),
            (id, _) => id,
        };
        settings
            .zone_chances(zone_id)
            .select_tier(self.random.gen_unit())
    }

    async fn spawn_near(
        &self,
        settings: &CometSettings,
        owner: OwnerId,
        tier: Tier,
    ) -> Result<SpawnedComet, SpawnError> {
        let origin = self
            .ports
            .players
            .position_of(owner)
            .await
            .ok_or(SpawnError::OwnerOffline(owner))?;
        let pos = self
            .find_site(settings, origin)
            .await
            .ok_or(SpawnError::NoSite(owner))?;

        self.land(pos, tier).await?;
        self.lifecycle.register(pos, tier, Some(owner), None).await;
        self.announce(owner, pos, tier).await;

        tracing::info!(pos = %pos, tier = %tier, owner = %owner, "Comet spawned");
        Ok(SpawnedComet { pos, tier, owner })
    }

    async fn find_site(&self, settings: &CometSettings, origin: Vec3) -> Option<BlockPos> {
        let min = f64::from(settings.spawn.min_spawn_distance);
        let max = f64::from(settings.spawn.max_spawn_distance);

        for _ in 0..MAX_SITE_PROBES {
            let angle = self.random.gen_unit() * 2.0 * PI;
            let distance = min + self.random.gen_unit() * (max - min);
            let x = (origin.x + angle.cos() * distance) as i32;
            let z = (origin.z + angle.sin() * distance) as i32;

            let Some(ground) = self
                .ports
                .terrain
                .ground_level(x, z, origin.y as i32)
                .await
            else {
                continue;
            };
            let surface = BlockPos::new(x, ground, z);
            let above = BlockPos::new(x, ground + 1, z);
            if self.registry.has_active_near(above, MIN_ANCHOR_SPACING) {
                continue;
            }
            if self.ports.terrain.is_water(surface).await
                || self.ports.terrain.is_water(above).await
            {
                continue;
            }
            return Some(above);
        }
        None
    }

    /// Falling anchor first, direct placement if the host refuses.
    async fn land(&self, pos: BlockPos, tier: Tier) -> Result<(), PortError> {
        match self.ports.structures.launch_falling(pos, tier).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, pos = %pos, "Falling anchor failed, placing directly");
                self.ports.structures.place(pos, tier).await
            }
        }
    }

    async fn announce(&self, owner: OwnerId, pos: BlockPos, tier: Tier) {
        let Some(session) = self.ports.players.session_for(owner).await else {
            return;
        };
        let notifications = &self.ports.notifications;
        let message = format!(
            "{} Comet falling! Target: X={}, Y={}, Z={}",
            tier, pos.x, pos.y, pos.z
        );
        if let Err(e) = notifications.message(session, message).await {
            tracing::debug!(error = %e, "Failed to send comet coordinates");
        }
        let notice = Notice::new(
            format!("{} Comet Falling!", tier),
            "Watch the sky!",
            FALLING_NOTICE_SECS,
        );
        if let Err(e) = notifications.notify(session, notice).await {
            tracing::debug!(error = %e, "Failed to show falling notice");
        }
    }
}
