//! Wave engine: activation, countdown, stage spawning, monitoring, completion
//! and timeout.
//!
//! `EncounterProgress` decides what happens next; this module applies the
//! resulting effects through the world ports. Every entry point runs on the
//! world context and looks the encounter up by anchor, so a command that
//! outlives its encounter finds nothing and returns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cometwave_domain::{
    ActivationOutcome, ActorHandle, BlockPos, EncounterPlan, EncounterProgress, EncounterState,
    Notice, OwnerId, Rotation, SessionHandle, Tier, Vec3, WaveEffect, WaveEvent, WavePhase,
};

use crate::infrastructure::ports::{
    ClockPort, DispatchError, WorldCommand, WorldPorts, WorldScheduler,
};
use crate::stores::{CatalogStore, EncounterRegistry, ProgressStore};
use crate::use_cases::lifecycle::EncounterLifecycle;
use crate::use_cases::placement::{SpatialPlacement, MAX_PROBES};
use crate::use_cases::rewards::RewardGenerator;
use crate::use_cases::themes::{ActorRole, ActorSpec, ThemeResolver};

/// Gap between fallback monitoring passes for a running stage.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum WaveError {
    #[error("World context unavailable: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("No theme matches '{0}'")]
    ThemeNotFound(String),

    #[error("No encounter registered at {0}")]
    UnknownAnchor(BlockPos),
}

pub struct WaveEngine {
    registry: Arc<EncounterRegistry>,
    progress: Arc<ProgressStore>,
    catalog: Arc<CatalogStore>,
    themes: Arc<ThemeResolver>,
    placement: Arc<SpatialPlacement>,
    rewards: Arc<RewardGenerator>,
    lifecycle: Arc<EncounterLifecycle>,
    ports: WorldPorts,
    scheduler: Arc<dyn WorldScheduler>,
    clock: Arc<dyn ClockPort>,
}

impl WaveEngine {
    pub fn new(
        registry: Arc<EncounterRegistry>,
        progress: Arc<ProgressStore>,
        catalog: Arc<CatalogStore>,
        themes: Arc<ThemeResolver>,
        placement: Arc<SpatialPlacement>,
        rewards: Arc<RewardGenerator>,
        lifecycle: Arc<EncounterLifecycle>,
        ports: WorldPorts,
        scheduler: Arc<dyn WorldScheduler>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            registry,
            progress,
            catalog,
            themes,
            placement,
            rewards,
            lifecycle,
            ports,
            scheduler,
            clock,
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Player opened the anchor at `pos`.
    ///
    /// Only an untouched encounter starts; anything else reports why not.
    pub async fn activate(
        &self,
        pos: BlockPos,
        owner: OwnerId,
    ) -> Result<ActivationOutcome, WaveError> {
        let tier = self.registry.tier(pos).unwrap_or_else(|| {
            let tier = Tier::default();
            tracing::warn!(pos = %pos, tier = %tier, "Activating unregistered anchor, assuming default tier");
            tier
        });

        let outcome = self.registry.activate(pos, tier);
        if outcome != ActivationOutcome::Started {
            tracing::debug!(pos = %pos, outcome = ?outcome, "Activation ignored");
            return Ok(outcome);
        }

        let owner = match self.registry.owner(pos) {
            Some(existing) => existing,
            None => {
                self.registry.set_owner(pos, owner);
                owner
            }
        };

        // The plan is the only catalog read of the encounter. Stages, radius
        // band and loot all come from it, so a reload never reaches a running
        // encounter.
        let settings = self.catalog.snapshot().await;
        let theme_id = match self.registry.forced_theme(pos) {
            Some(forced) => forced,
            None => self.themes.select_theme_in(&settings, tier),
        };
        let theme = self.themes.resolve_theme(&settings, &theme_id);
        let rewards = RewardGenerator::table_for(&settings, Some(&theme), tier);
        let plan = EncounterPlan::new(theme, settings.tier_settings(tier), rewards);
        self.registry.assign_theme(pos, plan.theme.id.clone());

        let session = self.ports.players.session_for(owner).await;
        tracing::info!(
            pos = %pos,
            tier = %tier,
            theme_id = %plan.theme.id,
            stages = plan.theme.stage_count(),
            owner = %owner,
            "Encounter activated"
        );
        let progress =
            EncounterProgress::begin(pos, owner, session, tier, plan, self.clock.now());
        self.progress.insert(progress);

        if let Err(e) = self.scheduler.dispatch(WorldCommand::CountdownTick(pos)) {
            self.progress.take(pos);
            self.registry.revert_activation(pos);
            tracing::warn!(error = %e, pos = %pos, "Countdown could not be queued, activation reverted");
            return Err(e.into());
        }
        Ok(outcome)
    }

    pub async fn countdown_tick(&self, pos: BlockPos) -> Option<WavePhase> {
        let progress = self.progress.take(pos)?;
        let now = self.clock.now();
        self.apply(progress, WaveEvent::CountdownTick { now }).await
    }

    /// Recount the live actors of the running stage.
    pub async fn monitor(&self, pos: BlockPos) -> Option<WavePhase> {
        let mut progress = self.progress.take(pos)?;
        self.reachable_session(&mut progress).await;
        let live = self.live_actors(&progress.actors).await;
        let now = self.clock.now();
        self.apply(progress, WaveEvent::Monitor { live, now }).await
    }

    /// Fallback pass: recount, then re-arm while the stage keeps running.
    pub async fn monitor_tick(&self, pos: BlockPos) -> Option<WavePhase> {
        let phase = self.monitor(pos).await?;
        if phase == WavePhase::StageActive {
            self.schedule_monitor(pos);
        }
        Some(phase)
    }

    /// An actor died somewhere; recount its encounter if it belongs to one.
    pub async fn actor_died(&self, actor: ActorHandle) -> Option<WavePhase> {
        let pos = self.progress.find_by_actor(actor)?;
        self.monitor(pos).await
    }

    /// Supervisor decided the stage ran out of time.
    pub async fn force_timeout(&self, pos: BlockPos) -> Option<WavePhase> {
        let progress = self.progress.take(pos)?;
        let now = self.clock.now();
        tracing::info!(pos = %pos, stage = progress.stage_index, "Stage timed out");
        self.apply(progress, WaveEvent::ForceTimeout { now }).await
    }

    /// The anchor was broken by something other than the wave engine.
    ///
    /// A stage pass that is holding the progress at this point finds the
    /// encounter gone when it resumes and discards what it holds.
    pub async fn anchor_destroyed(&self, pos: BlockPos) -> bool {
        if let Some(mut progress) = self.progress.take(pos) {
            self.despawn_actors(std::mem::take(&mut progress.actors))
                .await;
            if let Some(session) = self.reachable_session(&mut progress).await {
                if let Err(e) = self.ports.notifications.hide(session).await {
                    tracing::debug!(error = %e, "Failed to hide encounter title");
                }
            }
        }
        let cleared = self.lifecycle.clear(pos);
        if cleared {
            tracing::info!(pos = %pos, "Anchor destroyed externally");
        }
        cleared
    }

    /// Pin the theme the next activation at `pos` uses.
    pub async fn force_theme(&self, pos: BlockPos, query: &str) -> Result<String, WaveError> {
        if !self.registry.is_known(pos) {
            return Err(WaveError::UnknownAnchor(pos));
        }
        let theme_id = self
            .themes
            .find_theme_by_name(query)
            .await
            .ok_or_else(|| WaveError::ThemeNotFound(query.to_string()))?;
        self.registry.force_theme(pos, theme_id.clone());
        tracing::info!(pos = %pos, theme_id = %theme_id, "Theme forced");
        Ok(theme_id)
    }

    // =========================================================================
    // Effect executor
    // =========================================================================

    /// Feed one event to a taken progress record, run every effect, and put
    /// the record back unless the encounter ended.
    ///
    /// Returns `None` when the encounter was torn down while the pass was
    /// suspended on a port call.
    async fn apply(&self, progress: EncounterProgress, event: WaveEvent) -> Option<WavePhase> {
        let pos = progress.anchor;
        if !self.is_running(pos) {
            return self.discard(progress).await;
        }
        let (mut progress, effects) = progress.handle(event);
        let mut pending: VecDeque<WaveEffect> = effects.into();
        let mut clear = false;

        while let Some(effect) = pending.pop_front() {
            match effect {
                WaveEffect::Notify(notice) => self.notify_owner(&mut progress, notice).await,
                WaveEffect::ScheduleCountdown { delay_ms } => {
                    let delay = Duration::from_millis(delay_ms);
                    if let Err(e) = self
                        .scheduler
                        .dispatch_after(delay, WorldCommand::CountdownTick(pos))
                    {
                        tracing::warn!(error = %e, pos = %pos, "Failed to schedule countdown tick");
                    }
                }
                WaveEffect::SpawnStage { stage_index } => {
                    if !self.is_running(pos) {
                        return self.discard(progress).await;
                    }
                    let actors = self.spawn_stage(&progress, stage_index).await;
                    if !self.is_running(pos) {
                        self.despawn_actors(actors).await;
                        return self.discard(progress).await;
                    }
                    let now = self.clock.now();
                    let (next, more) = progress.handle(WaveEvent::StageSpawned { actors, now });
                    progress = next;
                    pending.extend(more);
                    // One fallback chain per encounter, started with the first stage.
                    if stage_index == 0 && !progress.phase.is_terminal() {
                        self.schedule_monitor(pos);
                    }
                }
                WaveEffect::DespawnActors(actors) => self.despawn_actors(actors).await,
                WaveEffect::DropRewards => {
                    if !self.is_running(pos) {
                        return self.discard(progress).await;
                    }
                    self.drop_rewards(&mut progress).await;
                }
                WaveEffect::DestroyAnchor => self.destroy_anchor(pos).await,
                WaveEffect::ClearEncounter => clear = true,
            }
        }

        let phase = progress.phase;
        if clear || phase.is_terminal() {
            self.lifecycle.clear(pos);
        } else if self.is_running(pos) {
            self.progress.insert(progress);
        } else {
            return self.discard(progress).await;
        }
        Some(phase)
    }

    fn is_running(&self, pos: BlockPos) -> bool {
        self.registry.state(pos) == EncounterState::WaveActive
    }

    async fn discard(&self, progress: EncounterProgress) -> Option<WavePhase> {
        tracing::debug!(pos = %progress.anchor, "Encounter torn down mid-pass, progress discarded");
        self.despawn_actors(progress.actors).await;
        None
    }

    fn schedule_monitor(&self, pos: BlockPos) {
        if let Err(e) = self
            .scheduler
            .dispatch_after(MONITOR_INTERVAL, WorldCommand::Monitor(pos))
        {
            tracing::warn!(error = %e, pos = %pos, "Failed to schedule monitor pass");
        }
    }

    // =========================================================================
    // Stage spawning
    // =========================================================================

    async fn spawn_stage(&self, progress: &EncounterProgress, stage_index: usize) -> Vec<ActorHandle> {
        let pos = progress.anchor;
        let theme = &progress.plan.theme;
        let Some(stage) = theme.stage(stage_index) else {
            tracing::warn!(pos = %pos, theme_id = %theme.id, stage = stage_index, "Stage missing from theme");
            return Vec::new();
        };

        let role = ThemeResolver::role_for(stage.kind);
        let specs = self
            .themes
            .stage_actors_for(theme, progress.tier, stage_index, role);
        let band = &progress.plan.tier_settings;
        let center = pos.spawn_center();
        let planned = specs.len();

        let mut spawned = Vec::with_capacity(planned);
        let mut successes: Vec<Vec3> = Vec::new();
        let mut failed: Vec<(ActorSpec, Rotation)> = Vec::new();

        for (index, spec) in specs.into_iter().enumerate() {
            let (preferred, rotation) = match role {
                ActorRole::Mob => self.placement.ring_position(
                    center,
                    index,
                    planned,
                    band.min_radius(),
                    band.max_radius(),
                ),
                ActorRole::Boss => SpatialPlacement::boss_position(center, index),
            };

            let Some(position) = self.placement.place(preferred, MAX_PROBES).await else {
                failed.push((spec, rotation));
                continue;
            };
            match self.spawn_actor(&spec, position, rotation).await {
                Some(actor) => {
                    spawned.push(actor);
                    successes.push(position);
                }
                None => failed.push((spec, rotation)),
            }
        }

        if !failed.is_empty() {
            let retrying = failed.len();
            let retried = self
                .placement
                .retry_near_success(failed, &mut successes, MAX_PROBES)
                .await;
            for ((spec, rotation), position) in retried {
                if let Some(actor) = self.spawn_actor(&spec, position, rotation).await {
                    spawned.push(actor);
                }
            }
            tracing::debug!(pos = %pos, retrying, "Retried failed placements near siblings");
        }

        if spawned.len() < planned {
            tracing::warn!(
                pos = %pos,
                stage = stage_index,
                planned,
                spawned = spawned.len(),
                "Stage spawned under strength"
            );
        } else {
            tracing::info!(pos = %pos, stage = stage_index, spawned = spawned.len(), "Stage spawned");
        }
        spawned
    }

    /// Spawn and immediately apply multipliers so no hit lands on base stats.
    async fn spawn_actor(
        &self,
        spec: &ActorSpec,
        position: Vec3,
        rotation: Rotation,
    ) -> Option<ActorHandle> {
        let actor = match self
            .ports
            .spawner
            .spawn(&spec.actor_id, position, rotation)
            .await
        {
            Ok(actor) => actor,
            Err(e) => {
                tracing::warn!(error = %e, actor_id = %spec.actor_id, "Actor spawn failed");
                return None;
            }
        };

        if !spec.multipliers.is_identity() {
            if let Err(e) = self
                .ports
                .stats
                .apply_multipliers(actor, spec.multipliers)
                .await
            {
                tracing::warn!(error = %e, actor = %actor, "Failed to apply stat multipliers");
            }
        }
        Some(actor)
    }

    // =========================================================================
    // Monitoring helpers
    // =========================================================================

    async fn live_actors(&self, tracked: &[ActorHandle]) -> Vec<ActorHandle> {
        let mut live = Vec::with_capacity(tracked.len());
        for actor in tracked {
            if self.ports.liveness.is_valid(*actor).await
                && !self.ports.liveness.is_dead(*actor).await
            {
                live.push(*actor);
            }
        }
        live
    }

    /// Current session of the owner, re-resolved by identity when the stored
    /// one went stale.
    async fn reachable_session(&self, progress: &mut EncounterProgress) -> Option<SessionHandle> {
        if let Some(session) = progress.owner_session {
            if self.ports.players.is_session_valid(session).await {
                return Some(session);
            }
        }

        let resolved = self.ports.players.session_for(progress.owner).await;
        if resolved.is_some() && resolved != progress.owner_session {
            tracing::debug!(pos = %progress.anchor, owner = %progress.owner, "Owner session re-resolved");
        }
        progress.owner_session = resolved;
        resolved
    }

    async fn notify_owner(&self, progress: &mut EncounterProgress, notice: Notice) {
        let Some(session) = self.reachable_session(progress).await else {
            tracing::debug!(pos = %progress.anchor, "Owner unreachable, notice skipped");
            return;
        };
        if let Err(e) = self.ports.notifications.notify(session, notice).await {
            tracing::debug!(error = %e, "Failed to notify owner");
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    async fn despawn_actors(&self, actors: Vec<ActorHandle>) {
        for actor in actors {
            if let Err(e) = self.ports.spawner.despawn(actor).await {
                tracing::warn!(error = %e, actor = %actor, "Failed to despawn actor");
            }
        }
    }

    async fn drop_rewards(&self, progress: &mut EncounterProgress) {
        let pos = progress.anchor;
        self.registry.mark_completed(pos);

        let drops = self.rewards.generate(&progress.plan.rewards, progress.tier);

        if let Err(e) = self
            .ports
            .drops
            .drop_items(RewardGenerator::items(&drops), pos)
            .await
        {
            tracing::error!(error = %e, pos = %pos, "Failed to drop rewards");
        }
        tracing::info!(pos = %pos, tier = %progress.tier, drops = drops.len(), "Encounter completed");

        let Some(session) = self.reachable_session(progress).await else {
            return;
        };
        let lines = std::iter::once("Comet Rewards:".to_string())
            .chain(drops.iter().map(|d| format!("- {}", d)));
        for line in lines {
            if let Err(e) = self.ports.notifications.message(session, line).await {
                tracing::debug!(error = %e, "Failed to send reward summary");
                break;
            }
        }
    }

    async fn destroy_anchor(&self, pos: BlockPos) {
        match self.ports.structures.destroy(pos).await {
            Ok(true) => tracing::debug!(pos = %pos, "Anchor destroyed"),
            Ok(false) => tracing::debug!(pos = %pos, "Anchor already gone"),
            Err(e) => tracing::warn!(error = %e, pos = %pos, "Failed to destroy anchor"),
        }
    }
}
