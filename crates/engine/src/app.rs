//! Application state and composition.

use std::sync::Arc;

use tokio::task::JoinHandle;

use cometwave_domain::{ActivationOutcome, ActorHandle, BlockPos, DespawnRecord, OwnerId, Tier};

use crate::infrastructure::ports::{
    ClockPort, ConfigSource, DespawnStore, DispatchError, RandomPort, WorldCommand, WorldPorts,
    WorldScheduler,
};
use crate::infrastructure::settings::EngineSettings;
use crate::infrastructure::world_context::WorldReceiver;
use crate::stores::{CatalogStore, EncounterRegistry, ProgressStore, ReloadReport};
use crate::use_cases::{
    CometSpawner, DespawnTiming, DespawnTracker, EncounterLifecycle, RewardGenerator,
    SpatialPlacement, SpawnError, SpawnedComet, ThemeResolver, TimeoutSupervisor, WaveEngine,
    WaveError,
};

/// Main application state.
///
/// Holds the runtime stores and use cases. The host calls the operations
/// below; everything that mutates the world then runs through the world
/// context via `handle_world_command`.
pub struct App {
    pub stores: Stores,
    pub use_cases: UseCases,
    scheduler: Arc<dyn WorldScheduler>,
}

/// Container for the in-memory stores.
pub struct Stores {
    pub registry: Arc<EncounterRegistry>,
    pub progress: Arc<ProgressStore>,
    pub catalog: Arc<CatalogStore>,
}

/// Container for all use cases.
pub struct UseCases {
    pub waves: Arc<WaveEngine>,
    pub lifecycle: Arc<EncounterLifecycle>,
    pub despawn: Arc<DespawnTracker>,
    pub timeout: Arc<TimeoutSupervisor>,
    pub spawner: Arc<CometSpawner>,
    pub themes: Arc<ThemeResolver>,
    pub rewards: Arc<RewardGenerator>,
}

impl App {
    pub fn new(
        ports: WorldPorts,
        config: Arc<dyn ConfigSource>,
        despawn_store: Arc<dyn DespawnStore>,
        scheduler: Arc<dyn WorldScheduler>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        timing: DespawnTiming,
    ) -> Self {
        let registry = Arc::new(EncounterRegistry::new());
        let progress = Arc::new(ProgressStore::new());
        let catalog = Arc::new(CatalogStore::new(config));

        let despawn = Arc::new(DespawnTracker::new(
            despawn_store,
            catalog.clone(),
            clock.clone(),
            scheduler.clone(),
            timing,
        ));
        let lifecycle = Arc::new(EncounterLifecycle::new(
            registry.clone(),
            progress.clone(),
            despawn.clone(),
            ports.structures.clone(),
            ports.spawner.clone(),
        ));

        let themes = Arc::new(ThemeResolver::new(catalog.clone(), random.clone()));
        let placement = Arc::new(SpatialPlacement::new(ports.collision.clone(), random.clone()));
        let rewards = Arc::new(RewardGenerator::new(random.clone()));

        let waves = Arc::new(WaveEngine::new(
            registry.clone(),
            progress.clone(),
            catalog.clone(),
            themes.clone(),
            placement,
            rewards.clone(),
            lifecycle.clone(),
            ports.clone(),
            scheduler.clone(),
            clock.clone(),
        ));
        let timeout = Arc::new(TimeoutSupervisor::new(
            progress.clone(),
            lifecycle.clone(),
            scheduler.clone(),
            clock,
        ));
        let spawner = Arc::new(CometSpawner::new(
            catalog.clone(),
            registry.clone(),
            themes.clone(),
            lifecycle.clone(),
            ports,
            random,
        ));

        Self {
            stores: Stores {
                registry,
                progress,
                catalog,
            },
            use_cases: UseCases {
                waves,
                lifecycle,
                despawn,
                timeout,
                spawner,
                themes,
                rewards,
            },
            scheduler,
        }
    }

    // =========================================================================
    // Host operations
    // =========================================================================

    /// An anchor now exists at `pos` (placed by the host or a spawn).
    pub async fn register_anchor(
        &self,
        pos: BlockPos,
        tier: Tier,
        owner: Option<OwnerId>,
        custom_minutes: Option<f64>,
    ) -> DespawnRecord {
        self.use_cases
            .lifecycle
            .register(pos, tier, owner, custom_minutes)
            .await
    }

    pub async fn activate(
        &self,
        pos: BlockPos,
        owner: OwnerId,
    ) -> Result<ActivationOutcome, WaveError> {
        self.use_cases.waves.activate(pos, owner).await
    }

    /// Death notification from the host; monitoring runs on the world context.
    pub fn actor_died(&self, actor: ActorHandle) -> Result<(), DispatchError> {
        self.scheduler.dispatch(WorldCommand::ActorDied(actor))
    }

    /// The host broke the anchor. Teardown runs on the world context so it
    /// never interleaves with a stage pass for the same encounter.
    pub fn anchor_destroyed(&self, pos: BlockPos) -> Result<(), DispatchError> {
        self.scheduler.dispatch(WorldCommand::AnchorDestroyed(pos))
    }

    pub async fn force_theme(&self, pos: BlockPos, query: &str) -> Result<String, WaveError> {
        self.use_cases.waves.force_theme(pos, query).await
    }

    pub async fn spawn_for_owner(
        &self,
        owner: OwnerId,
        tier: Option<Tier>,
        theme_query: Option<&str>,
    ) -> Result<SpawnedComet, SpawnError> {
        self.use_cases
            .spawner
            .spawn_for_owner(owner, tier, theme_query)
            .await
    }

    pub async fn reload_config(&self) -> ReloadReport {
        let report = self.stores.catalog.reload().await;
        tracing::info!(
            themes = report.theme_count,
            warnings = report.warnings,
            used_defaults = report.used_defaults,
            "Comet config reloaded"
        );
        report
    }

    // =========================================================================
    // World context
    // =========================================================================

    /// Run one command. Must only be called from the world loop.
    pub async fn handle_world_command(&self, command: WorldCommand) {
        tracing::trace!(command = command.name(), "World command");
        match command {
            WorldCommand::CountdownTick(pos) => {
                self.use_cases.waves.countdown_tick(pos).await;
            }
            WorldCommand::Monitor(pos) => {
                self.use_cases.waves.monitor_tick(pos).await;
            }
            WorldCommand::ActorDied(actor) => {
                self.use_cases.waves.actor_died(actor).await;
            }
            WorldCommand::Timeout(pos) => {
                self.use_cases.waves.force_timeout(pos).await;
            }
            WorldCommand::Despawn(pos) => {
                let outcome = self.use_cases.lifecycle.on_despawn_timer(pos).await;
                tracing::debug!(pos = %pos, outcome = ?outcome, "Despawn timer handled");
            }
            WorldCommand::AnchorDestroyed(pos) => {
                let torn_down = self.use_cases.waves.anchor_destroyed(pos).await;
                tracing::debug!(pos = %pos, torn_down, "Anchor destroyed");
            }
            WorldCommand::NaturalSpawn => {
                let check = self.use_cases.spawner.check_and_spawn().await;
                tracing::debug!(check = ?check, "Natural spawn check");
            }
        }
    }

    /// Drain the world context until every sender is gone.
    pub async fn run_world_loop(self: Arc<Self>, mut rx: WorldReceiver) {
        tracing::info!("World loop started");
        while let Some(command) = rx.recv().await {
            self.handle_world_command(command).await;
        }
        tracing::info!("World loop stopped");
    }

    /// Queue a natural spawn roll on the world context.
    pub fn request_natural_spawn(&self) -> Result<(), DispatchError> {
        self.scheduler.dispatch(WorldCommand::NaturalSpawn)
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    /// Spawn the world loop and every periodic task. Requires a runtime.
    pub fn start_background_tasks(
        self: &Arc<Self>,
        rx: WorldReceiver,
        settings: &EngineSettings,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = vec![tokio::spawn(self.clone().run_world_loop(rx))];

        let supervisor_app = self.clone();
        let supervisor_interval = settings.supervisor_interval;
        handles.push(tokio::spawn(async move {
            loop {
                tokio::time::sleep(supervisor_interval).await;
                let report = supervisor_app.use_cases.timeout.sweep();
                if !report.is_empty() {
                    tracing::info!(
                        queued = report.queued.len(),
                        force_cleared = report.force_cleared.len(),
                        "Timeout sweep"
                    );
                }
            }
        }));

        let despawn_app = self.clone();
        let reconcile_interval = settings.reconcile_interval;
        handles.push(tokio::spawn(async move {
            despawn_app.use_cases.despawn.process_on_startup().await;
            loop {
                tokio::time::sleep(reconcile_interval).await;
                despawn_app.use_cases.despawn.sweep().await;
            }
        }));

        if settings.natural_spawns {
            let spawn_app = self.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let delay = spawn_app.use_cases.spawner.next_delay().await;
                    tokio::time::sleep(delay).await;
                    if let Err(e) = spawn_app.request_natural_spawn() {
                        tracing::warn!(error = %e, "Stopping natural spawn timer");
                        break;
                    }
                }
            }));
        } else {
            tracing::info!("Natural spawns disabled by environment");
        }

        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use cometwave_domain::{
        BossEntry, CometSettings, EncounterState, MobEntry, Stage, Theme, ThemeCatalog, Vec3,
    };

    use crate::infrastructure::clock::{FixedRandom, ManualClock, SystemClock};
    use crate::infrastructure::headless::HeadlessWorld;
    use crate::infrastructure::ports::{
        MockConfigSource, MockDespawnStore, StructureStore, ZoneInfo,
    };
    use crate::infrastructure::world_context::{QueuedScheduler, WorldContext};

    struct TestApp {
        app: App,
        world: Arc<HeadlessWorld>,
        scheduler: Arc<QueuedScheduler>,
        clock: Arc<ManualClock>,
    }

    impl TestApp {
        /// Run queued commands like the world loop would. Monitor passes
        /// re-arm themselves, so they are run once and not re-queued.
        async fn pump(&self) {
            for _ in 0..32 {
                let batch = self.scheduler.drain();
                if batch.is_empty() {
                    return;
                }
                for (_, command) in batch {
                    if matches!(command, WorldCommand::Monitor(_)) {
                        continue;
                    }
                    self.app.handle_world_command(command).await;
                }
            }
        }
    }

    fn raid() -> Theme {
        Theme::new("raid", "Test Raid", Tier::ALL).with_stages(vec![
            Stage::normal(vec![MobEntry::new("Raider", 2)]),
            Stage::boss(vec![BossEntry::new("Raid_Boss")]),
        ])
    }

    async fn test_app() -> TestApp {
        let world = Arc::new(HeadlessWorld::default());
        let scheduler = Arc::new(QueuedScheduler::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let mut config = MockConfigSource::new();
        config.expect_load().returning(|| {
            Ok(CometSettings {
                catalog: ThemeCatalog::new([raid()]),
                ..CometSettings::default()
            })
        });
        let mut store = MockDespawnStore::new();
        store.expect_upsert().returning(|_| Ok(()));
        store.expect_delete().returning(|_| Ok(()));

        let app = App::new(
            world.ports(),
            Arc::new(config),
            Arc::new(store),
            scheduler.clone(),
            clock.clone(),
            Arc::new(FixedRandom::new(0, 0.0)),
            DespawnTiming::default(),
        );
        app.reload_config().await;

        TestApp {
            app,
            world,
            scheduler,
            clock,
        }
    }

    #[tokio::test]
    async fn when_host_drives_full_encounter_then_commands_route_to_completion() {
        let t = test_app().await;
        let pos = BlockPos::new(0, 64, 0);
        let owner = OwnerId::new();
        t.world
            .connect(owner, Vec3::new(0.5, 65.0, 4.5), ZoneInfo::default());
        t.world.place(pos, Tier::Uncommon).await.unwrap();
        t.app
            .register_anchor(pos, Tier::Uncommon, Some(owner), None)
            .await;
        t.scheduler.drain();

        let outcome = t.app.activate(pos, owner).await.unwrap();
        assert_eq!(outcome, ActivationOutcome::Started);
        t.pump().await;
        assert_eq!(t.world.living_actors().len(), 2);

        for _ in 0..2 {
            for actor in t.world.living_actors() {
                t.world.kill(actor);
                t.app.actor_died(actor).unwrap();
            }
            t.pump().await;
        }

        assert_eq!(t.app.stores.registry.state(pos), EncounterState::Untouched);
        assert!(!t.app.use_cases.despawn.is_tracked(pos));
        assert!(t.world.anchor_at(pos).is_none());
        assert_eq!(t.world.dropped().len(), 1);
    }

    async fn start_raid(t: &TestApp, pos: BlockPos) -> OwnerId {
        let owner = OwnerId::new();
        t.world
            .connect(owner, Vec3::new(0.5, 65.0, 4.5), ZoneInfo::default());
        t.world.place(pos, Tier::Uncommon).await.unwrap();
        t.app
            .register_anchor(pos, Tier::Uncommon, Some(owner), None)
            .await;
        t.scheduler.drain();
        t.app.activate(pos, owner).await.unwrap();
        t.pump().await;
        owner
    }

    #[tokio::test]
    async fn when_stage_overruns_budget_then_supervisor_sweep_tears_it_down() {
        let t = test_app().await;
        let pos = BlockPos::new(0, 64, 0);
        start_raid(&t, pos).await;
        assert_eq!(t.world.living_actors().len(), 2);
        assert!(t.app.use_cases.despawn.is_tracked(pos));

        t.clock.advance(ChronoDuration::seconds(91));
        let report = t.app.use_cases.timeout.sweep();
        assert_eq!(report.queued, vec![pos]);
        let queued = t.scheduler.drain();
        assert!(queued.contains(&(None, WorldCommand::Timeout(pos))));
        for (_, command) in queued {
            t.app.handle_world_command(command).await;
        }

        assert!(!t.app.stores.registry.is_known(pos));
        assert!(!t.app.stores.progress.contains(pos));
        assert!(!t.app.use_cases.despawn.is_tracked(pos));
        assert!(t.world.anchor_at(pos).is_none());
        assert!(t.world.living_actors().is_empty());
        assert!(t.world.dropped().is_empty());
    }

    #[tokio::test]
    async fn when_host_reports_anchor_destroyed_then_teardown_waits_for_world_context() {
        let t = test_app().await;
        let pos = BlockPos::new(0, 64, 0);
        start_raid(&t, pos).await;

        t.app.anchor_destroyed(pos).unwrap();
        assert_eq!(t.app.stores.registry.state(pos), EncounterState::WaveActive);
        assert_eq!(t.world.living_actors().len(), 2);

        t.pump().await;

        assert!(!t.app.stores.registry.is_known(pos));
        assert!(!t.app.stores.progress.contains(pos));
        assert!(t.world.living_actors().is_empty());
    }

    #[tokio::test]
    async fn when_despawn_timer_fires_after_expiry_then_anchor_is_removed() {
        let t = test_app().await;
        let pos = BlockPos::new(5, 64, 5);
        t.world.place(pos, Tier::Rare).await.unwrap();
        t.app
            .register_anchor(pos, Tier::Rare, None, Some(1.0))
            .await;
        t.scheduler.drain();

        t.clock.advance(ChronoDuration::minutes(2));
        t.app.handle_world_command(WorldCommand::Despawn(pos)).await;

        assert!(t.world.anchor_at(pos).is_none());
        assert!(!t.app.stores.registry.is_known(pos));
    }

    #[tokio::test]
    async fn when_despawn_timer_fires_early_then_it_is_rescheduled() {
        let t = test_app().await;
        let pos = BlockPos::new(5, 64, 5);
        t.world.place(pos, Tier::Rare).await.unwrap();
        t.app.register_anchor(pos, Tier::Rare, None, None).await;
        t.scheduler.drain();

        t.app.handle_world_command(WorldCommand::Despawn(pos)).await;

        assert_eq!(t.world.anchor_at(pos), Some(Tier::Rare));
        let queued = t.scheduler.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].1, WorldCommand::Despawn(pos));
    }

    #[tokio::test]
    async fn when_natural_spawn_is_requested_then_it_runs_on_world_context() {
        let t = test_app().await;
        let owner = OwnerId::new();
        t.world
            .connect(owner, Vec3::new(0.5, 65.0, 0.5), ZoneInfo::default());

        t.app.request_natural_spawn().unwrap();
        t.pump().await;

        assert_eq!(t.world.anchors().len(), 1);
        assert_eq!(t.app.stores.registry.len(), 1);
    }

    #[tokio::test]
    async fn when_background_tasks_run_then_world_loop_executes_dispatched_commands() {
        let world = Arc::new(HeadlessWorld::default());
        let (context, rx) = WorldContext::new();
        let mut config = MockConfigSource::new();
        config
            .expect_load()
            .returning(|| Ok(CometSettings::default()));
        let mut store = MockDespawnStore::new();
        store.expect_load_all().returning(|| Ok(Vec::new()));
        store.expect_upsert().returning(|_| Ok(()));

        let app = Arc::new(App::new(
            world.ports(),
            Arc::new(config),
            Arc::new(store),
            Arc::new(context),
            Arc::new(SystemClock::new()),
            Arc::new(FixedRandom::new(0, 0.0)),
            DespawnTiming::default(),
        ));
        app.reload_config().await;
        let settings = EngineSettings {
            natural_spawns: false,
            ..EngineSettings::default()
        };
        let handles = app.start_background_tasks(rx, &settings);

        let pos = BlockPos::new(2, 64, 2);
        let owner = OwnerId::new();
        let session = world.connect(owner, Vec3::new(2.5, 65.0, 6.5), ZoneInfo::default());
        world.place(pos, Tier::Epic).await.unwrap();
        app.register_anchor(pos, Tier::Epic, Some(owner), None).await;
        app.activate(pos, owner).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(handles.len(), 3);
        assert!(!world.notices_to(session).is_empty());
        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn when_actor_died_and_context_is_closed_then_error_is_returned() {
        let t = test_app().await;
        t.scheduler.close();

        let result = t.app.actor_died(ActorHandle::new(7));

        assert!(matches!(result, Err(DispatchError::Closed)));
    }
}
