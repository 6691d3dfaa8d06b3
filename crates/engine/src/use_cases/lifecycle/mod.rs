//! Encounter lifecycle: registering anchors and every teardown path.
//!
//! Registry, wave progress, and the despawn record are separate stores keyed
//! by the same position. Registration fills them together and `clear`
//! empties them together, so no exit path leaves an encounter half-tracked.

use std::sync::Arc;

use cometwave_domain::{BlockPos, DespawnRecord, OwnerId, Tier};

use crate::infrastructure::ports::{ActorSpawner, StructureStore};
use crate::stores::{EncounterRegistry, ProgressStore};
use crate::use_cases::despawn::{DespawnCheck, DespawnTracker};

/// What a fired despawn timer ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnOutcome {
    /// Nothing left to tear down.
    AlreadyCleared,
    Rescheduled,
    Expired,
}

pub struct EncounterLifecycle {
    registry: Arc<EncounterRegistry>,
    progress: Arc<ProgressStore>,
    despawn: Arc<DespawnTracker>,
    structures: Arc<dyn StructureStore>,
    spawner: Arc<dyn ActorSpawner>,
}

impl EncounterLifecycle {
    pub fn new(
        registry: Arc<EncounterRegistry>,
        progress: Arc<ProgressStore>,
        despawn: Arc<DespawnTracker>,
        structures: Arc<dyn StructureStore>,
        spawner: Arc<dyn ActorSpawner>,
    ) -> Self {
        Self {
            registry,
            progress,
            despawn,
            structures,
            spawner,
        }
    }

    /// Track an anchor that now exists in the world and start its despawn timer.
    pub async fn register(
        &self,
        pos: BlockPos,
        tier: Tier,
        owner: Option<OwnerId>,
        custom_minutes: Option<f64>,
    ) -> DespawnRecord {
        self.registry.register_tier(pos, tier, owner);
        let record = self.despawn.register(pos, tier, custom_minutes);
        if let Err(e) = self.despawn.schedule(pos).await {
            tracing::warn!(error = %e, pos = %pos, "Failed to schedule despawn");
        }
        tracing::info!(pos = %pos, tier = %tier, "Anchor registered");
        record
    }

    /// Forget the encounter in every store. Idempotent.
    pub fn clear(&self, pos: BlockPos) -> bool {
        let had_progress = self.progress.take(pos).is_some();
        let had_registry = self.registry.clear(pos);
        let had_record = self.despawn.unregister(pos);
        let cleared = had_progress || had_registry || had_record;
        if cleared {
            tracing::info!(pos = %pos, "Encounter cleared");
        }
        cleared
    }

    /// Despawn timer fired: tear down if due, otherwise wait again.
    pub async fn on_despawn_timer(&self, pos: BlockPos) -> DespawnOutcome {
        match self.despawn.check(pos).await {
            DespawnCheck::Missing => DespawnOutcome::AlreadyCleared,
            DespawnCheck::Pending { remaining_ms } => {
                if let Err(e) = self.despawn.schedule_in(pos, remaining_ms) {
                    tracing::warn!(error = %e, pos = %pos, "Failed to reschedule despawn");
                }
                DespawnOutcome::Rescheduled
            }
            DespawnCheck::Due => {
                self.expire(pos).await;
                DespawnOutcome::Expired
            }
        }
    }

    /// Remove an expired anchor, any actors still fighting for it, and all
    /// tracking.
    pub async fn expire(&self, pos: BlockPos) {
        if let Some(progress) = self.progress.take(pos) {
            for actor in progress.actors {
                if let Err(e) = self.spawner.despawn(actor).await {
                    tracing::warn!(error = %e, actor = %actor, "Failed to despawn actor of expired anchor");
                }
            }
        }

        if self.structures.exists(pos).await {
            match self.structures.destroy(pos).await {
                Ok(_) => tracing::info!(pos = %pos, "Expired anchor destroyed"),
                Err(e) => tracing::warn!(error = %e, pos = %pos, "Failed to destroy expired anchor"),
            }
        }

        self.clear(pos);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cometwave_domain::{
        ActorHandle, BossEntry, EncounterPlan, EncounterProgress, EncounterState, MobEntry, Stage,
        Theme, TierRewards, TierSettings,
    };

    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockActorSpawner, MockConfigSource, MockDespawnStore, MockStructureStore,
        MockWorldScheduler,
    };
    use crate::stores::CatalogStore;
    use crate::use_cases::despawn::DespawnTiming;

    struct Fixture {
        registry: Arc<EncounterRegistry>,
        progress: Arc<ProgressStore>,
        despawn: Arc<DespawnTracker>,
    }

    fn fixture(store: MockDespawnStore, scheduler: MockWorldScheduler) -> Fixture {
        let catalog = Arc::new(CatalogStore::new(Arc::new(MockConfigSource::new())));
        Fixture {
            registry: Arc::new(EncounterRegistry::new()),
            progress: Arc::new(ProgressStore::new()),
            despawn: Arc::new(DespawnTracker::new(
                Arc::new(store),
                catalog,
                Arc::new(FixedClock(Utc::now())),
                Arc::new(scheduler),
                DespawnTiming::default(),
            )),
        }
    }

    fn lifecycle(
        f: &Fixture,
        structures: MockStructureStore,
        spawner: MockActorSpawner,
    ) -> EncounterLifecycle {
        EncounterLifecycle::new(
            f.registry.clone(),
            f.progress.clone(),
            f.despawn.clone(),
            Arc::new(structures),
            Arc::new(spawner),
        )
    }

    fn pos() -> BlockPos {
        BlockPos::new(0, 64, 0)
    }

    fn relaxed_scheduler() -> MockWorldScheduler {
        let mut scheduler = MockWorldScheduler::new();
        scheduler.expect_dispatch_after().returning(|_, _| Ok(()));
        scheduler
    }

    fn writable_store() -> MockDespawnStore {
        let mut store = MockDespawnStore::new();
        store.expect_upsert().returning(|_| Ok(()));
        store.expect_delete().returning(|_| Ok(()));
        store
    }

    #[tokio::test]
    async fn when_cleared_twice_then_second_call_changes_nothing() {
        let mut store = MockDespawnStore::new();
        store.expect_upsert().returning(|_| Ok(()));
        store.expect_delete().times(1).returning(|_| Ok(()));
        let f = fixture(store, relaxed_scheduler());
        let lifecycle = lifecycle(&f, MockStructureStore::new(), MockActorSpawner::new());
        lifecycle
            .register(pos(), Tier::Rare, Some(OwnerId::new()), None)
            .await;

        assert!(lifecycle.clear(pos()));
        assert!(!lifecycle.clear(pos()));
        assert!(f.registry.snapshot().is_empty());
        assert!(!f.despawn.is_tracked(pos()));
    }

    #[tokio::test]
    async fn when_registering_with_custom_minutes_then_timer_is_scheduled() {
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .withf(|delay, _| *delay == std::time::Duration::from_secs(300))
            .times(1)
            .returning(|_, _| Ok(()));
        let f = fixture(writable_store(), scheduler);
        let lifecycle = lifecycle(&f, MockStructureStore::new(), MockActorSpawner::new());

        let record = lifecycle.register(pos(), Tier::Epic, None, Some(5.0)).await;

        assert_eq!(record.custom_minutes, Some(5.0));
        assert_eq!(f.registry.state(pos()), EncounterState::Untouched);
        assert_eq!(f.registry.tier(pos()), Some(Tier::Epic));
    }

    #[tokio::test]
    async fn when_expiring_then_anchor_and_actors_are_removed() {
        let f = fixture(writable_store(), relaxed_scheduler());
        let mut structures = MockStructureStore::new();
        structures.expect_exists().returning(|_| true);
        structures
            .expect_destroy()
            .times(1)
            .returning(|_| Ok(true));
        let mut spawner = MockActorSpawner::new();
        spawner.expect_despawn().times(2).returning(|_| Ok(()));
        let lifecycle = lifecycle(&f, structures, spawner);

        lifecycle.register(pos(), Tier::Rare, None, None).await;
        f.registry.activate(pos(), Tier::Rare);
        let mut progress = EncounterProgress::begin(
            pos(),
            OwnerId::new(),
            None,
            Tier::Rare,
            EncounterPlan::new(
                Theme::new("goblin", "Goblin Gang", [Tier::Rare]).with_stages(vec![
                    Stage::normal(vec![MobEntry::new("Grunt", 2)]),
                    Stage::boss(vec![BossEntry::new("Chief")]),
                ]),
                TierSettings::default_for(Tier::Rare),
                TierRewards::default(),
            ),
            Utc::now(),
        );
        progress.actors = vec![ActorHandle::new(1), ActorHandle::new(2)];
        f.progress.insert(progress);

        lifecycle.expire(pos()).await;

        assert!(!f.progress.contains(pos()));
        assert!(f.registry.snapshot().is_empty());
        assert!(!f.despawn.is_tracked(pos()));
    }

    #[tokio::test]
    async fn when_anchor_already_gone_then_expire_skips_destroy() {
        let f = fixture(writable_store(), relaxed_scheduler());
        let mut structures = MockStructureStore::new();
        structures.expect_exists().returning(|_| false);
        structures.expect_destroy().never();
        let lifecycle = lifecycle(&f, structures, MockActorSpawner::new());
        lifecycle.register(pos(), Tier::Rare, None, None).await;

        lifecycle.expire(pos()).await;

        assert!(!f.despawn.is_tracked(pos()));
    }

    #[tokio::test]
    async fn when_timer_fires_after_clear_then_nothing_happens() {
        let f = fixture(writable_store(), MockWorldScheduler::new());
        let mut structures = MockStructureStore::new();
        structures.expect_exists().never();
        let lifecycle = lifecycle(&f, structures, MockActorSpawner::new());

        assert_eq!(
            lifecycle.on_despawn_timer(pos()).await,
            DespawnOutcome::AlreadyCleared
        );
    }

    #[tokio::test]
    async fn when_timer_fires_early_then_it_is_rescheduled() {
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .times(1)
            .returning(|_, _| Ok(()));
        let f = fixture(writable_store(), scheduler);
        let lifecycle = lifecycle(&f, MockStructureStore::new(), MockActorSpawner::new());
        f.despawn.register(pos(), Tier::Rare, None);

        assert_eq!(
            lifecycle.on_despawn_timer(pos()).await,
            DespawnOutcome::Rescheduled
        );
    }
}
