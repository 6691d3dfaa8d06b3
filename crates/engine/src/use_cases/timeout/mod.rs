//! Timeout supervision for running stages.
//!
//! The supervisor only decides that a teardown is due; the wave engine
//! performs it on the world context when the `Timeout` command arrives.

use std::sync::Arc;
use std::time::Duration;

use cometwave_domain::BlockPos;

use crate::infrastructure::ports::{ClockPort, WorldCommand, WorldScheduler};
use crate::stores::ProgressStore;
use crate::use_cases::lifecycle::EncounterLifecycle;

/// How often the supervisor sweeps.
pub const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Handed to the world context for teardown.
    pub queued: Vec<BlockPos>,
    /// Dropped from tracking because the world context was gone.
    pub force_cleared: Vec<BlockPos>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.force_cleared.is_empty()
    }
}

pub struct TimeoutSupervisor {
    progress: Arc<ProgressStore>,
    lifecycle: Arc<EncounterLifecycle>,
    scheduler: Arc<dyn WorldScheduler>,
    clock: Arc<dyn ClockPort>,
}

impl TimeoutSupervisor {
    pub fn new(
        progress: Arc<ProgressStore>,
        lifecycle: Arc<EncounterLifecycle>,
        scheduler: Arc<dyn WorldScheduler>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            progress,
            lifecycle,
            scheduler,
            clock,
        }
    }

    /// Queue teardown for every stage past its tier budget.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for progress in self.progress.snapshot() {
            if !progress.is_overdue(now) {
                continue;
            }
            let pos = progress.anchor;
            match self.scheduler.dispatch(WorldCommand::Timeout(pos)) {
                Ok(()) => {
                    tracing::info!(
                        pos = %pos,
                        stage = progress.stage_index,
                        overdue_ms = -progress.remaining_ms(now),
                        "Stage overdue, teardown queued"
                    );
                    report.queued.push(pos);
                }
                Err(e) => {
                    // A stray anchor is better than tracking that never ends.
                    tracing::warn!(error = %e, pos = %pos, "No world context for teardown, dropping tracking");
                    self.lifecycle.clear(pos);
                    report.force_cleared.push(pos);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cometwave_domain::{
        ActorHandle, BossEntry, EncounterPlan, EncounterProgress, MobEntry, OwnerId, Stage, Theme,
        Tier, TierRewards, TierSettings, WavePhase,
    };

    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::ports::{
        MockActorSpawner, MockConfigSource, MockDespawnStore, MockStructureStore,
    };
    use crate::infrastructure::world_context::QueuedScheduler;
    use crate::stores::{CatalogStore, EncounterRegistry};
    use crate::use_cases::despawn::{DespawnTiming, DespawnTracker};

    fn stage_active(pos: BlockPos, clock: &ManualClock) -> EncounterProgress {
        let mut progress = EncounterProgress::begin(
            pos,
            OwnerId::new(),
            None,
            Tier::Uncommon,
            EncounterPlan::new(
                Theme::new("skeleton", "Skeleton Horde", [Tier::Uncommon]).with_stages(vec![
                    Stage::normal(vec![MobEntry::new("Grunt", 2)]),
                    Stage::boss(vec![BossEntry::new("Chief")]),
                ]),
                TierSettings::default_for(Tier::Uncommon),
                TierRewards::default(),
            ),
            clock.now(),
        );
        progress.phase = WavePhase::StageActive;
        progress.actors = vec![ActorHandle::new(7)];
        progress
    }

    fn supervisor(
        progress: Arc<ProgressStore>,
        scheduler: Arc<QueuedScheduler>,
        clock: Arc<ManualClock>,
    ) -> TimeoutSupervisor {
        let catalog = Arc::new(CatalogStore::new(Arc::new(MockConfigSource::new())));
        let mut store = MockDespawnStore::new();
        store.expect_delete().returning(|_| Ok(()));
        let despawn = Arc::new(DespawnTracker::new(
            Arc::new(store),
            catalog,
            clock.clone(),
            scheduler.clone(),
            DespawnTiming::default(),
        ));
        let lifecycle = Arc::new(EncounterLifecycle::new(
            Arc::new(EncounterRegistry::new()),
            progress.clone(),
            despawn,
            Arc::new(MockStructureStore::new()),
            Arc::new(MockActorSpawner::new()),
        ));
        TimeoutSupervisor::new(progress, lifecycle, scheduler, clock)
    }

    #[test]
    fn when_stage_is_within_budget_then_nothing_is_queued() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let progress = Arc::new(ProgressStore::new());
        let scheduler = Arc::new(QueuedScheduler::default());
        progress.insert(stage_active(BlockPos::new(0, 64, 0), &clock));
        let supervisor = supervisor(progress, scheduler.clone(), clock.clone());

        clock.advance(chrono::Duration::seconds(89));

        assert!(supervisor.sweep().is_empty());
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn when_stage_overruns_then_timeout_is_queued_on_world_context() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let progress = Arc::new(ProgressStore::new());
        let scheduler = Arc::new(QueuedScheduler::default());
        let pos = BlockPos::new(0, 64, 0);
        progress.insert(stage_active(pos, &clock));
        let supervisor = supervisor(progress.clone(), scheduler.clone(), clock.clone());

        clock.advance(chrono::Duration::seconds(91));
        let report = supervisor.sweep();

        assert_eq!(report.queued, vec![pos]);
        assert_eq!(scheduler.drain(), vec![(None, WorldCommand::Timeout(pos))]);
        // Teardown itself belongs to the world context.
        assert!(progress.contains(pos));
    }

    #[test]
    fn when_countdown_is_slow_then_it_is_not_timed_out() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let progress = Arc::new(ProgressStore::new());
        let scheduler = Arc::new(QueuedScheduler::default());
        let mut countdown = stage_active(BlockPos::new(0, 64, 0), &clock);
        countdown.phase = WavePhase::Countdown { remaining: 1 };
        progress.insert(countdown);
        let supervisor = supervisor(progress, scheduler, clock.clone());

        clock.advance(chrono::Duration::seconds(600));

        assert!(supervisor.sweep().is_empty());
    }

    #[test]
    fn when_world_context_is_gone_then_tracking_is_force_cleared() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let progress = Arc::new(ProgressStore::new());
        let scheduler = Arc::new(QueuedScheduler::default());
        let pos = BlockPos::new(5, 70, -5);
        progress.insert(stage_active(pos, &clock));
        let supervisor = supervisor(progress.clone(), scheduler.clone(), clock.clone());
        scheduler.close();

        clock.advance(chrono::Duration::seconds(120));
        let report = supervisor.sweep();

        assert_eq!(report.force_cleared, vec![pos]);
        assert!(!progress.contains(pos));
    }
}
