//! Restart-safe anchor despawning.
//!
//! Every placed anchor gets a durable record. Timers do not survive a
//! restart, so startup reconciles the stored records against the wall clock
//! and a periodic sweep catches anything a timer missed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use cometwave_domain::{BlockPos, DespawnRecord, Tier};

use crate::infrastructure::ports::{
    ClockPort, DespawnStore, DispatchError, WorldCommand, WorldScheduler,
};
use crate::stores::CatalogStore;

/// Delays used when handing despawns to the world context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DespawnTiming {
    /// Wait before tearing down records that expired while offline.
    pub startup_grace: Duration,
    /// Floor for any deferred teardown.
    pub min_delay: Duration,
}

impl Default for DespawnTiming {
    fn default() -> Self {
        Self {
            startup_grace: Duration::from_secs(2),
            min_delay: Duration::from_secs(1),
        }
    }
}

/// What a fired despawn timer should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnCheck {
    /// Already unregistered by another teardown path.
    Missing,
    Pending { remaining_ms: i64 },
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupReport {
    pub expired: usize,
    pub scheduled: usize,
}

pub struct DespawnTracker {
    records: DashMap<BlockPos, DespawnRecord>,
    store: Arc<dyn DespawnStore>,
    catalog: Arc<CatalogStore>,
    clock: Arc<dyn ClockPort>,
    scheduler: Arc<dyn WorldScheduler>,
    timing: DespawnTiming,
    started: AtomicBool,
    // Set after a failed write; the next write saves everything.
    dirty: AtomicBool,
}

impl DespawnTracker {
    pub fn new(
        store: Arc<dyn DespawnStore>,
        catalog: Arc<CatalogStore>,
        clock: Arc<dyn ClockPort>,
        scheduler: Arc<dyn WorldScheduler>,
        timing: DespawnTiming,
    ) -> Self {
        Self {
            records: DashMap::new(),
            store,
            catalog,
            clock,
            scheduler,
            timing,
            started: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
        }
    }

    /// Track a freshly placed anchor and persist it immediately.
    pub fn register(&self, pos: BlockPos, tier: Tier, custom_minutes: Option<f64>) -> DespawnRecord {
        let record =
            DespawnRecord::new(pos, self.clock.now(), tier).with_custom_minutes(custom_minutes);
        self.records.insert(pos, record.clone());
        self.persist_upsert(&record);
        tracing::debug!(pos = %pos, tier = %tier, "Registered despawn record");
        record
    }

    /// Stop tracking `pos`. Storage is only touched when a record existed.
    pub fn unregister(&self, pos: BlockPos) -> bool {
        if self.records.remove(&pos).is_none() {
            return false;
        }
        self.persist_delete(pos);
        tracing::debug!(pos = %pos, "Unregistered despawn record");
        true
    }

    pub fn get(&self, pos: BlockPos) -> Option<DespawnRecord> {
        self.records.get(&pos).map(|r| r.clone())
    }

    pub fn is_tracked(&self, pos: BlockPos) -> bool {
        self.records.contains_key(&pos)
    }

    pub fn records(&self) -> Vec<DespawnRecord> {
        let mut records: Vec<DespawnRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.pos);
        records
    }

    /// Milliseconds until `pos` despawns, or -1 when it is not tracked.
    pub fn remaining_ms(&self, pos: BlockPos, despawn_minutes: f64) -> i64 {
        self.records
            .get(&pos)
            .map(|r| r.remaining_millis(self.clock.now(), despawn_minutes))
            .unwrap_or(-1)
    }

    /// Custom override for this anchor, else the configured global value.
    pub async fn despawn_minutes_for(&self, pos: BlockPos) -> f64 {
        let global = self.catalog.snapshot().await.spawn.despawn_minutes;
        self.records
            .get(&pos)
            .map(|r| r.despawn_minutes(global))
            .unwrap_or(global)
    }

    /// Re-check a record when its timer fires.
    pub async fn check(&self, pos: BlockPos) -> DespawnCheck {
        let Some(record) = self.get(pos) else {
            return DespawnCheck::Missing;
        };
        let global = self.catalog.snapshot().await.spawn.despawn_minutes;
        let remaining_ms = record.remaining_millis(self.clock.now(), record.despawn_minutes(global));
        if remaining_ms <= 0 {
            DespawnCheck::Due
        } else {
            DespawnCheck::Pending { remaining_ms }
        }
    }

    /// Defer the teardown of `pos` until its record expires.
    pub async fn schedule(&self, pos: BlockPos) -> Result<(), DispatchError> {
        let minutes = self.despawn_minutes_for(pos).await;
        let remaining = self.remaining_ms(pos, minutes);
        self.schedule_in(pos, remaining)
    }

    pub fn schedule_in(&self, pos: BlockPos, remaining_ms: i64) -> Result<(), DispatchError> {
        let delay = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0))
            .max(self.timing.min_delay);
        self.scheduler
            .dispatch_after(delay, WorldCommand::Despawn(pos))
    }

    /// One-shot reconciliation of stored records against the wall clock.
    ///
    /// Returns `None` when it already ran in this process.
    pub async fn process_on_startup(&self) -> Option<StartupReport> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Despawn startup reconciliation already ran");
            return None;
        }

        match self.store.load_all() {
            Ok(stored) => {
                // Anchors registered since boot are newer than anything on disk.
                for record in stored {
                    self.records.entry(record.pos).or_insert(record);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load despawn records, starting empty");
            }
        }

        let global = self.catalog.snapshot().await.spawn.despawn_minutes;
        let now = self.clock.now();
        let mut report = StartupReport::default();

        for record in self.records() {
            let remaining_ms = record.remaining_millis(now, record.despawn_minutes(global));
            let result = if remaining_ms <= 0 {
                report.expired += 1;
                tracing::info!(pos = %record.pos, tier = %record.tier, "Anchor expired while offline");
                self.scheduler
                    .dispatch_after(self.timing.startup_grace, WorldCommand::Despawn(record.pos))
            } else {
                report.scheduled += 1;
                self.schedule_in(record.pos, remaining_ms)
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, pos = %record.pos, "Failed to schedule despawn");
            }
        }

        tracing::info!(
            expired = report.expired,
            scheduled = report.scheduled,
            "Despawn startup reconciliation complete"
        );
        Some(report)
    }

    /// Safety net: hand every expired record to the world context now.
    pub async fn sweep(&self) -> Vec<BlockPos> {
        let global = self.catalog.snapshot().await.spawn.despawn_minutes;
        let now = self.clock.now();
        let expired: Vec<BlockPos> = self
            .records()
            .into_iter()
            .filter(|r| r.remaining_millis(now, r.despawn_minutes(global)) <= 0)
            .map(|r| r.pos)
            .collect();

        for pos in &expired {
            if let Err(e) = self.scheduler.dispatch(WorldCommand::Despawn(*pos)) {
                tracing::warn!(error = %e, pos = %pos, "Failed to dispatch despawn from sweep");
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Despawn sweep found expired anchors");
        }
        expired
    }

    fn persist_upsert(&self, record: &DespawnRecord) {
        if self.dirty.load(Ordering::SeqCst) {
            self.persist_all();
            return;
        }
        if let Err(e) = self.store.upsert(record) {
            self.dirty.store(true, Ordering::SeqCst);
            tracing::warn!(error = %e, pos = %record.pos, "Failed to persist despawn record, continuing in memory");
        }
    }

    fn persist_delete(&self, pos: BlockPos) {
        if self.dirty.load(Ordering::SeqCst) {
            self.persist_all();
            return;
        }
        if let Err(e) = self.store.delete(pos) {
            self.dirty.store(true, Ordering::SeqCst);
            tracing::warn!(error = %e, pos = %pos, "Failed to delete despawn record, continuing in memory");
        }
    }

    fn persist_all(&self) {
        match self.store.save_all(&self.records()) {
            Ok(()) => self.dirty.store(false, Ordering::SeqCst),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save despawn records, continuing in memory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use mockall::predicate::eq;

    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockConfigSource, MockDespawnStore, MockWorldScheduler, StoreError,
    };

    const MINUTES: f64 = 30.0;

    fn catalog() -> Arc<CatalogStore> {
        Arc::new(CatalogStore::new(Arc::new(MockConfigSource::new())))
    }

    fn tracker(
        store: MockDespawnStore,
        scheduler: MockWorldScheduler,
        now: chrono::DateTime<Utc>,
    ) -> DespawnTracker {
        DespawnTracker::new(
            Arc::new(store),
            catalog(),
            Arc::new(FixedClock(now)),
            Arc::new(scheduler),
            DespawnTiming::default(),
        )
    }

    fn pos() -> BlockPos {
        BlockPos::new(4, 70, 4)
    }

    #[tokio::test]
    async fn when_record_long_expired_then_startup_schedules_after_grace() {
        let now = Utc::now();
        let spawned = now - ChronoDuration::milliseconds((2.0 * MINUTES * 60_000.0) as i64);
        let mut store = MockDespawnStore::new();
        store
            .expect_load_all()
            .returning(move || Ok(vec![DespawnRecord::new(pos(), spawned, Tier::Rare)]));
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .with(eq(Duration::from_secs(2)), eq(WorldCommand::Despawn(pos())))
            .times(1)
            .returning(|_, _| Ok(()));

        let report = tracker(store, scheduler, now).process_on_startup().await;

        assert_eq!(report, Some(StartupReport { expired: 1, scheduled: 0 }));
    }

    #[tokio::test]
    async fn when_record_just_spawned_then_startup_schedules_full_duration() {
        let now = Utc::now();
        let mut store = MockDespawnStore::new();
        store
            .expect_load_all()
            .returning(move || Ok(vec![DespawnRecord::new(pos(), now, Tier::Rare)]));
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .withf(|delay, command| {
                *command == WorldCommand::Despawn(pos())
                    && *delay == Duration::from_secs((MINUTES * 60.0) as u64)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let report = tracker(store, scheduler, now).process_on_startup().await;

        assert_eq!(report, Some(StartupReport { expired: 0, scheduled: 1 }));
    }

    #[tokio::test]
    async fn when_custom_minutes_set_then_they_override_global() {
        let now = Utc::now();
        let record = DespawnRecord::new(pos(), now - ChronoDuration::minutes(6), Tier::Epic)
            .with_custom_minutes(Some(5.0));
        let mut store = MockDespawnStore::new();
        store
            .expect_load_all()
            .returning(move || Ok(vec![record.clone()]));
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .with(eq(Duration::from_secs(2)), eq(WorldCommand::Despawn(pos())))
            .times(1)
            .returning(|_, _| Ok(()));

        let report = tracker(store, scheduler, now).process_on_startup().await;

        assert_eq!(report.map(|r| r.expired), Some(1));
    }

    #[tokio::test]
    async fn when_startup_runs_twice_then_second_is_skipped() {
        let mut store = MockDespawnStore::new();
        store.expect_load_all().times(1).returning(|| Ok(vec![]));
        let tracker = tracker(store, MockWorldScheduler::new(), Utc::now());

        assert!(tracker.process_on_startup().await.is_some());
        assert!(tracker.process_on_startup().await.is_none());
    }

    #[tokio::test]
    async fn when_anchor_registered_before_startup_then_stored_copy_does_not_replace_it() {
        let now = Utc::now();
        let stale = DespawnRecord::new(pos(), now - ChronoDuration::days(2), Tier::Uncommon);
        let mut store = MockDespawnStore::new();
        store.expect_upsert().times(1).returning(|_| Ok(()));
        store
            .expect_load_all()
            .returning(move || Ok(vec![stale.clone()]));
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch_after()
            .withf(|delay, command| {
                *command == WorldCommand::Despawn(pos()) && *delay > Duration::from_secs(60)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let tracker = tracker(store, scheduler, now);

        let fresh = tracker.register(pos(), Tier::Epic, None);
        let report = tracker.process_on_startup().await;

        assert_eq!(report, Some(StartupReport { expired: 0, scheduled: 1 }));
        assert_eq!(tracker.get(pos()), Some(fresh));
    }

    #[tokio::test]
    async fn when_store_unreadable_then_startup_continues_empty() {
        let mut store = MockDespawnStore::new();
        store
            .expect_load_all()
            .returning(|| Err(StoreError::io("load_all", "permission denied")));
        let tracker = tracker(store, MockWorldScheduler::new(), Utc::now());

        assert_eq!(
            tracker.process_on_startup().await,
            Some(StartupReport::default())
        );
    }

    #[test]
    fn when_registering_then_record_is_written_through() {
        let mut store = MockDespawnStore::new();
        store
            .expect_upsert()
            .withf(|r: &DespawnRecord| r.pos == pos() && r.tier == Tier::Legendary)
            .times(1)
            .returning(|_| Ok(()));
        let tracker = tracker(store, MockWorldScheduler::new(), Utc::now());

        tracker.register(pos(), Tier::Legendary, None);

        assert!(tracker.is_tracked(pos()));
        assert_eq!(tracker.remaining_ms(pos(), MINUTES), 30 * 60_000);
    }

    #[test]
    fn when_unregistering_unknown_position_then_store_is_untouched() {
        let mut store = MockDespawnStore::new();
        store.expect_delete().never();
        let tracker = tracker(store, MockWorldScheduler::new(), Utc::now());

        assert!(!tracker.unregister(pos()));
        assert_eq!(tracker.remaining_ms(pos(), MINUTES), -1);
    }

    #[test]
    fn when_a_write_fails_then_next_write_saves_everything() {
        let mut store = MockDespawnStore::new();
        store
            .expect_upsert()
            .times(1)
            .returning(|_| Err(StoreError::io("upsert", "disk full")));
        store
            .expect_save_all()
            .withf(|records: &[DespawnRecord]| records.len() == 2)
            .times(1)
            .returning(|_| Ok(()));
        let tracker = tracker(store, MockWorldScheduler::new(), Utc::now());

        tracker.register(pos(), Tier::Rare, None);
        tracker.register(BlockPos::new(0, 0, 0), Tier::Rare, None);

        assert_eq!(tracker.records().len(), 2);
    }

    #[tokio::test]
    async fn when_sweeping_then_only_expired_records_are_dispatched() {
        let now = Utc::now();
        let fresh = BlockPos::new(1, 1, 1);
        let mut scheduler = MockWorldScheduler::new();
        scheduler
            .expect_dispatch()
            .with(eq(WorldCommand::Despawn(pos())))
            .times(1)
            .returning(|_| Ok(()));
        let tracker = tracker(MockDespawnStore::new(), scheduler, now);
        tracker.records.insert(
            pos(),
            DespawnRecord::new(pos(), now - ChronoDuration::minutes(45), Tier::Rare),
        );
        tracker
            .records
            .insert(fresh, DespawnRecord::new(fresh, now, Tier::Rare));

        assert_eq!(tracker.sweep().await, vec![pos()]);
    }

    #[tokio::test]
    async fn when_timer_fires_for_cleared_record_then_check_reports_missing() {
        let tracker = tracker(MockDespawnStore::new(), MockWorldScheduler::new(), Utc::now());
        assert_eq!(tracker.check(pos()).await, DespawnCheck::Missing);
    }
}
