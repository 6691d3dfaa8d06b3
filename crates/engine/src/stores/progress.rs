//! Per-encounter wave progress, owned by the wave engine.
//!
//! The world context takes a record out, runs one transition, and puts it
//! back. A second handler that finds the slot empty simply has nothing to do.

use dashmap::DashMap;

use cometwave_domain::{ActorHandle, BlockPos, EncounterProgress};

#[derive(Default)]
pub struct ProgressStore {
    inner: DashMap<BlockPos, EncounterProgress>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, progress: EncounterProgress) {
        self.inner.insert(progress.anchor, progress);
    }

    pub fn get(&self, pos: BlockPos) -> Option<EncounterProgress> {
        self.inner.get(&pos).map(|p| p.clone())
    }

    /// Take ownership of the record; only one caller can win.
    pub fn take(&self, pos: BlockPos) -> Option<EncounterProgress> {
        self.inner.remove(&pos).map(|(_, p)| p)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.inner.contains_key(&pos)
    }

    /// Anchor of the encounter tracking `actor`.
    pub fn find_by_actor(&self, actor: ActorHandle) -> Option<BlockPos> {
        self.inner
            .iter()
            .find(|e| e.value().tracks(actor))
            .map(|e| *e.key())
    }

    pub fn snapshot(&self) -> Vec<EncounterProgress> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
