//! Encounter registry: which encounters exist, keyed by anchor position.
//!
//! Five independent concurrent maps (state, tier, owner, theme, forced
//! theme). Writers update them from the same call path and `clear` removes
//! them together; readers get copies, never live references.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use cometwave_domain::{
    ActivationOutcome, BlockPos, EncounterRecord, EncounterState, OwnerId, Tier,
};

#[derive(Default)]
pub struct EncounterRegistry {
    states: DashMap<BlockPos, EncounterState>,
    tiers: DashMap<BlockPos, Tier>,
    owners: DashMap<BlockPos, OwnerId>,
    themes: DashMap<BlockPos, String>,
    forced_themes: DashMap<BlockPos, String>,
}

impl EncounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record tier and owner for a freshly placed anchor.
    ///
    /// Idempotent: an existing state is never overwritten, and neither are an
    /// already recorded tier or owner.
    pub fn register_tier(&self, pos: BlockPos, tier: Tier, owner: Option<OwnerId>) {
        self.states.entry(pos).or_insert(EncounterState::Untouched);
        self.tiers.entry(pos).or_insert(tier);
        if let Some(owner) = owner {
            self.owners.entry(pos).or_insert(owner);
        }
    }

    /// Untouched when nothing is known about `pos`.
    pub fn state(&self, pos: BlockPos) -> EncounterState {
        self.states
            .get(&pos)
            .map(|s| *s)
            .unwrap_or(EncounterState::Untouched)
    }

    pub fn tier(&self, pos: BlockPos) -> Option<Tier> {
        self.tiers.get(&pos).map(|t| *t)
    }

    pub fn owner(&self, pos: BlockPos) -> Option<OwnerId> {
        self.owners.get(&pos).map(|o| *o)
    }

    pub fn theme(&self, pos: BlockPos) -> Option<String> {
        self.themes.get(&pos).map(|t| t.clone())
    }

    pub fn forced_theme(&self, pos: BlockPos) -> Option<String> {
        self.forced_themes.get(&pos).map(|t| t.clone())
    }

    pub fn is_known(&self, pos: BlockPos) -> bool {
        self.states.contains_key(&pos) || self.tiers.contains_key(&pos)
    }

    /// Untouched -> WaveActive, decided under the entry lock so concurrent
    /// callers see exactly one `Started`.
    pub fn activate(&self, pos: BlockPos, tier: Tier) -> ActivationOutcome {
        let outcome = match self.states.entry(pos) {
            Entry::Occupied(mut entry) => match *entry.get() {
                EncounterState::WaveActive => ActivationOutcome::AlreadyActive,
                EncounterState::Completed => ActivationOutcome::AlreadyCompleted,
                EncounterState::Untouched => {
                    entry.insert(EncounterState::WaveActive);
                    ActivationOutcome::Started
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(EncounterState::WaveActive);
                ActivationOutcome::Started
            }
        };

        if outcome == ActivationOutcome::Started {
            self.tiers.entry(pos).or_insert(tier);
        }
        outcome
    }

    /// WaveActive -> Completed. Any other state is left alone.
    pub fn mark_completed(&self, pos: BlockPos) -> bool {
        match self.states.get_mut(&pos) {
            Some(mut state) if *state == EncounterState::WaveActive => {
                *state = EncounterState::Completed;
                true
            }
            _ => false,
        }
    }

    pub fn set_owner(&self, pos: BlockPos, owner: OwnerId) {
        self.owners.insert(pos, owner);
    }

    /// Theme actually chosen when the encounter activated.
    pub fn assign_theme(&self, pos: BlockPos, theme_id: impl Into<String>) {
        self.themes.insert(pos, theme_id.into());
    }

    /// Override random selection for this anchor until it is cleared.
    pub fn force_theme(&self, pos: BlockPos, theme_id: impl Into<String>) {
        self.forced_themes.insert(pos, theme_id.into());
    }

    /// Forget everything about `pos`. Returns whether anything was removed;
    /// repeated calls are harmless.
    pub fn clear(&self, pos: BlockPos) -> bool {
        let state = self.states.remove(&pos).is_some();
        let tier = self.tiers.remove(&pos).is_some();
        let owner = self.owners.remove(&pos).is_some();
        let theme = self.themes.remove(&pos).is_some();
        let forced = self.forced_themes.remove(&pos).is_some();
        state || tier || owner || theme || forced
    }

    /// Whether any known encounter lies within `distance` of `pos`.
    pub fn has_active_near(&self, pos: BlockPos, distance: f64) -> bool {
        let near = |other: &BlockPos| other.distance_to(&pos) <= distance;
        self.states.iter().any(|e| near(e.key())) || self.tiers.iter().any(|e| near(e.key()))
    }

    /// WaveActive -> Untouched for an activation that never got going.
    ///
    /// Tier, owner and any forced theme stay, so the anchor can be opened
    /// again.
    pub fn revert_activation(&self, pos: BlockPos) -> bool {
        let reverted = match self.states.get_mut(&pos) {
            Some(mut state) if *state == EncounterState::WaveActive => {
                *state = EncounterState::Untouched;
                true
            }
            _ => false,
        };
        if reverted {
            self.themes.remove(&pos);
        }
        reverted
    }

    /// Copy of every record, sorted by position.
    pub fn snapshot(&self) -> Vec<EncounterRecord> {
        let mut positions: Vec<BlockPos> = self
            .states
            .iter()
            .map(|e| *e.key())
            .chain(self.tiers.iter().map(|e| *e.key()))
            .collect();
        positions.sort();
        positions.dedup();

        positions
            .into_iter()
            .map(|pos| EncounterRecord {
                pos,
                state: self.state(pos),
                tier: self.tier(pos),
                owner: self.owner(pos),
                theme_id: self.theme(pos),
                forced_theme_id: self.forced_theme(pos),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
