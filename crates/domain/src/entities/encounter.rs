//! Registry-level encounter state.

use std::fmt;

use crate::ids::OwnerId;
use crate::value_objects::{BlockPos, Tier};

/// Coarse lifecycle of an encounter anchor.
///
/// Only ever moves forward: Untouched -> WaveActive -> Completed. Teardown
/// removes the record instead of resetting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncounterState {
    #[default]
    Untouched,
    WaveActive,
    Completed,
}

impl fmt::Display for EncounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncounterState::Untouched => f.write_str("untouched"),
            EncounterState::WaveActive => f.write_str("wave_active"),
            EncounterState::Completed => f.write_str("completed"),
        }
    }
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Transitioned Untouched -> WaveActive; the caller owns the countdown.
    Started,
    AlreadyActive,
    /// Completed encounters may only be reopened for their results.
    AlreadyCompleted,
}

/// Point-in-time copy of everything the registry knows about one anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterRecord {
    pub pos: BlockPos,
    pub state: EncounterState,
    pub tier: Option<Tier>,
    pub owner: Option<OwnerId>,
    pub theme_id: Option<String>,
    pub forced_theme_id: Option<String>,
}
