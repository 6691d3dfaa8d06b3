//! Encounter progression: composition policies and the wave state machine.

pub mod composition;
mod progress;

pub use progress::{
    EncounterPlan, EncounterProgress, Notice, WaveEffect, WaveEvent, WavePhase, COMPLETE_NOTICE_SECS,
    COUNTDOWN_INTERVAL_MS, COUNTDOWN_STEPS, FAILED_NOTICE_SECS, UI_REFRESH_INTERVAL_MS,
};
