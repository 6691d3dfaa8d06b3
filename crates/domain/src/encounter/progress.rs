//! Per-encounter wave progression.
//!
//! Transitions are pure: `EncounterProgress::handle(event)` returns the next
//! progress value plus the effects a caller must apply through the world
//! ports. Nothing here touches the clock, randomness, or the world.
//!
//! ```text
//! Countdown(3) -tick-> Countdown(2) -tick-> Countdown(1) -tick-> Countdown(0)
//!   -tick-> StageActive -(all dead, more stages)-> StageActive
//!                       -(all dead, last stage)-> Completed
//!                       -(time budget spent)----> TimedOut
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::entities::{StageKind, Theme, TierRewards};
use crate::ids::{ActorHandle, OwnerId, SessionHandle};
use crate::value_objects::{BlockPos, Tier, TierSettings};

/// Number of countdown notices before stage 0 spawns.
pub const COUNTDOWN_STEPS: u8 = 3;
pub const COUNTDOWN_INTERVAL_MS: u64 = 1_000;

/// Minimum gap between periodic UI refreshes when nothing changed.
pub const UI_REFRESH_INTERVAL_MS: i64 = 5_000;

pub const STAGE_NOTICE_SECS: f32 = 6.0;
pub const COUNTDOWN_NOTICE_SECS: f32 = 1.0;
pub const COMPLETE_NOTICE_SECS: f32 = 8.0;
pub const FAILED_NOTICE_SECS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePhase {
    Countdown { remaining: u8 },
    StageActive,
    Completed,
    TimedOut,
}

impl WavePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, WavePhase::Completed | WavePhase::TimedOut)
    }
}

/// Title shown to the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub primary: String,
    pub secondary: String,
    pub duration_secs: f32,
}

impl Notice {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>, duration_secs: f32) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveEvent {
    CountdownTick { now: DateTime<Utc> },
    /// Actors that were actually placed for the current stage.
    StageSpawned { actors: Vec<ActorHandle>, now: DateTime<Utc> },
    /// `live` is the tracked list already filtered to valid, non-dead actors.
    Monitor { live: Vec<ActorHandle>, now: DateTime<Utc> },
    ForceTimeout { now: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveEffect {
    Notify(Notice),
    ScheduleCountdown { delay_ms: u64 },
    SpawnStage { stage_index: usize },
    DespawnActors(Vec<ActorHandle>),
    DropRewards,
    DestroyAnchor,
    ClearEncounter,
}

/// Configuration an encounter runs on, captured once at activation.
///
/// Stages and loot are read from here, never from the live catalog, so a
/// reload only affects encounters activated after it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterPlan {
    pub theme: Arc<Theme>,
    pub tier_settings: TierSettings,
    /// Effective loot table for the encounter's tier.
    pub rewards: TierRewards,
}

impl EncounterPlan {
    pub fn new(theme: Theme, tier_settings: TierSettings, rewards: TierRewards) -> Self {
        Self {
            theme: Arc::new(theme),
            tier_settings,
            rewards,
        }
    }
}

/// Mutable progression record for one active encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterProgress {
    pub anchor: BlockPos,
    pub owner: OwnerId,
    /// Last known session; may go stale and is re-resolved by `owner`.
    pub owner_session: Option<SessionHandle>,
    pub tier: Tier,
    pub theme_id: String,
    pub theme_name: String,
    /// Stage layout captured when the encounter began.
    pub stage_kinds: Vec<StageKind>,
    /// Legacy two-stage themes use the short titles.
    pub legacy_layout: bool,
    pub stage_index: usize,
    pub actors: Vec<ActorHandle>,
    pub stage_started_at: DateTime<Utc>,
    pub last_ui_update: Option<DateTime<Utc>>,
    pub initial_count: usize,
    pub previous_remaining: usize,
    pub timeout_ms: i64,
    pub phase: WavePhase,
    pub plan: EncounterPlan,
}

impl EncounterProgress {
    /// Fresh record in the countdown phase.
    pub fn begin(
        anchor: BlockPos,
        owner: OwnerId,
        owner_session: Option<SessionHandle>,
        tier: Tier,
        plan: EncounterPlan,
        now: DateTime<Utc>,
    ) -> Self {
        let theme = &plan.theme;
        Self {
            anchor,
            owner,
            owner_session,
            tier,
            theme_id: theme.id.clone(),
            theme_name: theme.display_name.clone(),
            stage_kinds: theme.stage_kinds(),
            legacy_layout: !theme.has_multi_wave(),
            stage_index: 0,
            actors: Vec::new(),
            stage_started_at: now,
            last_ui_update: None,
            initial_count: 0,
            previous_remaining: 0,
            timeout_ms: plan.tier_settings.timeout_millis(),
            phase: WavePhase::Countdown {
                remaining: COUNTDOWN_STEPS,
            },
            plan,
        }
    }

    pub fn total_stages(&self) -> usize {
        self.stage_kinds.len()
    }

    pub fn has_more_stages(&self) -> bool {
        self.stage_index + 1 < self.total_stages()
    }

    pub fn current_stage_kind(&self) -> StageKind {
        self.stage_kinds
            .get(self.stage_index)
            .copied()
            .unwrap_or_default()
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.stage_started_at)
            .num_milliseconds()
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        self.timeout_ms - self.elapsed_ms(now)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.phase == WavePhase::StageActive && self.remaining_ms(now) <= 0
    }

    pub fn tracks(&self, actor: ActorHandle) -> bool {
        self.actors.contains(&actor)
    }

    /// Apply one event. Terminal records ignore everything.
    pub fn handle(mut self, event: WaveEvent) -> (Self, Vec<WaveEffect>) {
        if self.phase.is_terminal() {
            return (self, Vec::new());
        }

        let effects = match (self.phase, event) {
            (WavePhase::Countdown { remaining }, WaveEvent::CountdownTick { now }) => {
                self.countdown_tick(remaining, now)
            }
            (WavePhase::StageActive, WaveEvent::StageSpawned { actors, now }) => {
                self.actors = actors;
                self.initial_count = self.actors.len();
                self.previous_remaining = self.initial_count;
                self.stage_started_at = now;
                self.last_ui_update = None;
                let live = self.actors.clone();
                self.monitor(live, now)
            }
            (WavePhase::StageActive, WaveEvent::Monitor { live, now }) => self.monitor(live, now),
            (_, WaveEvent::ForceTimeout { .. }) => self.time_out(),
            // Ticks after spawning and monitors during countdown carry no news.
            _ => Vec::new(),
        };

        (self, effects)
    }

    fn countdown_tick(&mut self, remaining: u8, now: DateTime<Utc>) -> Vec<WaveEffect> {
        if remaining == 0 {
            self.phase = WavePhase::StageActive;
            self.stage_started_at = now;
            return vec![WaveEffect::SpawnStage {
                stage_index: self.stage_index,
            }];
        }

        self.phase = WavePhase::Countdown {
            remaining: remaining - 1,
        };
        vec![
            WaveEffect::Notify(Notice::new(
                remaining.to_string(),
                format!("{} incoming", self.theme_name),
                COUNTDOWN_NOTICE_SECS,
            )),
            WaveEffect::ScheduleCountdown {
                delay_ms: COUNTDOWN_INTERVAL_MS,
            },
        ]
    }

    fn monitor(&mut self, live: Vec<ActorHandle>, now: DateTime<Utc>) -> Vec<WaveEffect> {
        if self.remaining_ms(now) <= 0 {
            self.actors = live;
            return self.time_out();
        }

        self.actors = live;
        let alive = self.actors.len();

        if alive == 0 {
            if self.has_more_stages() {
                self.stage_index += 1;
                self.actors.clear();
                self.stage_started_at = now;
                self.last_ui_update = None;
                self.initial_count = 0;
                self.previous_remaining = 0;
                return vec![WaveEffect::SpawnStage {
                    stage_index: self.stage_index,
                }];
            }

            self.phase = WavePhase::Completed;
            return vec![
                WaveEffect::DropRewards,
                WaveEffect::DestroyAnchor,
                WaveEffect::ClearEncounter,
                WaveEffect::Notify(Notice::new(
                    "Wave Complete!",
                    "Loot Dropped!",
                    COMPLETE_NOTICE_SECS,
                )),
            ];
        }

        let changed = alive != self.previous_remaining;
        let stale = self
            .last_ui_update
            .map_or(true, |at| now.signed_duration_since(at).num_milliseconds() >= UI_REFRESH_INTERVAL_MS);
        if !changed && !stale {
            return Vec::new();
        }

        self.previous_remaining = alive;
        self.last_ui_update = Some(now);
        vec![WaveEffect::Notify(self.stage_notice(now))]
    }

    fn time_out(&mut self) -> Vec<WaveEffect> {
        self.phase = WavePhase::TimedOut;
        let stragglers = std::mem::take(&mut self.actors);
        vec![
            WaveEffect::DespawnActors(stragglers),
            WaveEffect::DestroyAnchor,
            WaveEffect::ClearEncounter,
            WaveEffect::Notify(Notice::new("Wave Failed!", "Time's Up!", FAILED_NOTICE_SECS)),
        ]
    }

    /// Status title for the running stage.
    pub fn stage_notice(&self, now: DateTime<Utc>) -> Notice {
        let seconds_left = (self.remaining_ms(now).max(0) + 999) / 1000;
        let wave = self.stage_index + 1;
        let total = self.total_stages();
        let alive = self.actors.len();

        match self.current_stage_kind() {
            StageKind::Boss => {
                let primary = if self.legacy_layout {
                    "Boss Wave!".to_string()
                } else {
                    format!("Boss Wave {}/{}", wave, total)
                };
                let status = if alive > 0 { "Alive" } else { "Defeated" };
                Notice::new(
                    primary,
                    format!("Boss: {} | Time: {}s", status, seconds_left),
                    STAGE_NOTICE_SECS,
                )
            }
            StageKind::Normal => {
                let primary = if self.legacy_layout {
                    format!("{} Incoming!", self.theme_name)
                } else {
                    format!("Wave {}/{} - {}", wave, total, self.theme_name)
                };
                let killed = self.initial_count.saturating_sub(alive);
                Notice::new(
                    primary,
                    format!("Mobs: {}/{} | Time: {}s", killed, self.initial_count, seconds_left),
                    STAGE_NOTICE_SECS,
                )
            }
        }
    }
}
