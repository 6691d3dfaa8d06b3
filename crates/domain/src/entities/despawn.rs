use chrono::{DateTime, Duration, Utc};

use crate::value_objects::{BlockPos, Tier};

/// Durable despawn bookkeeping for one placed anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct DespawnRecord {
    pub pos: BlockPos,
    pub spawned_at: DateTime<Utc>,
    /// Diagnostic only.
    pub tier: Tier,
    pub custom_minutes: Option<f64>,
}

impl DespawnRecord {
    pub fn new(pos: BlockPos, spawned_at: DateTime<Utc>, tier: Tier) -> Self {
        Self {
            pos,
            spawned_at,
            tier,
            custom_minutes: None,
        }
    }

    pub fn with_custom_minutes(mut self, minutes: Option<f64>) -> Self {
        self.custom_minutes = minutes.filter(|m| *m > 0.0);
        self
    }

    /// Custom override if set, else the global value.
    pub fn despawn_minutes(&self, global_minutes: f64) -> f64 {
        self.custom_minutes.unwrap_or(global_minutes)
    }

    pub fn expires_at(&self, minutes: f64) -> DateTime<Utc> {
        self.spawned_at + Duration::milliseconds((minutes * 60_000.0) as i64)
    }

    /// Milliseconds left; zero or negative means expired.
    pub fn remaining_millis(&self, now: DateTime<Utc>, minutes: f64) -> i64 {
        self.expires_at(minutes)
            .signed_duration_since(now)
            .num_milliseconds()
    }
}
