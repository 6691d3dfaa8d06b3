//! Per-tier stage timeout and spawn radius band.
//!
//! # Clamping Rules
//!
//! - `timeout_seconds` is never below [`TierSettings::MIN_TIMEOUT_SECONDS`]
//! - `min_radius` is never below [`TierSettings::MIN_RADIUS`]
//! - `max_radius` is always at least `min_radius + 1.0`
//!
//! Values are clamped rather than rejected, so a hand-edited config file with
//! a zero timeout still produces a playable encounter.

use serde::{Deserialize, Serialize};

use super::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    timeout_seconds: u32,
    min_radius: f64,
    max_radius: f64,
}

impl TierSettings {
    /// Minimum stage timeout: 10 seconds
    pub const MIN_TIMEOUT_SECONDS: u32 = 10;

    /// Minimum inner spawn radius: 1 block
    pub const MIN_RADIUS: f64 = 1.0;

    /// Minimum width of the radius band
    pub const MIN_BAND: f64 = 1.0;

    /// Create settings, clamping every field into its valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use cometwave_domain::TierSettings;
    ///
    /// let settings = TierSettings::new(3, 0.2, 0.5);
    /// assert_eq!(settings.timeout_seconds(), 10);
    /// assert_eq!(settings.min_radius(), 1.0);
    /// assert_eq!(settings.max_radius(), 2.0);
    /// ```
    pub fn new(timeout_seconds: u32, min_radius: f64, max_radius: f64) -> Self {
        let mut settings = Self {
            timeout_seconds: Self::MIN_TIMEOUT_SECONDS,
            min_radius: Self::MIN_RADIUS,
            max_radius: Self::MIN_RADIUS + Self::MIN_BAND,
        };
        settings.set_timeout_seconds(timeout_seconds);
        settings.set_min_radius(min_radius);
        settings.set_max_radius(max_radius);
        settings
    }

    /// Reference values for each tier.
    pub fn default_for(tier: Tier) -> Self {
        match tier {
            Tier::Uncommon => Self::new(90, 3.0, 5.0),
            Tier::Rare => Self::new(150, 4.0, 6.0),
            Tier::Epic => Self::new(180, 5.0, 7.0),
            Tier::Legendary => Self::new(240, 6.0, 8.0),
        }
    }

    #[inline]
    pub const fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    #[inline]
    pub fn timeout_millis(&self) -> i64 {
        i64::from(self.timeout_seconds) * 1000
    }

    #[inline]
    pub const fn min_radius(&self) -> f64 {
        self.min_radius
    }

    #[inline]
    pub const fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn set_timeout_seconds(&mut self, seconds: u32) {
        self.timeout_seconds = seconds.max(Self::MIN_TIMEOUT_SECONDS);
    }

    pub fn set_min_radius(&mut self, radius: f64) {
        self.min_radius = radius.max(Self::MIN_RADIUS);
        if self.max_radius < self.min_radius + Self::MIN_BAND {
            self.max_radius = self.min_radius + Self::MIN_BAND;
        }
    }

    pub fn set_max_radius(&mut self, radius: f64) {
        self.max_radius = radius.max(self.min_radius + Self::MIN_BAND);
    }
}
