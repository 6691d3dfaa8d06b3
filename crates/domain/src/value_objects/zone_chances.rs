//! Tier probabilities per world zone, used by natural comet spawning.

use serde::{Deserialize, Serialize};

use super::Tier;

/// Probability of each tier being chosen in a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpawnChances {
    pub tier1: f64,
    pub tier2: f64,
    pub tier3: f64,
    pub tier4: f64,
}

impl ZoneSpawnChances {
    /// Key used for zones without their own entry.
    pub const DEFAULT_KEY: &'static str = "default";

    pub const fn new(tier1: f64, tier2: f64, tier3: f64, tier4: f64) -> Self {
        Self {
            tier1,
            tier2,
            tier3,
            tier4,
        }
    }

    pub fn probability(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Uncommon => self.tier1,
            Tier::Rare => self.tier2,
            Tier::Epic => self.tier3,
            Tier::Legendary => self.tier4,
        }
    }

    /// Cumulative selection against a roll in `[0, 1)`.
    ///
    /// Rolls beyond the cumulative total (tables that sum below 1) land on
    /// Legendary.
    pub fn select_tier(&self, roll: f64) -> Tier {
        let mut cumulative = 0.0;
        for tier in Tier::ALL {
            cumulative += self.probability(tier);
            if roll < cumulative {
                return tier;
            }
        }
        Tier::Legendary
    }

    pub fn total(&self) -> f64 {
        self.tier1 + self.tier2 + self.tier3 + self.tier4
    }

    pub fn is_valid(&self) -> bool {
        let total = self.total();
        (0.99..=1.01).contains(&total)
    }

    /// Rescale so the probabilities sum to 1. A zero table is left alone.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 {
            self.tier1 /= total;
            self.tier2 /= total;
            self.tier3 /= total;
            self.tier4 /= total;
        }
    }

    /// Reference table: low zones favour low tiers.
    pub fn default_for_zone(zone: u32) -> Self {
        match zone {
            0 => Self::new(1.0, 0.0, 0.0, 0.0),
            1 => Self::new(0.8, 0.2, 0.0, 0.0),
            2 => Self::new(0.4, 0.4, 0.2, 0.0),
            3 => Self::new(0.0, 0.3, 0.5, 0.2),
            _ => Self::new(0.0, 0.0, 0.4, 0.6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_rolling_then_tier_is_selected_cumulatively() {
        let chances = ZoneSpawnChances::default_for_zone(2);
        assert_eq!(chances.select_tier(0.0), Tier::Uncommon);
        assert_eq!(chances.select_tier(0.39), Tier::Uncommon);
        assert_eq!(chances.select_tier(0.41), Tier::Rare);
        assert_eq!(chances.select_tier(0.85), Tier::Epic);
    }

    #[test]
    fn when_table_sums_short_then_legendary_is_returned() {
        let chances = ZoneSpawnChances::new(0.1, 0.1, 0.0, 0.0);
        assert_eq!(chances.select_tier(0.5), Tier::Legendary);
    }

    #[test]
    fn when_normalizing_then_table_becomes_valid() {
        let mut chances = ZoneSpawnChances::new(2.0, 1.0, 1.0, 0.0);
        assert!(!chances.is_valid());
        chances.normalize();
        assert!(chances.is_valid());
        assert!((chances.tier1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn when_using_default_tables_then_each_is_valid() {
        for zone in 0..6 {
            assert!(ZoneSpawnChances::default_for_zone(zone).is_valid());
        }
    }
}
