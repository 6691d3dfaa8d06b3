//! Per-actor stat scaling.

use serde::{Deserialize, Serialize};

/// Multiplier vector applied to a freshly spawned actor.
///
/// Absence of a configured vector means "no modification", which is
/// exactly [`StatMultipliers::IDENTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatMultipliers {
    pub hp: f64,
    pub damage: f64,
    pub scale: f64,
    pub speed: f64,
}

impl StatMultipliers {
    pub const IDENTITY: StatMultipliers = StatMultipliers {
        hp: 1.0,
        damage: 1.0,
        scale: 1.0,
        speed: 1.0,
    };

    pub const fn new(hp: f64, damage: f64, scale: f64, speed: f64) -> Self {
        Self {
            hp,
            damage,
            scale,
            speed,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for StatMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}
