//! Encounter difficulty tier.
//!
//! Tiers gate which themes may appear, how long a stage may run, how far
//! actors spawn from the anchor, and which reward table drops.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Difficulty tier, ordinal 1..=4.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    #[default]
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Uncommon, Tier::Rare, Tier::Epic, Tier::Legendary];

    pub const fn ordinal(self) -> u8 {
        match self {
            Tier::Uncommon => 1,
            Tier::Rare => 2,
            Tier::Epic => 3,
            Tier::Legendary => 4,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self, DomainError> {
        match ordinal {
            1 => Ok(Tier::Uncommon),
            2 => Ok(Tier::Rare),
            3 => Ok(Tier::Epic),
            4 => Ok(Tier::Legendary),
            other => Err(DomainError::validation(format!(
                "Tier must be between 1 and 4, got {}",
                other
            ))),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tier::Uncommon => "Uncommon",
            Tier::Rare => "Rare",
            Tier::Epic => "Epic",
            Tier::Legendary => "Legendary",
        }
    }

    /// Lenient lookup used for host-provided labels; unknown names map to Uncommon.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or(Tier::Uncommon)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<u8>() {
            return Tier::from_ordinal(ordinal);
        }
        Tier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::parse(format!("Unknown tier: {}", s)))
    }
}

impl TryFrom<u8> for Tier {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::from_ordinal(value)
    }
}

impl From<Tier> for u8 {
    fn from(value: Tier) -> Self {
        value.ordinal()
    }
}
