//! Loot tables.

use std::fmt;

/// One line of a loot table.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardEntry {
    pub id: String,
    min_count: u32,
    max_count: u32,
    /// Percent in `[0, 100]`.
    chance: f64,
    display_name: Option<String>,
}

impl RewardEntry {
    pub const ALWAYS: f64 = 100.0;

    /// Guaranteed entry; counts are clamped so `1 <= min <= max`.
    pub fn new(id: impl Into<String>, min_count: u32, max_count: u32) -> Self {
        let min_count = min_count.max(1);
        Self {
            id: id.into(),
            min_count,
            max_count: max_count.max(min_count),
            chance: Self::ALWAYS,
            display_name: None,
        }
    }

    pub fn with_chance(mut self, percent: f64) -> Self {
        self.chance = percent.clamp(0.0, 100.0);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn min_count(&self) -> u32 {
        self.min_count
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn chance(&self) -> f64 {
        self.chance
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }

    /// `roll` in `[0, 1)`.
    pub fn should_drop(&self, roll: f64) -> bool {
        if self.chance >= Self::ALWAYS {
            return true;
        }
        if self.chance <= 0.0 {
            return false;
        }
        roll * 100.0 < self.chance
    }

    /// Maps `roll` in `[0, 1)` uniformly onto `[min_count, max_count]`.
    pub fn count_for_roll(&self, roll: f64) -> u32 {
        let span = self.max_count - self.min_count + 1;
        let offset = (roll.clamp(0.0, 1.0) * f64::from(span)) as u32;
        self.min_count + offset.min(span - 1)
    }
}

/// Guaranteed drops plus chance-gated bonus drops for one tier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TierRewards {
    pub drops: Vec<RewardEntry>,
    pub bonus_drops: Vec<RewardEntry>,
}

impl TierRewards {
    pub fn new(drops: Vec<RewardEntry>, bonus_drops: Vec<RewardEntry>) -> Self {
        Self { drops, bonus_drops }
    }

    pub fn is_empty(&self) -> bool {
        self.drops.is_empty() && self.bonus_drops.is_empty()
    }

    /// Expand the table into concrete drops.
    ///
    /// Every entry consumes one roll for its chance check and, if it drops,
    /// one more for its count.
    pub fn roll(&self, rng: &mut impl FnMut() -> f64) -> Vec<RewardDrop> {
        let mut out = Vec::new();
        let tables = [(&self.drops, false), (&self.bonus_drops, true)];
        for (entries, bonus) in tables {
            for entry in entries {
                if !entry.should_drop(rng()) {
                    continue;
                }
                out.push(RewardDrop {
                    item: ItemStack::new(entry.id.clone(), entry.count_for_roll(rng())),
                    display_name: entry.display_name().to_string(),
                    bonus,
                });
            }
        }
        out
    }
}

/// Item id and amount handed to the drop sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub id: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(id: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            count,
        }
    }
}

/// A generated drop with its presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardDrop {
    pub item: ItemStack,
    pub display_name: String,
    pub bonus: bool,
}

impl fmt::Display for RewardDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.display_name, self.item.count)?;
        if self.bonus {
            f.write_str(" (bonus)")?;
        }
        Ok(())
    }
}
