//! Loot generation for completed encounters.

use std::sync::Arc;

use cometwave_domain::defaults::{default_tier_rewards, SHARD_COUNT, SHARD_ITEM_PREFIX};
use cometwave_domain::{CometSettings, ItemStack, RewardDrop, Theme, Tier, TierRewards};

use crate::infrastructure::ports::RandomPort;

pub struct RewardGenerator {
    random: Arc<dyn RandomPort>,
}

impl RewardGenerator {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }

    /// Roll `table`, then add the tier's comet shards.
    pub fn generate(&self, table: &TierRewards, tier: Tier) -> Vec<RewardDrop> {
        let mut drops = table.roll(&mut || self.random.gen_unit());
        drops.push(Self::shard_drop(tier));
        drops
    }

    /// Theme override, then the configured table, then the built-in table.
    pub fn table_for(settings: &CometSettings, theme: Option<&Theme>, tier: Tier) -> TierRewards {
        theme
            .and_then(|t| t.reward_override(tier))
            .filter(|table| !table.is_empty())
            .or_else(|| settings.configured_rewards(tier))
            .cloned()
            .unwrap_or_else(|| default_tier_rewards(tier))
    }

    pub fn shard_drop(tier: Tier) -> RewardDrop {
        let id = format!("{}{}", SHARD_ITEM_PREFIX, tier.name());
        RewardDrop {
            display_name: format!("{} Comet Shard", tier.name()),
            item: ItemStack::new(id, SHARD_COUNT),
            bonus: false,
        }
    }

    pub fn items(drops: &[RewardDrop]) -> Vec<ItemStack> {
        drops.iter().map(|d| d.item.clone()).collect()
    }
}
