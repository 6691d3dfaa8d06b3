//! Domain entities.

mod despawn;
mod encounter;
mod rewards;
mod theme;

pub use despawn::DespawnRecord;
pub use encounter::{ActivationOutcome, EncounterRecord, EncounterState};
pub use rewards::{ItemStack, RewardDrop, RewardEntry, TierRewards};
pub use theme::{
    BossEntry, CompositionVariant, MobEntry, Stage, StageKind, Theme, LEGACY_STAGE_COUNT,
};
