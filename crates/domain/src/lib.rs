//! Cometwave domain: the encounter data model and its pure rules.
//!
//! Nothing in this crate performs I/O, reads the clock, or owns a random
//! number generator. Time arrives as `DateTime<Utc>` arguments and randomness
//! as roll closures, so every rule here is deterministic under test.

extern crate self as cometwave_domain;

pub mod catalog;
pub mod encounter;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use catalog::{defaults, CometSettings, SpawnSettings, ThemeCatalog};
pub use encounter::composition::{cap_ranged, is_ranged, MAX_RANGED_PER_STAGE};
pub use encounter::{EncounterPlan, EncounterProgress, Notice, WaveEffect, WaveEvent, WavePhase};
pub use entities::{
    ActivationOutcome, BossEntry, CompositionVariant, DespawnRecord, EncounterRecord,
    EncounterState, ItemStack, MobEntry, RewardDrop, RewardEntry, Stage, StageKind, Theme,
    TierRewards, LEGACY_STAGE_COUNT,
};
pub use error::DomainError;
pub use ids::{ActorHandle, OwnerId, SessionHandle};
pub use value_objects::{
    BlockPos, Rotation, StatMultipliers, Tier, TierSettings, Vec3, ZoneSpawnChances,
};
