//! Value objects: small immutable or self-validating types.

mod multipliers;
mod position;
mod tier;
mod tier_settings;
mod zone_chances;

pub use multipliers::StatMultipliers;
pub use position::{BlockPos, Rotation, Vec3};
pub use tier::Tier;
pub use tier_settings::TierSettings;
pub use zone_chances::ZoneSpawnChances;
