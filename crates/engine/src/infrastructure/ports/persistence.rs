// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Storage port traits: despawn records and the configuration file.

use cometwave_domain::{BlockPos, CometSettings, DespawnRecord};

use super::error::{ConfigError, StoreError};

/// Durable despawn bookkeeping. Writes go straight through to storage.
#[cfg_attr(test, mockall::automock)]
pub trait DespawnStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<DespawnRecord>, StoreError>;
    fn upsert(&self, record: &DespawnRecord) -> Result<(), StoreError>;
    fn delete(&self, pos: BlockPos) -> Result<(), StoreError>;
    fn save_all(&self, records: &[DespawnRecord]) -> Result<(), StoreError>;
}

/// Where theme, tier, reward, and spawn settings come from.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigSource: Send + Sync {
    /// A missing source yields the built-in defaults (and may persist them).
    fn load(&self) -> Result<CometSettings, ConfigError>;
    fn save(&self, settings: &CometSettings) -> Result<(), ConfigError>;
}
