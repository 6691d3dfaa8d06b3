//! Use cases - encounter orchestration.
//!
//! Each module owns one concern of the encounter lifecycle. Use cases
//! orchestrate stores and ports; the rules themselves live in the domain crate.

pub mod despawn;
pub mod lifecycle;
pub mod placement;
pub mod rewards;
pub mod spawning;
pub mod themes;
pub mod timeout;
pub mod waves;

// Re-export main types
pub use despawn::{DespawnTiming, DespawnTracker, StartupReport};
pub use lifecycle::{DespawnOutcome, EncounterLifecycle};
pub use placement::SpatialPlacement;
pub use rewards::RewardGenerator;
pub use spawning::{CometSpawner, SpawnCheck, SpawnError, SpawnedComet};
pub use themes::ThemeResolver;
pub use timeout::{SweepReport, TimeoutSupervisor};
pub use waves::{WaveEngine, WaveError};
