// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The game host (actors, anchors, terrain, drops, players, titles)
//! - Durable despawn records and the configuration file
//! - The serialized world context (immediate and deferred commands)
//! - Clock/Random (for testing)

mod error;
mod persistence;
mod scheduler;
mod testing;
pub mod types;
mod world;

pub use types::{BoundingBox, WorldCommand, ZoneInfo};

// =============================================================================
// World Ports
// =============================================================================
pub use world::{
    ActorLivenessQuery, ActorSpawner, CollisionQuery, ItemDropSink, NotificationSink,
    PlayerDirectory, StatApplier, StructureStore, Terrain, WorldPorts,
};

#[cfg(test)]
pub use world::{
    MockActorLivenessQuery, MockActorSpawner, MockCollisionQuery, MockItemDropSink,
    MockNotificationSink, MockPlayerDirectory, MockStatApplier, MockStructureStore, MockTerrain,
};

// =============================================================================
// Storage and Scheduling Ports
// =============================================================================
pub use persistence::{ConfigSource, DespawnStore};
pub use scheduler::WorldScheduler;

#[cfg(test)]
pub use persistence::{MockConfigSource, MockDespawnStore};
#[cfg(test)]
pub use scheduler::MockWorldScheduler;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ConfigError, DispatchError, PortError, StoreError};

// =============================================================================
// Testability Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
