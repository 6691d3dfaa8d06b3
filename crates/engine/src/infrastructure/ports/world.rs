// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! World port traits: everything the engine asks of the game host.
//!
//! Handles returned by the host (actors, sessions) may go stale at any time.
//! Adapters answer liveness questions honestly and never panic on a stale
//! handle.

use std::sync::Arc;

use async_trait::async_trait;
use cometwave_domain::{
    ActorHandle, BlockPos, ItemStack, Notice, OwnerId, Rotation, SessionHandle, StatMultipliers,
    Tier, Vec3,
};

use super::error::PortError;
use super::types::{BoundingBox, ZoneInfo};

// =============================================================================
// Actors
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorSpawner: Send + Sync {
    async fn spawn(
        &self,
        actor_id: &str,
        position: Vec3,
        rotation: Rotation,
    ) -> Result<ActorHandle, PortError>;

    /// Remove an actor from the world. Unknown handles are not an error.
    async fn despawn(&self, actor: ActorHandle) -> Result<(), PortError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorLivenessQuery: Send + Sync {
    /// The handle still refers to an actor.
    async fn is_valid(&self, actor: ActorHandle) -> bool;
    async fn is_dead(&self, actor: ActorHandle) -> bool;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatApplier: Send + Sync {
    async fn apply_multipliers(
        &self,
        actor: ActorHandle,
        multipliers: StatMultipliers,
    ) -> Result<(), PortError>;
}

// =============================================================================
// Anchors and terrain
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StructureStore: Send + Sync {
    async fn exists(&self, pos: BlockPos) -> bool;
    /// Remove the anchor. Returns false when nothing was there.
    async fn destroy(&self, pos: BlockPos) -> Result<bool, PortError>;
    /// Start a falling anchor that lands on `pos`.
    async fn launch_falling(&self, pos: BlockPos, tier: Tier) -> Result<(), PortError>;
    /// Place the anchor directly.
    async fn place(&self, pos: BlockPos, tier: Tier) -> Result<(), PortError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollisionQuery: Send + Sync {
    async fn can_occupy(&self, position: Vec3, bounds: BoundingBox) -> bool;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Terrain: Send + Sync {
    /// Highest solid block at or below `start_y`, if any.
    async fn ground_level(&self, x: i32, z: i32, start_y: i32) -> Option<i32>;
    async fn is_water(&self, pos: BlockPos) -> bool;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemDropSink: Send + Sync {
    async fn drop_items(&self, items: Vec<ItemStack>, pos: BlockPos) -> Result<(), PortError>;
}

// =============================================================================
// Players
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, session: SessionHandle, notice: Notice) -> Result<(), PortError>;
    async fn hide(&self, session: SessionHandle) -> Result<(), PortError>;
    /// Plain chat line.
    async fn message(&self, session: SessionHandle, text: String) -> Result<(), PortError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn is_session_valid(&self, session: SessionHandle) -> bool;
    /// Current session for a stable identity, if the player is connected.
    async fn session_for(&self, owner: OwnerId) -> Option<SessionHandle>;
    async fn online_owners(&self) -> Vec<OwnerId>;
    async fn position_of(&self, owner: OwnerId) -> Option<Vec3>;
    async fn zone_of(&self, owner: OwnerId) -> ZoneInfo;
}

// =============================================================================
// Port bundle
// =============================================================================

/// All world-facing ports, cloned into each use case that needs a subset.
#[derive(Clone)]
pub struct WorldPorts {
    pub spawner: Arc<dyn ActorSpawner>,
    pub liveness: Arc<dyn ActorLivenessQuery>,
    pub stats: Arc<dyn StatApplier>,
    pub structures: Arc<dyn StructureStore>,
    pub collision: Arc<dyn CollisionQuery>,
    pub terrain: Arc<dyn Terrain>,
    pub drops: Arc<dyn ItemDropSink>,
    pub notifications: Arc<dyn NotificationSink>,
    pub players: Arc<dyn PlayerDirectory>,
}
