//! Helper types for port operations.

use cometwave_domain::{ActorHandle, BlockPos};

/// Axis-aligned extent an actor needs to stand somewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BoundingBox {
    /// Footprint of a humanoid actor.
    pub const ACTOR: BoundingBox = BoundingBox {
        width: 0.7,
        height: 1.9,
        depth: 0.7,
    };
}

/// Zone and region the host reports for a player position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZoneInfo {
    pub zone_name: Option<String>,
    pub region_name: Option<String>,
}

/// Commands executed serially on the world context.
///
/// Each one names an encounter by anchor (or an actor) rather than carrying
/// state, so a command that arrives after its encounter was cleared finds
/// nothing and does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldCommand {
    CountdownTick(BlockPos),
    Monitor(BlockPos),
    ActorDied(ActorHandle),
    Timeout(BlockPos),
    Despawn(BlockPos),
    /// The host reported the anchor block broken.
    AnchorDestroyed(BlockPos),
    /// Natural spawn roll, queued by the spawn timer.
    NaturalSpawn,
}

impl WorldCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WorldCommand::CountdownTick(_) => "countdown_tick",
            WorldCommand::Monitor(_) => "monitor",
            WorldCommand::ActorDied(_) => "actor_died",
            WorldCommand::Timeout(_) => "timeout",
            WorldCommand::Despawn(_) => "despawn",
            WorldCommand::AnchorDestroyed(_) => "anchor_destroyed",
            WorldCommand::NaturalSpawn => "natural_spawn",
        }
    }
}
