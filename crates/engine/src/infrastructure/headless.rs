//! In-memory world used when no game host is attached.
//!
//! Implements every world port over plain maps: actors are records that can
//! be killed by hand, anchors are a set of positions, the ground is flat.
//! The binary runs against it for dry runs and the test suite drives whole
//! encounters through it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use cometwave_domain::{
    ActorHandle, BlockPos, ItemStack, Notice, OwnerId, Rotation, SessionHandle, StatMultipliers,
    Tier, Vec3,
};

use crate::infrastructure::ports::{
    ActorLivenessQuery, ActorSpawner, BoundingBox, CollisionQuery, ItemDropSink,
    NotificationSink, PlayerDirectory, PortError, StatApplier, StructureStore, Terrain,
    WorldPorts, ZoneInfo,
};

pub const DEFAULT_GROUND_Y: i32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessActor {
    pub actor_id: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub multipliers: StatMultipliers,
    pub dead: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessPlayer {
    pub session: SessionHandle,
    pub position: Vec3,
    pub zone: ZoneInfo,
}

/// Something the world showed a player.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    Notice(Notice),
    Hidden,
    Message(String),
}

pub struct HeadlessWorld {
    ground_y: i32,
    next_actor: AtomicU64,
    next_session: AtomicU64,
    actors: DashMap<ActorHandle, HeadlessActor>,
    anchors: DashMap<BlockPos, Tier>,
    blocked: DashSet<BlockPos>,
    water: DashSet<(i32, i32)>,
    players: DashMap<OwnerId, HeadlessPlayer>,
    drops: Mutex<Vec<(BlockPos, Vec<ItemStack>)>>,
    deliveries: Mutex<Vec<(SessionHandle, Delivered)>>,
}

impl HeadlessWorld {
    pub fn new(ground_y: i32) -> Self {
        Self {
            ground_y,
            next_actor: AtomicU64::new(1),
            next_session: AtomicU64::new(1),
            actors: DashMap::new(),
            anchors: DashMap::new(),
            blocked: DashSet::new(),
            water: DashSet::new(),
            players: DashMap::new(),
            drops: Mutex::new(Vec::new()),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Every port backed by this world.
    pub fn ports(self: &Arc<Self>) -> WorldPorts {
        WorldPorts {
            spawner: self.clone(),
            liveness: self.clone(),
            stats: self.clone(),
            structures: self.clone(),
            collision: self.clone(),
            terrain: self.clone(),
            drops: self.clone(),
            notifications: self.clone(),
            players: self.clone(),
        }
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Connect `owner` with a fresh session; reconnecting replaces the old one.
    pub fn connect(&self, owner: OwnerId, position: Vec3, zone: ZoneInfo) -> SessionHandle {
        let session = SessionHandle::new(self.next_session.fetch_add(1, Ordering::SeqCst));
        self.players.insert(
            owner,
            HeadlessPlayer {
                session,
                position,
                zone,
            },
        );
        session
    }

    pub fn disconnect(&self, owner: OwnerId) -> bool {
        self.players.remove(&owner).is_some()
    }

    pub fn deliveries_to(&self, session: SessionHandle) -> Vec<Delivered> {
        self.deliveries
            .lock()
            .map(|log| {
                log.iter()
                    .filter(|(s, _)| *s == session)
                    .map(|(_, d)| d.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn notices_to(&self, session: SessionHandle) -> Vec<Notice> {
        self.deliveries_to(session)
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Actors
    // =========================================================================

    pub fn kill(&self, actor: ActorHandle) -> bool {
        match self.actors.get_mut(&actor) {
            Some(mut record) if !record.dead => {
                record.dead = true;
                true
            }
            _ => false,
        }
    }

    /// Drop an actor as if the host unloaded it.
    pub fn invalidate(&self, actor: ActorHandle) -> bool {
        self.actors.remove(&actor).is_some()
    }

    pub fn actor(&self, actor: ActorHandle) -> Option<HeadlessActor> {
        self.actors.get(&actor).map(|a| a.clone())
    }

    pub fn living_actors(&self) -> Vec<ActorHandle> {
        let mut living: Vec<ActorHandle> = self
            .actors
            .iter()
            .filter(|a| !a.dead)
            .map(|a| *a.key())
            .collect();
        living.sort();
        living
    }

    // =========================================================================
    // Terrain and anchors
    // =========================================================================

    pub fn block(&self, pos: BlockPos) {
        self.blocked.insert(pos);
    }

    pub fn flood(&self, x: i32, z: i32) {
        self.water.insert((x, z));
    }

    pub fn anchor_at(&self, pos: BlockPos) -> Option<Tier> {
        self.anchors.get(&pos).map(|t| *t)
    }

    pub fn anchors(&self) -> Vec<BlockPos> {
        let mut anchors: Vec<BlockPos> = self.anchors.iter().map(|a| *a.key()).collect();
        anchors.sort();
        anchors
    }

    pub fn dropped(&self) -> Vec<(BlockPos, Vec<ItemStack>)> {
        self.drops.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn cell(position: Vec3) -> BlockPos {
        BlockPos::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    fn deliver(&self, session: SessionHandle, delivered: Delivered) -> Result<(), PortError> {
        if !self.players.iter().any(|p| p.session == session) {
            return Err(PortError::stale(session));
        }
        self.deliveries
            .lock()
            .map_err(|_| PortError::Unavailable)?
            .push((session, delivered));
        Ok(())
    }
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new(DEFAULT_GROUND_Y)
    }
}

#[async_trait]
impl ActorSpawner for HeadlessWorld {
    async fn spawn(
        &self,
        actor_id: &str,
        position: Vec3,
        rotation: Rotation,
    ) -> Result<ActorHandle, PortError> {
        let handle = ActorHandle::new(self.next_actor.fetch_add(1, Ordering::SeqCst));
        self.actors.insert(
            handle,
            HeadlessActor {
                actor_id: actor_id.to_string(),
                position,
                rotation,
                multipliers: StatMultipliers::IDENTITY,
                dead: false,
            },
        );
        Ok(handle)
    }

    async fn despawn(&self, actor: ActorHandle) -> Result<(), PortError> {
        self.actors.remove(&actor);
        Ok(())
    }
}

#[async_trait]
impl ActorLivenessQuery for HeadlessWorld {
    async fn is_valid(&self, actor: ActorHandle) -> bool {
        self.actors.contains_key(&actor)
    }

    async fn is_dead(&self, actor: ActorHandle) -> bool {
        self.actors.get(&actor).map(|a| a.dead).unwrap_or(true)
    }
}

#[async_trait]
impl StatApplier for HeadlessWorld {
    async fn apply_multipliers(
        &self,
        actor: ActorHandle,
        multipliers: StatMultipliers,
    ) -> Result<(), PortError> {
        let mut record = self
            .actors
            .get_mut(&actor)
            .ok_or_else(|| PortError::stale(actor))?;
        record.multipliers = multipliers;
        Ok(())
    }
}

#[async_trait]
impl StructureStore for HeadlessWorld {
    async fn exists(&self, pos: BlockPos) -> bool {
        self.anchors.contains_key(&pos)
    }

    async fn destroy(&self, pos: BlockPos) -> Result<bool, PortError> {
        Ok(self.anchors.remove(&pos).is_some())
    }

    async fn launch_falling(&self, pos: BlockPos, tier: Tier) -> Result<(), PortError> {
        // Nothing to animate; the anchor lands immediately.
        self.anchors.insert(pos, tier);
        Ok(())
    }

    async fn place(&self, pos: BlockPos, tier: Tier) -> Result<(), PortError> {
        self.anchors.insert(pos, tier);
        Ok(())
    }
}

#[async_trait]
impl CollisionQuery for HeadlessWorld {
    async fn can_occupy(&self, position: Vec3, bounds: BoundingBox) -> bool {
        let feet = Self::cell(position);
        let head = Self::cell(position.offset(0.0, bounds.height, 0.0));
        !(self.blocked.contains(&feet) || self.blocked.contains(&head))
    }
}

#[async_trait]
impl Terrain for HeadlessWorld {
    async fn ground_level(&self, _x: i32, _z: i32, start_y: i32) -> Option<i32> {
        (start_y >= self.ground_y).then_some(self.ground_y)
    }

    async fn is_water(&self, pos: BlockPos) -> bool {
        self.water.contains(&(pos.x, pos.z))
    }
}

#[async_trait]
impl ItemDropSink for HeadlessWorld {
    async fn drop_items(&self, items: Vec<ItemStack>, pos: BlockPos) -> Result<(), PortError> {
        self.drops
            .lock()
            .map_err(|_| PortError::Unavailable)?
            .push((pos, items));
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for HeadlessWorld {
    async fn notify(&self, session: SessionHandle, notice: Notice) -> Result<(), PortError> {
        self.deliver(session, Delivered::Notice(notice))
    }

    async fn hide(&self, session: SessionHandle) -> Result<(), PortError> {
        self.deliver(session, Delivered::Hidden)
    }

    async fn message(&self, session: SessionHandle, text: String) -> Result<(), PortError> {
        self.deliver(session, Delivered::Message(text))
    }
}

#[async_trait]
impl PlayerDirectory for HeadlessWorld {
    async fn is_session_valid(&self, session: SessionHandle) -> bool {
        self.players.iter().any(|p| p.session == session)
    }

    async fn session_for(&self, owner: OwnerId) -> Option<SessionHandle> {
        self.players.get(&owner).map(|p| p.session)
    }

    async fn online_owners(&self) -> Vec<OwnerId> {
        self.players.iter().map(|p| *p.key()).collect()
    }

    async fn position_of(&self, owner: OwnerId) -> Option<Vec3> {
        self.players.get(&owner).map(|p| p.position)
    }

    async fn zone_of(&self, owner: OwnerId) -> ZoneInfo {
        self.players
            .get(&owner)
            .map(|p| p.zone.clone())
            .unwrap_or_default()
    }
}
