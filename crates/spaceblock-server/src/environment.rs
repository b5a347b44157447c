//! Server environments
//!
//! An environment owns one chunk container (a planet or a ship), the entity
//! world living in it, the players registered in it and the transforms to
//! the environments it is connected to. Connections are keyed by
//! [`EnvironmentId`]; the [`ServerInstance`](crate::ServerInstance) keeps both
//! directions of a connection in sync.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use glam::Vec3;
use hecs::World;
use log::debug;
use spaceblock::container::{ChunkContainer, GravityForce, Planet, Ship};
use spaceblock::core::types::ChunkIndices;
use spaceblock::environment::EnvironmentTransform;

use crate::components::{GravityAffected, Position, Velocity};
use crate::player::PlayerIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentId(pub u32);

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The container an environment simulates
pub enum EnvironmentKind {
    Planet(Box<Planet>),
    Ship(Box<Ship>),
}

impl EnvironmentKind {
    pub fn container(&self) -> &dyn ChunkContainer {
        match self {
            EnvironmentKind::Planet(planet) => &**planet,
            EnvironmentKind::Ship(ship) => &**ship,
        }
    }

    pub fn container_mut(&mut self) -> &mut dyn ChunkContainer {
        match self {
            EnvironmentKind::Planet(planet) => &mut **planet,
            EnvironmentKind::Ship(ship) => &mut **ship,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EnvironmentKind::Planet(_) => "planet",
            EnvironmentKind::Ship(_) => "ship",
        }
    }
}

pub struct ServerEnvironment {
    id: EnvironmentId,
    kind: EnvironmentKind,
    world: World,
    connected: HashMap<EnvironmentId, EnvironmentTransform>,
    players: BTreeSet<PlayerIndex>,
}

impl ServerEnvironment {
    pub(crate) fn new(id: EnvironmentId, kind: EnvironmentKind) -> Self {
        Self {
            id,
            kind,
            world: World::new(),
            connected: HashMap::new(),
            players: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    pub fn kind(&self) -> &EnvironmentKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut EnvironmentKind {
        &mut self.kind
    }

    pub fn planet(&self) -> Option<&Planet> {
        match &self.kind {
            EnvironmentKind::Planet(planet) => Some(&**planet),
            EnvironmentKind::Ship(_) => None,
        }
    }

    pub fn ship(&self) -> Option<&Ship> {
        match &self.kind {
            EnvironmentKind::Ship(ship) => Some(&**ship),
            EnvironmentKind::Planet(_) => None,
        }
    }

    pub fn container(&self) -> &dyn ChunkContainer {
        self.kind.container()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Spawn an entity at rest that falls under this environment's gravity.
    pub fn spawn_body(&mut self, position: Vec3) -> hecs::Entity {
        self.world.spawn((Position(position), Velocity::default(), GravityAffected))
    }

    pub fn gravity_at(&self, position: Vec3) -> GravityForce {
        self.kind.container().compute_gravity(position)
    }

    /// Transform of `target` expressed in this environment's frame, if the two
    /// are directly connected. Multi-hop paths are left to the caller.
    pub fn environment_transformation(&self, target: EnvironmentId) -> Option<EnvironmentTransform> {
        self.connected.get(&target).copied()
    }

    pub fn is_connected(&self, other: EnvironmentId) -> bool {
        self.connected.contains_key(&other)
    }

    pub fn connected_environments(&self) -> impl Iterator<Item = (EnvironmentId, &EnvironmentTransform)> {
        self.connected.iter().map(|(id, transform)| (*id, transform))
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerIndex> + '_ {
        self.players.iter().copied()
    }

    pub fn has_player(&self, player: PlayerIndex) -> bool {
        self.players.contains(&player)
    }

    pub(crate) fn insert_connection(&mut self, other: EnvironmentId, transform: EnvironmentTransform) {
        assert!(!self.connected.contains_key(&other), "environment is already connected");
        self.connected.insert(other, transform);
        debug!("Environment {} connected to {}", self.id, other);
    }

    pub(crate) fn remove_connection(&mut self, other: EnvironmentId) {
        assert!(self.connected.remove(&other).is_some(), "environment is not connected");
        debug!("Environment {} disconnected from {}", self.id, other);
    }

    pub(crate) fn set_connection(&mut self, other: EnvironmentId, transform: EnvironmentTransform) {
        let entry = self.connected.get_mut(&other);
        *entry.expect("environment is not connected") = transform;
    }

    pub(crate) fn register_player(&mut self, player: PlayerIndex) {
        assert!(self.players.insert(player), "player was already registered");
    }

    pub(crate) fn unregister_player(&mut self, player: PlayerIndex) {
        assert!(self.players.remove(&player), "player is not registered");
    }

    /// Advance the entity world by `elapsed` seconds, then tick the container.
    /// Returns the chunks whose geometry must be rebuilt.
    pub fn tick(&mut self, elapsed: f32) -> Vec<ChunkIndices> {
        let container = self.kind.container();
        for (_, (position, velocity)) in self
            .world
            .query_mut::<(&mut Position, &mut Velocity)>()
            .with::<&GravityAffected>()
        {
            let gravity = container.compute_gravity(position.0);
            velocity.0 += gravity.vector() * elapsed;
            position.0 += velocity.0 * elapsed;
        }

        self.kind.container_mut().tick()
    }
}

impl fmt::Debug for ServerEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEnvironment")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("entities", &self.world.len())
            .field("connected", &self.connected.len())
            .field("players", &self.players.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use spaceblock::block::BlockLibrary;
    use spaceblock::container::ShipConfig;

    fn ship_environment() -> ServerEnvironment {
        let ship = Ship::new(Arc::new(BlockLibrary::with_default_blocks()), ShipConfig::default());
        ServerEnvironment::new(EnvironmentId(1), EnvironmentKind::Ship(Box::new(ship)))
    }

    #[test]
    fn test_tick_applies_gravity() {
        let mut env = ship_environment();
        let body = env.spawn_body(Vec3::new(0.0, 10.0, 0.0));
        let anchored = env.world_mut().spawn((Position(Vec3::new(0.0, 10.0, 0.0)), Velocity::default()));

        env.tick(0.5);

        let velocity = env.world().get::<&Velocity>(body).unwrap().0;
        assert!(velocity.abs_diff_eq(Vec3::new(0.0, -4.905, 0.0), 1e-4));
        assert!(env.world().get::<&Position>(body).unwrap().0.y < 10.0);
        assert_eq!(env.world().get::<&Position>(anchored).unwrap().0.y, 10.0);
    }

    #[test]
    fn test_tick_drains_dirty_chunks() {
        let mut env = ship_environment();
        if let EnvironmentKind::Ship(ship) = env.kind_mut() {
            ship.generate(true).unwrap();
        }

        assert_eq!(env.tick(0.0), vec![ChunkIndices::ZERO]);
        assert!(env.tick(0.0).is_empty());
    }

    #[test]
    #[should_panic(expected = "already connected")]
    fn test_double_connect_panics() {
        let mut env = ship_environment();
        env.insert_connection(EnvironmentId(2), EnvironmentTransform::identity());
        env.insert_connection(EnvironmentId(2), EnvironmentTransform::identity());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_double_register_panics() {
        let mut env = ship_environment();
        env.register_player(3);
        env.register_player(3);
    }
}
