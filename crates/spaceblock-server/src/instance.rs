//! Server instance: owns every environment and player
//!
//! Environments refer to each other by id. Connecting two environments
//! stores the transform in one direction and its inverse in the other, then
//! lets players rooted in either side see the other one.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use spaceblock::block::BlockLibrary;
use spaceblock::container::{Planet, Ship};
use spaceblock::core::Signal;
use spaceblock::environment::EnvironmentTransform;

use crate::config::ServerConfig;
use crate::environment::{EnvironmentId, EnvironmentKind, ServerEnvironment};
use crate::error::{Result, ServerError};
use crate::persistence;
use crate::player::{PlayerIndex, ServerPlayer};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentConnected {
    pub from: EnvironmentId,
    pub to: EnvironmentId,
    /// `to` expressed in the frame of `from`
    pub transform: EnvironmentTransform,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvironmentDisconnected {
    pub from: EnvironmentId,
    pub to: EnvironmentId,
}

pub struct ServerInstance {
    config: ServerConfig,
    block_library: Arc<BlockLibrary>,
    environments: HashMap<EnvironmentId, ServerEnvironment>,
    players: HashMap<PlayerIndex, ServerPlayer>,
    next_environment: u32,
    next_player: PlayerIndex,
    pub on_environment_connected: Signal<EnvironmentConnected>,
    pub on_environment_disconnected: Signal<EnvironmentDisconnected>,
}

impl ServerInstance {
    pub fn new(config: ServerConfig, block_library: Arc<BlockLibrary>) -> Self {
        Self {
            config,
            block_library,
            environments: HashMap::new(),
            players: HashMap::new(),
            next_environment: 0,
            next_player: 0,
            on_environment_connected: Signal::new(),
            on_environment_disconnected: Signal::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn block_library(&self) -> &Arc<BlockLibrary> {
        &self.block_library
    }

    // -- Environments --

    pub fn add_environment(&mut self, kind: EnvironmentKind) -> EnvironmentId {
        let id = EnvironmentId(self.next_environment);
        self.next_environment += 1;

        info!("Created {} environment {}", kind.name(), id);
        self.environments.insert(id, ServerEnvironment::new(id, kind));
        id
    }

    /// Generate a planet from the configured terrain parameters.
    pub fn create_planet(&mut self) -> Result<EnvironmentId> {
        let mut planet = Planet::new(self.block_library.clone(), self.config.planet.clone());
        planet.generate_chunks(self.config.terrain.clone())?;
        Ok(self.add_environment(EnvironmentKind::Planet(Box::new(planet))))
    }

    pub fn create_ship(&mut self, small: bool) -> Result<EnvironmentId> {
        let mut ship = Ship::new(self.block_library.clone(), self.config.ship.clone());
        ship.generate(small)?;
        Ok(self.add_environment(EnvironmentKind::Ship(Box::new(ship))))
    }

    /// Load a ship from `path`, falling back to a freshly generated one when
    /// the file is missing or cannot be read.
    pub async fn load_or_create_ship(&mut self, path: &Path, small: bool) -> Result<EnvironmentId> {
        match persistence::load_ship(self.block_library.clone(), self.config.ship.clone(), path).await {
            Ok(ship) => Ok(self.add_environment(EnvironmentKind::Ship(Box::new(ship)))),
            Err(err) => {
                warn!("Failed to load ship from {}: {}, generating a new one", path.display(), err);
                self.create_ship(small)
            }
        }
    }

    pub async fn save_ship(&self, id: EnvironmentId, path: &Path) -> Result<()> {
        let env = self.environments.get(&id).ok_or(ServerError::UnknownEnvironment(id))?;
        let ship = env.ship().ok_or(ServerError::NotAShip(id))?;
        persistence::save_ship(ship, path).await
    }

    pub fn environment(&self, id: EnvironmentId) -> Option<&ServerEnvironment> {
        self.environments.get(&id)
    }

    pub fn environment_mut(&mut self, id: EnvironmentId) -> Option<&mut ServerEnvironment> {
        self.environments.get_mut(&id)
    }

    pub fn environment_count(&self) -> usize {
        self.environments.len()
    }

    fn env_mut(&mut self, id: EnvironmentId) -> &mut ServerEnvironment {
        self.environments.get_mut(&id).expect("environment does not exist")
    }

    /// Connect `from` and `to`. `transform` places `to` inside the frame of
    /// `from`; the reverse direction receives its inverse.
    pub fn connect(&mut self, from: EnvironmentId, to: EnvironmentId, transform: EnvironmentTransform) {
        assert_ne!(from, to, "cannot connect an environment to itself");

        self.connect_one_way(from, to, transform);
        self.connect_one_way(to, from, -transform);

        self.on_environment_connected.emit(&EnvironmentConnected { from, to, transform });
    }

    /// Sever both directions of a connection.
    pub fn disconnect(&mut self, from: EnvironmentId, to: EnvironmentId) {
        self.disconnect_one_way(from, to);
        self.disconnect_one_way(to, from);

        self.on_environment_disconnected.emit(&EnvironmentDisconnected { from, to });
    }

    fn connect_one_way(&mut self, env: EnvironmentId, other: EnvironmentId, transform: EnvironmentTransform) {
        self.env_mut(env).insert_connection(other, transform);

        // Players standing in `other` now also see `env`
        for player in self.players_rooted_in(other) {
            self.add_player_to_environment(player, env);
        }
    }

    fn disconnect_one_way(&mut self, env: EnvironmentId, other: EnvironmentId) {
        self.env_mut(env).remove_connection(other);

        for player in self.players_rooted_in(other) {
            if self.players[&player].is_in_environment(env) {
                self.remove_player_from_environment(player, env);
            }
        }
    }

    fn players_rooted_in(&self, env: EnvironmentId) -> Vec<PlayerIndex> {
        self.environments[&env]
            .players()
            .filter(|player| self.players[player].root_environment() == Some(env))
            .collect()
    }

    /// Transform of `to` expressed in the frame of `from` (direct connections only).
    pub fn environment_transformation(&self, from: EnvironmentId, to: EnvironmentId) -> Option<EnvironmentTransform> {
        self.environments.get(&from)?.environment_transformation(to)
    }

    pub fn update_connected_transform(&mut self, from: EnvironmentId, to: EnvironmentId, transform: EnvironmentTransform) {
        self.env_mut(from).set_connection(to, transform);
        self.env_mut(to).set_connection(from, -transform);
    }

    /// Update the transform only if it moved beyond the default epsilons.
    /// Returns whether anything changed.
    pub fn compare_and_update_connected_transform(
        &mut self,
        from: EnvironmentId,
        to: EnvironmentId,
        transform: EnvironmentTransform,
    ) -> bool {
        let current = self
            .environment_transformation(from, to)
            .expect("environment is not connected");
        if current.approx_eq(&transform) {
            return false;
        }

        self.update_connected_transform(from, to, transform);
        true
    }

    /// Unload an environment: sever its connections, detach its players and
    /// drop its entities. Returns the removed environment.
    pub fn destroy_environment(&mut self, id: EnvironmentId) -> Option<ServerEnvironment> {
        let env = self.environments.get(&id)?;
        let players: Vec<PlayerIndex> = env.players().collect();
        let connected: Vec<EnvironmentId> = env.connected_environments().map(|(other, _)| other).collect();

        for other in connected {
            self.disconnect(id, other);
        }
        for player in players {
            self.remove_player_from_environment(player, id);
        }

        let mut env = self.environments.remove(&id)?;
        env.world_mut().clear();
        info!("Destroyed {} environment {}", env.kind().name(), id);
        Some(env)
    }

    // -- Players --

    pub fn add_player(&mut self, nickname: impl Into<String>) -> PlayerIndex {
        let index = self.next_player;
        self.next_player += 1;
        self.players.insert(index, ServerPlayer::new(index, nickname));
        index
    }

    pub fn remove_player(&mut self, index: PlayerIndex) -> Option<ServerPlayer> {
        let environments: Vec<EnvironmentId> = self.players.get(&index)?.environments().collect();
        for env in environments {
            self.remove_player_from_environment(index, env);
        }
        self.players.remove(&index)
    }

    pub fn player(&self, index: PlayerIndex) -> Option<&ServerPlayer> {
        self.players.get(&index)
    }

    pub fn players(&self) -> impl Iterator<Item = &ServerPlayer> {
        self.players.values()
    }

    /// Move a player so it stands in `root`. It leaves every environment it
    /// tracked and joins `root` plus everything connected to it.
    pub fn update_root_environment(&mut self, index: PlayerIndex, root: EnvironmentId) {
        let previous: Vec<EnvironmentId> = self.players[&index].environments().collect();
        for env in previous {
            self.remove_player_from_environment(index, env);
        }

        let connected: Vec<EnvironmentId> = self.environments[&root]
            .connected_environments()
            .map(|(other, _)| other)
            .collect();

        self.add_player_to_environment(index, root);
        self.players
            .get_mut(&index)
            .expect("player does not exist")
            .set_root_environment(Some(root));

        for env in connected {
            self.add_player_to_environment(index, env);
        }
    }

    fn add_player_to_environment(&mut self, index: PlayerIndex, env: EnvironmentId) {
        let player = self.players.get_mut(&index).expect("player does not exist");
        if player.insert_environment(env) {
            self.env_mut(env).register_player(index);
        }
    }

    fn remove_player_from_environment(&mut self, index: PlayerIndex, env: EnvironmentId) {
        let player = self.players.get_mut(&index).expect("player does not exist");
        if player.erase_environment(env) {
            self.env_mut(env).unregister_player(index);
        }
    }

    /// Advance every environment by one configured tick.
    pub fn tick(&mut self) {
        let elapsed = self.config.tick_duration();
        for env in self.environments.values_mut() {
            let dirty = env.tick(elapsed);
            if !dirty.is_empty() {
                log::trace!("Environment {}: {} chunks to rebuild", env.id(), dirty.len());
            }
        }
    }
}

impl std::fmt::Debug for ServerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerInstance")
            .field("environments", &self.environments.len())
            .field("players", &self.players.len())
            .finish()
    }
}
