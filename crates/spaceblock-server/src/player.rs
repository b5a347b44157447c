//! Connected players

use std::collections::BTreeSet;

use crate::environment::EnvironmentId;

/// Index of a player slot on the server
pub type PlayerIndex = u32;

/// A player and the set of environments it currently tracks.
///
/// The root environment is the one the player stands in; environments
/// connected to the root become visible as well.
#[derive(Clone, Debug)]
pub struct ServerPlayer {
    index: PlayerIndex,
    nickname: String,
    root_environment: Option<EnvironmentId>,
    environments: BTreeSet<EnvironmentId>,
}

impl ServerPlayer {
    pub(crate) fn new(index: PlayerIndex, nickname: impl Into<String>) -> Self {
        Self {
            index,
            nickname: nickname.into(),
            root_environment: None,
            environments: BTreeSet::new(),
        }
    }

    pub fn index(&self) -> PlayerIndex {
        self.index
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn root_environment(&self) -> Option<EnvironmentId> {
        self.root_environment
    }

    /// Environments this player is registered in, root included
    pub fn environments(&self) -> impl Iterator<Item = EnvironmentId> + '_ {
        self.environments.iter().copied()
    }

    pub fn is_in_environment(&self, environment: EnvironmentId) -> bool {
        self.environments.contains(&environment)
    }

    pub(crate) fn set_root_environment(&mut self, environment: Option<EnvironmentId>) {
        self.root_environment = environment;
    }

    pub(crate) fn insert_environment(&mut self, environment: EnvironmentId) -> bool {
        self.environments.insert(environment)
    }

    pub(crate) fn erase_environment(&mut self, environment: EnvironmentId) -> bool {
        if self.root_environment == Some(environment) {
            self.root_environment = None;
        }
        self.environments.remove(&environment)
    }
}
