//! Server side of the voxel world: environments, their connection graph,
//! players and ship persistence.

pub mod components;
pub mod config;
pub mod environment;
pub mod error;
pub mod instance;
pub mod persistence;
pub mod player;

pub use config::ServerConfig;
pub use environment::{EnvironmentId, EnvironmentKind, ServerEnvironment};
pub use error::{Result, ServerError};
pub use instance::{EnvironmentConnected, EnvironmentDisconnected, ServerInstance};
pub use player::{PlayerIndex, ServerPlayer};
