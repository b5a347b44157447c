//! Spaceblock - voxel world core for a multiplayer space-exploration game
//!
//! Chunked block volumes (planets and ships), their render and collision
//! geometry, gravity models and the reference frames relating them.

pub mod core;
pub mod math;
pub mod block;
pub mod voxel;
pub mod container;
pub mod terrain;
pub mod environment;
