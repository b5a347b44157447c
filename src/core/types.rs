//! Core type aliases and re-exports

pub use glam::{IVec3, Quat, UVec3, Vec2, Vec3};

/// Integer coordinates of a chunk inside its container
pub type ChunkIndices = IVec3;

/// Global voxel coordinates inside a container (all chunks share one index space)
pub type BlockIndices = IVec3;

/// Standard Result type for the voxel core
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
