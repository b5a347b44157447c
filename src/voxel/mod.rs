//! Voxel data structures and operations

pub mod chunk;
pub mod collider;
pub mod direction;
pub mod geometry;
pub mod invalidator;
pub mod mesh;
pub mod serialize;

pub use chunk::{BlockUpdated, Chunk, ChunkContent, ChunkReadGuard, ChunkReset, ChunkWriteGuard, CHUNK_SIZE};
pub use collider::Collider;
pub use direction::{Direction, DirectionMask};
pub use geometry::{ChunkGeometry, Deformation, HitBlock};
pub use invalidator::ChunkInvalidator;
pub use mesh::{ChunkMesh, ChunkVertex, Face};
