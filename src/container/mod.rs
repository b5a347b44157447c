//! Chunk containers: sparse chunk maps with a topology (planet or ship).
//!
//! A [`ChunkMap`] owns the chunks and converts between world positions,
//! chunk indices and global block indices. The [`ChunkContainer`] trait adds
//! what differs per topology: how chunks are created and where gravity points.
//!
//! Coordinates: a chunk's offset is its center, `indices * chunk_size * tile_size`.
//! Global block indices run through every chunk, `chunk * chunk_size + local - chunk_size / 2`,
//! so block `b` spans `[b * tile_size, (b + 1) * tile_size)` in container space.

pub mod planet;
pub mod ship;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::block::{BlockIndex, BlockLibrary};
use crate::core::signal::Signal;
use crate::core::types::{BlockIndices, ChunkIndices};
use crate::math::{Aabb, CORNER_COUNT};
use crate::voxel::chunk::{CHUNK_SIZE, Chunk};
use crate::voxel::direction::DirectionMask;
use crate::voxel::geometry::ChunkGeometry;
use crate::voxel::invalidator::ChunkInvalidator;

pub use planet::{GravityZones, Planet, PlanetConfig};
pub use ship::{Ship, ShipConfig};

/// Gravity at a position: `direction * acceleration * factor`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GravityForce {
    /// Unit vector (zero when there is no gravity)
    pub direction: Vec3,
    pub acceleration: f32,
    /// Strength multiplier in `[0, 1]`
    pub factor: f32,
}

impl GravityForce {
    pub fn zero() -> Self {
        Self {
            direction: Vec3::ZERO,
            acceleration: 0.0,
            factor: 0.0,
        }
    }

    /// Resulting acceleration vector
    pub fn vector(&self) -> Vec3 {
        self.direction * self.acceleration * self.factor
    }

    pub fn magnitude(&self) -> f32 {
        self.acceleration * self.factor
    }
}

/// A block update or reset inside a chunk, with the neighbours whose seams may have changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkUpdated {
    pub chunk: ChunkIndices,
    pub neighbor_mask: DirectionMask,
}

/// Container-level notifications, raised synchronously on the mutating thread
#[derive(Debug, Default)]
pub struct ContainerEvents {
    pub on_chunk_added: Signal<ChunkIndices>,
    pub on_chunk_removed: Signal<ChunkIndices>,
    pub on_chunk_updated: Signal<ChunkUpdated>,
}

/// Sparse map of chunks sharing one block library and block size.
///
/// Inserting and removing chunks requires `&mut self`: map mutation belongs
/// to the container's owning thread. Chunk content is shared through each
/// chunk's own lock.
#[derive(Debug)]
pub struct ChunkMap {
    tile_size: f32,
    chunk_size: u32,
    library: Arc<BlockLibrary>,
    chunks: HashMap<ChunkIndices, Chunk>,
    events: Arc<ContainerEvents>,
    invalidator: Arc<Mutex<ChunkInvalidator>>,
}

impl ChunkMap {
    pub fn new(library: Arc<BlockLibrary>, tile_size: f32) -> Self {
        Self::with_chunk_size(library, tile_size, CHUNK_SIZE)
    }

    pub fn with_chunk_size(library: Arc<BlockLibrary>, tile_size: f32, chunk_size: u32) -> Self {
        assert!(tile_size > 0.0, "tile size must be positive");
        assert!(chunk_size > 0 && chunk_size % 2 == 0, "chunk size must be even");

        Self {
            tile_size,
            chunk_size,
            library,
            chunks: HashMap::new(),
            events: Arc::new(ContainerEvents::default()),
            invalidator: Arc::new(Mutex::new(ChunkInvalidator::new())),
        }
    }

    /// Edge length of a block in world units
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Number of blocks along each chunk axis
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn block_library(&self) -> &Arc<BlockLibrary> {
        &self.library
    }

    pub fn events(&self) -> &ContainerEvents {
        &self.events
    }

    /// Center of a chunk in container space
    pub fn chunk_offset(&self, indices: ChunkIndices) -> Vec3 {
        indices.as_vec3() * self.chunk_size as f32 * self.tile_size
    }

    /// Container-space bounds of a chunk
    pub fn chunk_bounds(&self, indices: ChunkIndices) -> Aabb {
        let half = Vec3::splat(self.chunk_size as f32 * self.tile_size * 0.5);
        Aabb::from_center_half_extent(self.chunk_offset(indices), half)
    }

    pub fn chunk_indices_by_position(&self, position: Vec3) -> ChunkIndices {
        (position / (self.chunk_size as f32 * self.tile_size) + Vec3::splat(0.5))
            .floor()
            .as_ivec3()
    }

    /// Global block indices of a chunk-local voxel
    pub fn block_indices(&self, chunk: ChunkIndices, local: UVec3) -> BlockIndices {
        block_indices_in(self.chunk_size, chunk, local)
    }

    /// Chunk containing a global block, and the block's chunk-local coordinates
    pub fn chunk_indices_by_block_indices(&self, block: BlockIndices) -> (ChunkIndices, UVec3) {
        let shifted = block + IVec3::splat(self.chunk_size as i32 / 2);
        let size = self.chunk_size as i32;
        (shifted.div_euclid(IVec3::splat(size)), shifted.rem_euclid(IVec3::splat(size)).as_uvec3())
    }

    pub fn block_indices_by_position(&self, position: Vec3) -> BlockIndices {
        (position / self.tile_size).floor().as_ivec3()
    }

    pub fn get_chunk(&self, indices: ChunkIndices) -> Option<&Chunk> {
        self.chunks.get(&indices)
    }

    pub fn contains_chunk(&self, indices: ChunkIndices) -> bool {
        self.chunks.contains_key(&indices)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Create an unset chunk and raise "chunk added".
    ///
    /// # Panics
    /// Panics if a chunk already exists at `indices`.
    pub fn insert_chunk(&mut self, indices: ChunkIndices, geometry: ChunkGeometry) -> &Chunk {
        let chunk = Chunk::new(
            self.library.clone(),
            indices,
            UVec3::splat(self.chunk_size),
            self.tile_size,
            geometry,
        );

        {
            let events = self.events.clone();
            let invalidator = self.invalidator.clone();
            chunk.on_reset().connect(move |reset| {
                invalidator.lock().unwrap().mark_updated(reset.chunk, DirectionMask::ALL);
                events.on_chunk_updated.emit(&ChunkUpdated {
                    chunk: reset.chunk,
                    neighbor_mask: DirectionMask::ALL,
                });
            });
        }

        {
            let events = self.events.clone();
            let invalidator = self.invalidator.clone();
            chunk.on_block_updated().connect(move |update| {
                invalidator.lock().unwrap().mark_updated(update.chunk, update.neighbor_mask);
                events.on_chunk_updated.emit(&ChunkUpdated {
                    chunk: update.chunk,
                    neighbor_mask: update.neighbor_mask,
                });
            });
        }

        let chunk = match self.chunks.entry(indices) {
            Entry::Vacant(entry) => entry.insert(chunk),
            Entry::Occupied(_) => panic!("chunk {indices} already exists"),
        };

        self.events.on_chunk_added.emit(&indices);
        chunk
    }

    /// Remove a chunk and raise "chunk removed" (before the chunk is dropped).
    ///
    /// # Panics
    /// Panics if no chunk exists at `indices`.
    pub fn remove_chunk(&mut self, indices: ChunkIndices) {
        assert!(self.chunks.contains_key(&indices), "chunk {indices} does not exist");

        self.events.on_chunk_removed.emit(&indices);
        self.chunks.remove(&indices);
        self.invalidator.lock().unwrap().forget(&indices);
    }

    /// Block at global indices, `None` if its chunk is missing or unset
    pub fn get_block_content(&self, block: BlockIndices) -> Option<BlockIndex> {
        let (chunk, local) = self.chunk_indices_by_block_indices(block);
        let guard = self.get_chunk(chunk)?.lock_read();
        guard.has_content().then(|| guard.get_block_content(local))
    }

    /// Whether a global block lies inside an existing chunk
    pub fn is_within_bounds(&self, block: BlockIndices) -> bool {
        let (chunk, _) = self.chunk_indices_by_block_indices(block);
        self.contains_chunk(chunk)
    }

    /// Set a block at global indices. Returns false if the chunk is missing or
    /// unset, or if the block already had this type.
    pub fn update_block(&self, block: BlockIndices, new_block: BlockIndex) -> bool {
        let (chunk, local) = self.chunk_indices_by_block_indices(block);
        let Some(chunk) = self.get_chunk(chunk) else {
            return false;
        };

        let mut guard = chunk.lock_write();
        guard.has_content() && guard.update_block(local, new_block)
    }

    /// Container-space corners of a block, `None` if its chunk is missing
    pub fn voxel_corners(&self, block: BlockIndices) -> Option<[Vec3; CORNER_COUNT]> {
        let (indices, local) = self.chunk_indices_by_block_indices(block);
        let chunk = self.get_chunk(indices)?;
        let offset = self.chunk_offset(indices);
        Some(chunk.compute_voxel_corners(local).map(|corner| corner + offset))
    }

    /// Chunks marked dirty since the last call, restricted to existing chunks.
    /// Neighbours outside the map are forgotten so their generations do not pile up.
    pub fn take_dirty_chunks(&self) -> Vec<ChunkIndices> {
        let mut invalidator = self.invalidator.lock().unwrap();
        let mut dirty = invalidator.take_dirty_chunks();
        dirty.retain(|indices| {
            let exists = self.chunks.contains_key(indices);
            if !exists {
                invalidator.forget(indices);
            }
            exists
        });
        dirty
    }

    pub fn chunk_generation(&self, indices: ChunkIndices) -> u32 {
        self.invalidator.lock().unwrap().generation(&indices)
    }
}

/// Global block indices of a chunk-local voxel, for a given chunk size
pub fn block_indices_in(chunk_size: u32, chunk: ChunkIndices, local: UVec3) -> BlockIndices {
    let size = chunk_size as i32;
    chunk * size + local.as_ivec3() - IVec3::splat(size / 2)
}

/// Shared interface of planets and ships
pub trait ChunkContainer {
    fn chunk_map(&self) -> &ChunkMap;

    fn chunk_map_mut(&mut self) -> &mut ChunkMap;

    /// Create a chunk with the geometry this topology assigns to it
    fn add_chunk(&mut self, indices: ChunkIndices) -> &Chunk;

    fn remove_chunk(&mut self, indices: ChunkIndices) {
        self.chunk_map_mut().remove_chunk(indices);
    }

    /// Gravity center in container space
    fn center(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn compute_gravity(&self, position: Vec3) -> GravityForce;

    /// Per-frame update. Returns the chunks whose meshes and colliders must be rebuilt.
    fn tick(&mut self) -> Vec<ChunkIndices> {
        self.chunk_map().take_dirty_chunks()
    }
}
