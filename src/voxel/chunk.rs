//! Chunk storage: a fixed-size grid of block indices guarded by a reader/writer lock.
//!
//! Every chunk carries its own lock so generation, meshing, physics and
//! network serialization can work on different chunks in parallel. Access
//! goes through scoped guards ([`ChunkReadGuard`], [`ChunkWriteGuard`]) which
//! release the lock on every exit path.

use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bitvec::prelude::{BitSlice, BitVec};
use glam::{IVec3, UVec3, Vec3};

use crate::block::{BlockIndex, BlockLibrary, EMPTY_BLOCK_INDEX};
use crate::core::signal::Signal;
use crate::core::types::ChunkIndices;
use crate::math::CORNER_COUNT;
use crate::voxel::collider::Collider;
use crate::voxel::direction::{Direction, DirectionMask};
use crate::voxel::geometry::{ChunkGeometry, HitBlock};

/// Default number of blocks along each chunk axis
pub const CHUNK_SIZE: u32 = 32;

/// Linear index of a voxel: `x + size.x * (y + size.y * z)`
#[inline]
pub fn block_local_index(size: UVec3, indices: UVec3) -> usize {
    assert!(
        indices.x < size.x && indices.y < size.y && indices.z < size.z,
        "block indices {indices} out of chunk bounds {size}"
    );
    (indices.x + size.x * (indices.y + size.y * indices.z)) as usize
}

/// Inverse of [`block_local_index`]
#[inline]
pub fn block_local_indices(size: UVec3, index: usize) -> UVec3 {
    let index = index as u32;
    UVec3::new(
        index % size.x,
        (index / size.x) % size.y,
        index / (size.x * size.y),
    )
}

/// Raised when the whole content of a chunk has been replaced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkReset {
    pub chunk: ChunkIndices,
}

/// Raised when a single voxel changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockUpdated {
    pub chunk: ChunkIndices,
    pub block: UVec3,
    pub new_block: BlockIndex,
    /// Chunk faces this voxel touches, i.e. neighbouring chunks whose seam may change
    pub neighbor_mask: DirectionMask,
}

/// Voxel data of a chunk. Only reachable through a chunk lock guard.
#[derive(Debug)]
pub struct ChunkContent {
    size: UVec3,
    blocks: Vec<BlockIndex>,
    block_type_count: Vec<u32>,
    collision_cell_mask: BitVec,
    has_per_face_collision: bool,
}

impl ChunkContent {
    fn unset(size: UVec3) -> Self {
        Self {
            size,
            blocks: Vec::new(),
            block_type_count: Vec::new(),
            collision_cell_mask: BitVec::new(),
            has_per_face_collision: false,
        }
    }

    fn volume(&self) -> usize {
        (self.size.x * self.size.y * self.size.z) as usize
    }

    /// Whether the chunk has been reset at least once
    pub fn has_content(&self) -> bool {
        !self.blocks.is_empty()
    }

    fn assert_content(&self) {
        assert!(self.has_content(), "chunk has not been reset");
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn get_block_local_index(&self, indices: UVec3) -> usize {
        block_local_index(self.size, indices)
    }

    pub fn get_block_local_indices(&self, index: usize) -> UVec3 {
        block_local_indices(self.size, index)
    }

    /// Block at chunk-local coordinates.
    ///
    /// # Panics
    /// Panics if the chunk was never reset or the coordinates are out of bounds.
    pub fn get_block_content(&self, indices: UVec3) -> BlockIndex {
        self.get_block_content_at(self.get_block_local_index(indices))
    }

    /// Block at a linear index
    pub fn get_block_content_at(&self, index: usize) -> BlockIndex {
        self.assert_content();
        self.blocks[index]
    }

    /// Block next to `indices` in the given offset, `None` outside of the chunk
    pub fn get_neighbor_block(&self, indices: UVec3, offset: IVec3) -> Option<BlockIndex> {
        let neighbor = indices.as_ivec3() + offset;
        if neighbor.cmplt(IVec3::ZERO).any() || neighbor.cmpge(self.size.as_ivec3()).any() {
            return None;
        }

        Some(self.get_block_content(neighbor.as_uvec3()))
    }

    /// Raw block array in linear index order
    pub fn content(&self) -> &[BlockIndex] {
        self.assert_content();
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.assert_content();
        self.blocks.len()
    }

    /// Number of voxels currently holding `block`
    pub fn block_type_count(&self, block: BlockIndex) -> u32 {
        self.block_type_count.get(block as usize).copied().unwrap_or(0)
    }

    /// One bit per voxel, set when the voxel contributes collision geometry
    pub fn collision_cell_mask(&self) -> &BitSlice {
        self.assert_content();
        &self.collision_cell_mask
    }

    /// Whether some voxel requires face-exact collision geometry
    pub fn has_per_face_collisions(&self) -> bool {
        self.has_per_face_collision
    }

    /// Whether every voxel is empty
    pub fn is_empty(&self) -> bool {
        self.block_type_count(EMPTY_BLOCK_INDEX) as usize == self.blocks.len()
    }

    fn allocate(&mut self) {
        let volume = self.volume();
        self.blocks.clear();
        self.blocks.resize(volume, EMPTY_BLOCK_INDEX);
        self.collision_cell_mask.clear();
        self.collision_cell_mask.resize(volume, false);
        self.block_type_count.clear();
        self.block_type_count.resize(EMPTY_BLOCK_INDEX as usize + 1, 0);
        self.block_type_count[EMPTY_BLOCK_INDEX as usize] = volume as u32;
        self.has_per_face_collision = false;
    }

    /// Rebuild histogram and collision mask from the block array
    fn recompute(&mut self, library: &BlockLibrary) {
        self.block_type_count.clear();
        self.block_type_count.resize(library.len().max(1), 0);
        self.has_per_face_collision = false;

        for (index, &block) in self.blocks.iter().enumerate() {
            assert!(library.contains(block), "unregistered block index {block}");

            self.block_type_count[block as usize] += 1;

            let data = library.get_block_data(block);
            let collides = block != EMPTY_BLOCK_INDEX && data.is_some_and(|d| d.has_collisions);
            self.collision_cell_mask.set(index, collides);
            if data.is_some_and(|d| d.per_face_collision) {
                self.has_per_face_collision = true;
            }
        }
    }

    fn increment_type_count(&mut self, block: BlockIndex) {
        let slot = block as usize;
        if slot >= self.block_type_count.len() {
            self.block_type_count.resize(slot + 1, 0);
        }
        self.block_type_count[slot] += 1;
    }
}

/// Fixed-size 3D grid of block indices, the unit of voxel storage.
///
/// Owned by a container; shared with worker threads by reference.
pub struct Chunk {
    indices: ChunkIndices,
    size: UVec3,
    block_size: f32,
    geometry: ChunkGeometry,
    library: Arc<BlockLibrary>,
    content: RwLock<ChunkContent>,
    on_reset: Signal<ChunkReset>,
    on_block_updated: Signal<BlockUpdated>,
}

impl Chunk {
    /// Create a chunk with no content. It must be reset before being read.
    pub fn new(
        library: Arc<BlockLibrary>,
        indices: ChunkIndices,
        size: UVec3,
        block_size: f32,
        geometry: ChunkGeometry,
    ) -> Self {
        assert!(size.cmpgt(UVec3::ZERO).all(), "chunk size must be non-zero");

        Self {
            indices,
            size,
            block_size,
            geometry,
            library,
            content: RwLock::new(ChunkContent::unset(size)),
            on_reset: Signal::new(),
            on_block_updated: Signal::new(),
        }
    }

    pub fn indices(&self) -> ChunkIndices {
        self.indices
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Edge length of a block in world units
    pub fn block_size(&self) -> f32 {
        self.block_size
    }

    pub fn geometry(&self) -> &ChunkGeometry {
        &self.geometry
    }

    pub fn block_library(&self) -> &BlockLibrary {
        &self.library
    }

    pub fn get_block_local_index(&self, indices: UVec3) -> usize {
        block_local_index(self.size, indices)
    }

    pub fn get_block_local_indices(&self, index: usize) -> UVec3 {
        block_local_indices(self.size, index)
    }

    pub fn contains_block(&self, indices: IVec3) -> bool {
        indices.cmpge(IVec3::ZERO).all() && indices.cmplt(self.size.as_ivec3()).all()
    }

    pub fn on_reset(&self) -> &Signal<ChunkReset> {
        &self.on_reset
    }

    pub fn on_block_updated(&self) -> &Signal<BlockUpdated> {
        &self.on_block_updated
    }

    /// Acquire shared access. Blocks while a writer holds the chunk.
    pub fn lock_read(&self) -> ChunkReadGuard<'_> {
        ChunkReadGuard {
            chunk: self,
            content: self.content.read().expect("chunk lock poisoned"),
        }
    }

    /// Acquire exclusive access. Blocks while readers or another writer hold the chunk.
    pub fn lock_write(&self) -> ChunkWriteGuard<'_> {
        ChunkWriteGuard {
            chunk: self,
            content: self.content.write().expect("chunk lock poisoned"),
        }
    }

    /// Chunk faces bordered by the voxel at `indices`
    pub fn neighbor_mask(&self, indices: UVec3) -> DirectionMask {
        let mut mask = DirectionMask::empty();
        let max = self.size - UVec3::ONE;

        if indices.x == 0 {
            mask |= DirectionMask::LEFT;
        }
        if indices.x == max.x {
            mask |= DirectionMask::RIGHT;
        }
        if indices.y == 0 {
            mask |= DirectionMask::DOWN;
        }
        if indices.y == max.y {
            mask |= DirectionMask::UP;
        }
        if indices.z == 0 {
            mask |= DirectionMask::FRONT;
        }
        if indices.z == max.z {
            mask |= DirectionMask::BACK;
        }

        mask
    }

    /// Chunk-local positions of the 8 corners of a voxel (ordered by `math::corner_index`)
    pub fn compute_voxel_corners(&self, indices: UVec3) -> [Vec3; CORNER_COUNT] {
        self.geometry.compute_voxel_corners(self.size, self.block_size, indices)
    }

    /// Collider for a single voxel, shrunk by `scale` around its center, and that center
    pub fn build_block_collider(&self, indices: UVec3, scale: f32) -> (Collider, Vec3) {
        self.geometry.build_block_collider(self.size, self.block_size, indices, scale)
    }

    /// Map a physics hit against this chunk's collider back to a voxel and face
    pub fn compute_hit_coordinates(
        &self,
        hit_position: Vec3,
        hit_normal: Vec3,
        collider: &Collider,
        sub_shape: u32,
    ) -> Option<HitBlock> {
        self.geometry.compute_hit_coordinates(
            self.size,
            self.block_size,
            hit_position,
            hit_normal,
            collider,
            sub_shape,
        )
    }

    /// Rotate normals to follow the chunk's deformation
    pub fn deform_normals(&self, normals: &mut [Vec3], reference_normal: Vec3, positions: &[Vec3]) {
        self.geometry.deform_normals(normals, None, reference_normal, positions);
    }

    pub fn deform_normals_and_tangents(
        &self,
        normals: &mut [Vec3],
        tangents: &mut [Vec3],
        reference_normal: Vec3,
        positions: &[Vec3],
    ) {
        self.geometry.deform_normals(normals, Some(tangents), reference_normal, positions);
    }

    /// Apply the chunk deformation to positions. Returns false when the chunk is flat.
    pub fn deform_positions(&self, positions: &mut [Vec3]) -> bool {
        self.geometry.deform_positions(positions)
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("indices", &self.indices)
            .field("size", &self.size)
            .field("block_size", &self.block_size)
            .field("geometry", &self.geometry)
            .finish()
    }
}

/// Shared access to a chunk's content
pub struct ChunkReadGuard<'a> {
    chunk: &'a Chunk,
    content: RwLockReadGuard<'a, ChunkContent>,
}

impl<'a> ChunkReadGuard<'a> {
    pub fn chunk(&self) -> &'a Chunk {
        self.chunk
    }

    /// Merged collider for the whole chunk, `None` when nothing collides
    pub fn build_collider(&self) -> Option<Collider> {
        self.chunk.geometry.build_collider(self.chunk, &self.content)
    }
}

impl Deref for ChunkReadGuard<'_> {
    type Target = ChunkContent;

    fn deref(&self) -> &ChunkContent {
        &self.content
    }
}

/// Exclusive access to a chunk's content.
///
/// Notifications are raised on the calling thread while the lock is held;
/// listeners must not lock the same chunk.
pub struct ChunkWriteGuard<'a> {
    chunk: &'a Chunk,
    content: RwLockWriteGuard<'a, ChunkContent>,
}

impl<'a> ChunkWriteGuard<'a> {
    pub fn chunk(&self) -> &'a Chunk {
        self.chunk
    }

    /// Replace the whole content with empty blocks
    pub fn reset(&mut self) {
        self.content.allocate();
        self.chunk.on_reset.emit(&ChunkReset { chunk: self.chunk.indices });
    }

    /// Replace the whole content using a fill callback receiving the block array
    pub fn reset_with(&mut self, fill: impl FnOnce(&mut [BlockIndex])) {
        if !self.content.has_content() {
            self.content.allocate();
        }

        fill(&mut self.content.blocks);
        self.content.recompute(&self.chunk.library);
        self.chunk.on_reset.emit(&ChunkReset { chunk: self.chunk.indices });
    }

    /// Set a single voxel. Returns false (and raises nothing) when the voxel already held `block`.
    ///
    /// # Panics
    /// Panics if the chunk was never reset, the coordinates are out of bounds
    /// or `block` is not registered in the block library.
    pub fn update_block(&mut self, indices: UVec3, block: BlockIndex) -> bool {
        let chunk = self.chunk;
        let library = &chunk.library;
        assert!(library.contains(block), "unregistered block index {block}");

        let index = self.content.get_block_local_index(indices);
        let previous = self.content.get_block_content_at(index);
        if previous == block {
            return false;
        }

        let content = &mut *self.content;
        content.blocks[index] = block;
        content.block_type_count[previous as usize] -= 1;
        content.increment_type_count(block);

        let data = library.get_block_data(block);
        let collides = block != EMPTY_BLOCK_INDEX && data.is_some_and(|d| d.has_collisions);
        content.collision_cell_mask.set(index, collides);
        if data.is_some_and(|d| d.per_face_collision) {
            content.has_per_face_collision = true;
        }

        chunk.on_block_updated.emit(&BlockUpdated {
            chunk: chunk.indices,
            block: indices,
            new_block: block,
            neighbor_mask: chunk.neighbor_mask(indices),
        });

        true
    }

    /// Merged collider for the whole chunk, `None` when nothing collides
    pub fn build_collider(&self) -> Option<Collider> {
        self.chunk.geometry.build_collider(self.chunk, &self.content)
    }
}

impl Deref for ChunkWriteGuard<'_> {
    type Target = ChunkContent;

    fn deref(&self) -> &ChunkContent {
        &self.content
    }
}

/// Directions in which `indices` has no solid neighbour inside the chunk
pub fn visible_faces(content: &ChunkContent, indices: UVec3) -> impl Iterator<Item = Direction> + '_ {
    Direction::ALL.into_iter().filter(move |dir| {
        content
            .get_neighbor_block(indices, dir.offset())
            .is_none_or(|neighbor| neighbor == EMPTY_BLOCK_INDEX)
    })
}
