//! Tracking of chunks whose derived data (meshes, colliders) must be rebuilt after edits.

use std::collections::{HashMap, HashSet};

use crate::core::types::ChunkIndices;
use crate::voxel::direction::DirectionMask;

/// Tracks which chunks need their meshes and colliders rebuilt.
///
/// A voxel edit on a chunk border also dirties the neighbouring chunks it
/// touches, since their seam faces may appear or disappear.
#[derive(Debug)]
pub struct ChunkInvalidator {
    dirty_chunks: HashSet<ChunkIndices>,
    /// Generation counters for cache invalidation
    generations: HashMap<ChunkIndices, u32>,
}

impl ChunkInvalidator {
    pub fn new() -> Self {
        Self {
            dirty_chunks: HashSet::new(),
            generations: HashMap::new(),
        }
    }

    /// Mark a chunk as dirty and increment its generation.
    pub fn mark_chunk_dirty(&mut self, chunk: ChunkIndices) {
        self.dirty_chunks.insert(chunk);
        let generation = self.generations.entry(chunk).or_insert(0);
        *generation = generation.wrapping_add(1);
    }

    /// Mark a chunk and the neighbours named by `mask` as dirty.
    pub fn mark_updated(&mut self, chunk: ChunkIndices, mask: DirectionMask) {
        self.mark_chunk_dirty(chunk);
        for direction in mask.directions() {
            self.mark_chunk_dirty(chunk + direction.offset());
        }
    }

    /// Take all dirty chunks and clear the dirty list.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkIndices> {
        self.dirty_chunks.drain().collect()
    }

    /// Generation counter of a chunk, incremented each time it is marked dirty.
    pub fn generation(&self, chunk: &ChunkIndices) -> u32 {
        self.generations.get(chunk).copied().unwrap_or(0)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty_chunks.is_empty()
    }

    pub fn is_chunk_dirty(&self, chunk: &ChunkIndices) -> bool {
        self.dirty_chunks.contains(chunk)
    }

    /// Forget a chunk entirely (it was removed from its container).
    pub fn forget(&mut self, chunk: &ChunkIndices) {
        self.dirty_chunks.remove(chunk);
        self.generations.remove(chunk);
    }

    pub fn dirty_chunk_count(&self) -> usize {
        self.dirty_chunks.len()
    }
}

impl Default for ChunkInvalidator {
    fn default() -> Self {
        Self::new()
    }
}
