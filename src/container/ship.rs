//! Ships: flat chunk containers with uniform gravity

use std::sync::Arc;

use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::{ChunkContainer, ChunkMap, GravityForce};
use crate::block::{BlockLibrary, EMPTY_BLOCK_INDEX};
use crate::core::Result;
use crate::core::types::ChunkIndices;
use crate::voxel::chunk::Chunk;
use crate::voxel::collider::{ChildCollider, Collider, CompoundCollider};
use crate::voxel::geometry::ChunkGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipConfig {
    /// Edge length of a block in world units
    pub tile_size: f32,
    pub gravity: f32,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            gravity: 9.81,
        }
    }
}

pub struct Ship {
    chunks: ChunkMap,
    config: ShipConfig,
    up: Vec3,
}

impl Ship {
    pub fn new(library: Arc<BlockLibrary>, config: ShipConfig) -> Self {
        Self {
            chunks: ChunkMap::new(library, config.tile_size),
            config,
            up: Vec3::Y,
        }
    }

    pub fn config(&self) -> &ShipConfig {
        &self.config
    }

    pub fn up_direction(&self) -> Vec3 {
        self.up
    }

    /// Generate a hollow hull in chunk (0, 0, 0): walls, floor and ceiling of
    /// hull blocks, with a door-sized opening in the -X wall.
    pub fn generate(&mut self, small: bool) -> Result<()> {
        let hull = self.chunks.block_library().try_block_index("hull")?;

        let (box_size, height) = if small { (6, 4) } else { (12, 6) };

        let chunk = self.add_chunk(IVec3::ZERO);
        let start = chunk.size() / 2 - UVec3::new(box_size / 2, height / 2, box_size / 2);

        let mut guard = chunk.lock_write();
        guard.reset();

        for z in 0..box_size {
            for y in 0..height {
                for x in 0..box_size {
                    let is_shell = x == 0 || x == box_size - 1 || y == 0 || y == height - 1 || z == 0 || z == box_size - 1;
                    if !is_shell {
                        continue;
                    }

                    let is_door = x == 0 && z == box_size / 2 && y > 0 && y < height - 1;
                    if is_door {
                        continue;
                    }

                    guard.update_block(start + UVec3::new(x, y, z), hull);
                }
            }
        }

        log::info!(
            "Generated {} ship hull ({} blocks)",
            if small { "small" } else { "large" },
            guard.block_count() - guard.block_type_count(EMPTY_BLOCK_INDEX) as usize
        );
        Ok(())
    }

    /// Collider of the whole ship: each chunk's collider placed at its chunk offset.
    /// A single chunk gives its own collider; `None` when nothing collides.
    pub fn build_hull_collider(&self) -> Option<Collider> {
        if self.chunks.chunk_count() <= 1 {
            let chunk = self.chunks.chunks().next()?;
            return chunk.lock_read().build_collider();
        }

        let children: Vec<ChildCollider> = self
            .chunks
            .chunks()
            .filter_map(|chunk| {
                let collider = chunk.lock_read().build_collider()?;
                Some(ChildCollider {
                    collider,
                    offset: self.chunks.chunk_offset(chunk.indices()),
                })
            })
            .collect();

        (!children.is_empty()).then_some(Collider::Compound(CompoundCollider { children }))
    }
}

impl ChunkContainer for Ship {
    fn chunk_map(&self) -> &ChunkMap {
        &self.chunks
    }

    fn chunk_map_mut(&mut self) -> &mut ChunkMap {
        &mut self.chunks
    }

    fn add_chunk(&mut self, indices: ChunkIndices) -> &Chunk {
        self.chunks.insert_chunk(indices, ChunkGeometry::Flat)
    }

    fn compute_gravity(&self, _position: Vec3) -> GravityForce {
        GravityForce {
            direction: -self.up,
            acceleration: self.config.gravity,
            factor: 1.0,
        }
    }
}

impl std::fmt::Debug for Ship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ship")
            .field("chunks", &self.chunks.chunk_count())
            .field("config", &self.config)
            .field("up", &self.up)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ship() -> Ship {
        Ship::new(Arc::new(BlockLibrary::with_default_blocks()), ShipConfig::default())
    }

    #[test]
    fn test_uniform_gravity() {
        let ship = test_ship();
        for position in [Vec3::ZERO, Vec3::new(100.0, -50.0, 3.0)] {
            let gravity = ship.compute_gravity(position);
            assert_eq!(gravity.direction, Vec3::NEG_Y);
            assert_eq!(gravity.vector(), Vec3::new(0.0, -9.81, 0.0));
        }
    }

    #[test]
    fn test_small_hull() {
        let mut ship = test_ship();
        ship.generate(true).unwrap();

        let chunk = ship.chunk_map().get_chunk(IVec3::ZERO).unwrap();
        let guard = chunk.lock_read();
        let hull = chunk.block_library().get_block_index("hull");

        // 6x4x6 shell minus the 4x2x4 interior and the 2-block door
        assert_eq!(guard.block_type_count(hull), 6 * 4 * 6 - 4 * 2 * 4 - 2);

        let start = UVec3::new(13, 14, 13);
        assert_eq!(guard.get_block_content(start), hull);
        assert_eq!(guard.get_block_content(start + UVec3::new(2, 1, 2)), EMPTY_BLOCK_INDEX);
        assert_eq!(guard.get_block_content(start + UVec3::new(0, 1, 3)), EMPTY_BLOCK_INDEX);
        assert_eq!(guard.get_block_content(start + UVec3::new(0, 1, 2)), hull);
    }

    #[test]
    fn test_hull_collider() {
        let mut ship = test_ship();
        assert!(ship.build_hull_collider().is_none());

        ship.generate(false).unwrap();
        let single = ship.build_hull_collider();
        assert!(single.is_some_and(|collider| collider.leaf_count() >= 1));

        let stone = ship.chunk_map().block_library().get_block_index("stone");
        ship.add_chunk(IVec3::X).lock_write().reset_with(|blocks| blocks[0] = stone);
        ship.add_chunk(IVec3::NEG_X).lock_write().reset();

        let Some(Collider::Compound(compound)) = ship.build_hull_collider() else {
            panic!("expected compound collider");
        };
        // The empty chunk contributes nothing
        assert_eq!(compound.children.len(), 2);
        assert!(compound.children.iter().any(|child| child.offset == Vec3::new(32.0, 0.0, 0.0)));
    }
}
