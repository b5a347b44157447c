//! Noise-based procedural planet terrain.
//!
//! Generation is a pure function of (seed, chunk indices, block indices):
//! regenerating a chunk always yields the same content.

use glam::{IVec3, UVec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::block::{BlockIndex, BlockLibrary, EMPTY_BLOCK_INDEX};
use crate::container::block_indices_in;
use crate::core::Result;
use crate::core::types::ChunkIndices;
use crate::voxel::chunk::{CHUNK_SIZE, Chunk, block_local_index};
use crate::voxel::direction::Direction;

/// Parameters controlling planet generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    pub seed: u32,
    /// Number of chunks along each axis, centered on the origin
    pub chunk_count: UVec3,
    /// Empty layer thickness between the solid fill and the planet bounds
    pub free_space: i32,
    /// Horizontal noise frequency
    pub noise_scale: f64,
    /// Multiplier of the normalized noise height
    pub height_scale: f64,
    pub octaves: usize,
    /// Half width of the tunnel carved through the core along Z (disabled when `None`)
    pub tunnel_half_width: Option<i32>,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 42,
            chunk_count: UVec3::splat(5),
            free_space: 30,
            noise_scale: 0.02,
            height_scale: 1.5,
            octaves: 4,
            tunnel_half_width: Some(2),
        }
    }
}

/// Block indices used by generation, resolved once from the library
#[derive(Clone, Copy, Debug)]
struct TerrainBlocks {
    dirt: BlockIndex,
    grass: BlockIndex,
    stone: BlockIndex,
    stone_mossy: BlockIndex,
    snow: BlockIndex,
}

/// Planet terrain: a solid fill by depth, carved by one height map per cube face
pub struct PlanetTerrainGenerator {
    params: TerrainParams,
    blocks: TerrainBlocks,
    /// Indexed by `Direction`
    height_maps: Vec<Fbm<Perlin>>,
    max_height: IVec3,
}

impl PlanetTerrainGenerator {
    /// Create a generator. Fails if the library lacks one of the terrain blocks.
    pub fn new(library: &BlockLibrary, params: TerrainParams) -> Result<Self> {
        let blocks = TerrainBlocks {
            dirt: library.try_block_index("dirt")?,
            grass: library.try_block_index("grass")?,
            stone: library.try_block_index("stone")?,
            stone_mossy: library.try_block_index("stone_mossy")?,
            snow: library.try_block_index("snow")?,
        };

        let height_maps = Direction::ALL
            .iter()
            .map(|dir| Fbm::<Perlin>::new(params.seed.wrapping_add(*dir as u32)).set_octaves(params.octaves))
            .collect();

        let max_height = ((params.chunk_count.as_ivec3() + IVec3::ONE) / 2) * CHUNK_SIZE as i32;

        Ok(Self {
            params,
            blocks,
            height_maps,
            max_height,
        })
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Distance from the planet center to its bounds, per axis, in blocks
    pub fn max_height(&self) -> IVec3 {
        self.max_height
    }

    /// Chunk indices covered by the planet
    pub fn chunk_indices(&self) -> impl Iterator<Item = ChunkIndices> + use<> {
        let count = self.params.chunk_count.as_ivec3();
        let half = count / 2;
        (0..count.z).flat_map(move |z| {
            (0..count.y).flat_map(move |y| (0..count.x).map(move |x| IVec3::new(x, y, z) - half))
        })
    }

    /// Reset a chunk with generated content. Takes the chunk's write lock.
    pub fn generate(&self, chunk: &Chunk) {
        let size = chunk.size();
        assert!(size.x == size.y && size.y == size.z, "terrain chunks must be cubic");

        let mut guard = chunk.lock_write();
        guard.reset_with(|blocks| self.fill_chunk(chunk.indices(), size.x, blocks));
    }

    /// Fill a chunk's block array (linear index order)
    pub fn fill_chunk(&self, chunk: ChunkIndices, chunk_size: u32, blocks: &mut [BlockIndex]) {
        assert_eq!(blocks.len(), (chunk_size * chunk_size * chunk_size) as usize);

        self.fill_by_depth(chunk, chunk_size, blocks);
        for direction in [
            Direction::Right,
            Direction::Left,
            Direction::Up,
            Direction::Down,
            Direction::Back,
            Direction::Front,
        ] {
            self.carve_surface(chunk, chunk_size, direction, blocks);
        }
    }

    fn chunk_seed(&self, chunk: ChunkIndices) -> u64 {
        self.params
            .seed
            .wrapping_add(chunk.x as u32)
            .wrapping_add(chunk.y as u32)
            .wrapping_add(chunk.z as u32) as u64
    }

    /// Solid layers by depth below the planet bounds: snow, dirt, then stone
    fn fill_by_depth(&self, chunk: ChunkIndices, chunk_size: u32, blocks: &mut [BlockIndex]) {
        let mut rng = fastrand::Rng::with_seed(self.chunk_seed(chunk));
        let free_space = self.params.free_space;

        let mut index = 0;
        for z in 0..chunk_size {
            for y in 0..chunk_size {
                for x in 0..chunk_size {
                    let pos = block_indices_in(chunk_size, chunk, UVec3::new(x, y, z));
                    let depth = (self.max_height - pos.abs()).min_element();

                    let block = if depth < free_space {
                        EMPTY_BLOCK_INDEX
                    } else {
                        match depth - free_space {
                            0..=6 => self.blocks.snow,
                            7..=18 => self.blocks.dirt,
                            _ if rng.f32() < 0.9 => self.blocks.stone,
                            _ => self.blocks.stone_mossy,
                        }
                    };

                    let in_tunnel = self
                        .params
                        .tunnel_half_width
                        .is_some_and(|half| pos.x.abs() <= half && pos.y.abs() <= half);

                    blocks[index] = if in_tunnel { EMPTY_BLOCK_INDEX } else { block };
                    index += 1;
                }
            }
        }
    }

    /// Normalized height in `[0, height_scale]` of a face height map
    fn sample_height(&self, direction: Direction, u: i32, v: i32) -> f64 {
        let scale = self.params.noise_scale;
        let value = self.height_maps[direction.index()].get([u as f64 * scale, v as f64 * scale]);
        ((value + 1.0) * 0.5).clamp(0.0, 1.0) * self.params.height_scale
    }

    /// Carve the solid fill down to the height map of one cube face, turning exposed dirt into grass
    fn carve_surface(&self, chunk: ChunkIndices, chunk_size: u32, direction: Direction, blocks: &mut [BlockIndex]) {
        let normal = direction.offset();
        let axis = if normal.x != 0 { 0 } else if normal.y != 0 { 1 } else { 2 };
        let (u_axis, v_axis) = ((axis + 1) % 3, (axis + 2) % 3);
        let sign = normal[axis];

        let size = UVec3::splat(chunk_size);
        let free_space = self.params.free_space as f64;
        let max_height = self.max_height[axis];
        let half_height = (max_height / 2) as f64;

        // Layer `h` counted from the chunk side facing the planet center
        let layer = |h: u32| if sign > 0 { h } else { chunk_size - 1 - h };

        for v in 0..chunk_size {
            for u in 0..chunk_size {
                let mut local = UVec3::ZERO;
                local[u_axis] = u;
                local[v_axis] = v;
                local[axis] = layer(0);

                let map_pos = block_indices_in(chunk_size, chunk, local);
                let height = self.sample_height(direction, map_pos[u_axis], map_pos[v_axis]);

                let terrain_depth = (height * (half_height - free_space) + free_space).min(half_height).round() as i32;
                let block_depth = max_height - sign * map_pos[axis] + 1;
                if block_depth < terrain_depth {
                    continue;
                }

                let start_height = (block_depth - terrain_depth) as u32;
                if start_height >= chunk_size {
                    continue;
                }

                local[axis] = layer(start_height);
                let surface = &mut blocks[block_local_index(size, local)];
                if *surface == self.blocks.dirt {
                    *surface = self.blocks.grass;
                }

                for h in start_height + 1..chunk_size {
                    local[axis] = layer(h);
                    blocks[block_local_index(size, local)] = EMPTY_BLOCK_INDEX;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> TerrainParams {
        TerrainParams {
            seed: 7,
            chunk_count: UVec3::splat(3),
            ..TerrainParams::default()
        }
    }

    fn generate(generator: &PlanetTerrainGenerator, chunk: ChunkIndices) -> Vec<BlockIndex> {
        let mut blocks = vec![EMPTY_BLOCK_INDEX; (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize];
        generator.fill_chunk(chunk, CHUNK_SIZE, &mut blocks);
        blocks
    }

    #[test]
    fn test_terrain_params_default() {
        let params = TerrainParams::default();
        assert_eq!(params.free_space, 30);
        assert_eq!(params.octaves, 4);
        assert_eq!(params.chunk_count, UVec3::splat(5));
    }

    #[test]
    fn test_missing_blocks_fail() {
        let library = BlockLibrary::new();
        assert!(PlanetTerrainGenerator::new(&library, small_params()).is_err());
    }

    #[test]
    fn test_chunk_indices_centered() {
        let library = BlockLibrary::with_default_blocks();
        let generator = PlanetTerrainGenerator::new(&library, small_params()).unwrap();
        let indices: Vec<_> = generator.chunk_indices().collect();
        assert_eq!(indices.len(), 27);
        assert_eq!(indices[0], IVec3::splat(-1));
        assert_eq!(indices[26], IVec3::splat(1));
        assert_eq!(generator.max_height(), IVec3::splat(64));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let library = BlockLibrary::with_default_blocks();
        let a = PlanetTerrainGenerator::new(&library, small_params()).unwrap();
        let b = PlanetTerrainGenerator::new(&library, small_params()).unwrap();

        let chunk = IVec3::new(0, 1, 0);
        assert_eq!(generate(&a, chunk), generate(&b, chunk));
        assert_eq!(generate(&a, chunk), generate(&a, chunk));
    }

    #[test]
    fn test_layers() {
        let library = BlockLibrary::with_default_blocks();
        let generator = PlanetTerrainGenerator::new(&library, small_params()).unwrap();
        let chunk = IVec3::new(0, 1, 0);
        let blocks = generate(&generator, chunk);
        let size = UVec3::splat(CHUNK_SIZE);

        // Above the planet bounds minus the free space everything is empty
        for y in 20..CHUNK_SIZE {
            let global_y = block_indices_in(CHUNK_SIZE, chunk, UVec3::new(8, y, 8)).y;
            if 64 - global_y < 30 {
                assert_eq!(blocks[block_local_index(size, UVec3::new(8, y, 8))], EMPTY_BLOCK_INDEX);
            }
        }

        // Global y = 16 is 18 blocks below the snow layer: dirt
        let dirt = library.get_block_index("dirt");
        assert_eq!(blocks[block_local_index(size, UVec3::new(8, 0, 8))], dirt);

        // The core is stone
        let core = generate(&generator, IVec3::ZERO);
        let deep = core[block_local_index(size, UVec3::new(8, 8, 8))];
        let stone = library.get_block_index("stone");
        let mossy = library.get_block_index("stone_mossy");
        assert!(deep == stone || deep == mossy);
    }

    #[test]
    fn test_tunnel() {
        let library = BlockLibrary::with_default_blocks();
        let generator = PlanetTerrainGenerator::new(&library, small_params()).unwrap();
        let blocks = generate(&generator, IVec3::ZERO);
        let size = UVec3::splat(CHUNK_SIZE);

        // Global (0, 0, z) sits at local (16, 16, z)
        for z in 0..CHUNK_SIZE {
            assert_eq!(blocks[block_local_index(size, UVec3::new(16, 16, z))], EMPTY_BLOCK_INDEX);
        }
        assert_ne!(blocks[block_local_index(size, UVec3::new(16, 24, 4))], EMPTY_BLOCK_INDEX);
    }
}
