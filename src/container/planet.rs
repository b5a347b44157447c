//! Planets: rounded-cube chunk containers with zoned gravity

use std::sync::Arc;
use std::time::Instant;

use glam::{IVec3, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ChunkContainer, ChunkMap, GravityForce};
use crate::block::{BlockIndex, BlockLibrary, EMPTY_BLOCK_INDEX};
use crate::core::Result;
use crate::core::types::{BlockIndices, ChunkIndices};
use crate::math::Aabb;
use crate::terrain::{PlanetTerrainGenerator, TerrainParams};
use crate::voxel::chunk::Chunk;
use crate::voxel::direction::Direction;
use crate::voxel::geometry::ChunkGeometry;

/// Distances from the planet center delimiting gravity zones
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GravityZones {
    /// No gravity below this distance
    pub center_no_gravity: f32,
    /// Gravity fades out linearly below this distance
    pub center_start_decrease: f32,
    /// Surface gravity starts bending towards the center past this distance
    pub space_start: f32,
    /// Gravity points at the center past this distance and starts fading
    pub space_finish: f32,
    /// No gravity past this distance
    pub space_none: f32,
}

impl Default for GravityZones {
    fn default() -> Self {
        Self {
            center_no_gravity: 4.0,
            center_start_decrease: 16.0,
            space_start: 100.0,
            space_finish: 150.0,
            space_none: 250.0,
        }
    }
}

/// Planet configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanetConfig {
    /// Edge length of a block in world units
    pub tile_size: f32,
    /// Radius of the rounded cube edges and corners
    pub corner_radius: f32,
    /// Surface gravity acceleration
    pub gravity: f32,
    pub gravity_zones: GravityZones,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            corner_radius: 16.0,
            gravity: 9.81,
            gravity_zones: GravityZones::default(),
        }
    }
}

pub struct Planet {
    chunks: ChunkMap,
    config: PlanetConfig,
    terrain: Option<PlanetTerrainGenerator>,
}

impl Planet {
    pub fn new(library: Arc<BlockLibrary>, config: PlanetConfig) -> Self {
        Self {
            chunks: ChunkMap::new(library, config.tile_size),
            config,
            terrain: None,
        }
    }

    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    pub fn corner_radius(&self) -> f32 {
        self.config.corner_radius
    }

    /// Geometry variant of a chunk, decided from its corners
    pub fn classify_chunk(&self, indices: ChunkIndices) -> ChunkGeometry {
        let offset = self.chunks.chunk_offset(indices);
        let bounds = self.chunks.chunk_bounds(indices);
        let local_bounds = Aabb::new(bounds.min - offset, bounds.max - offset);

        ChunkGeometry::classify(&local_bounds, self.center() - offset, self.config.corner_radius)
    }

    /// Add a chunk and fill it with a callback
    pub fn add_chunk_with(&mut self, indices: ChunkIndices, fill: impl FnOnce(&mut [BlockIndex])) -> &Chunk {
        let chunk = self.add_chunk(indices);
        chunk.lock_write().reset_with(fill);
        chunk
    }

    /// Local "up": away from the nearest point of the inset cube
    pub fn compute_up_direction(&self, position: Vec3) -> Vec3 {
        let center = self.center();
        let distance = (position - center).abs().max_element();
        let inset = (distance - self.config.corner_radius.max(1.0)).max(0.0);

        let inner = position.clamp(center - Vec3::splat(inset), center + Vec3::splat(inset));
        (position - inner).try_normalize().unwrap_or(Vec3::Y)
    }

    /// Create every chunk of the planet and generate them in parallel.
    ///
    /// Blocks until all chunks are generated. Existing chunks are regenerated.
    pub fn generate_chunks(&mut self, params: TerrainParams) -> Result<()> {
        let start = Instant::now();
        let generator = PlanetTerrainGenerator::new(self.chunks.block_library(), params)?;

        let indices: Vec<ChunkIndices> = generator.chunk_indices().collect();
        for &chunk_indices in &indices {
            if !self.chunks.contains_chunk(chunk_indices) {
                self.add_chunk(chunk_indices);
            }
        }

        let chunks: Vec<&Chunk> = indices.iter().filter_map(|&i| self.chunks.get_chunk(i)).collect();
        chunks.par_iter().for_each(|chunk| generator.generate(chunk));

        let deformed = chunks.iter().filter(|c| c.geometry().is_deformed()).count();
        log::info!(
            "Generated {} planet chunks ({} deformed) in {:.2?}",
            chunks.len(),
            deformed,
            start.elapsed()
        );

        self.terrain = Some(generator);
        Ok(())
    }

    /// Re-run terrain generation for one chunk. Returns false if the planet was
    /// never generated or the chunk does not exist.
    pub fn regenerate_chunk(&self, indices: ChunkIndices) -> bool {
        let (Some(generator), Some(chunk)) = (&self.terrain, self.chunks.get_chunk(indices)) else {
            return false;
        };

        generator.generate(chunk);
        log::debug!("Regenerated planet chunk {}", indices);
        true
    }

    /// Build a landing platform centered on `center`, facing `up`.
    ///
    /// Lays a 15x15 pad (copper border, stone brick interior), clears 9 layers
    /// above it and props it up with plank pillars down to the ground, with a
    /// full plank ring every third layer.
    pub fn generate_platform(&self, up: Direction, center: BlockIndices) -> Result<()> {
        const PLATFORM_SIZE: i32 = 15;
        const FREE_HEIGHT: i32 = 10;

        let library = self.chunks.block_library();
        let border = library.try_block_index("copper_block")?;
        let interior = library.try_block_index("stone_bricks")?;
        let planks = library.try_block_index("planks")?;

        let up_offset = up.offset();
        let right = if up_offset.x != 0 { IVec3::Z } else { IVec3::X };
        let forward = up_offset.cross(right);
        let origin = center - right * (PLATFORM_SIZE / 2) - forward * (PLATFORM_SIZE / 2);

        let is_border = |x: i32, z: i32| x == 0 || x == PLATFORM_SIZE - 1 || z == 0 || z == PLATFORM_SIZE - 1;
        let is_corner = |x: i32, z: i32| (x == 0 || x == PLATFORM_SIZE - 1) && (z == 0 || z == PLATFORM_SIZE - 1);

        for y in 0..FREE_HEIGHT {
            for z in 0..PLATFORM_SIZE {
                for x in 0..PLATFORM_SIZE {
                    let block = if y != 0 {
                        EMPTY_BLOCK_INDEX
                    } else if is_border(x, z) {
                        border
                    } else {
                        interior
                    };

                    self.chunks.update_block(origin + up_offset * y + right * x + forward * z, block);
                }
            }
        }

        // Supports, until a layer has nothing left to fill
        let mut depth = 1;
        loop {
            let mut placed = false;

            for z in 0..PLATFORM_SIZE {
                for x in 0..PLATFORM_SIZE {
                    let position = origin - up_offset * depth + right * x + forward * z;
                    let Some(content) = self.chunks.get_block_content(position) else {
                        continue;
                    };

                    let fill = if depth % 3 == 0 {
                        is_border(x, z)
                    } else {
                        is_corner(x, z) && content == EMPTY_BLOCK_INDEX
                    };

                    if fill {
                        placed = true;
                        self.chunks.update_block(position, planks);
                    }
                }
            }

            if !placed {
                break;
            }
            depth += 1;
        }

        log::debug!("Generated platform at {} ({} support layers)", center, depth - 1);
        Ok(())
    }

    /// Gravity from the configured zones, see [`GravityZones`]
    fn zoned_gravity(&self, position: Vec3) -> GravityForce {
        let zones = &self.config.gravity_zones;
        let center = self.center();
        let distance = position.distance(center);

        if distance < zones.center_start_decrease {
            return GravityForce {
                direction: -self.compute_up_direction(position),
                acceleration: self.config.gravity,
                factor: (distance - zones.center_no_gravity).max(0.0)
                    / (zones.center_start_decrease - zones.center_no_gravity),
            };
        }

        if distance > zones.space_start {
            if distance > zones.space_none {
                return GravityForce::zero();
            }

            let newtonian = if distance > zones.space_finish {
                1.0
            } else {
                (distance - zones.space_start).max(0.0) / (zones.space_finish - zones.space_start)
            };

            let to_center = (center - position).normalize();
            let direction = if newtonian < 0.99 {
                (-self.compute_up_direction(position)).lerp(to_center, newtonian).normalize()
            } else {
                to_center
            };

            let fade = (distance - zones.space_finish).max(0.0) / (zones.space_none - zones.space_finish);
            return GravityForce {
                direction,
                acceleration: self.config.gravity,
                factor: 1.0 - fade * fade,
            };
        }

        GravityForce {
            direction: -self.compute_up_direction(position),
            acceleration: self.config.gravity,
            factor: 1.0,
        }
    }
}

impl ChunkContainer for Planet {
    fn chunk_map(&self) -> &ChunkMap {
        &self.chunks
    }

    fn chunk_map_mut(&mut self) -> &mut ChunkMap {
        &mut self.chunks
    }

    fn add_chunk(&mut self, indices: ChunkIndices) -> &Chunk {
        let geometry = self.classify_chunk(indices);
        self.chunks.insert_chunk(indices, geometry)
    }

    fn compute_gravity(&self, position: Vec3) -> GravityForce {
        self.zoned_gravity(position)
    }
}

impl std::fmt::Debug for Planet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planet")
            .field("chunks", &self.chunks.chunk_count())
            .field("config", &self.config)
            .field("generated", &self.terrain.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::mesh::build_render_mesh;
    use glam::UVec3;

    const STEP: f32 = 0.05;
    const TOLERANCE: f32 = 0.1;

    fn test_planet() -> Planet {
        Planet::new(Arc::new(BlockLibrary::with_default_blocks()), PlanetConfig::default())
    }

    #[test]
    fn test_chunk_classification() {
        let mut planet = test_planet();

        // Face center of a 5x5x5 planet: flat
        assert_eq!(planet.add_chunk(IVec3::new(0, 2, 0)).geometry(), &ChunkGeometry::Flat);
        // Planet corner: deformed
        assert!(planet.add_chunk(IVec3::new(2, 2, 2)).geometry().is_deformed());
        // Edge
        assert!(planet.add_chunk(IVec3::new(2, 2, 0)).geometry().is_deformed());
    }

    #[test]
    fn test_deformation_center_is_chunk_relative() {
        let planet = test_planet();
        match planet.classify_chunk(IVec3::new(2, 2, 2)) {
            ChunkGeometry::Deformed(deformation) => {
                assert_eq!(deformation.center, Vec3::splat(-64.0));
                assert_eq!(deformation.radius, 16.0);
            }
            ChunkGeometry::Flat => panic!("corner chunk must be deformed"),
        }
    }

    #[test]
    fn test_up_direction() {
        let planet = test_planet();
        assert_eq!(planet.compute_up_direction(Vec3::new(3.0, 80.0, -5.0)), Vec3::Y);
        assert_eq!(planet.compute_up_direction(Vec3::new(-80.0, 3.0, 5.0)), Vec3::NEG_X);
        assert!(planet.compute_up_direction(Vec3::splat(80.0)).distance(Vec3::ONE.normalize()) < 1e-5);
        assert_eq!(planet.compute_up_direction(Vec3::ZERO), Vec3::Y);
    }

    #[test]
    fn test_gravity_zones() {
        let planet = test_planet();

        let center = planet.compute_gravity(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(center.factor, 0.0);

        let inner = planet.compute_gravity(Vec3::new(0.0, 10.0, 0.0));
        assert!((inner.factor - 0.5).abs() < 1e-5);

        let surface = planet.compute_gravity(Vec3::new(5.0, 70.0, 0.0));
        assert_eq!(surface.factor, 1.0);
        assert_eq!(surface.direction, Vec3::NEG_Y);
        assert!((surface.magnitude() - 9.81).abs() < 1e-5);

        let space = planet.compute_gravity(Vec3::new(0.0, 200.0, 0.0));
        assert_eq!(space.direction, Vec3::NEG_Y);
        assert!((space.factor - 0.75).abs() < 1e-5);

        assert_eq!(planet.compute_gravity(Vec3::new(0.0, 300.0, 0.0)), GravityForce::zero());
    }

    #[test]
    fn test_gravity_blends_towards_center() {
        let planet = test_planet();
        let position = Vec3::new(125.0, 20.0, 0.0);
        let gravity = planet.compute_gravity(position);

        let surface = -planet.compute_up_direction(position);
        let radial = (-position).normalize();
        assert!(gravity.direction.dot(surface) < 1.0);
        assert!(gravity.direction.dot(radial) < 1.0);
        assert!(gravity.direction.dot(surface) > 0.0 && gravity.direction.dot(radial) > 0.0);
    }

    #[test]
    fn test_add_chunk_with_fill() {
        let mut planet = test_planet();
        let stone = planet.chunk_map().block_library().get_block_index("stone");
        let chunk = planet.add_chunk_with(IVec3::ZERO, |blocks| blocks[0] = stone);
        assert_eq!(chunk.lock_read().block_type_count(stone), 1);
    }

    #[test]
    fn test_regenerate_without_generation() {
        let mut planet = test_planet();
        planet.add_chunk(IVec3::ZERO);
        assert!(!planet.regenerate_chunk(IVec3::ZERO));
    }

    #[test]
    fn test_platform_on_flat_ground() {
        let mut planet = test_planet();
        let library = planet.chunk_map().block_library().clone();
        let stone = library.get_block_index("stone");

        // Ground: local y < 12 is stone, so the ground top is global y = -5
        planet.add_chunk_with(IVec3::ZERO, |blocks| {
            for (i, block) in blocks.iter_mut().enumerate() {
                if (i / 32) % 32 < 12 {
                    *block = stone;
                }
            }
        });

        planet.generate_platform(Direction::Up, IVec3::ZERO).unwrap();

        let map = planet.chunk_map();
        let copper = library.get_block_index("copper_block");
        let bricks = library.get_block_index("stone_bricks");
        let planks = library.get_block_index("planks");

        assert_eq!(map.get_block_content(IVec3::new(-7, 0, -7)), Some(copper));
        assert_eq!(map.get_block_content(IVec3::ZERO), Some(bricks));
        assert_eq!(map.get_block_content(IVec3::new(0, 5, 0)), Some(EMPTY_BLOCK_INDEX));

        // Corner pillars fill y = -1..-4
        assert_eq!(map.get_block_content(IVec3::new(-7, -1, -7)), Some(planks));
        assert_eq!(map.get_block_content(IVec3::new(7, -2, 7)), Some(planks));
        assert_eq!(map.get_block_content(IVec3::new(0, -1, 0)), Some(EMPTY_BLOCK_INDEX));
        // Every third layer is a full ring
        assert_eq!(map.get_block_content(IVec3::new(0, -3, -7)), Some(planks));
        assert_eq!(map.get_block_content(IVec3::new(0, -3, 0)), Some(EMPTY_BLOCK_INDEX));
    }

    fn magnitudes_along(planet: &Planet, direction: Vec3, max_distance: f32) -> Vec<(f32, f32)> {
        let direction = direction.normalize();
        let steps = (max_distance / STEP) as usize;
        (0..=steps)
            .map(|i| {
                let distance = i as f32 * STEP;
                let gravity = planet.compute_gravity(planet.center() + direction * distance);
                (distance, gravity.magnitude())
            })
            .collect()
    }

    #[test]
    fn test_magnitude_is_continuous_along_rays() {
        let planet = test_planet();
        let zones = GravityZones::default();

        for direction in [Vec3::X, Vec3::NEG_Y, Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.3, -0.8, 0.5), Vec3::ONE] {
            let samples = magnitudes_along(&planet, direction, zones.space_none + 20.0);
            for pair in samples.windows(2) {
                let (d0, m0) = pair[0];
                let (d1, m1) = pair[1];
                assert!(
                    (m1 - m0).abs() < TOLERANCE,
                    "gravity jumps from {} to {} between {} and {} along {:?}",
                    m0,
                    m1,
                    d0,
                    d1,
                    direction
                );
            }
        }
    }

    #[test]
    fn test_zone_boundary_values() {
        let planet = test_planet();
        let zones = &planet.config().gravity_zones;
        let g = planet.config().gravity;

        let at = |distance: f32| planet.compute_gravity(Vec3::new(0.0, distance, 0.0)).magnitude();

        assert_eq!(at(zones.center_no_gravity * 0.5), 0.0);
        assert!((at(zones.center_start_decrease) - g).abs() < 1e-4);
        assert!((at(50.0) - g).abs() < 1e-4);
        assert!((at(zones.space_finish) - g).abs() < 1e-4);
        assert!(at((zones.space_finish + zones.space_none) * 0.5) < g);
        assert_eq!(at(zones.space_none + 1.0), 0.0);
    }

    #[test]
    fn test_surface_gravity_points_down_each_face() {
        let planet = test_planet();

        let cases = [
            (Vec3::new(0.0, 60.0, 0.0), Vec3::NEG_Y),
            (Vec3::new(0.0, -60.0, 5.0), Vec3::Y),
            (Vec3::new(60.0, 3.0, -2.0), Vec3::NEG_X),
            (Vec3::new(-4.0, 0.0, -60.0), Vec3::Z),
        ];
        for (position, expected) in cases {
            let direction = planet.compute_gravity(position).direction;
            assert!(direction.abs_diff_eq(expected, 1e-4), "{:?} at {:?}", direction, position);
        }
    }

    fn generated_planet(seed: u32) -> Planet {
        let mut planet = Planet::new(Arc::new(BlockLibrary::with_default_blocks()), PlanetConfig::default());
        planet
            .generate_chunks(TerrainParams {
                seed,
                chunk_count: UVec3::splat(3),
                ..Default::default()
            })
            .unwrap();
        planet
    }

    fn chunk_contents(planet: &Planet) -> Vec<(IVec3, Vec<u8>)> {
        let mut contents: Vec<_> = planet
            .chunk_map()
            .chunks()
            .map(|chunk| (chunk.indices(), chunk.lock_read().content().to_vec()))
            .collect();
        contents.sort_by_key(|(indices, _)| indices.to_array());
        contents
    }

    #[test]
    fn test_flat_center_and_deformed_corners() {
        let planet = generated_planet(7);

        assert_eq!(planet.chunk_map().chunk_count(), 27);
        for chunk in planet.chunk_map().chunks() {
            assert_eq!(chunk.geometry(), &planet.classify_chunk(chunk.indices()));
        }

        let geometry = |indices: IVec3| *planet.chunk_map().get_chunk(indices).unwrap().geometry();
        assert_eq!(geometry(IVec3::ZERO), ChunkGeometry::Flat);
        assert_eq!(geometry(IVec3::new(0, 1, 0)), ChunkGeometry::Flat);
        assert!(geometry(IVec3::new(1, 1, 1)).is_deformed());
        assert!(geometry(IVec3::new(-1, 1, 0)).is_deformed());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generated_planet(99);
        let b = generated_planet(99);
        let c = generated_planet(100);

        assert_eq!(chunk_contents(&a), chunk_contents(&b));
        assert_ne!(chunk_contents(&a), chunk_contents(&c));
    }

    #[test]
    fn test_regenerate_restores_edits() {
        let planet = generated_planet(3);
        let before = chunk_contents(&planet);

        let chunk = planet.chunk_map().get_chunk(IVec3::new(0, 1, 0)).unwrap();
        let hull = planet.chunk_map().block_library().get_block_index("hull");
        chunk.lock_write().reset_with(|blocks| blocks.fill(hull));
        assert_ne!(chunk_contents(&planet), before);

        assert!(planet.regenerate_chunk(IVec3::new(0, 1, 0)));
        assert_eq!(chunk_contents(&planet), before);
        assert!(!planet.regenerate_chunk(IVec3::new(9, 9, 9)));
    }

    #[test]
    fn test_deformed_voxel_still_emits_six_faces() {
        let planet = test_planet();
        let indices = IVec3::new(1, 1, 1);
        let geometry = planet.classify_chunk(indices);
        assert!(geometry.is_deformed());

        let chunk = Chunk::new(
            planet.chunk_map().block_library().clone(),
            indices,
            UVec3::splat(32),
            1.0,
            geometry,
        );
        let stone = chunk.block_library().get_block_index("stone");
        chunk.lock_write().reset();
        chunk.lock_write().update_block(UVec3::new(31, 31, 31), stone);

        let gravity_center = planet.center() - planet.chunk_map().chunk_offset(indices);
        let mesh = build_render_mesh(&chunk, &chunk.lock_read(), gravity_center);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        for vertex in &mesh.vertices {
            let normal = Vec3::from_array(vertex.normal);
            assert!((normal.length() - 1.0).abs() < 1e-3);
        }

        // The outermost corner voxel is bent away from its flat box
        let flat = ChunkGeometry::Flat.compute_voxel_corners(chunk.size(), 1.0, UVec3::new(31, 31, 31));
        let curved = chunk.compute_voxel_corners(UVec3::new(31, 31, 31));
        assert!(flat.iter().zip(curved.iter()).any(|(a, b)| a.distance(*b) > 0.01));
    }
}
