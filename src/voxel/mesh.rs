//! Face extraction from chunk content.
//!
//! The builder walks voxels in linear index order (x fastest) and emits one
//! quad for every solid voxel face whose neighbour is empty or outside the
//! chunk. Neighbouring chunks are not consulted, so faces on chunk borders are
//! always emitted.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, UVec3, Vec3};

use crate::block::{BlockIndex, EMPTY_BLOCK_INDEX};
use crate::math::corner_index;
use crate::voxel::chunk::{Chunk, ChunkContent};
use crate::voxel::collider::MeshCollider;
use crate::voxel::direction::Direction;

/// Voxel corners of each face as (top-left, top-right, bottom-left, bottom-right)
/// seen from outside the block, indexed by `Direction`
const FACE_CORNERS: [[usize; 4]; Direction::COUNT] = [
    // Back (+Z)
    [
        corner_index(false, true, true),
        corner_index(true, true, true),
        corner_index(false, false, true),
        corner_index(true, false, true),
    ],
    // Down (-Y)
    [
        corner_index(false, false, true),
        corner_index(true, false, true),
        corner_index(false, false, false),
        corner_index(true, false, false),
    ],
    // Front (-Z)
    [
        corner_index(true, true, false),
        corner_index(false, true, false),
        corner_index(true, false, false),
        corner_index(false, false, false),
    ],
    // Left (-X)
    [
        corner_index(false, true, false),
        corner_index(false, true, true),
        corner_index(false, false, false),
        corner_index(false, false, true),
    ],
    // Right (+X)
    [
        corner_index(true, true, true),
        corner_index(true, true, false),
        corner_index(true, false, true),
        corner_index(true, false, false),
    ],
    // Up (+Y)
    [
        corner_index(false, true, false),
        corner_index(true, true, false),
        corner_index(false, true, true),
        corner_index(true, true, true),
    ],
];

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Triangle pattern of a quad, relative to its first vertex
pub const FACE_INDICES: [u32; 6] = [0, 2, 1, 1, 2, 3];

/// One visible voxel face
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub block: UVec3,
    pub block_type: BlockIndex,
    pub direction: Direction,
    /// Corners in chunk-local space (top-left, top-right, bottom-left, bottom-right)
    pub positions: [Vec3; 4],
    pub normal: Vec3,
    /// Texture coordinates, `z` is the texture array slice
    pub uvw: [Vec3; 4],
}

impl Face {
    pub fn center(&self) -> Vec3 {
        self.positions.iter().copied().sum::<Vec3>() * 0.25
    }
}

/// Enumerate visible faces of a chunk.
///
/// `add_face` stores the face's 4 vertices and returns the index of the first
/// one; the builder then appends 6 indices for the two triangles.
/// `gravity_center` (chunk-local) orients textures so that block tops face away from it.
pub fn build_mesh(
    chunk: &Chunk,
    content: &ChunkContent,
    gravity_center: Vec3,
    indices: &mut Vec<u32>,
    mut add_face: impl FnMut(&Face) -> u32,
) {
    let size = chunk.size();
    let library = chunk.block_library();

    for z in 0..size.z {
        for y in 0..size.y {
            for x in 0..size.x {
                let block_indices = UVec3::new(x, y, z);
                let block = content.get_block_content(block_indices);
                if block == EMPTY_BLOCK_INDEX {
                    continue;
                }

                let corners = chunk.compute_voxel_corners(block_indices);
                let block_center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;

                for direction in Direction::ALL {
                    let neighbor = content.get_neighbor_block(block_indices, direction.offset());
                    if neighbor.is_some_and(|n| n != EMPTY_BLOCK_INDEX) {
                        continue;
                    }

                    let positions = FACE_CORNERS[direction.index()].map(|corner| corners[corner]);
                    let face_center = positions.iter().copied().sum::<Vec3>() * 0.25;
                    let normal = (face_center - block_center)
                        .try_normalize()
                        .unwrap_or_else(|| direction.normal());

                    let texture_direction = texture_direction(direction, face_center, gravity_center);
                    let slice = library.texture_index(block, texture_direction) as f32;
                    let uvw = FACE_UVS.map(|[u, v]| Vec3::new(u, v, slice));

                    let first_index = add_face(&Face {
                        block: block_indices,
                        block_type: block,
                        direction,
                        positions,
                        normal,
                        uvw,
                    });

                    indices.extend(FACE_INDICES.iter().map(|offset| first_index + offset));
                }
            }
        }
    }
}

/// Which face texture of a block to use for a face, taking the local "up" into account
fn texture_direction(direction: Direction, face_center: Vec3, gravity_center: Vec3) -> Direction {
    let face_up = (face_center - gravity_center).try_normalize().unwrap_or(Vec3::Y);
    let face_up = Direction::from_normal(face_up).normal();
    let up_rotation = Quat::from_rotation_arc(face_up, Vec3::Y);
    Direction::from_normal(up_rotation * direction.normal())
}

/// Vertex layout of rendered chunk meshes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uvw: [f32; 3],
}

/// Render-ready mesh of a chunk
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    pub vertices: Vec<ChunkVertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / FACE_INDICES.len()
    }

    /// Vertex buffer contents for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Build a render mesh of a chunk
pub fn build_render_mesh(chunk: &Chunk, content: &ChunkContent, gravity_center: Vec3) -> ChunkMesh {
    let mut mesh = ChunkMesh::default();
    let vertices = &mut mesh.vertices;

    build_mesh(chunk, content, gravity_center, &mut mesh.indices, |face| {
        let first_index = vertices.len() as u32;
        vertices.extend((0..4).map(|i| ChunkVertex {
            position: face.positions[i].to_array(),
            normal: face.normal.to_array(),
            uvw: face.uvw[i].to_array(),
        }));
        first_index
    });

    mesh
}

/// Build a triangle collider whose triangle userdata is `local_block_index * 6 + direction`
pub fn build_collision_mesh(chunk: &Chunk, content: &ChunkContent, gravity_center: Vec3) -> MeshCollider {
    let mut collider = MeshCollider::default();
    let positions = &mut collider.positions;
    let userdata = &mut collider.triangle_userdata;

    build_mesh(chunk, content, gravity_center, &mut collider.indices, |face| {
        let first_index = positions.len() as u32;
        positions.extend_from_slice(&face.positions);

        let value = (chunk.get_block_local_index(face.block) * Direction::COUNT + face.direction.index()) as u32;
        userdata.extend([value, value]);
        first_index
    });

    collider
}
