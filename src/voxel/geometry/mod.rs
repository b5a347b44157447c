//! Chunk geometry variants.
//!
//! A chunk is either flat (voxels are axis-aligned boxes) or deformed
//! (voxel corners are bent onto a rounded cube). The variant is chosen once
//! when the chunk is created and decides how corners, colliders, hit lookups
//! and normals are computed.

pub mod deformation;
pub mod deformed;
pub mod flat;

use glam::{UVec3, Vec3};

use crate::math::{Aabb, CORNER_COUNT};
use crate::voxel::chunk::{Chunk, ChunkContent};
use crate::voxel::collider::Collider;
use crate::voxel::direction::Direction;

/// Parameters of a rounded-cube deformation, in chunk-local space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deformation {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChunkGeometry {
    Flat,
    Deformed(Deformation),
}

/// Voxel and face targeted by a physics hit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitBlock {
    pub block: UVec3,
    pub direction: Direction,
}

impl ChunkGeometry {
    /// Deformed if the deformation moves any corner of `bounds` (chunk-local), flat otherwise
    pub fn classify(bounds: &Aabb, center: Vec3, radius: f32) -> Self {
        if deformation::is_deformed(bounds, center, radius) {
            ChunkGeometry::Deformed(Deformation { center, radius })
        } else {
            ChunkGeometry::Flat
        }
    }

    pub fn is_deformed(&self) -> bool {
        matches!(self, ChunkGeometry::Deformed(_))
    }

    pub fn compute_voxel_corners(&self, size: UVec3, block_size: f32, indices: UVec3) -> [Vec3; CORNER_COUNT] {
        let corners = flat::voxel_bounds(size, block_size, indices).corners();
        match self {
            ChunkGeometry::Flat => corners,
            ChunkGeometry::Deformed(deformation) => deformed::deform_corners(corners, deformation),
        }
    }

    pub fn build_block_collider(
        &self,
        size: UVec3,
        block_size: f32,
        indices: UVec3,
        scale: f32,
    ) -> (Collider, Vec3) {
        match self {
            ChunkGeometry::Flat => flat::build_block_collider(size, block_size, indices, scale),
            ChunkGeometry::Deformed(deformation) => {
                deformed::build_block_collider(size, block_size, indices, scale, deformation)
            }
        }
    }

    pub fn build_collider(&self, chunk: &Chunk, content: &ChunkContent) -> Option<Collider> {
        match self {
            ChunkGeometry::Flat => flat::build_collider(chunk, content),
            ChunkGeometry::Deformed(deformation) => deformed::build_collider(chunk, content, deformation),
        }
    }

    pub fn compute_hit_coordinates(
        &self,
        size: UVec3,
        block_size: f32,
        hit_position: Vec3,
        hit_normal: Vec3,
        collider: &Collider,
        sub_shape: u32,
    ) -> Option<HitBlock> {
        match self {
            ChunkGeometry::Flat => {
                flat::compute_hit_coordinates(size, block_size, hit_position, hit_normal, collider, sub_shape)
            }
            ChunkGeometry::Deformed(_) => mesh_hit_coordinates(size, collider, sub_shape),
        }
    }

    pub fn deform_normals(
        &self,
        normals: &mut [Vec3],
        tangents: Option<&mut [Vec3]>,
        reference_normal: Vec3,
        positions: &[Vec3],
    ) {
        if let ChunkGeometry::Deformed(deformation) = self {
            deformed::deform_normals(normals, tangents, reference_normal, positions, deformation);
        }
    }

    pub fn deform_positions(&self, positions: &mut [Vec3]) -> bool {
        match self {
            ChunkGeometry::Flat => false,
            ChunkGeometry::Deformed(deformation) => {
                for position in positions {
                    *position = deformation::deform_position(*position, deformation.center, deformation.radius);
                }
                true
            }
        }
    }
}

/// Hit lookup through the triangle userdata of a face mesh collider
pub(crate) fn mesh_hit_coordinates(size: UVec3, collider: &Collider, sub_shape: u32) -> Option<HitBlock> {
    let (leaf, triangle, _) = collider.resolve_sub_shape(sub_shape)?;
    let Collider::Mesh(mesh) = leaf else {
        return None;
    };

    let userdata = mesh.triangle_userdata(triangle)?;
    let local_index = (userdata as usize) / Direction::COUNT;
    if local_index >= (size.x * size.y * size.z) as usize {
        return None;
    }

    Some(HitBlock {
        block: crate::voxel::chunk::block_local_indices(size, local_index),
        direction: Direction::from_index(userdata % Direction::COUNT as u32)?,
    })
}
