//! Voxel geometry bent onto a rounded cube

use glam::{UVec3, Vec3};

use super::Deformation;
use super::deformation::{deform_position, normal_deformation};
use super::flat::voxel_bounds;
use crate::math::CORNER_COUNT;
use crate::voxel::chunk::{Chunk, ChunkContent};
use crate::voxel::collider::{Collider, ConvexHullCollider};
use crate::voxel::mesh::build_collision_mesh;

pub fn deform_corners(corners: [Vec3; CORNER_COUNT], deformation: &Deformation) -> [Vec3; CORNER_COUNT] {
    corners.map(|corner| deform_position(corner, deformation.center, deformation.radius))
}

/// Convex hull of the deformed voxel corners, scaled around their centroid.
/// Hull points are relative to the returned centroid.
pub fn build_block_collider(
    size: UVec3,
    block_size: f32,
    indices: UVec3,
    scale: f32,
    deformation: &Deformation,
) -> (Collider, Vec3) {
    let corners = deform_corners(voxel_bounds(size, block_size, indices).corners(), deformation);
    let center = corners.iter().copied().sum::<Vec3>() / CORNER_COUNT as f32;

    let points = corners.iter().map(|&corner| (corner - center) * scale).collect();
    (Collider::ConvexHull(ConvexHullCollider { points }), center)
}

/// Face mesh of the chunk. Box merging does not apply to bent voxels.
pub fn build_collider(chunk: &Chunk, content: &ChunkContent, deformation: &Deformation) -> Option<Collider> {
    let mesh = build_collision_mesh(chunk, content, deformation.center);
    (!mesh.is_empty()).then_some(Collider::Mesh(mesh))
}

pub fn deform_normals(
    normals: &mut [Vec3],
    mut tangents: Option<&mut [Vec3]>,
    reference_normal: Vec3,
    positions: &[Vec3],
    deformation: &Deformation,
) {
    for (i, (normal, &position)) in normals.iter_mut().zip(positions).enumerate() {
        let rotation = normal_deformation(position, reference_normal, deformation.center, deformation.radius);
        *normal = rotation * *normal;

        if let Some(tangent) = tangents.as_deref_mut().and_then(|t| t.get_mut(i)) {
            *tangent = rotation * *tangent;
        }
    }
}
