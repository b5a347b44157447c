//! Axis-aligned voxel geometry

use bitvec::prelude::BitSlice;
use glam::{UVec3, Vec3};

use super::{HitBlock, mesh_hit_coordinates};
use crate::math::Aabb;
use crate::voxel::chunk::{Chunk, ChunkContent, block_local_index};
use crate::voxel::collider::{BoxCollider, ChildCollider, Collider, CompoundCollider};
use crate::voxel::direction::Direction;
use crate::voxel::mesh::build_collision_mesh;

/// Chunk-local box of a voxel. The chunk center is the origin.
pub fn voxel_bounds(size: UVec3, block_size: f32, indices: UVec3) -> Aabb {
    let min = (indices.as_vec3() - size.as_vec3() * 0.5) * block_size;
    Aabb::from_min_size(min, Vec3::splat(block_size))
}

pub fn build_block_collider(size: UVec3, block_size: f32, indices: UVec3, scale: f32) -> (Collider, Vec3) {
    let bounds = voxel_bounds(size, block_size, indices);
    let collider = Collider::Box(BoxCollider {
        center: Vec3::ZERO,
        half_extents: bounds.half_extent() * scale,
    });
    (collider, bounds.center())
}

/// Greedily merge set cells of `mask` into boxes (growing along x, then y, then z).
///
/// `callback` receives each box as (first cell, extent in cells). Every set
/// cell is covered by exactly one box.
pub fn merge_collision_cells(dims: UVec3, mask: &BitSlice, mut callback: impl FnMut(UVec3, UVec3)) {
    let mut remaining = mask.to_bitvec();
    let index = |x: u32, y: u32, z: u32| block_local_index(dims, UVec3::new(x, y, z));

    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                if !remaining[index(x, y, z)] {
                    continue;
                }

                let mut extent_x = 1;
                while x + extent_x < dims.x && remaining[index(x + extent_x, y, z)] {
                    extent_x += 1;
                }

                let mut extent_y = 1;
                'grow_y: while y + extent_y < dims.y {
                    for i in 0..extent_x {
                        if !remaining[index(x + i, y + extent_y, z)] {
                            break 'grow_y;
                        }
                    }
                    extent_y += 1;
                }

                let mut extent_z = 1;
                'grow_z: while z + extent_z < dims.z {
                    for j in 0..extent_y {
                        for i in 0..extent_x {
                            if !remaining[index(x + i, y + j, z + extent_z)] {
                                break 'grow_z;
                            }
                        }
                    }
                    extent_z += 1;
                }

                for k in 0..extent_z {
                    for j in 0..extent_y {
                        for i in 0..extent_x {
                            remaining.set(index(x + i, y + j, z + k), false);
                        }
                    }
                }

                callback(UVec3::new(x, y, z), UVec3::new(extent_x, extent_y, extent_z));
            }
        }
    }
}

pub fn build_collider(chunk: &Chunk, content: &ChunkContent) -> Option<Collider> {
    if content.has_per_face_collisions() {
        let mesh = build_collision_mesh(chunk, content, Vec3::ZERO);
        return (!mesh.is_empty()).then_some(Collider::Mesh(mesh));
    }

    let size = chunk.size();
    let block_size = chunk.block_size();
    let mut boxes = Vec::new();

    merge_collision_cells(size, content.collision_cell_mask(), |first, extent| {
        let min = voxel_bounds(size, block_size, first).min;
        let bounds = Aabb::from_min_size(min, extent.as_vec3() * block_size);
        boxes.push(Collider::Box(BoxCollider {
            center: bounds.center(),
            half_extents: bounds.half_extent(),
        }));
    });

    match boxes.len() {
        0 => None,
        1 => boxes.pop(),
        _ => Some(Collider::Compound(CompoundCollider {
            children: boxes
                .into_iter()
                .map(|collider| ChildCollider { collider, offset: Vec3::ZERO })
                .collect(),
        })),
    }
}

/// Voxel containing a chunk-local position, `None` outside of the chunk
pub fn compute_coordinates(size: UVec3, block_size: f32, position: Vec3) -> Option<UVec3> {
    let cell = (position / block_size + size.as_vec3() * 0.5).floor();
    if cell.cmplt(Vec3::ZERO).any() || cell.cmpge(size.as_vec3()).any() {
        return None;
    }
    Some(cell.as_uvec3())
}

pub fn compute_hit_coordinates(
    size: UVec3,
    block_size: f32,
    hit_position: Vec3,
    hit_normal: Vec3,
    collider: &Collider,
    sub_shape: u32,
) -> Option<HitBlock> {
    if let Some((Collider::Mesh(_), _, _)) = collider.resolve_sub_shape(sub_shape) {
        return mesh_hit_coordinates(size, collider, sub_shape);
    }

    // Step back inside the voxel that was hit
    let inside = hit_position - hit_normal * (block_size * 0.25);
    let block = compute_coordinates(size, block_size, inside)?;

    Some(HitBlock {
        block,
        direction: Direction::from_normal(hit_normal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::*;

    fn mask_from(dims: UVec3, cells: &[UVec3]) -> BitVec {
        let mut mask = bitvec![0; (dims.x * dims.y * dims.z) as usize];
        for &cell in cells {
            mask.set(block_local_index(dims, cell), true);
        }
        mask
    }

    #[test]
    fn test_voxel_bounds_centered() {
        let bounds = voxel_bounds(UVec3::splat(32), 1.0, UVec3::ZERO);
        assert_eq!(bounds.min, Vec3::splat(-16.0));
        assert_eq!(bounds.max, Vec3::splat(-15.0));

        let bounds = voxel_bounds(UVec3::splat(32), 2.0, UVec3::splat(31));
        assert_eq!(bounds.max, Vec3::splat(32.0));
    }

    #[test]
    fn test_merge_full_mask_single_box() {
        let dims = UVec3::new(4, 3, 2);
        let mask = bitvec![1; 24];
        let mut boxes = Vec::new();
        merge_collision_cells(dims, &mask, |first, extent| boxes.push((first, extent)));
        assert_eq!(boxes, vec![(UVec3::ZERO, dims)]);
    }

    #[test]
    fn test_merge_covers_each_cell_once() {
        let dims = UVec3::splat(4);
        let cells = [
            UVec3::new(0, 0, 0),
            UVec3::new(1, 0, 0),
            UVec3::new(0, 1, 0),
            UVec3::new(3, 3, 3),
            UVec3::new(2, 1, 2),
            UVec3::new(2, 2, 2),
        ];
        let mask = mask_from(dims, &cells);

        let mut covered = bitvec![0; 64];
        merge_collision_cells(dims, &mask, |first, extent| {
            for z in 0..extent.z {
                for y in 0..extent.y {
                    for x in 0..extent.x {
                        let index = block_local_index(dims, first + UVec3::new(x, y, z));
                        assert!(!covered[index], "cell covered twice");
                        covered.set(index, true);
                    }
                }
            }
        });

        assert_eq!(covered, mask);
    }

    #[test]
    fn test_compute_coordinates() {
        let size = UVec3::splat(4);
        assert_eq!(compute_coordinates(size, 1.0, Vec3::splat(-1.5)), Some(UVec3::splat(0)));
        assert_eq!(compute_coordinates(size, 1.0, Vec3::new(1.9, 0.1, -0.1)), Some(UVec3::new(3, 2, 1)));
        assert_eq!(compute_coordinates(size, 1.0, Vec3::splat(2.5)), None);
    }

    #[test]
    fn test_hit_on_box_top() {
        let size = UVec3::splat(4);
        let collider = Collider::Box(BoxCollider { center: Vec3::ZERO, half_extents: Vec3::splat(2.0) });

        // Top face of voxel (1, 1, 2): y = 0
        let hit = compute_hit_coordinates(size, 1.0, Vec3::new(-0.5, 0.0, 0.5), Vec3::Y, &collider, 0).unwrap();
        assert_eq!(hit.block, UVec3::new(1, 1, 2));
        assert_eq!(hit.direction, Direction::Up);
    }
}
