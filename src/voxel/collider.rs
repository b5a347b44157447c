//! Physics-engine-agnostic collision shapes produced from chunk content.
//!
//! Shapes are expressed in chunk-local space. Hits reported by a physics
//! engine carry a sub-shape id which [`Collider::resolve_sub_shape`] maps back
//! to the leaf shape that was hit.

use glam::Vec3;

/// Axis-aligned box
#[derive(Clone, Debug, PartialEq)]
pub struct BoxCollider {
    pub center: Vec3,
    pub half_extents: Vec3,
}

/// Convex hull of a point cloud
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexHullCollider {
    pub points: Vec<Vec3>,
}

/// Triangle soup with one user value per triangle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshCollider {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// One entry per triangle (`indices.len() / 3` entries)
    pub triangle_userdata: Vec<u32>,
}

impl MeshCollider {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle_userdata(&self, triangle: u32) -> Option<u32> {
        self.triangle_userdata.get(triangle as usize).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Child of a compound shape, placed at `offset`
#[derive(Clone, Debug, PartialEq)]
pub struct ChildCollider {
    pub collider: Collider,
    pub offset: Vec3,
}

/// Set of shapes. Sub-shape ids store the child index in the low bits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundCollider {
    pub children: Vec<ChildCollider>,
}

impl CompoundCollider {
    /// Number of low bits used to encode a child index
    pub fn child_bits(&self) -> u32 {
        let count = self.children.len() as u32;
        if count <= 1 {
            return 0;
        }
        32 - (count - 1).leading_zeros()
    }

    /// Sub-shape id addressing `remainder` inside the child at `child`
    pub fn encode_sub_shape(&self, child: u32, remainder: u32) -> u32 {
        (remainder << self.child_bits()) | child
    }

    /// Split a sub-shape id into child and remainder
    pub fn decode_sub_shape(&self, sub_shape: u32) -> Option<(&ChildCollider, u32)> {
        let bits = self.child_bits();
        let mask = if bits == 0 { 0 } else { u32::MAX >> (32 - bits) };
        let child = self.children.get((sub_shape & mask) as usize)?;
        let remainder = sub_shape.checked_shr(bits).unwrap_or(0);
        Some((child, remainder))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Collider {
    Box(BoxCollider),
    ConvexHull(ConvexHullCollider),
    Mesh(MeshCollider),
    Compound(CompoundCollider),
}

impl Collider {
    /// Descend through compound shapes to the leaf addressed by `sub_shape`.
    ///
    /// Returns the leaf, the remaining id bits (the triangle index for meshes)
    /// and the accumulated child offset.
    pub fn resolve_sub_shape(&self, sub_shape: u32) -> Option<(&Collider, u32, Vec3)> {
        let mut collider = self;
        let mut remainder = sub_shape;
        let mut offset = Vec3::ZERO;

        while let Collider::Compound(compound) = collider {
            let (child, rest) = compound.decode_sub_shape(remainder)?;
            collider = &child.collider;
            remainder = rest;
            offset += child.offset;
        }

        Some((collider, remainder, offset))
    }

    /// Total number of leaf shapes
    pub fn leaf_count(&self) -> usize {
        match self {
            Collider::Compound(compound) => compound.children.iter().map(|c| c.collider.leaf_count()).sum(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: Vec3) -> Collider {
        Collider::Box(BoxCollider {
            center,
            half_extents: Vec3::splat(0.5),
        })
    }

    #[test]
    fn test_child_bits() {
        let mut compound = CompoundCollider::default();
        assert_eq!(compound.child_bits(), 0);

        compound.children.push(ChildCollider { collider: unit_box(Vec3::ZERO), offset: Vec3::ZERO });
        assert_eq!(compound.child_bits(), 0);

        compound.children.push(ChildCollider { collider: unit_box(Vec3::X), offset: Vec3::ZERO });
        assert_eq!(compound.child_bits(), 1);

        for _ in 0..3 {
            compound.children.push(ChildCollider { collider: unit_box(Vec3::Y), offset: Vec3::ZERO });
        }
        assert_eq!(compound.child_bits(), 3);
    }

    #[test]
    fn test_resolve_nested_mesh_triangle() {
        let mesh = Collider::Mesh(MeshCollider {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2, 0, 2, 1],
            triangle_userdata: vec![7, 8],
        });
        let compound = CompoundCollider {
            children: vec![
                ChildCollider { collider: unit_box(Vec3::ZERO), offset: Vec3::ZERO },
                ChildCollider { collider: unit_box(Vec3::ZERO), offset: Vec3::ZERO },
                ChildCollider { collider: mesh, offset: Vec3::new(32.0, 0.0, 0.0) },
            ],
        };

        let id = compound.encode_sub_shape(2, 1);
        let collider = Collider::Compound(compound);
        let (leaf, triangle, offset) = collider.resolve_sub_shape(id).unwrap();

        assert_eq!(triangle, 1);
        assert_eq!(offset, Vec3::new(32.0, 0.0, 0.0));
        match leaf {
            Collider::Mesh(mesh) => assert_eq!(mesh.triangle_userdata(triangle), Some(8)),
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_out_of_range_child() {
        let compound = Collider::Compound(CompoundCollider {
            children: vec![
                ChildCollider { collider: unit_box(Vec3::ZERO), offset: Vec3::ZERO },
                ChildCollider { collider: unit_box(Vec3::X), offset: Vec3::ZERO },
                ChildCollider { collider: unit_box(Vec3::Y), offset: Vec3::ZERO },
            ],
        });
        assert!(compound.resolve_sub_shape(3).is_none());
        assert_eq!(compound.leaf_count(), 3);
    }
}
