//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Number of corners of a box
pub const CORNER_COUNT: usize = 8;

/// Index of a box corner: bit 0 = +x side, bit 1 = +y side, bit 2 = +z side
pub const fn corner_index(positive_x: bool, positive_y: bool, positive_z: bool) -> usize {
    (positive_x as usize) | ((positive_y as usize) << 1) | ((positive_z as usize) << 2)
}

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from its min corner and size
    pub fn from_min_size(min: Vec3, size: Vec3) -> Self {
        Self { min, max: min + size }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Clamp a point into the box
    pub fn clamp_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// The 8 corners, ordered by [`corner_index`]
    pub fn corners(&self) -> [Vec3; CORNER_COUNT] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            )
        })
    }
}
