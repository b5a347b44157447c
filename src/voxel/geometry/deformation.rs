//! Rounded-cube deformation used by planets.
//!
//! Positions inside the inset cube (the planet cube shrunk by `radius`) are
//! left untouched. Outside of it, the offset from the inset cube is rescaled
//! so that its Euclidean length equals its Chebyshev length, which turns the
//! cube's edges and corners into quarter cylinders and sphere octants.

use glam::{Quat, Vec3};

use crate::math::{Aabb, CORNER_COUNT};

/// Distance under which a corner is considered not deformed
pub const DEFORMATION_EPSILON: f32 = 0.001;

/// Split `position` into its projection onto the inset cube and the remaining offset
fn split_inset(position: Vec3, center: Vec3, radius: f32) -> (Vec3, Vec3) {
    let inner = position - center;
    let inset = (inner.abs().max_element() - radius).max(0.0);
    let clamped = inner.clamp(Vec3::splat(-inset), Vec3::splat(inset));
    (clamped, inner - clamped)
}

/// Deform a position around `center` with the given corner radius
pub fn deform_position(position: Vec3, center: Vec3, radius: f32) -> Vec3 {
    let (clamped, offset) = split_inset(position, center, radius);
    let length = offset.length();
    if length <= f32::EPSILON {
        return position;
    }

    let distance = offset.abs().max_element();
    center + clamped + offset * (distance / length)
}

/// Rotation bringing `reference_normal` (the flat surface normal) onto the
/// deformed surface normal at `position`
pub fn normal_deformation(position: Vec3, reference_normal: Vec3, center: Vec3, radius: f32) -> Quat {
    let (_, offset) = split_inset(position, center, radius);
    match offset.try_normalize() {
        Some(deformed) => Quat::from_rotation_arc(reference_normal.normalize(), deformed),
        None => Quat::IDENTITY,
    }
}

/// Whether deforming the box moves any of its corners
pub fn is_deformed(bounds: &Aabb, center: Vec3, radius: f32) -> bool {
    let corners: [Vec3; CORNER_COUNT] = bounds.corners();
    corners
        .iter()
        .any(|&corner| deform_position(corner, center, radius).distance(corner) > DEFORMATION_EPSILON)
}
