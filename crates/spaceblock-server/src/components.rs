//! Entity components simulated by environment worlds

use glam::Vec3;

/// Position in the owning environment's local frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec3);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity(pub Vec3);

/// Marker: the entity is pulled by its environment's gravity
#[derive(Clone, Copy, Debug, Default)]
pub struct GravityAffected;
