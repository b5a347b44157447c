//! Rigid environment transforms
//!
//! An [`EnvironmentTransform`] expresses a child frame inside a parent frame.
//! Composition uses `+` (`parent + child`), inversion uses unary `-`, and
//! `a - b` is `a + (-b)`.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Default tolerance for translation comparisons, in world units
pub const TRANSLATION_EPSILON: f32 = 0.01;

/// Default tolerance for rotation comparisons (per quaternion component)
pub const ROTATION_EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for EnvironmentTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl EnvironmentTransform {
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// Map a point from the child frame into the parent frame.
    pub fn translate(&self, local_position: Vec3) -> Vec3 {
        self.translation + self.rotation * local_position
    }

    /// Map a direction from the child frame into the parent frame.
    pub fn rotate(&self, direction: Vec3) -> Vec3 {
        self.rotation * direction
    }

    /// Map an orientation from the child frame into the parent frame.
    pub fn rotate_rotation(&self, local_rotation: Quat) -> Quat {
        (self.rotation * local_rotation).normalize()
    }

    /// Compare with independent tolerances. `q` and `-q` describe the same
    /// rotation and compare equal.
    pub fn approx_equal(&self, other: &Self, translation_epsilon: f32, rotation_epsilon: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, translation_epsilon)
            && (self.rotation.abs_diff_eq(other.rotation, rotation_epsilon)
                || self.rotation.abs_diff_eq(-other.rotation, rotation_epsilon))
    }

    /// [`approx_equal`](Self::approx_equal) with the default epsilons.
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.approx_equal(other, TRANSLATION_EPSILON, ROTATION_EPSILON)
    }

    pub fn inverse(&self) -> Self {
        -*self
    }
}

impl AddAssign for EnvironmentTransform {
    fn add_assign(&mut self, child: Self) {
        self.translation += self.rotation * child.translation;
        self.rotation = (self.rotation * child.rotation).normalize();
    }
}

impl Add for EnvironmentTransform {
    type Output = Self;

    fn add(mut self, child: Self) -> Self {
        self += child;
        self
    }
}

impl Neg for EnvironmentTransform {
    type Output = Self;

    fn neg(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self {
            translation: -(rotation * self.translation),
            rotation,
        }
    }
}

impl SubAssign for EnvironmentTransform {
    fn sub_assign(&mut self, other: Self) {
        *self += -other;
    }
}

impl Sub for EnvironmentTransform {
    type Output = Self;

    fn sub(mut self, other: Self) -> Self {
        self -= other;
        self
    }
}
