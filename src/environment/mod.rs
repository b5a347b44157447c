//! Reference frames relating one container's local space to another's

pub mod transform;

pub use transform::{EnvironmentTransform, ROTATION_EPSILON, TRANSLATION_EPSILON};
