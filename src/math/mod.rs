//! Mathematical utilities and data structures

pub mod aabb;

pub use aabb::{Aabb, CORNER_COUNT, corner_index};
