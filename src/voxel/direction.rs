//! Axis directions and direction masks

use bitflags::bitflags;
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// One of the six axis-aligned directions. `Up` is +Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// +Z
    Back = 0,
    /// -Y
    Down = 1,
    /// -Z
    Front = 2,
    /// -X
    Left = 3,
    /// +X
    Right = 4,
    /// +Y
    Up = 5,
}

impl Direction {
    pub const COUNT: usize = 6;

    pub const ALL: [Direction; 6] = [
        Direction::Back,
        Direction::Down,
        Direction::Front,
        Direction::Left,
        Direction::Right,
        Direction::Up,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Integer offset to the neighbouring cell in this direction
    pub fn offset(self) -> IVec3 {
        match self {
            Direction::Back => IVec3::Z,
            Direction::Down => IVec3::NEG_Y,
            Direction::Front => IVec3::NEG_Z,
            Direction::Left => IVec3::NEG_X,
            Direction::Right => IVec3::X,
            Direction::Up => IVec3::Y,
        }
    }

    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Back => Direction::Front,
            Direction::Down => Direction::Up,
            Direction::Front => Direction::Back,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
        }
    }

    /// Closest direction to an arbitrary vector (dominant axis wins, X before Y before Z on ties)
    pub fn from_normal(normal: Vec3) -> Self {
        let abs = normal.abs();
        if abs.x >= abs.y && abs.x >= abs.z {
            if normal.x >= 0.0 { Direction::Right } else { Direction::Left }
        } else if abs.y >= abs.z {
            if normal.y >= 0.0 { Direction::Up } else { Direction::Down }
        } else if normal.z >= 0.0 {
            Direction::Back
        } else {
            Direction::Front
        }
    }

    pub fn mask(self) -> DirectionMask {
        DirectionMask::from_bits_truncate(1 << self as u8)
    }
}

bitflags! {
    /// Set of directions, used to report which neighbouring chunks are affected by a change
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DirectionMask: u8 {
        const BACK = 1 << 0;
        const DOWN = 1 << 1;
        const FRONT = 1 << 2;
        const LEFT = 1 << 3;
        const RIGHT = 1 << 4;
        const UP = 1 << 5;
        const ALL = 0b11_1111;
    }
}

impl DirectionMask {
    /// Iterate over the directions contained in this mask
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |dir| self.contains(dir.mask()))
    }
}

impl From<Direction> for DirectionMask {
    fn from(direction: Direction) -> Self {
        direction.mask()
    }
}
