//! Error types for the voxel core

use thiserror::Error;

use crate::block::BlockIndex;

/// Main error type for recoverable data/content failures.
///
/// Precondition violations (reading an unset chunk, out-of-range voxel
/// coordinates) are programmer errors and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Voxel error: {0}")]
    Voxel(String),

    #[error("unknown block type \"{0}\"")]
    UnknownBlock(String),

    #[error("block index {0} is not registered in the block library")]
    InvalidBlockIndex(BlockIndex),

    #[error("chunk size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch { expected: [u32; 3], actual: [u32; 3] },

    #[error("Serialization error: {0}")]
    Serialization(String),
}
