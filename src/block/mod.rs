//! Block type identifiers and the block library

pub mod library;

pub use library::{BlockData, BlockLibrary};

/// Small unsigned integer identifying a block type
pub type BlockIndex = u8;

/// Reserved index meaning "no block here"
pub const EMPTY_BLOCK_INDEX: BlockIndex = 0;

/// Reserved index meaning "not a recognized block type"
pub const INVALID_BLOCK_INDEX: BlockIndex = BlockIndex::MAX;
