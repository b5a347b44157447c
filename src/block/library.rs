//! Registry of named block types.
//!
//! Maps block names to indices and stores per-type rendering and collision
//! data. Index 0 is always the empty block.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{BlockIndex, EMPTY_BLOCK_INDEX, INVALID_BLOCK_INDEX};
use crate::core::{Error, Result};
use crate::voxel::direction::Direction;

/// Static data describing one block type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockData {
    pub name: String,
    /// Texture array slice per face, indexed by `Direction`
    pub tex_indices: [u32; Direction::COUNT],
    /// Whether the block takes part in collisions at all
    pub has_collisions: bool,
    /// Whether the block needs face-exact collision geometry (disables box merging)
    pub per_face_collision: bool,
}

impl BlockData {
    /// A block using the same texture on every face
    pub fn uniform(name: impl Into<String>, tex_index: u32) -> Self {
        Self {
            name: name.into(),
            tex_indices: [tex_index; Direction::COUNT],
            has_collisions: true,
            per_face_collision: false,
        }
    }

    /// A block with distinct top, bottom and side textures
    pub fn with_sides(name: impl Into<String>, top: u32, bottom: u32, side: u32) -> Self {
        let mut tex_indices = [side; Direction::COUNT];
        tex_indices[Direction::Up.index()] = top;
        tex_indices[Direction::Down.index()] = bottom;

        Self {
            name: name.into(),
            tex_indices,
            has_collisions: true,
            per_face_collision: false,
        }
    }
}

/// Block registry shared (read-only) by every chunk of a world
#[derive(Clone, Debug)]
pub struct BlockLibrary {
    blocks: Vec<BlockData>,
    by_name: HashMap<String, BlockIndex>,
}

impl BlockLibrary {
    /// Create a library containing only the empty block
    pub fn new() -> Self {
        let empty = BlockData {
            name: "empty".to_string(),
            tex_indices: [0; Direction::COUNT],
            has_collisions: false,
            per_face_collision: false,
        };

        let mut by_name = HashMap::new();
        by_name.insert(empty.name.clone(), EMPTY_BLOCK_INDEX);

        Self {
            blocks: vec![empty],
            by_name,
        }
    }

    /// Library with the block set used by planets and ships
    pub fn with_default_blocks() -> Self {
        let mut library = Self::new();

        // Texture slices: 0 dirt, 1 grass top, 2 grass side, 3 stone, 4 mossy stone,
        // 5 snow, 6 hull, 7 forcefield, 8 copper, 9 stone bricks, 10 planks
        library.register(BlockData::uniform("dirt", 0));
        library.register(BlockData::with_sides("grass", 1, 0, 2));
        library.register(BlockData::uniform("stone", 3));
        library.register(BlockData::uniform("stone_mossy", 4));
        library.register(BlockData::uniform("snow", 5));
        library.register(BlockData::uniform("hull", 6));
        library.register(BlockData {
            per_face_collision: true,
            ..BlockData::uniform("forcefield", 7)
        });
        library.register(BlockData::uniform("copper_block", 8));
        library.register(BlockData::uniform("stone_bricks", 9));
        library.register(BlockData::uniform("planks", 10));

        library
    }

    /// Register a new block type and return its index.
    ///
    /// # Panics
    /// Panics if the name is already registered or the library is full.
    pub fn register(&mut self, data: BlockData) -> BlockIndex {
        assert!(!self.by_name.contains_key(&data.name), "block {} registered twice", data.name);
        assert!(self.blocks.len() < INVALID_BLOCK_INDEX as usize, "block library is full");

        let index = self.blocks.len() as BlockIndex;
        self.by_name.insert(data.name.clone(), index);
        self.blocks.push(data);
        index
    }

    /// Look up a block index by name, returning `INVALID_BLOCK_INDEX` when unknown
    pub fn get_block_index(&self, name: &str) -> BlockIndex {
        self.by_name.get(name).copied().unwrap_or(INVALID_BLOCK_INDEX)
    }

    /// Look up a block index by name
    pub fn try_block_index(&self, name: &str) -> Result<BlockIndex> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownBlock(name.to_string()))
    }

    pub fn get_block_data(&self, index: BlockIndex) -> Option<&BlockData> {
        self.blocks.get(index as usize)
    }

    pub fn contains(&self, index: BlockIndex) -> bool {
        (index as usize) < self.blocks.len()
    }

    /// Number of registered block types, empty block included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    /// Build a library from a JSON array of block definitions. The empty
    /// block is implicit and must not be listed.
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<BlockData> =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut library = Self::new();
        for data in definitions {
            if library.by_name.contains_key(&data.name) {
                return Err(Error::Serialization(format!("block \"{}\" defined twice", data.name)));
            }
            if library.blocks.len() >= INVALID_BLOCK_INDEX as usize {
                return Err(Error::Serialization("too many block definitions".to_string()));
            }
            library.register(data);
        }
        Ok(library)
    }

    /// Block definitions as JSON, empty block excluded
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.blocks[1..]).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Texture slice for a face of a block, 0 for unregistered indices
    pub fn texture_index(&self, index: BlockIndex, direction: Direction) -> u32 {
        self.get_block_data(index)
            .map(|data| data.tex_indices[direction.index()])
            .unwrap_or(0)
    }
}

impl Default for BlockLibrary {
    fn default() -> Self {
        Self::with_default_blocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block_is_index_zero() {
        let library = BlockLibrary::new();
        assert_eq!(library.get_block_index("empty"), EMPTY_BLOCK_INDEX);
        assert_eq!(library.len(), 1);
        assert!(library.is_empty());
    }

    #[test]
    fn test_default_blocks() {
        let library = BlockLibrary::with_default_blocks();
        let grass = library.get_block_index("grass");
        assert_ne!(grass, INVALID_BLOCK_INDEX);
        assert_eq!(library.texture_index(grass, Direction::Up), 1);
        assert_eq!(library.texture_index(grass, Direction::Down), 0);
        assert_eq!(library.texture_index(grass, Direction::Left), 2);

        let forcefield = library.get_block_index("forcefield");
        assert!(library.get_block_data(forcefield).unwrap().per_face_collision);
    }

    #[test]
    fn test_unknown_block() {
        let library = BlockLibrary::with_default_blocks();
        assert_eq!(library.get_block_index("lava"), INVALID_BLOCK_INDEX);
        assert!(matches!(library.try_block_index("lava"), Err(Error::UnknownBlock(name)) if name == "lava"));
    }

    #[test]
    fn test_json_round_trip() {
        let library = BlockLibrary::with_default_blocks();
        let loaded = BlockLibrary::from_json(&library.to_json().unwrap()).unwrap();

        assert_eq!(loaded.len(), library.len());
        assert_eq!(loaded.get_block_index("planks"), library.get_block_index("planks"));
        let forcefield = loaded.get_block_index("forcefield");
        assert!(loaded.get_block_data(forcefield).unwrap().per_face_collision);
    }

    #[test]
    fn test_json_rejects_duplicates() {
        let json = r#"[
            { "name": "dirt", "tex_indices": [0, 0, 0, 0, 0, 0], "has_collisions": true, "per_face_collision": false },
            { "name": "dirt", "tex_indices": [1, 1, 1, 1, 1, 1], "has_collisions": true, "per_face_collision": false }
        ]"#;
        assert!(matches!(BlockLibrary::from_json(json), Err(Error::Serialization(_))));
        assert!(BlockLibrary::from_json("[{}]").is_err());
    }

    #[test]
    #[should_panic]
    fn test_duplicate_registration_panics() {
        let mut library = BlockLibrary::new();
        library.register(BlockData::uniform("dirt", 0));
        library.register(BlockData::uniform("dirt", 1));
    }
}
