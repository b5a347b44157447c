//! Ship persistence
//!
//! A ship is stored as a JSON document listing its chunks; each chunk carries
//! its compressed voxel content as base64 text.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use spaceblock::block::BlockLibrary;
use spaceblock::container::{ChunkContainer, Ship, ShipConfig};
use spaceblock::core::types::ChunkIndices;
use spaceblock::voxel::serialize::{compress_content, decompress_into};

use crate::error::{Result, ServerError};

pub const SHIP_DOCUMENT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipDocument {
    pub version: u32,
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub indices: [i32; 3],
    /// Base64 of the lz4-compressed chunk content
    pub data: String,
}

/// Snapshot every chunk holding content, sorted by chunk indices.
pub fn ship_to_document(ship: &Ship) -> Result<ShipDocument> {
    let mut chunks = Vec::new();
    for chunk in ship.chunk_map().chunks() {
        let guard = chunk.lock_read();
        if !guard.has_content() {
            continue;
        }

        chunks.push(ChunkRecord {
            indices: chunk.indices().to_array(),
            data: STANDARD.encode(compress_content(&guard)?),
        });
    }
    chunks.sort_by_key(|record| record.indices);

    Ok(ShipDocument {
        version: SHIP_DOCUMENT_VERSION,
        chunks,
    })
}

pub fn ship_from_document(library: Arc<BlockLibrary>, config: ShipConfig, document: &ShipDocument) -> Result<Ship> {
    if document.version != SHIP_DOCUMENT_VERSION {
        return Err(ServerError::UnsupportedVersion(document.version));
    }

    let mut ship = Ship::new(library, config);
    for record in &document.chunks {
        let indices = ChunkIndices::from_array(record.indices);
        if ship.chunk_map().contains_chunk(indices) {
            return Err(ServerError::DuplicateChunk(record.indices));
        }

        let data = STANDARD.decode(&record.data)?;
        let chunk = ship.add_chunk(indices);
        decompress_into(&mut chunk.lock_write(), &data)?;
    }

    Ok(ship)
}

pub async fn save_ship(ship: &Ship, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&ship_to_document(ship)?)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;

    log::info!("Saved ship to {}", path.display());
    Ok(())
}

pub async fn load_ship(library: Arc<BlockLibrary>, config: ShipConfig, path: &Path) -> Result<Ship> {
    let json = tokio::fs::read_to_string(path).await?;
    let document: ShipDocument = serde_json::from_str(&json)?;
    ship_from_document(library, config, &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{IVec3, UVec3};

    fn library() -> Arc<BlockLibrary> {
        Arc::new(BlockLibrary::with_default_blocks())
    }

    #[tokio::test]
    async fn test_save_and_load_ship() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ships").join("player.json");

        let mut ship = Ship::new(library(), ShipConfig::default());
        ship.generate(false).unwrap();
        let stone = ship.chunk_map().block_library().get_block_index("stone");
        ship.chunk_map()
            .get_chunk(IVec3::ZERO)
            .unwrap()
            .lock_write()
            .update_block(UVec3::new(16, 16, 16), stone);

        save_ship(&ship, &path).await.unwrap();
        let loaded = load_ship(library(), ShipConfig::default(), &path).await.unwrap();

        let original = ship.chunk_map().get_chunk(IVec3::ZERO).unwrap().lock_read();
        let restored = loaded.chunk_map().get_chunk(IVec3::ZERO).unwrap().lock_read();
        assert_eq!(original.content(), restored.content());
        assert_eq!(restored.block_type_count(stone), 1);
    }

    #[test]
    fn test_unset_chunks_are_skipped() {
        let mut ship = Ship::new(library(), ShipConfig::default());
        ship.generate(true).unwrap();
        ship.add_chunk(IVec3::new(0, 1, 0));

        let document = ship_to_document(&ship).unwrap();
        assert_eq!(document.chunks.len(), 1);
        assert_eq!(document.chunks[0].indices, [0, 0, 0]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let document = ShipDocument {
            version: SHIP_DOCUMENT_VERSION + 1,
            chunks: Vec::new(),
        };
        let result = ship_from_document(library(), ShipConfig::default(), &document);
        assert!(matches!(result, Err(ServerError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_rejects_malformed_chunk_data() {
        let document = ShipDocument {
            version: SHIP_DOCUMENT_VERSION,
            chunks: vec![ChunkRecord {
                indices: [0, 0, 0],
                data: "not base64!".to_string(),
            }],
        };
        let result = ship_from_document(library(), ShipConfig::default(), &document);
        assert!(matches!(result, Err(ServerError::Base64(_))));

        let document = ShipDocument {
            version: SHIP_DOCUMENT_VERSION,
            chunks: vec![ChunkRecord {
                indices: [0, 0, 0],
                data: STANDARD.encode([5u8, 0, 0, 0, 0xFF]),
            }],
        };
        let result = ship_from_document(library(), ShipConfig::default(), &document);
        assert!(matches!(result, Err(ServerError::Core(_))));
    }

    #[test]
    fn test_rejects_duplicate_chunks() {
        let mut ship = Ship::new(library(), ShipConfig::default());
        ship.generate(true).unwrap();

        let mut document = ship_to_document(&ship).unwrap();
        document.chunks.push(document.chunks[0].clone());

        let result = ship_from_document(library(), ShipConfig::default(), &document);
        assert!(matches!(result, Err(ServerError::DuplicateChunk([0, 0, 0]))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_ship(library(), ShipConfig::default(), &dir.path().join("nope.json")).await;
        assert!(matches!(result, Err(ServerError::Io(_))));
    }
}
