//! Chunk content encoding for persistence and network transfer.
//!
//! Content is archived with rkyv and compressed with LZ4. The block array is
//! stored raw; decoding validates the chunk size and every block index
//! against the receiving chunk's library.

use rkyv::{Archive, Deserialize, Serialize};

use crate::block::BlockIndex;
use crate::core::{Error, Result};
use crate::voxel::chunk::{ChunkContent, ChunkWriteGuard};

const FORMAT_VERSION: u32 = 1;

#[derive(Archive, Deserialize, Serialize)]
struct ChunkData {
    version: u32,
    size: [u32; 3],
    blocks: Vec<BlockIndex>,
}

/// Serialize chunk content to bytes (uncompressed)
pub fn serialize_content(content: &ChunkContent) -> Result<Vec<u8>> {
    let data = ChunkData {
        version: FORMAT_VERSION,
        size: content.size().to_array(),
        blocks: content.content().to_vec(),
    };

    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    Ok(bytes.to_vec())
}

fn deserialize_data(data: &[u8]) -> Result<ChunkData> {
    // rkyv needs aligned input, buffers coming from disk or network are not
    let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(data.len());
    aligned.extend_from_slice(data);

    let archived = rkyv::access::<ArchivedChunkData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    rkyv::deserialize::<ChunkData, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Compress serialized chunk content using LZ4
pub fn compress_content(content: &ChunkContent) -> Result<Vec<u8>> {
    let serialized = serialize_content(content)?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Decompress bytes produced by [`compress_content`] and reset the chunk with them.
///
/// The chunk is left untouched if the data is corrupted or does not match it.
pub fn decompress_into(chunk: &mut ChunkWriteGuard<'_>, data: &[u8]) -> Result<()> {
    let decompressed = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| Error::Serialization(format!("LZ4 decompression failed: {}", e)))?;
    let data = deserialize_data(&decompressed)?;

    if data.version != FORMAT_VERSION {
        return Err(Error::Serialization(format!("unsupported chunk format version {}", data.version)));
    }

    let expected = chunk.chunk().size().to_array();
    if data.size != expected {
        return Err(Error::SizeMismatch { expected, actual: data.size });
    }

    let volume = expected.iter().product::<u32>() as usize;
    if data.blocks.len() != volume {
        return Err(Error::Serialization(format!(
            "expected {} blocks, got {}",
            volume,
            data.blocks.len()
        )));
    }

    let library = chunk.chunk().block_library();
    if let Some(&invalid) = data.blocks.iter().find(|&&block| !library.contains(block)) {
        return Err(Error::InvalidBlockIndex(invalid));
    }

    chunk.reset_with(|blocks| blocks.copy_from_slice(&data.blocks));
    Ok(())
}
