//! Chunk decoding: decompress blocks, reassemble, read the EBX identity.

use gridiron_common::FbGuid;
use gridiron_ebx::EbxHeader;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::decompress::decompress_block;

/// Index entry for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Partition GUID.
    pub id: FbGuid,
    /// Hierarchical name, matched case-insensitively.
    pub name: String,
    /// Container path relative to the install root, `/`-separated.
    pub file: String,
    /// Chunk offset in the container.
    pub offset: u64,
    /// Chunk size in the container.
    pub size: u64,
}

/// Decompress every block of a chunk and concatenate them in block order.
///
/// Returns `None` when the first block has no codec or one this crate cannot
/// decode. Blocks that fail to decompress are left out of the result.
pub fn decompress_chunk(chunk: &Chunk) -> Option<Vec<u8>> {
    let codec = chunk.codec()?;
    if !codec.is_supported() {
        debug!(offset = chunk.offset, ?codec, "skipping chunk without a supported codec");
        return None;
    }

    // `collect` on an indexed parallel iterator keeps block order.
    let parts: Vec<Option<Vec<u8>>> = chunk
        .blocks
        .par_iter()
        .enumerate()
        .map(|(index, block)| match decompress_block(block) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(
                    chunk = chunk.offset,
                    block = block.offset,
                    index,
                    error = %e,
                    "dropping block that failed to decompress"
                );
                None
            }
        })
        .collect();

    Some(parts.into_iter().flatten().collect::<Vec<_>>().concat())
}

/// Decode a chunk into its index record.
///
/// Yields at most one record. `None` for an unsupported codec or a stream
/// that is not an EBX partition.
pub fn decode_chunk(chunk: &Chunk, file: &str) -> Option<ResourceRecord> {
    let data = decompress_chunk(chunk)?;
    match EbxHeader::parse(&data) {
        Ok(header) => Some(ResourceRecord {
            id: header.guid,
            name: header.name,
            file: file.to_string(),
            offset: chunk.offset,
            size: chunk.size_in_container,
        }),
        Err(e) => {
            warn!(file, offset = chunk.offset, error = %e, "chunk is not an EBX partition");
            None
        }
    }
}
