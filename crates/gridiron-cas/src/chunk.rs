//! Chunks: runs of blocks that make up one resource.

use crate::block::{Block, Codec};

/// An ordered run of blocks read from one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub blocks: Vec<Block>,
    /// Offset of the first block header in the container.
    pub offset: u64,
    /// Bytes the chunk occupies in the container, headers included.
    pub size_in_container: u64,
}

impl Chunk {
    /// Build a chunk from contiguous blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let offset = blocks.first().map_or(0, |b| b.offset);
        let size_in_container = blocks.iter().map(Block::stored_len).sum();
        Self {
            blocks,
            offset,
            size_in_container,
        }
    }

    /// Codec of the first block, which decides how the chunk is decoded.
    #[inline]
    pub fn codec(&self) -> Option<Codec> {
        self.blocks.first().map(|b| b.header.codec)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The chunk's bytes exactly as stored in the container.
    pub fn stored_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_in_container as usize);
        for block in &self.blocks {
            out.extend_from_slice(&block.stored_bytes());
        }
        out
    }
}
