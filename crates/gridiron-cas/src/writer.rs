//! CAS block writer.
//!
//! Lays out blocks the way [`CasBlockReader`](crate::CasBlockReader) reads
//! them. Available to tests and behind the `test-util` feature.

use crate::block::{BlockHeader, Codec};
use crate::{Error, Result};

/// Zstandard level used for written blocks.
const ZSTD_LEVEL: i32 = 3;

/// Appends blocks to an in-memory container.
#[derive(Debug, Default)]
pub struct BlockWriter {
    out: Vec<u8>,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next block will be written at.
    #[inline]
    pub fn position(&self) -> u64 {
        self.out.len() as u64
    }

    /// Write a block with an already encoded payload. Returns its offset.
    pub fn write_raw(
        &mut self,
        codec: Codec,
        decompressed_size: u32,
        payload: &[u8],
        chunk_start: bool,
    ) -> Result<u64> {
        if decompressed_size > BlockHeader::MAX_DECOMPRESSED_SIZE {
            return Err(Error::BlockTooLarge(decompressed_size as usize));
        }
        let compressed_size = if codec.is_compressed() {
            u16::try_from(payload.len()).map_err(|_| Error::BlockTooLarge(payload.len()))?
        } else {
            if payload.len() != decompressed_size as usize {
                return Err(Error::BlockTooLarge(payload.len()));
            }
            0
        };

        let header = BlockHeader {
            flags: if chunk_start { BlockHeader::FLAG_CHUNK_START } else { 0 },
            decompressed_size,
            codec,
            codec_flags: 0,
            compressed_size,
        };

        let offset = self.position();
        self.out.extend_from_slice(&header.to_bytes());
        self.out.extend_from_slice(payload);
        Ok(offset)
    }

    /// Write data uncompressed.
    pub fn write_stored(&mut self, data: &[u8], chunk_start: bool) -> Result<u64> {
        self.write_raw(Codec::None, data.len() as u32, data, chunk_start)
    }

    /// Write data as one zstd block.
    pub fn write_zstd(&mut self, data: &[u8], chunk_start: bool) -> Result<u64> {
        let compressed = zstd::encode_all(data, ZSTD_LEVEL)?;
        self.write_raw(Codec::Zstd, data.len() as u32, &compressed, chunk_start)
    }

    /// Write data as one zlib block.
    pub fn write_zlib(&mut self, data: &[u8], chunk_start: bool) -> Result<u64> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;
        self.write_raw(Codec::Zlib, data.len() as u32, &compressed, chunk_start)
    }

    /// Write data as a chunk of zstd blocks of at most `block_size` bytes each.
    /// Returns the chunk offset.
    pub fn write_zstd_chunk(&mut self, data: &[u8], block_size: usize) -> Result<u64> {
        let offset = self.position();
        for (i, piece) in data.chunks(block_size.max(1)).enumerate() {
            self.write_zstd(piece, i == 0)?;
        }
        Ok(offset)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}
