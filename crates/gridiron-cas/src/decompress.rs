//! Block decompression.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::block::{Block, Codec};
use crate::{Error, Result};

/// Decompress Zstandard-compressed data.
pub fn decompress_zstd(data: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut decoder = zstd::Decoder::new(data).map_err(|e| Error::Decompression(e.to_string()))?;

    output.clear();
    decoder
        .read_to_end(output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    Ok(())
}

/// Decompress zlib-wrapped DEFLATE data.
pub fn decompress_zlib(data: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut decoder = ZlibDecoder::new(data);

    output.clear();
    decoder
        .read_to_end(output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    Ok(())
}

/// Decompress one block according to its own codec.
///
/// Stored blocks are returned as is.
pub fn decompress_block(block: &Block) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(block.header.decompressed_size as usize);
    match block.header.codec {
        Codec::None => output.extend_from_slice(&block.payload),
        Codec::Zstd => decompress_zstd(&block.payload, &mut output)?,
        Codec::Zlib => decompress_zlib(&block.payload, &mut output)?,
        other => return Err(Error::UnsupportedCodec(other.as_u8())),
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;

    fn block(codec: Codec, payload: Vec<u8>, decompressed_size: u32) -> Block {
        Block {
            offset: 0,
            header: BlockHeader {
                flags: BlockHeader::FLAG_CHUNK_START,
                decompressed_size,
                codec,
                codec_flags: 0,
                compressed_size: payload.len() as u16,
            },
            payload,
        }
    }

    #[test]
    fn test_zstd_block() {
        let original = b"Frostbite block payload compressed with zstd".repeat(4);
        let compressed = zstd::encode_all(&original[..], 3).unwrap();

        let out = decompress_block(&block(Codec::Zstd, compressed, original.len() as u32)).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_zlib_block() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let original = b"Frostbite block payload compressed with zlib".to_vec();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&original).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress_block(&block(Codec::Zlib, compressed, original.len() as u32)).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_stored_block_passes_through() {
        let out = decompress_block(&block(Codec::None, vec![1, 2, 3], 3)).unwrap();
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn test_corrupt_zstd_fails() {
        let result = decompress_block(&block(Codec::Zstd, vec![0xDE, 0xAD, 0xBE, 0xEF], 16));
        assert!(matches!(result, Err(Error::Decompression(_))));
    }

    #[test]
    fn test_unsupported_codec() {
        let result = decompress_block(&block(Codec::Oodle, vec![0; 4], 16));
        assert!(matches!(result, Err(Error::UnsupportedCodec(0x15))));
    }
}
