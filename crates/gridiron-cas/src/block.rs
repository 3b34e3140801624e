//! CAS block records.

use gridiron_common::BinaryReader;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// On-disk block header (big-endian).
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0x00 | 4 | flags (top byte) and decompressed size (low 24 bits) |
/// | 0x04 | 1 | codec |
/// | 0x05 | 1 | codec flags |
/// | 0x06 | 2 | compressed size |
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawBlockHeader {
    pub flags_and_size: U32<BigEndian>,
    pub codec: u8,
    pub codec_flags: u8,
    pub compressed_size: U16<BigEndian>,
}

/// Block compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Stored as is.
    None,
    Zlib,
    Lz4,
    Zstd,
    Oodle,
    Unknown(u8),
}

impl Codec {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::None,
            0x02 => Self::Zlib,
            0x09 => Self::Lz4,
            0x0F => Self::Zstd,
            0x15 => Self::Oodle,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Zlib => 0x02,
            Self::Lz4 => 0x09,
            Self::Zstd => 0x0F,
            Self::Oodle => 0x15,
            Self::Unknown(value) => *value,
        }
    }

    /// Whether this crate can decompress the codec.
    #[inline]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Zlib | Self::Zstd)
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub flags: u8,
    pub decompressed_size: u32,
    pub codec: Codec,
    pub codec_flags: u8,
    pub compressed_size: u16,
}

impl BlockHeader {
    /// Size of the header on disk.
    pub const SIZE: usize = 8;

    /// Flag marking the first block of a chunk.
    pub const FLAG_CHUNK_START: u8 = 0x01;

    /// Largest decompressed size the 24-bit field holds.
    pub const MAX_DECOMPRESSED_SIZE: u32 = 0x00FF_FFFF;

    pub fn from_raw(raw: &RawBlockHeader) -> Self {
        let word = raw.flags_and_size.get();
        Self {
            flags: (word >> 24) as u8,
            decompressed_size: word & Self::MAX_DECOMPRESSED_SIZE,
            codec: Codec::from_u8(raw.codec),
            codec_flags: raw.codec_flags,
            compressed_size: raw.compressed_size.get(),
        }
    }

    pub fn to_raw(&self) -> RawBlockHeader {
        RawBlockHeader {
            flags_and_size: U32::new(
                (u32::from(self.flags) << 24) | (self.decompressed_size & Self::MAX_DECOMPRESSED_SIZE),
            ),
            codec: self.codec.as_u8(),
            codec_flags: self.codec_flags,
            compressed_size: U16::new(self.compressed_size),
        }
    }

    /// Parse from the first eight bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> gridiron_common::Result<Self> {
        let raw: RawBlockHeader = BinaryReader::new(bytes).read_struct()?;
        Ok(Self::from_raw(&raw))
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.to_raw().as_bytes());
        out
    }

    #[inline]
    pub fn is_chunk_start(&self) -> bool {
        self.flags & Self::FLAG_CHUNK_START != 0
    }

    /// Number of payload bytes following the header.
    #[inline]
    pub fn payload_len(&self) -> usize {
        if self.codec.is_compressed() {
            self.compressed_size as usize
        } else {
            self.decompressed_size as usize
        }
    }
}

/// A block as read from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Offset of the header in the container.
    pub offset: u64,
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

impl Block {
    /// Bytes the block occupies in the container.
    #[inline]
    pub fn stored_len(&self) -> u64 {
        (BlockHeader::SIZE + self.payload.len()) as u64
    }

    /// The block exactly as stored, header included.
    pub fn stored_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BlockHeader::SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}
