//! EBX partition header.

use gridiron_common::{BinaryReader, FbGuid};

use crate::{Error, Result};

/// Identity section at the start of every EBX partition.
///
/// Layout (little-endian):
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0x00 | 4 | magic `EBXD` |
/// | 0x04 | 4 | header size (offset of the instance payload) |
/// | 0x08 | 16 | partition GUID |
/// | 0x18 | 4 | root type name hash |
/// | 0x1C | 2 + n | name length and UTF-8 name |
///
/// The header is zero-padded up to `header_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbxHeader {
    /// Partition GUID, the resource identity.
    pub guid: FbGuid,
    /// Hierarchical resource name, e.g. `Sound/Speech/Intro`.
    pub name: String,
    /// Name hash of the root instance's type.
    pub root_type_hash: u32,
    /// Offset of the instance payload.
    pub header_size: u32,
}

impl EbxHeader {
    /// Magic bytes.
    pub const MAGIC: &'static [u8; 4] = b"EBXD";

    /// Size of the fixed part, before the name bytes.
    pub const FIXED_SIZE: usize = 0x1E;

    /// Check if data starts with the EBX magic.
    pub fn is_ebx(data: &[u8]) -> bool {
        data.len() >= Self::MAGIC.len() && &data[..Self::MAGIC.len()] == Self::MAGIC
    }

    /// Parse the header of a decompressed partition.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(Self::MAGIC)?;

        let header_size = reader.read_u32()?;
        let guid = reader.read_guid()?;
        let root_type_hash = reader.read_u32()?;
        let name = reader.read_short_string()?.to_string();

        if (header_size as usize) < reader.position() || header_size as usize > data.len() {
            return Err(Error::InvalidHeaderSize {
                header_size,
                len: data.len(),
            });
        }

        Ok(Self {
            guid,
            name,
            root_type_hash,
            header_size,
        })
    }

    /// Instance payload that follows this header.
    #[inline]
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[(self.header_size as usize).min(data.len())..]
    }
}
