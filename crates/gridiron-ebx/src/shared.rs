//! SharedTypeDescriptors payload.
//!
//! The initfs carries one EBX partition, `SharedTypeDescriptors.ebx`, whose
//! payload lists every type descriptor the game's EBX partitions refer to.
//!
//! Layout (little-endian):
//!
//! ```text
//! "STDS" u32 count
//! count x {
//!     u32 name_hash, u8 alignment, u16 kind, u32 size, u16 header_size,
//!     guid class_guid, guid type_info_guid, u16+utf8 name,
//!     u16 field_count,
//!     field_count x { u32 name_hash, u32 offset, u16 raw_type, u16 class_ref, u16+utf8 name }
//! }
//! ```

use gridiron_common::BinaryReader;

use crate::{EbxHeader, FieldRecord, Result, TypeDescriptorRecord};

/// Name of the initfs entry holding the shared type descriptors.
pub const SHARED_TYPE_DESCRIPTORS: &str = "SharedTypeDescriptors.ebx";

pub(crate) const MAGIC: &[u8; 4] = b"STDS";

/// Parse the shared type descriptors.
///
/// Accepts either the full EBX partition or its bare payload. Descriptors are
/// returned in stored order.
pub fn parse_shared_type_descriptors(data: &[u8]) -> Result<Vec<TypeDescriptorRecord>> {
    let payload = if EbxHeader::is_ebx(data) {
        let header = EbxHeader::parse(data)?;
        header.payload(data)
    } else {
        data
    };

    let mut reader = BinaryReader::new(payload);
    reader.expect_magic(MAGIC)?;
    let count = reader.read_u32()? as usize;

    // Each descriptor takes at least 51 bytes.
    let mut types = Vec::with_capacity(count.min(reader.remaining() / 51));
    for _ in 0..count {
        types.push(read_descriptor(&mut reader)?);
    }
    Ok(types)
}

fn read_descriptor(reader: &mut BinaryReader<'_>) -> Result<TypeDescriptorRecord> {
    let name_hash = reader.read_u32()?;
    let alignment = reader.read_u8()?;
    let kind = reader.read_u16()?;
    let size = reader.read_u32()?;
    let header_size = reader.read_u16()?;
    let class_guid = reader.read_guid()?;
    let type_info_guid = reader.read_guid()?;
    let name = reader.read_short_string()?.to_string();

    let field_count = reader.read_u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(FieldRecord {
            name_hash: reader.read_u32()?,
            offset: reader.read_u32()?,
            raw_type: reader.read_u16()?,
            class_ref: reader.read_u16()?,
            name: reader.read_short_string()?.to_string(),
        });
    }

    Ok(TypeDescriptorRecord {
        name_hash,
        alignment,
        kind,
        size,
        header_size,
        class_guid,
        type_info_guid,
        name,
        fields,
    })
}
