//! EBX partition and shared type descriptor builders.
//!
//! Produce bytes in the layouts read by [`EbxHeader::parse`] and
//! [`parse_shared_type_descriptors`](crate::parse_shared_type_descriptors).
//! Available to tests and behind the `test-util` feature.

use byteorder::{LittleEndian, WriteBytesExt};
use gridiron_common::hash::hash_str;
use gridiron_common::FbGuid;

use crate::shared::MAGIC;
use crate::{EbxFieldType, EbxHeader, FieldRecord, TypeDescriptorRecord};

/// Builder for a decompressed EBX partition.
#[derive(Debug, Clone)]
pub struct EbxBuilder {
    name: String,
    guid: FbGuid,
    root_type_hash: u32,
    header_size: Option<u32>,
    payload: Vec<u8>,
}

impl EbxBuilder {
    /// Start a partition with the given identity.
    pub fn new(name: impl Into<String>, guid: FbGuid, root_type_hash: u32) -> Self {
        Self {
            name: name.into(),
            guid,
            root_type_hash,
            header_size: None,
            payload: Vec::new(),
        }
    }

    /// Set the instance payload.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    /// Force a header size. Values smaller than the header itself are ignored.
    pub fn header_size(mut self, header_size: u32) -> Self {
        self.header_size = Some(header_size);
        self
    }

    /// Serialize the partition.
    pub fn build(&self) -> Vec<u8> {
        let minimum = EbxHeader::FIXED_SIZE + self.name.len();
        let header_size = self
            .header_size
            .map(|size| (size as usize).max(minimum))
            .unwrap_or_else(|| minimum.next_multiple_of(16));

        let mut out = Vec::with_capacity(header_size + self.payload.len());
        out.extend_from_slice(EbxHeader::MAGIC);
        // Writes into a Vec cannot fail.
        let _ = out.write_u32::<LittleEndian>(header_size as u32);
        out.extend_from_slice(self.guid.as_bytes());
        let _ = out.write_u32::<LittleEndian>(self.root_type_hash);
        let _ = out.write_u16::<LittleEndian>(self.name.len() as u16);
        out.extend_from_slice(self.name.as_bytes());
        out.resize(header_size, 0);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Builder for a SharedTypeDescriptors payload.
///
/// ```
/// use gridiron_ebx::{parse_shared_type_descriptors, EbxFieldType, SharedTypeWriter};
///
/// let mut writer = SharedTypeWriter::new();
/// let player = writer.add_type("Player", EbxFieldType::Struct, 8, 4);
/// writer.add_field(player, "Speed", EbxFieldType::Float32, 0, 0);
/// writer.add_field(player, "Number", EbxFieldType::Int32, 4, 0);
///
/// let types = parse_shared_type_descriptors(&writer.build_partition())?;
/// assert_eq!(types[0].fields.len(), 2);
/// # Ok::<(), gridiron_ebx::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct SharedTypeWriter {
    types: Vec<TypeDescriptorRecord>,
}

impl SharedTypeWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type and return its index, which field class references use.
    pub fn add_type(&mut self, name: &str, kind: EbxFieldType, size: u32, alignment: u8) -> u16 {
        let index = self.types.len() as u16;
        self.types.push(TypeDescriptorRecord {
            name_hash: hash_str(name),
            alignment,
            kind: kind.to_flags(),
            size,
            header_size: 0,
            class_guid: FbGuid::EMPTY,
            type_info_guid: FbGuid::EMPTY,
            name: name.to_string(),
            fields: Vec::new(),
        });
        index
    }

    /// Add a field to the type at `type_index`.
    pub fn add_field(
        &mut self,
        type_index: u16,
        name: &str,
        field_type: EbxFieldType,
        offset: u32,
        class_ref: u16,
    ) {
        if let Some(ty) = self.types.get_mut(type_index as usize) {
            ty.fields.push(FieldRecord {
                name_hash: hash_str(name),
                offset,
                raw_type: field_type.to_flags(),
                class_ref,
                name: name.to_string(),
            });
        }
    }

    /// Add a fully formed record as is.
    pub fn push_record(&mut self, record: TypeDescriptorRecord) -> u16 {
        self.types.push(record);
        (self.types.len() - 1) as u16
    }

    /// Records added so far.
    pub fn records(&self) -> &[TypeDescriptorRecord] {
        &self.types
    }

    /// Serialize the bare `STDS` payload.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        // Writes into a Vec cannot fail.
        let _ = out.write_u32::<LittleEndian>(self.types.len() as u32);
        for ty in &self.types {
            let _ = out.write_u32::<LittleEndian>(ty.name_hash);
            let _ = out.write_u8(ty.alignment);
            let _ = out.write_u16::<LittleEndian>(ty.kind);
            let _ = out.write_u32::<LittleEndian>(ty.size);
            let _ = out.write_u16::<LittleEndian>(ty.header_size);
            out.extend_from_slice(ty.class_guid.as_bytes());
            out.extend_from_slice(ty.type_info_guid.as_bytes());
            write_short_string(&mut out, &ty.name);
            let _ = out.write_u16::<LittleEndian>(ty.fields.len() as u16);
            for field in &ty.fields {
                let _ = out.write_u32::<LittleEndian>(field.name_hash);
                let _ = out.write_u32::<LittleEndian>(field.offset);
                let _ = out.write_u16::<LittleEndian>(field.raw_type);
                let _ = out.write_u16::<LittleEndian>(field.class_ref);
                write_short_string(&mut out, &field.name);
            }
        }
        out
    }

    /// Serialize as a complete `SharedTypeDescriptors.ebx` partition.
    pub fn build_partition(&self) -> Vec<u8> {
        EbxBuilder::new("SharedTypeDescriptors", FbGuid::EMPTY, 0)
            .payload(&self.build())
            .build()
    }
}

fn write_short_string(out: &mut Vec<u8>, s: &str) {
    let _ = out.write_u16::<LittleEndian>(s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}
