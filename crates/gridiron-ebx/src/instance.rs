//! Typed decode of an EBX instance payload.
//!
//! The payload of a partition is the root instance laid out by its type
//! descriptor: each field sits at `offset` from the start of its owner.
//! Base classes are flattened into the derived instance, nested structs are
//! decoded in place.

use gridiron_common::{BinaryReader, FbGuid};

use crate::{EbxFieldType, Error, Field, Result, TypeDescriptor, TypeTable};

/// Deepest struct/base-class nesting the decoder follows.
pub const MAX_NESTING: usize = 32;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum EbxValue {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Guid(FbGuid),
    /// Raw enum value.
    Enum(i32),
    CString(String),
    Struct(EbxInstance),
    /// Import or instance reference, undecoded.
    Pointer(u64),
    ResourceRef(u64),
    /// Fixed-size bytes with no richer representation (SHA-1).
    Raw(Vec<u8>),
    /// Field kind this decoder does not interpret.
    Unsupported(EbxFieldType),
}

/// A named field of a decoded instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EbxField {
    pub name: String,
    pub value: EbxValue,
}

/// A decoded instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EbxInstance {
    pub type_name: String,
    pub type_hash: u32,
    /// Fields in layout order, base class fields first.
    pub fields: Vec<EbxField>,
}

impl EbxInstance {
    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&EbxValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

/// Decode the instance payload of a partition whose root type is `type_hash`.
pub fn decode_instance(table: &TypeTable, type_hash: u32, payload: &[u8]) -> Result<EbxInstance> {
    let ty = table.get(type_hash).ok_or(Error::UnknownType(type_hash))?;
    let decoder = Decoder { table, payload };
    decoder.instance(ty, 0, 0)
}

struct Decoder<'a> {
    table: &'a TypeTable,
    payload: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn instance(&self, ty: &TypeDescriptor, base: usize, depth: usize) -> Result<EbxInstance> {
        let mut fields = Vec::with_capacity(ty.fields.len());
        self.fields_into(ty, base, depth, &mut fields)?;
        Ok(EbxInstance {
            type_name: ty.name.clone(),
            type_hash: ty.name_hash,
            fields,
        })
    }

    fn fields_into(
        &self,
        ty: &TypeDescriptor,
        base: usize,
        depth: usize,
        out: &mut Vec<EbxField>,
    ) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(Error::NestingTooDeep(MAX_NESTING));
        }

        for field in &ty.fields {
            let at = base + field.offset as usize;
            match field.field_type {
                EbxFieldType::Inherited => {
                    let parent = self.class(field)?;
                    self.fields_into(parent, base, depth + 1, out)?;
                }
                EbxFieldType::Struct => {
                    let nested = self.class(field)?;
                    out.push(EbxField {
                        name: field.name.clone(),
                        value: EbxValue::Struct(self.instance(nested, at, depth + 1)?),
                    });
                }
                kind => out.push(EbxField {
                    name: field.name.clone(),
                    value: self.value(kind, at)?,
                }),
            }
        }
        Ok(())
    }

    fn class(&self, field: &Field) -> Result<&'a TypeDescriptor> {
        let hash = field.class_hash.ok_or(Error::InvalidClassRef {
            class_ref: field.class_ref,
            count: self.table.len(),
        })?;
        self.table.get(hash).ok_or(Error::UnknownType(hash))
    }

    fn value(&self, kind: EbxFieldType, at: usize) -> Result<EbxValue> {
        let mut reader = BinaryReader::new_at(self.payload, at);
        let value = match kind {
            EbxFieldType::Boolean => EbxValue::Bool(reader.read_bool()?),
            EbxFieldType::Int8 => EbxValue::Int8(reader.read_i8()?),
            EbxFieldType::UInt8 => EbxValue::UInt8(reader.read_u8()?),
            EbxFieldType::Int16 => EbxValue::Int16(reader.read_i16()?),
            EbxFieldType::UInt16 => EbxValue::UInt16(reader.read_u16()?),
            EbxFieldType::Int32 => EbxValue::Int32(reader.read_i32()?),
            EbxFieldType::UInt32 => EbxValue::UInt32(reader.read_u32()?),
            EbxFieldType::Int64 => EbxValue::Int64(reader.read_i64()?),
            EbxFieldType::UInt64 => EbxValue::UInt64(reader.read_u64()?),
            EbxFieldType::Float32 => EbxValue::Float32(reader.read_f32()?),
            EbxFieldType::Float64 => EbxValue::Float64(reader.read_f64()?),
            EbxFieldType::Guid => EbxValue::Guid(reader.read_guid()?),
            EbxFieldType::Enum => EbxValue::Enum(reader.read_i32()?),
            EbxFieldType::CString => {
                let offset = reader.read_u32()?;
                EbxValue::CString(self.cstring(offset)?)
            }
            EbxFieldType::Pointer | EbxFieldType::FileRef => EbxValue::Pointer(reader.read_u64()?),
            EbxFieldType::ResourceRef => EbxValue::ResourceRef(reader.read_u64()?),
            EbxFieldType::Sha1 => EbxValue::Raw(reader.read_bytes(20)?.to_vec()),
            other => EbxValue::Unsupported(other),
        };
        Ok(value)
    }

    fn cstring(&self, offset: u32) -> Result<String> {
        if offset as usize >= self.payload.len() {
            return Err(Error::StringOutOfBounds {
                offset,
                len: self.payload.len(),
            });
        }
        let mut reader = BinaryReader::new_at(self.payload, offset as usize);
        Ok(reader.read_cstring()?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_shared_type_descriptors, SharedTypeWriter};
    use gridiron_common::hash::hash_str;
    use pretty_assertions::assert_eq;

    fn table() -> TypeTable {
        let mut w = SharedTypeWriter::new();
        let vec2 = w.add_type("Vec2", EbxFieldType::Struct, 8, 4);
        w.add_field(vec2, "x", EbxFieldType::Float32, 0, 0);
        w.add_field(vec2, "y", EbxFieldType::Float32, 4, 0);

        let base = w.add_type("DataContainer", EbxFieldType::Struct, 4, 4);
        w.add_field(base, "Flags", EbxFieldType::UInt32, 0, 0);

        let player = w.add_type("PlayerAsset", EbxFieldType::Struct, 32, 4);
        w.add_field(player, "$", EbxFieldType::Inherited, 0, base);
        w.add_field(player, "Starter", EbxFieldType::Boolean, 4, 0);
        w.add_field(player, "Position", EbxFieldType::Struct, 8, vec2);
        w.add_field(player, "Name", EbxFieldType::CString, 16, 0);
        w.add_field(player, "Role", EbxFieldType::Enum, 20, 0);
        w.add_field(player, "Callback", EbxFieldType::Delegate, 24, 0);

        TypeTable::from_records(&parse_shared_type_descriptors(&w.build()).unwrap())
    }

    fn payload() -> Vec<u8> {
        let mut p = vec![0u8; 24];
        p[0..4].copy_from_slice(&7u32.to_le_bytes());
        p[4] = 1;
        p[8..12].copy_from_slice(&1.5f32.to_le_bytes());
        p[12..16].copy_from_slice(&(-2.0f32).to_le_bytes());
        p[16..20].copy_from_slice(&24u32.to_le_bytes());
        p[20..24].copy_from_slice(&3i32.to_le_bytes());
        p.extend_from_slice(b"QB1\0");
        p
    }

    #[test]
    fn test_decode_flattens_base_and_nests_structs() {
        let instance = decode_instance(&table(), hash_str("PlayerAsset"), &payload()).unwrap();

        assert_eq!(instance.type_name, "PlayerAsset");
        let names: Vec<_> = instance.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Flags", "Starter", "Position", "Name", "Role", "Callback"]);

        assert_eq!(instance.get("Flags"), Some(&EbxValue::UInt32(7)));
        assert_eq!(instance.get("Starter"), Some(&EbxValue::Bool(true)));
        assert_eq!(instance.get("Name"), Some(&EbxValue::CString("QB1".into())));
        assert_eq!(instance.get("Role"), Some(&EbxValue::Enum(3)));
        assert_eq!(
            instance.get("Callback"),
            Some(&EbxValue::Unsupported(EbxFieldType::Delegate))
        );

        let Some(EbxValue::Struct(position)) = instance.get("Position") else {
            panic!("Position should decode as a struct");
        };
        assert_eq!(position.get("x"), Some(&EbxValue::Float32(1.5)));
        assert_eq!(position.get("y"), Some(&EbxValue::Float32(-2.0)));
    }

    #[test]
    fn test_unknown_type() {
        assert!(matches!(
            decode_instance(&table(), 0xABCD, &payload()),
            Err(Error::UnknownType(0xABCD))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let data = payload();
        assert!(decode_instance(&table(), hash_str("PlayerAsset"), &data[..10]).is_err());
    }

    #[test]
    fn test_string_offset_out_of_bounds() {
        let mut data = payload();
        data[16..20].copy_from_slice(&500u32.to_le_bytes());
        assert!(matches!(
            decode_instance(&table(), hash_str("PlayerAsset"), &data),
            Err(Error::StringOutOfBounds { offset: 500, .. })
        ));
    }

    #[test]
    fn test_bad_class_ref() {
        let mut w = SharedTypeWriter::new();
        let t = w.add_type("Broken", EbxFieldType::Struct, 4, 4);
        w.add_field(t, "Inner", EbxFieldType::Struct, 0, 9);
        let table = TypeTable::from_records(w.records());

        assert!(matches!(
            decode_instance(&table, hash_str("Broken"), &[0; 4]),
            Err(Error::InvalidClassRef { class_ref: 9, count: 1 })
        ));
    }

    #[test]
    fn test_decode_after_merging_reordered_types() {
        let mut first = SharedTypeWriter::new();
        let vec2 = first.add_type("Vec2", EbxFieldType::Struct, 4, 4);
        first.add_field(vec2, "x", EbxFieldType::Float32, 0, 0);
        let player = first.add_type("Player", EbxFieldType::Struct, 4, 4);
        first.add_field(player, "Position", EbxFieldType::Struct, 0, vec2);

        let mut second = SharedTypeWriter::new();
        second.add_type("Extra", EbxFieldType::Struct, 0, 1);
        let vec2 = second.add_type("Vec2", EbxFieldType::Struct, 4, 4);
        second.add_field(vec2, "x", EbxFieldType::Float32, 0, 0);
        let player = second.add_type("Player", EbxFieldType::Struct, 4, 4);
        second.add_field(player, "Position", EbxFieldType::Struct, 0, vec2);

        let payload = 1.5f32.to_le_bytes();
        let alone = TypeTable::from_records(second.records());
        let expected = decode_instance(&alone, hash_str("Player"), &payload).unwrap();

        let mut merged = TypeTable::from_records(first.records());
        merged.merge(TypeTable::from_records(second.records()).into_descriptors());
        let decoded = decode_instance(&merged, hash_str("Player"), &payload).unwrap();
        assert_eq!(decoded, expected);

        let Some(EbxValue::Struct(position)) = decoded.get("Position") else {
            panic!("Position should decode as a struct");
        };
        assert_eq!(position.type_name, "Vec2");
        assert_eq!(position.get("x"), Some(&EbxValue::Float32(1.5)));

        // The flattened table still decodes the same after a cache round trip.
        let rebuilt = TypeTable::from_records(&merged.to_records());
        assert_eq!(decode_instance(&rebuilt, hash_str("Player"), &payload).unwrap(), expected);
    }

    #[test]
    fn test_self_referencing_struct_stops() {
        let mut w = SharedTypeWriter::new();
        let t = w.add_type("Loop", EbxFieldType::Struct, 4, 4);
        w.add_field(t, "Again", EbxFieldType::Struct, 0, t);
        let table = TypeTable::from_records(w.records());

        assert!(matches!(
            decode_instance(&table, hash_str("Loop"), &[0; 4]),
            Err(Error::NestingTooDeep(MAX_NESTING))
        ));
    }
}
