//! Type descriptors and the resident type table.
//!
//! Descriptors arrive as [`TypeDescriptorRecord`]s, the flat shape read from
//! `SharedTypeDescriptors.ebx`, from the type cache, or from a live process.
//! [`TypeTable::from_records`] is the one routine that turns records into
//! resident [`TypeDescriptor`]s, whatever their source.

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use gridiron_common::FbGuid;

use crate::EbxFieldType;

type FxHashMap<K, V> = FastHashMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Persisted shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name_hash: u32,
    pub offset: u32,
    pub raw_type: u16,
    pub class_ref: u16,
    pub name: String,
}

/// Persisted shape of a type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptorRecord {
    pub name_hash: u32,
    pub alignment: u8,
    pub kind: u16,
    pub size: u32,
    pub header_size: u16,
    pub class_guid: FbGuid,
    pub type_info_guid: FbGuid,
    pub name: String,
    pub fields: Vec<FieldRecord>,
}

/// A field of a resident type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name_hash: u32,
    /// Byte offset inside the owning instance.
    pub offset: u32,
    pub raw_type: u16,
    /// Index into the descriptor list this field was read from.
    pub class_ref: u16,
    pub name: String,
    /// Kind decoded from `raw_type`.
    pub field_type: EbxFieldType,
    /// Name hash of the struct or base type `class_ref` pointed at.
    ///
    /// Positions shift when tables merge; hashes do not.
    pub class_hash: Option<u32>,
}

/// A resident type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name_hash: u32,
    pub alignment: u8,
    pub kind: u16,
    pub size: u32,
    pub header_size: u16,
    pub class_guid: FbGuid,
    pub type_info_guid: FbGuid,
    pub name: String,
    pub fields: Vec<Field>,
}

impl Field {
    fn from_record(record: &FieldRecord, source: &[TypeDescriptorRecord]) -> Self {
        let field_type = EbxFieldType::from_flags(record.raw_type);
        let class_hash = match field_type {
            EbxFieldType::Struct | EbxFieldType::Inherited => {
                source.get(record.class_ref as usize).map(|ty| ty.name_hash)
            }
            _ => None,
        };
        Self {
            name_hash: record.name_hash,
            offset: record.offset,
            raw_type: record.raw_type,
            class_ref: record.class_ref,
            name: record.name.clone(),
            field_type,
            class_hash,
        }
    }

    fn to_record(&self) -> FieldRecord {
        FieldRecord {
            name_hash: self.name_hash,
            offset: self.offset,
            raw_type: self.raw_type,
            class_ref: self.class_ref,
            name: self.name.clone(),
        }
    }
}

impl TypeDescriptor {
    /// Rebuild a resident descriptor from its persisted shape.
    ///
    /// `source` is the list `record` came from; field `class_ref`s index into it.
    pub fn from_record(record: &TypeDescriptorRecord, source: &[TypeDescriptorRecord]) -> Self {
        Self {
            name_hash: record.name_hash,
            alignment: record.alignment,
            kind: record.kind,
            size: record.size,
            header_size: record.header_size,
            class_guid: record.class_guid,
            type_info_guid: record.type_info_guid,
            name: record.name.clone(),
            fields: record.fields.iter().map(|f| Field::from_record(f, source)).collect(),
        }
    }

    /// Flatten back into the persisted shape.
    pub fn to_record(&self) -> TypeDescriptorRecord {
        TypeDescriptorRecord {
            name_hash: self.name_hash,
            alignment: self.alignment,
            kind: self.kind,
            size: self.size,
            header_size: self.header_size,
            class_guid: self.class_guid,
            type_info_guid: self.type_info_guid,
            name: self.name.clone(),
            fields: self.fields.iter().map(Field::to_record).collect(),
        }
    }

    /// Kind of this type (struct, enum, primitive, ...).
    #[inline]
    pub fn category(&self) -> EbxFieldType {
        EbxFieldType::from_flags(self.kind)
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Ordered type descriptors keyed by name hash.
///
/// Order is insertion order. Struct and base references are held by name
/// hash, so merging a list with a different order keeps them pointing at the
/// right type.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: Vec<TypeDescriptor>,
    by_hash: FxHashMap<u32, usize>,
    by_name: FxHashMap<String, usize>,
}

impl TypeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from persisted records.
    ///
    /// Records with a name seen earlier replace the earlier descriptor in place.
    pub fn from_records(records: &[TypeDescriptorRecord]) -> Self {
        let mut table = Self::new();
        table.merge(records.iter().map(|r| TypeDescriptor::from_record(r, records)));
        table
    }

    /// Merge descriptors by name. A descriptor whose name is already present
    /// replaces the resident one and keeps its position; new names are appended.
    pub fn merge<I>(&mut self, descriptors: I)
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        for descriptor in descriptors {
            match self.by_name.get(&descriptor.name).copied() {
                Some(index) => {
                    let old_hash = self.types[index].name_hash;
                    if self.by_hash.get(&old_hash) == Some(&index) {
                        self.by_hash.remove(&old_hash);
                    }
                    self.by_hash.insert(descriptor.name_hash, index);
                    self.types[index] = descriptor;
                }
                None => {
                    let index = self.types.len();
                    self.by_hash.insert(descriptor.name_hash, index);
                    self.by_name.insert(descriptor.name.clone(), index);
                    self.types.push(descriptor);
                }
            }
        }
    }

    /// Look up a type by name hash.
    #[inline]
    pub fn get(&self, name_hash: u32) -> Option<&TypeDescriptor> {
        self.by_hash.get(&name_hash).map(|&i| &self.types[i])
    }

    /// Look up a type by name.
    #[inline]
    pub fn get_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Look up a type by position.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&TypeDescriptor> {
        self.types.get(index)
    }

    /// Number of resident types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate types in table order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.types.iter()
    }

    /// Number of distinct hashes in the lookup index.
    #[inline]
    pub fn hash_count(&self) -> usize {
        self.by_hash.len()
    }

    /// Consume the table, yielding descriptors in table order.
    pub fn into_descriptors(self) -> impl Iterator<Item = TypeDescriptor> {
        self.types.into_iter()
    }

    /// Flatten the table for persistence, in table order.
    ///
    /// Resolved `class_ref`s are rewritten to positions in this table.
    pub fn to_records(&self) -> Vec<TypeDescriptorRecord> {
        self.types
            .iter()
            .map(|ty| {
                let mut record = ty.to_record();
                for (field, out) in ty.fields.iter().zip(&mut record.fields) {
                    let position = field
                        .class_hash
                        .and_then(|hash| self.by_hash.get(&hash))
                        .and_then(|&index| u16::try_from(index).ok());
                    if let Some(position) = position {
                        out.class_ref = position;
                    }
                }
                record
            })
            .collect()
    }
}
