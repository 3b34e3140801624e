//! DbObject binary object notation.
//!
//! Every value starts with a type byte. The low five bits select the type;
//! bit 7 marks an anonymous value, otherwise a null-terminated name follows.
//! Lists and objects carry a LEB128 byte size and end with a `0x00` byte.
//!
//! | Type | Value |
//! |------|-------|
//! | 0x01 | list |
//! | 0x02 | object |
//! | 0x06 | bool (u8) |
//! | 0x07 | string (LEB128 length, bytes, trailing null) |
//! | 0x08 | int32 |
//! | 0x09 | int64 |
//! | 0x0B | float32 |
//! | 0x0C | float64 |
//! | 0x0F | guid |
//! | 0x10 | sha1 |
//! | 0x13 | blob (LEB128 length, bytes) |

use gridiron_common::{BinaryReader, FbGuid};

use crate::{Error, Result};

/// Deepest list/object nesting [`read_value`] follows.
pub const MAX_DEPTH: usize = 64;

pub(crate) const ANONYMOUS: u8 = 0x80;
pub(crate) const TYPE_MASK: u8 = 0x1F;

/// Type codes.
pub mod kind {
    pub const LIST: u8 = 0x01;
    pub const OBJECT: u8 = 0x02;
    pub const BOOL: u8 = 0x06;
    pub const STRING: u8 = 0x07;
    pub const INT32: u8 = 0x08;
    pub const INT64: u8 = 0x09;
    pub const FLOAT32: u8 = 0x0B;
    pub const FLOAT64: u8 = 0x0C;
    pub const GUID: u8 = 0x0F;
    pub const SHA1: u8 = 0x10;
    pub const BLOB: u8 = 0x13;
}

/// A DbObject value.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    List(Vec<DbValue>),
    Object(DbObject),
    Bool(bool),
    String(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Guid(FbGuid),
    Sha1([u8; 20]),
    Blob(Vec<u8>),
}

/// An object: named fields in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbObject {
    fields: Vec<(String, DbValue)>,
}

impl DbObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn with(mut self, name: impl Into<String>, value: DbValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Append a field.
    pub fn insert(&mut self, name: impl Into<String>, value: DbValue) {
        self.fields.push((name.into(), value));
    }

    /// First field with the given name.
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// String field by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            DbValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Blob field by name.
    pub fn get_blob(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            DbValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Object field by name.
    pub fn get_object(&self, name: &str) -> Option<&DbObject> {
        match self.get(name)? {
            DbValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// First blob field in stored order.
    pub fn first_blob(&self) -> Option<&[u8]> {
        self.fields.iter().find_map(|(_, v)| match v {
            DbValue::Blob(b) => Some(b.as_slice()),
            _ => None,
        })
    }

    /// Fields in stored order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &DbValue)> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl DbValue {
    /// Borrow as an object.
    pub fn as_object(&self) -> Option<&DbObject> {
        match self {
            DbValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow as a list.
    pub fn as_list(&self) -> Option<&[DbValue]> {
        match self {
            DbValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Type code of this value.
    pub fn kind(&self) -> u8 {
        match self {
            DbValue::List(_) => kind::LIST,
            DbValue::Object(_) => kind::OBJECT,
            DbValue::Bool(_) => kind::BOOL,
            DbValue::String(_) => kind::STRING,
            DbValue::Int32(_) => kind::INT32,
            DbValue::Int64(_) => kind::INT64,
            DbValue::Float32(_) => kind::FLOAT32,
            DbValue::Float64(_) => kind::FLOAT64,
            DbValue::Guid(_) => kind::GUID,
            DbValue::Sha1(_) => kind::SHA1,
            DbValue::Blob(_) => kind::BLOB,
        }
    }
}

/// Read one value. Returns `None` at a terminator byte or end of data.
pub fn read_value(reader: &mut BinaryReader<'_>) -> Result<Option<(Option<String>, DbValue)>> {
    read_nested(reader, 0)
}

fn read_nested(reader: &mut BinaryReader<'_>, depth: usize) -> Result<Option<(Option<String>, DbValue)>> {
    if reader.is_empty() {
        return Ok(None);
    }

    let offset = reader.position();
    let flags = reader.read_u8()?;
    if flags == 0 {
        return Ok(None);
    }

    let name = if flags & ANONYMOUS == 0 {
        Some(reader.read_cstring()?.to_string())
    } else {
        None
    };

    let code = flags & TYPE_MASK;
    if matches!(code, kind::LIST | kind::OBJECT) && depth >= MAX_DEPTH {
        return Err(Error::NestingTooDeep { max: MAX_DEPTH, offset });
    }

    let value = match code {
        kind::LIST => {
            let mut inner = container(reader)?;
            let mut items = Vec::new();
            while let Some((_, item)) = read_nested(&mut inner, depth + 1)? {
                items.push(item);
            }
            DbValue::List(items)
        }
        kind::OBJECT => {
            let mut inner = container(reader)?;
            let mut object = DbObject::new();
            while let Some((field_name, field)) = read_nested(&mut inner, depth + 1)? {
                object.insert(field_name.unwrap_or_default(), field);
            }
            DbValue::Object(object)
        }
        kind::BOOL => DbValue::Bool(reader.read_bool()?),
        kind::STRING => {
            let bytes = sized(reader)?;
            let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
            DbValue::String(
                std::str::from_utf8(bytes)
                    .map_err(gridiron_common::Error::Utf8)?
                    .to_string(),
            )
        }
        kind::INT32 => DbValue::Int32(reader.read_i32()?),
        kind::INT64 => DbValue::Int64(reader.read_i64()?),
        kind::FLOAT32 => DbValue::Float32(reader.read_f32()?),
        kind::FLOAT64 => DbValue::Float64(reader.read_f64()?),
        kind::GUID => DbValue::Guid(reader.read_guid()?),
        kind::SHA1 => DbValue::Sha1(reader.read_array()?),
        kind::BLOB => DbValue::Blob(sized(reader)?.to_vec()),
        other => return Err(Error::UnknownType { kind: other, offset }),
    };

    Ok(Some((name, value)))
}

/// Read a LEB128 size and the bytes it covers.
fn sized<'a>(reader: &mut BinaryReader<'a>) -> Result<&'a [u8]> {
    let offset = reader.position();
    let size = reader.read_var_u64()?;
    if size > reader.remaining() as u64 {
        return Err(Error::SizeOutOfBounds { size, offset });
    }
    Ok(reader.read_bytes(size as usize)?)
}

fn container<'a>(reader: &mut BinaryReader<'a>) -> Result<BinaryReader<'a>> {
    sized(reader).map(BinaryReader::new)
}
