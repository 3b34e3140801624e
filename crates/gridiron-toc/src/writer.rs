//! DbObject encoder and initfs builder.
//!
//! Available to tests and behind the `test-util` feature.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::dbobject::{DbObject, DbValue, ANONYMOUS};
use crate::{crypto, INITFS_HEADER_SIZE};

/// Encodes DbObject values.
///
/// Produces exactly what [`read_value`](crate::read_value) consumes.
#[derive(Debug, Default)]
pub struct DbObjectWriter {
    out: Vec<u8>,
}

impl DbObjectWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a single anonymous value.
    pub fn encode(value: &DbValue) -> Vec<u8> {
        let mut writer = Self::new();
        writer.write_value(None, value);
        writer.into_inner()
    }

    /// Append a value, named or anonymous.
    pub fn write_value(&mut self, name: Option<&str>, value: &DbValue) {
        match name {
            Some(name) => {
                self.out.push(value.kind());
                self.out.extend_from_slice(name.as_bytes());
                self.out.push(0);
            }
            None => self.out.push(value.kind() | ANONYMOUS),
        }

        // Writes into a Vec cannot fail.
        match value {
            DbValue::List(items) => {
                let mut inner = Self::new();
                for item in items {
                    inner.write_value(None, item);
                }
                self.write_container(inner);
            }
            DbValue::Object(object) => {
                let mut inner = Self::new();
                inner.write_fields(object);
                self.write_container(inner);
            }
            DbValue::Bool(v) => self.out.push(u8::from(*v)),
            DbValue::String(s) => {
                write_var_u64(&mut self.out, s.len() as u64 + 1);
                self.out.extend_from_slice(s.as_bytes());
                self.out.push(0);
            }
            DbValue::Int32(v) => {
                let _ = self.out.write_i32::<LittleEndian>(*v);
            }
            DbValue::Int64(v) => {
                let _ = self.out.write_i64::<LittleEndian>(*v);
            }
            DbValue::Float32(v) => {
                let _ = self.out.write_f32::<LittleEndian>(*v);
            }
            DbValue::Float64(v) => {
                let _ = self.out.write_f64::<LittleEndian>(*v);
            }
            DbValue::Guid(g) => self.out.extend_from_slice(g.as_bytes()),
            DbValue::Sha1(h) => self.out.extend_from_slice(h),
            DbValue::Blob(b) => {
                write_var_u64(&mut self.out, b.len() as u64);
                self.out.extend_from_slice(b);
            }
        }
    }

    fn write_fields(&mut self, object: &DbObject) {
        for (name, value) in object.fields() {
            self.write_value(Some(name), value);
        }
    }

    fn write_container(&mut self, mut inner: Self) {
        inner.out.push(0);
        write_var_u64(&mut self.out, inner.out.len() as u64);
        self.out.extend_from_slice(&inner.out);
    }

    /// Take the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}

pub(crate) fn write_var_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Encode a TOC file: zeroed header followed by the root value.
pub fn encode_toc(root: &DbValue) -> Vec<u8> {
    let mut out = vec![0u8; INITFS_HEADER_SIZE];
    out.extend_from_slice(&DbObjectWriter::encode(root));
    out
}

/// Build an encrypted `initfs_Win32` image holding the given files.
///
/// The inner TOC is a list of `{ "$file": { name, payload } }` objects,
/// encrypted with AES-128-CBC (key as IV) and stored in the `encrypted`
/// blob of the outer root object.
pub fn build_initfs(files: &[(&str, &[u8])], key: &[u8; 16]) -> Vec<u8> {
    let entries = files
        .iter()
        .map(|(name, payload)| {
            let file = DbObject::new()
                .with("name", DbValue::String((*name).to_string()))
                .with("payload", DbValue::Blob(payload.to_vec()));
            DbValue::Object(DbObject::new().with("$file", DbValue::Object(file)))
        })
        .collect();

    let inner = DbObjectWriter::encode(&DbValue::List(entries));
    let encrypted = crypto::encrypt(&inner, key);
    encode_toc(&DbValue::Object(
        DbObject::new().with("encrypted", DbValue::Blob(encrypted)),
    ))
}
