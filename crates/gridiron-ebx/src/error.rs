//! Error types for EBX decoding.

use thiserror::Error;

/// Errors that can occur when decoding EBX partitions or type descriptors.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gridiron_common::Error),

    /// Header size field does not fit the partition.
    #[error("invalid EBX header size {header_size} (partition is {len} bytes)")]
    InvalidHeaderSize { header_size: u32, len: usize },

    /// Type hash not present in the type table.
    #[error("unknown type hash {0:#010x}")]
    UnknownType(u32),

    /// Class reference index outside the type table.
    #[error("class reference {class_ref} out of range (table has {count} types)")]
    InvalidClassRef { class_ref: u16, count: usize },

    /// Nested structs deeper than the decoder allows.
    #[error("struct nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    /// String offset outside the instance payload.
    #[error("string offset {offset} out of bounds (payload is {len} bytes)")]
    StringOutOfBounds { offset: u32, len: usize },
}

/// Result type for EBX operations.
pub type Result<T> = std::result::Result<T, Error>;
