//! Error types for the TOC crate.

use thiserror::Error;

/// Errors that can occur when reading TOC files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gridiron_common::Error),

    /// File shorter than the fixed TOC header.
    #[error("TOC too small: {0} bytes")]
    TooSmall(usize),

    /// Unknown DbObject type byte.
    #[error("unknown DbObject type {kind:#04x} at offset {offset}")]
    UnknownType { kind: u8, offset: usize },

    /// Container size runs past its parent.
    #[error("DbObject size {size} at offset {offset} exceeds the enclosing data")]
    SizeOutOfBounds { size: u64, offset: usize },

    /// Lists and objects nested deeper than the reader follows.
    #[error("DbObject nesting exceeds {max} levels at offset {offset}")]
    NestingTooDeep { max: usize, offset: usize },

    /// The outer TOC has no encrypted blob.
    #[error("TOC has no encrypted payload")]
    MissingPayload,

    /// The decrypted TOC does not have the expected shape.
    #[error("unexpected TOC layout: {0}")]
    Layout(&'static str),

    /// Decryption error.
    #[error("decryption error: {0}")]
    Decryption(String),
}

impl Error {
    /// Whether this error means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type for TOC operations.
pub type Result<T> = std::result::Result<T, Error>;
