//! Error types for the CAS crate.

use thiserror::Error;

/// Errors that can occur when scanning or reading CAS containers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gridiron_common::Error),

    /// EBX decoding error.
    #[error("{0}")]
    Ebx(#[from] gridiron_ebx::Error),

    /// A block or range ends before its declared size.
    #[error("truncated data at offset {offset}: needed {needed} bytes, got {available}")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Block codec this crate cannot decode.
    #[error("unsupported codec {0:#04x}")]
    UnsupportedCodec(u8),

    /// Block payload does not fit the header's size fields.
    #[error("block payload of {0} bytes is too large")]
    BlockTooLarge(usize),

    /// A ranged read did not produce a resource.
    #[error("no resource decoded at offset {offset:#x}")]
    NoResource { offset: u64 },

    /// A file name in the install layout does not follow the naming scheme.
    #[error("invalid layout entry name: {0}")]
    InvalidName(String),

    /// Pool workers stopped before answering every job.
    #[error("decode worker lost: {missing} of {submitted} jobs unanswered")]
    WorkerLost { missing: usize, submitted: usize },

    /// Submission after every worker has exited.
    #[error("decode pool is closed")]
    PoolClosed,
}

/// Result type for CAS operations.
pub type Result<T> = std::result::Result<T, Error>;
