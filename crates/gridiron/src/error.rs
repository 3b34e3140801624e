//! Error types for the Gridiron facade.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheKind;

/// Errors returned by the reader and the type pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory argument or resident state is missing. Raised before I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No resource with this name in the index.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The cache file does not exist.
    #[error("{kind} cache not found at {}", path.display())]
    CacheNotFound { kind: CacheKind, path: PathBuf },

    /// The cache file exists but cannot be decoded.
    #[error("{kind} cache at {} is corrupt: {reason}", path.display())]
    CacheCorrupt {
        kind: CacheKind,
        path: PathBuf,
        reason: String,
    },

    /// Neither initfs holds the shared type descriptors and no live fallback is set.
    #[error("shared type descriptors not found in any initfs")]
    TypeTableNotFound,

    /// The game process did not start in time.
    #[error("timed out waiting for {process} after {attempts} attempts")]
    ProcessTimeout { process: String, attempts: u32 },

    /// Process launch or memory inspection failed.
    #[error("process inspection failed: {0:#}")]
    Inspection(anyhow::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container error.
    #[error("{0}")]
    Cas(#[from] gridiron_cas::Error),

    /// TOC or initfs error.
    #[error("{0}")]
    Toc(#[from] gridiron_toc::Error),

    /// EBX or type descriptor error.
    #[error("{0}")]
    Ebx(#[from] gridiron_ebx::Error),
}

/// Result type for Gridiron operations.
pub type Result<T> = std::result::Result<T, Error>;
