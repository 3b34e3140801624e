//! DbObject TOC reader for Frostbite game data.
//!
//! TOC files store a tree of DbObject values after a fixed 556-byte header.
//! The `initfs_Win32` TOC wraps a second, AES-encrypted TOC listing the files
//! the engine loads at boot, among them `SharedTypeDescriptors.ebx`.
//!
//! # Example
//!
//! ```no_run
//! use gridiron_toc::InitFs;
//!
//! let key = *b"0123456789abcdef";
//! let initfs = InitFs::open("Patch/initfs_Win32", &key)?;
//! if let Some(entry) = initfs.find("SharedTypeDescriptors.ebx") {
//!     println!("{} bytes", entry.payload.len());
//! }
//! # Ok::<(), gridiron_toc::Error>(())
//! ```
//!
//! The `test-util` feature exposes the DbObject encoder and `build_initfs`.

pub mod crypto;
mod dbobject;
mod error;
mod initfs;
#[cfg(any(test, feature = "test-util"))]
mod writer;

pub use dbobject::{kind, read_value, DbObject, DbValue};
pub use error::{Error, Result};
pub use initfs::{InitFs, InitFsEntry, TocFile, INITFS_HEADER_SIZE};
#[cfg(any(test, feature = "test-util"))]
pub use writer::{build_initfs, encode_toc, DbObjectWriter};
