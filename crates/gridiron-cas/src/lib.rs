//! CAS container reader for Frostbite game data.
//!
//! CAS files are the bulk storage of a Frostbite install: long runs of
//! compressed blocks, grouped into chunks that each hold one resource. This
//! crate:
//!
//! - finds every container of an install ([`scan_install`])
//! - streams a container into [`Chunk`]s ([`CasBlockReader`])
//! - decodes chunks into [`ResourceRecord`]s, inline or on a [`DecodePool`]
//! - reads one resource back by byte range ([`read_range`])
//!
//! Zstandard and zlib blocks are decoded; LZ4 and Oodle are recognised but
//! chunks using them yield no resource.
//!
//! The `test-util` feature exposes `BlockWriter` for authoring containers.
//!
//! # Example
//!
//! ```no_run
//! use gridiron_cas::{read_range, scan_install, ByteRange, CasBlockReader, ReadOptions};
//!
//! for container in scan_install("C:/Games/Madden NFL 22/Madden22.exe")? {
//!     let resources = CasBlockReader::open(&container.path)?.read_all(None, &ReadOptions::default())?;
//!     println!("{}: {} resources", container.relative_path, resources.len());
//! }
//! # Ok::<(), gridiron_cas::Error>(())
//! ```

pub mod block;
mod chunk;
mod decode;
pub mod decompress;
mod error;
pub mod layout;
mod pool;
mod stream;
#[cfg(any(test, feature = "test-util"))]
mod writer;

pub use block::{Block, BlockHeader, Codec};
pub use chunk::Chunk;
pub use decode::{decode_chunk, decompress_chunk, ResourceRecord};
pub use error::{Error, Result};
pub use layout::{scan_install, ContainerDescriptor, InstallLayout, PackageId};
pub use pool::{DecodeJob, DecodePool};
pub use stream::{
    parse_blocks, read_range, ByteRange, CasBlockReader, Chunks, EbxResource, ExportOptions,
    ReadOptions,
};
#[cfg(any(test, feature = "test-util"))]
pub use writer::BlockWriter;
