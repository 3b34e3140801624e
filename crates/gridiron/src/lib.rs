//! Gridiron: asset indexing for Madden NFL 22.
//!
//! Madden 22 runs on Frostbite. Its resources live in CAS containers under
//! the install's `Data` and `Patch` partitions, and the type layouts needed to
//! decode them live in an encrypted initfs image. This crate ties the pieces
//! together:
//!
//! - [`GameResourceReader`] scans every container on a worker pool, builds a
//!   case-insensitive [`ResourceIndex`] and caches it as gzip-compressed JSON
//! - [`TypeTablePipeline`] loads shared type descriptors from the initfs, the
//!   type cache, or a running game
//! - [`GameResourceReader::get_resource`] reads one resource back by name with
//!   a single ranged read
//!
//! The lower layers are re-exported as [`cas`], [`toc`], [`ebx`] and [`common`].
//!
//! Logging goes through `tracing`; the library never installs a subscriber.

pub use gridiron_cas as cas;
pub use gridiron_common as common;
pub use gridiron_ebx as ebx;
pub use gridiron_toc as toc;

pub mod cache;
mod error;
pub mod index;
pub mod key;
pub mod progress;
pub mod reader;
pub mod types;

pub use cache::{CacheKind, CacheStore};
pub use error::{Error, Result};
pub use index::{ResourceIndex, TreeNode};
pub use key::KeyStore;
pub use progress::{NoProgress, Progress, ProgressSink};
pub use reader::{GameResourceReader, ReadOptions, ReaderConfig};
pub use types::{
    LaunchPolicy, LiveTypeExtractor, ProcessInspector, ProcessLauncher, TypeReadOptions, TypeTablePipeline,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports.
pub mod prelude {
    pub use crate::cas::{EbxResource, ResourceRecord};
    pub use crate::ebx::{TypeDescriptor, TypeTable};
    pub use crate::{
        GameResourceReader, NoProgress, Progress, ProgressSink, ReadOptions, ReaderConfig, ResourceIndex,
        TypeReadOptions, TypeTablePipeline,
    };
}
