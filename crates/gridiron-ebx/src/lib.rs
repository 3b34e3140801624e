//! EBX partition decoding for Frostbite game data.
//!
//! An EBX partition is the serialized form of one game resource. This crate
//! reads the partition header (identity and name), decodes the instance
//! payload into typed fields when a [`TypeTable`] is available, and reads the
//! `SharedTypeDescriptors.ebx` payload that fills that table.
//!
//! # Example
//!
//! ```
//! use gridiron_ebx::EbxHeader;
//!
//! let mut partition = b"EBXD".to_vec();
//! partition.extend_from_slice(&0x28u32.to_le_bytes()); // header size
//! partition.extend_from_slice(&[0; 16]); // partition GUID
//! partition.extend_from_slice(&0u32.to_le_bytes()); // root type hash
//! partition.extend_from_slice(&7u16.to_le_bytes());
//! partition.extend_from_slice(b"Sound/X");
//! partition.resize(0x28, 0);
//! partition.extend_from_slice(&[1, 2, 3]);
//!
//! let header = EbxHeader::parse(&partition)?;
//! assert_eq!(header.name, "Sound/X");
//! assert_eq!(header.payload(&partition), &[1, 2, 3]);
//! # Ok::<(), gridiron_ebx::Error>(())
//! ```
//!
//! The `test-util` feature exposes `EbxBuilder` and `SharedTypeWriter` for
//! authoring fixtures.

#[cfg(any(test, feature = "test-util"))]
mod builder;
mod error;
mod field;
mod header;
mod instance;
mod shared;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub use builder::{EbxBuilder, SharedTypeWriter};
pub use error::{Error, Result};
pub use field::EbxFieldType;
pub use header::EbxHeader;
pub use instance::{decode_instance, EbxField, EbxInstance, EbxValue};
pub use shared::{parse_shared_type_descriptors, SHARED_TYPE_DESCRIPTORS};
pub use types::{Field, FieldRecord, TypeDescriptor, TypeDescriptorRecord, TypeTable};
