//! Common utilities for Gridiron.
//!
//! This crate provides foundational types and utilities used across all Gridiron crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`FbGuid`] - Frostbite's 16-byte GUID
//! - [`hash`] - Frostbite string hashing used for type and field name keys

mod error;
mod guid;
mod reader;

pub mod hash;

pub use error::{Error, Result};
pub use guid::FbGuid;
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
