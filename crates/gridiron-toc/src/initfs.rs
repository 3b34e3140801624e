//! TOC files and the encrypted `initfs_Win32` image.

use std::fs::File;
use std::path::Path;

use gridiron_common::BinaryReader;
use memmap2::Mmap;
use tracing::debug;

use crate::dbobject::{read_value, DbValue};
use crate::{crypto, Error, Result};

/// Size of the fixed header in front of every TOC root.
///
/// Decrypted initfs payloads are parsed after prepending this many zero bytes.
pub const INITFS_HEADER_SIZE: usize = 0x22C;

/// A parsed TOC file.
#[derive(Debug, Clone, PartialEq)]
pub struct TocFile {
    pub root: DbValue,
}

impl TocFile {
    /// Parse a TOC, skipping its fixed header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() <= INITFS_HEADER_SIZE {
            return Err(Error::TooSmall(data.len()));
        }
        let mut reader = BinaryReader::new_at(data, INITFS_HEADER_SIZE);
        match read_value(&mut reader)? {
            Some((_, root)) => Ok(Self { root }),
            None => Err(Error::Layout("empty root")),
        }
    }

    /// Memory-map and parse a TOC file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse(&mmap)
    }

    /// The encrypted payload: the `encrypted` blob of the root object,
    /// otherwise its first blob field.
    pub fn encrypted_payload(&self) -> Option<&[u8]> {
        let root = self.root.as_object()?;
        root.get_blob("encrypted").or_else(|| root.first_blob())
    }
}

/// One `$file` entry of a decrypted initfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFsEntry {
    pub name: String,
    pub payload: Vec<u8>,
}

/// The decrypted file list of an `initfs_Win32` image.
#[derive(Debug, Clone, Default)]
pub struct InitFs {
    entries: Vec<InitFsEntry>,
}

impl InitFs {
    /// Open, decrypt and parse an initfs image.
    pub fn open<P: AsRef<Path>>(path: P, key: &[u8; 16]) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading initfs");
        let outer = TocFile::open(path)?;
        Self::from_outer(&outer, key)
    }

    /// Decrypt and parse an initfs image held in memory.
    pub fn from_bytes(data: &[u8], key: &[u8; 16]) -> Result<Self> {
        Self::from_outer(&TocFile::parse(data)?, key)
    }

    fn from_outer(outer: &TocFile, key: &[u8; 16]) -> Result<Self> {
        let encrypted = outer.encrypted_payload().ok_or(Error::MissingPayload)?;
        let plain = crypto::decrypt(encrypted, key)?;

        let mut inner = vec![0u8; INITFS_HEADER_SIZE];
        inner.extend_from_slice(&plain);
        let toc = TocFile::parse(&inner)?;

        let list = toc.root.as_list().ok_or(Error::Layout("root is not a list"))?;
        let entries = list
            .iter()
            .filter_map(|item| {
                let file = item.as_object()?.get_object("$file")?;
                Some(InitFsEntry {
                    name: file.get_str("name")?.to_string(),
                    payload: file.get_blob("payload")?.to_vec(),
                })
            })
            .collect::<Vec<_>>();

        debug!(entries = entries.len(), "decrypted initfs");
        Ok(Self { entries })
    }

    /// Find an entry by exact name.
    pub fn find(&self, name: &str) -> Option<&InitFsEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries in stored order.
    pub fn entries(&self) -> &[InitFsEntry] {
        &self.entries
    }
}
