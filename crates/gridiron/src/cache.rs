//! Gzip-compressed JSON caches.
//!
//! Each cache kind is one file in the cache directory. Files are opened and
//! closed per call. A save writes a temporary file next to the target and
//! renames it into place, so readers never see a partial cache.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Result};

/// What a cache file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// The resource index.
    Index,
    /// Shared type descriptors.
    Types,
}

impl CacheKind {
    /// File name inside the cache directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Index => "m22.cache",
            Self::Types => "m22.types",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str("index"),
            Self::Types => f.write_str("types"),
        }
    }
}

/// Cache files in one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: CacheKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn exists(&self, kind: CacheKind) -> bool {
        self.path(kind).is_file()
    }

    /// Serialize, compress and atomically replace the cache file.
    pub fn save<T: Serialize + ?Sized>(&self, kind: CacheKind, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path(kind);

        let temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            let mut encoder = GzEncoder::new(BufWriter::new(temp.as_file()), Compression::default());
            serde_json::to_writer(&mut encoder, value).map_err(std::io::Error::from)?;
            encoder.finish()?.flush()?;
        }
        temp.persist(&target).map_err(|e| e.error)?;

        info!(kind = %kind, path = %target.display(), "cache written");
        Ok(())
    }

    /// Read, decompress and deserialize a cache file.
    ///
    /// A missing file is [`Error::CacheNotFound`]; anything that fails to
    /// decode is [`Error::CacheCorrupt`].
    pub fn load<T: DeserializeOwned>(&self, kind: CacheKind) -> Result<T> {
        let path = self.path(kind);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(kind = %kind, path = %path.display(), "cache miss");
                return Err(Error::CacheNotFound { kind, path });
            }
            Err(e) => return Err(e.into()),
        };

        let decoder = GzDecoder::new(BufReader::new(file));
        match serde_json::from_reader(decoder) {
            Ok(value) => {
                debug!(kind = %kind, path = %path.display(), "cache loaded");
                Ok(value)
            }
            Err(e) => Err(Error::CacheCorrupt {
                kind,
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Delete a cache file. Missing files are fine.
    pub fn invalidate(&self, kind: CacheKind) -> Result<()> {
        match fs::remove_file(self.path(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
