//! Persisted initfs decryption key.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::{Error, Result};

/// Key file name inside the cache directory.
pub const KEY_FILE_NAME: &str = "m22.key";
/// Length of an AES-128 key.
pub const KEY_LEN: usize = 16;

/// Reads and writes `m22.key`.
///
/// The file may hold more than 16 bytes; only the first 16 are the key.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(KEY_FILE_NAME)
    }

    /// Write the key bytes as given.
    pub fn save(&self, key: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(), key)?;
        debug!(path = %self.path().display(), "key saved");
        Ok(())
    }

    /// Load the stored key, or `None` when no key file exists.
    pub fn load(&self) -> Result<Option<[u8; KEY_LEN]>> {
        let path = self.path();
        match fs::read(&path) {
            Ok(bytes) => key_from_bytes(&bytes).map(Some).map_err(|_| {
                Error::Configuration(format!(
                    "stored key at {} is shorter than {KEY_LEN} bytes",
                    path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// First 16 bytes of `bytes` as a key.
pub(crate) fn key_from_bytes(bytes: &[u8]) -> std::result::Result<[u8; KEY_LEN], usize> {
    bytes
        .get(..KEY_LEN)
        .and_then(|k| <[u8; KEY_LEN]>::try_from(k).ok())
        .ok_or(bytes.len())
}
