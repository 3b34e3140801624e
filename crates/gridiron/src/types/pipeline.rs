use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use gridiron_cas::InstallLayout;
use gridiron_ebx::{parse_shared_type_descriptors, TypeDescriptorRecord, TypeTable, SHARED_TYPE_DESCRIPTORS};
use gridiron_toc::InitFs;

use crate::cache::{CacheKind, CacheStore};
use crate::key::{key_from_bytes, KeyStore, KEY_LEN};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::types::live::LiveTypeExtractor;
use crate::{Error, Result};

/// Options for [`TypeTablePipeline::read`].
#[derive(Debug, Clone, Default)]
pub struct TypeReadOptions {
    /// initfs key. Falls back to the stored key.
    pub key: Option<Vec<u8>>,
    /// Always read the game files and rewrite the type cache.
    pub build_cache: bool,
}

/// Opens and decrypts an initfs image.
pub trait TocLoader: Send + Sync {
    fn load(&self, path: &Path, key: &[u8; KEY_LEN]) -> gridiron_toc::Result<InitFs>;
}

/// Memory-maps the image from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitFsLoader;

impl TocLoader for InitFsLoader {
    fn load(&self, path: &Path, key: &[u8; KEY_LEN]) -> gridiron_toc::Result<InitFs> {
        InitFs::open(path, key)
    }
}

/// Builds the resident [`TypeTable`] from the initfs, the type cache, or a
/// live process.
pub struct TypeTablePipeline {
    exe_path: PathBuf,
    layout: InstallLayout,
    cache: CacheStore,
    keys: KeyStore,
    loader: Box<dyn TocLoader>,
    live: Option<LiveTypeExtractor>,
    table: Arc<TypeTable>,
}

impl TypeTablePipeline {
    pub fn new<P: Into<PathBuf>, C: Into<PathBuf>>(exe_path: P, cache_dir: C) -> Self {
        let exe_path = exe_path.into();
        let cache_dir = cache_dir.into();
        Self {
            layout: InstallLayout::from_exe(&exe_path),
            exe_path,
            cache: CacheStore::new(cache_dir.clone()),
            keys: KeyStore::new(cache_dir),
            loader: Box::new(InitFsLoader),
            live: None,
            table: Arc::new(TypeTable::new()),
        }
    }

    pub fn with_loader<L: TocLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Fall back to a live process when no initfs has the descriptors.
    pub fn with_live(mut self, live: LiveTypeExtractor) -> Self {
        self.live = Some(live);
        self
    }

    /// The resident table.
    pub fn table(&self) -> Arc<TypeTable> {
        self.table.clone()
    }

    /// Read the shared type descriptors and merge them into the resident table.
    ///
    /// Without `build_cache` the type cache is tried first. A missing key is
    /// rejected before any file is touched.
    pub fn read(&mut self, options: &TypeReadOptions, progress: &mut dyn ProgressSink) -> Result<Arc<TypeTable>> {
        let key = self.resolve_key(options.key.as_deref())?;
        let mut tracker = ProgressTracker::new(1);

        if !options.build_cache {
            match self.cache.load::<Vec<TypeDescriptorRecord>>(CacheKind::Types) {
                Ok(records) => {
                    tracker.emit(progress, "Cache found.");
                    return Ok(self.install(&records));
                }
                Err(Error::CacheNotFound { .. }) => {
                    tracker.emit(progress, "Cache not found. Reading from game files...");
                }
                Err(e) => return Err(e),
            }
        }

        tracker.emit(progress, "Reading shared type descriptors.");
        let (records, decrypted) = self.read_from_game(&key)?;
        tracker.step();
        tracker.emit(progress, "Finished reading shared type descriptors.");

        if options.build_cache {
            tracker.reset();
            tracker.emit(progress, "Starting to build cache.");
            self.cache.save(CacheKind::Types, &records)?;
            tracker.step();
            tracker.emit(progress, "Cache built successfully.");
        }

        if let (Some(supplied), true) = (options.key.as_deref(), decrypted) {
            self.keys.save(supplied)?;
        }

        Ok(self.install(&records))
    }

    /// Rebuild the resident table from the type cache alone.
    pub fn read_from_cache(&mut self) -> Result<Arc<TypeTable>> {
        let records: Vec<TypeDescriptorRecord> = self.cache.load(CacheKind::Types)?;
        Ok(self.install(&records))
    }

    fn resolve_key(&self, supplied: Option<&[u8]>) -> Result<[u8; KEY_LEN]> {
        match supplied {
            Some(bytes) => key_from_bytes(bytes).map_err(|len| {
                Error::Configuration(format!("initfs key must be {KEY_LEN} bytes, got {len}"))
            }),
            None => self.keys.load()?.ok_or_else(|| {
                Error::Configuration("no initfs key supplied and none stored".to_string())
            }),
        }
    }

    /// Patch initfs, then data initfs, then the live process.
    ///
    /// The flag reports whether any initfs decrypted with `key`.
    fn read_from_game(&self, key: &[u8; KEY_LEN]) -> Result<(Vec<TypeDescriptorRecord>, bool)> {
        let mut decrypted = false;

        for candidate in self.layout.initfs_candidates() {
            let initfs = match self.loader.load(&candidate, key) {
                Ok(initfs) => initfs,
                Err(e) if e.is_not_found() => {
                    debug!(path = %candidate.display(), "initfs not present");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            decrypted = true;

            match initfs.find(SHARED_TYPE_DESCRIPTORS) {
                Some(entry) => {
                    let records = parse_shared_type_descriptors(&entry.payload)?;
                    info!(path = %candidate.display(), types = records.len(), "read shared type descriptors");
                    return Ok((records, decrypted));
                }
                None => debug!(path = %candidate.display(), "initfs has no shared type descriptors"),
            }
        }

        match &self.live {
            Some(live) => Ok((live.extract(&self.exe_path)?, decrypted)),
            None => Err(Error::TypeTableNotFound),
        }
    }

    fn install(&mut self, records: &[TypeDescriptorRecord]) -> Arc<TypeTable> {
        let mut table = TypeTable::clone(&self.table);
        table.merge(TypeTable::from_records(records).into_descriptors());
        self.table = Arc::new(table);
        self.table.clone()
    }
}

impl std::fmt::Debug for TypeTablePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeTablePipeline")
            .field("exe_path", &self.exe_path)
            .field("cache", &self.cache)
            .field("types", &self.table.len())
            .finish_non_exhaustive()
    }
}
