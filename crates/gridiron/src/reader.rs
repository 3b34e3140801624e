//! Game resource reader.
//!
//! Scans every container of an install into a [`ResourceIndex`], caches it,
//! and reads single resources back by name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use gridiron_cas::{
    read_range, ByteRange, CasBlockReader, DecodePool, EbxResource, ExportOptions, InstallLayout, ResourceRecord,
};
use gridiron_ebx::TypeTable;

use crate::cache::{CacheKind, CacheStore};
use crate::index::ResourceIndex;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::types::{TypeReadOptions, TypeTablePipeline};
use crate::{Error, Result};

/// Where caches live and how hard to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub cache_dir: PathBuf,
    /// Decode worker threads.
    pub workers: usize,
    /// Chunks queued ahead of the workers.
    pub queue_depth: usize,
}

impl ReaderConfig {
    /// One worker per available core, four queued chunks per worker.
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            cache_dir: cache_dir.into(),
            workers,
            queue_depth: workers * 4,
        }
    }
}

/// Options for [`GameResourceReader::read`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Path of the game executable. Containers are found relative to it.
    pub path: Option<PathBuf>,
    /// Scan the game files and rewrite the index cache.
    pub build_cache: bool,
}

/// Indexes an install and reads resources out of it.
///
/// ```no_run
/// use gridiron::{GameResourceReader, NoProgress, ReadOptions, ReaderConfig};
///
/// let mut reader = GameResourceReader::new(ReaderConfig::new("cache"));
/// let options = ReadOptions {
///     path: Some("C:/Games/Madden NFL 22/Madden22.exe".into()),
///     build_cache: true,
/// };
/// reader.read(&options, &mut NoProgress)?;
/// let bytes = reader.get_resource_data("sound/x")?;
/// # Ok::<(), gridiron::Error>(())
/// ```
#[derive(Debug)]
pub struct GameResourceReader {
    config: ReaderConfig,
    cache: CacheStore,
    exe_path: Option<PathBuf>,
    index: Option<Arc<ResourceIndex>>,
    types: Option<Arc<TypeTable>>,
}

impl GameResourceReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            cache: CacheStore::new(config.cache_dir.clone()),
            config,
            exe_path: None,
            index: None,
            types: None,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Load the resource index.
    ///
    /// - `build_cache` set: scan the install and rewrite the cache.
    /// - otherwise: use the cache; when there is none, scan the install
    ///   without saving.
    ///
    /// Without a path only the cache can be used, and a missing cache is a
    /// configuration error.
    pub fn read(&mut self, options: &ReadOptions, progress: &mut dyn ProgressSink) -> Result<Arc<ResourceIndex>> {
        let mut tracker = ProgressTracker::new(1);

        let records = match (&options.path, options.build_cache) {
            (None, true) => {
                return Err(Error::Configuration(
                    "building the cache needs the game executable path".to_string(),
                ));
            }
            (None, false) => match self.cache.load::<Vec<ResourceRecord>>(CacheKind::Index) {
                Ok(records) => {
                    tracker.emit(progress, "Cache found.");
                    records
                }
                Err(Error::CacheNotFound { .. }) => {
                    return Err(Error::Configuration(
                        "no cached index and no game executable path".to_string(),
                    ));
                }
                Err(e) => return Err(e),
            },
            (Some(exe), true) => self.scan(exe, true, &mut tracker, progress)?,
            (Some(exe), false) => {
                match self.cache.load::<Vec<ResourceRecord>>(CacheKind::Index) {
                    Ok(records) => {
                        tracker.emit(progress, "Cache found.");
                        records
                    }
                    Err(Error::CacheNotFound { .. }) => {
                        tracker.emit(progress, "Cache not found. Reading from game files...");
                        self.scan(exe, false, &mut tracker, progress)?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let index = Arc::new(ResourceIndex::from_records(records));
        info!(resources = index.len(), "resource index ready");
        if let Some(exe) = &options.path {
            self.exe_path = Some(exe.clone());
        }
        self.index = Some(index.clone());
        Ok(index)
    }

    fn scan(
        &self,
        exe: &Path,
        build_cache: bool,
        tracker: &mut ProgressTracker,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ResourceRecord>> {
        let containers = InstallLayout::from_exe(exe).scan()?;
        let total = containers.len();
        tracker.set_total(total);
        info!(containers = total, workers = self.config.workers, "scanning containers");

        let mut pool = DecodePool::new(self.config.workers, self.config.queue_depth)?;
        for (i, container) in containers.iter().enumerate() {
            tracker.emit(progress, format!("[{}/{}]: Reading {}.", i + 1, total, container.path.display()));

            let file: Arc<str> = Arc::from(container.relative_path.as_str());
            for chunk in CasBlockReader::open(&container.path)?.chunks() {
                pool.submit(chunk?, file.clone())?;
            }
            tracker.step();
        }

        let submitted = pool.submitted();
        let records: Vec<ResourceRecord> = pool.finish()?.into_iter().flatten().collect();
        debug!(chunks = submitted, resources = records.len(), "decoded containers");
        tracker.emit(progress, "Finished reading CAS files.");

        if build_cache {
            tracker.set_total(1);
            tracker.reset();
            tracker.emit(progress, "Starting to build cache.");
            self.cache.save(CacheKind::Index, &records)?;
            tracker.step();
            tracker.emit(progress, "Cache built successfully.");
        }

        Ok(records)
    }

    /// The resident index, once [`read`](Self::read) succeeded.
    pub fn data(&self) -> Option<&ResourceIndex> {
        self.index.as_deref()
    }

    /// The resident type table, if one was set.
    pub fn types(&self) -> Option<&TypeTable> {
        self.types.as_deref()
    }

    pub fn set_types(&mut self, types: Arc<TypeTable>) {
        self.types = Some(types);
    }

    /// Run the type pipeline and keep its table resident.
    pub fn read_types(
        &mut self,
        pipeline: &mut TypeTablePipeline,
        options: &TypeReadOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<Arc<TypeTable>> {
        let table = pipeline.read(options, progress)?;
        self.types = Some(table.clone());
        Ok(table)
    }

    /// Read a resource with its instance payload and decoded fields.
    pub fn get_resource(&self, name: &str) -> Result<EbxResource> {
        let record = self.locate(name)?;
        let types = self.types.as_deref().ok_or_else(|| {
            Error::Configuration("no type table loaded; call read_types() first".to_string())
        })?;

        let options = gridiron_cas::ReadOptions {
            read_ebx_data: true,
            ..Default::default()
        };
        self.read_record(record, Some(types), &options)
    }

    /// Read the whole decompressed stream of a resource.
    pub fn get_resource_data(&self, name: &str) -> Result<Vec<u8>> {
        let record = self.locate(name)?;
        let options = gridiron_cas::ReadOptions {
            export: ExportOptions {
                export: true,
                uncompressed: true,
            },
            ..Default::default()
        };
        Ok(self.read_record(record, None, &options)?.data)
    }

    fn locate(&self, name: &str) -> Result<&ResourceRecord> {
        if name.is_empty() {
            return Err(Error::Configuration("resource name is empty".to_string()));
        }
        let index = self
            .index
            .as_deref()
            .ok_or_else(|| Error::Configuration("no resource index; call read() first".to_string()))?;
        index
            .find(name)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }

    fn read_record(
        &self,
        record: &ResourceRecord,
        types: Option<&TypeTable>,
        options: &gridiron_cas::ReadOptions,
    ) -> Result<EbxResource> {
        let exe = self.exe_path.as_deref().ok_or_else(|| {
            Error::Configuration("index was loaded without a game executable path".to_string())
        })?;
        let path = InstallLayout::from_exe(exe).resolve(&record.file);
        let range = ByteRange {
            offset: record.offset,
            size: record.size,
        };
        debug!(name = %record.name, path = %path.display(), offset = record.offset, "reading resource");
        Ok(read_range(path, range, types, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::new("cache");
        assert!(config.workers >= 1);
        assert_eq!(config.queue_depth, config.workers * 4);
    }

    #[test]
    fn test_missing_path_and_cache_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = GameResourceReader::new(ReaderConfig::new(dir.path().join("cache")));
        let err = reader.read(&ReadOptions::default(), &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(reader.data().is_none());
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_build_without_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = GameResourceReader::new(ReaderConfig::new(dir.path()));
        let options = ReadOptions {
            path: None,
            build_cache: true,
        };
        assert!(matches!(reader.read(&options, &mut NoProgress), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_lookup_needs_name_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let reader = GameResourceReader::new(ReaderConfig::new(dir.path()));
        assert!(matches!(reader.get_resource(""), Err(Error::Configuration(_))));
        assert!(matches!(reader.get_resource_data(""), Err(Error::Configuration(_))));
        assert!(matches!(reader.get_resource_data("sound/x"), Err(Error::Configuration(_))));
    }
}
