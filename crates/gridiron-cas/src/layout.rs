//! Install layout discovery.
//!
//! ```text
//! <install>/
//!   Madden22.exe
//!   Data/initfs_Win32
//!   Data/Win32/superbundlelayout/<prefix>_<package>/cas_<id>.cas
//!   Patch/initfs_Win32
//!   Patch/Win32/superbundlelayout/<prefix>_<package>/cas_<id>.cas
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Partition root for base game data, relative to the install root.
pub const DATA_LAYOUT: &str = "Data/Win32/superbundlelayout";
/// Partition root for patch data, relative to the install root.
pub const PATCH_LAYOUT: &str = "Patch/Win32/superbundlelayout";
/// Name of the initfs TOC in each partition.
pub const INITFS_NAME: &str = "initfs_Win32";
/// Package name that is not numbered.
pub const SENTINEL_PACKAGE: &str = "lcu";

const CAS_PATTERN: &str = "*.cas";

/// Install package identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageId {
    Numeric(u32),
    Named(String),
}

impl PackageId {
    /// Parse the suffix after the last `_` of a package directory name.
    pub fn from_dir_name(name: &str) -> Self {
        let suffix = name.rsplit('_').next().unwrap_or(name);
        match suffix.parse() {
            Ok(id) => Self::Numeric(id),
            Err(_) => Self::Named(suffix.to_string()),
        }
    }

    /// Whether this is the reserved `lcu` package.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Named(name) if name == SENTINEL_PACKAGE)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id:02}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// One container file found in the install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub is_patch: bool,
    pub container_id: u32,
    pub package_id: PackageId,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the install root, `/`-separated.
    pub relative_path: String,
}

/// Paths of an install rooted at the game executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    /// Layout of the install containing `exe_path`.
    pub fn from_exe<P: AsRef<Path>>(exe_path: P) -> Self {
        let exe_path = exe_path.as_ref();
        let root = exe_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self { root }
    }

    /// Install root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_root(&self) -> PathBuf {
        self.root.join(DATA_LAYOUT)
    }

    pub fn patch_root(&self) -> PathBuf {
        self.root.join(PATCH_LAYOUT)
    }

    /// initfs TOC paths in lookup order: patch, then data.
    pub fn initfs_candidates(&self) -> [PathBuf; 2] {
        [
            self.root.join("Patch").join(INITFS_NAME),
            self.root.join("Data").join(INITFS_NAME),
        ]
    }

    /// Resolve a record's relative container path.
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Enumerate every container, patch partition first.
    pub fn scan(&self) -> Result<Vec<ContainerDescriptor>> {
        let pattern = Pattern::new(CAS_PATTERN).map_err(|e| Error::InvalidName(e.to_string()))?;

        let mut containers = self.scan_partition(PATCH_LAYOUT, true, &pattern)?;
        containers.extend(self.scan_partition(DATA_LAYOUT, false, &pattern)?);
        debug!(root = %self.root.display(), containers = containers.len(), "scanned install");
        Ok(containers)
    }

    fn scan_partition(
        &self,
        layout: &str,
        is_patch: bool,
        pattern: &Pattern,
    ) -> Result<Vec<ContainerDescriptor>> {
        let partition = self.root.join(layout);
        let mut packages = sorted_entries(&partition)?;
        packages.retain(|(name, path)| {
            let keep = path.is_dir();
            if !keep {
                debug!(entry = %name, "skipping non-directory in partition");
            }
            keep
        });

        let mut containers = Vec::new();
        for (package_name, package_path) in packages {
            let package_id = PackageId::from_dir_name(&package_name);

            for (file_name, file_path) in sorted_entries(&package_path)? {
                if !pattern.matches(&file_name) || !file_path.is_file() {
                    debug!(entry = %file_name, "skipping non-container file");
                    continue;
                }

                let Ok(id) = container_id(&file_name) else {
                    warn!(entry = %file_name, "skipping container without a numeric id");
                    continue;
                };

                containers.push(ContainerDescriptor {
                    is_patch,
                    container_id: id,
                    package_id: package_id.clone(),
                    relative_path: format!("{layout}/{package_name}/{file_name}"),
                    path: file_path,
                });
            }
        }
        Ok(containers)
    }
}

/// Scan the install containing `exe_path`.
pub fn scan_install<P: AsRef<Path>>(exe_path: P) -> Result<Vec<ContainerDescriptor>> {
    InstallLayout::from_exe(exe_path).scan()
}

/// Parse the digits between the last `_` and the first `.` (`cas_01.cas` is 1).
pub fn container_id(file_name: &str) -> Result<u32> {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let digits = stem.rsplit('_').next().unwrap_or(stem);
    digits
        .parse()
        .map_err(|_| Error::InvalidName(file_name.to_string()))
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
