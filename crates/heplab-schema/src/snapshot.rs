//! The architecture snapshot: everything detected about the machine and its
//! optional dependencies, persisted between runs.
//!
//! The on-disk format is explicit, versioned JSON. Equality is full
//! structural equality over every field (derived `PartialEq`): any drift in
//! any single dependency forces a full rebuild of the analysis core, because
//! the core is compiled against a fixed dependency configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::package::PackageId;

/// Errors from snapshot persistence and validation.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Record for {package} marked present without {missing}")]
    Incomplete {
        package: PackageId,
        missing: &'static str,
    },
}

/// Everything detected about one dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Whether the package is usable in this configuration.
    pub present: bool,
    /// Detected version string (e.g. `"1.3.1"`). Empty when absent.
    #[serde(default)]
    pub version: String,
    /// Ordered include-search paths, highest precedence first.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Ordered library-search paths, highest precedence first.
    #[serde(default)]
    pub library_paths: Vec<PathBuf>,
    /// Original library files, used to build the symlink farm.
    #[serde(default)]
    pub original_libraries: Vec<PathBuf>,
    /// Search this copy before any system copy.
    #[serde(default)]
    pub priority: bool,
}

impl DependencyRecord {
    /// Invariant check: once marked present, the version and at least one
    /// library path must be non-empty.
    pub fn validate(&self, package: PackageId) -> Result<(), SnapshotError> {
        if !self.present {
            return Ok(());
        }
        if self.version.is_empty() {
            return Err(SnapshotError::Incomplete {
                package,
                missing: "a version string",
            });
        }
        if self.library_paths.is_empty() {
            return Err(SnapshotError::Incomplete {
                package,
                missing: "a library path",
            });
        }
        Ok(())
    }

    /// Reset this record to "absent". Used when a probe fails or a package
    /// is deactivated.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One record per process lifetime; filled in-place by each dependency
/// probe, compared against the copy persisted after the last successful
/// build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchSnapshot {
    /// Format version of the serialized file. A mismatch on load is treated
    /// the same as a corrupt file.
    pub format_version: u32,
    /// Per-package detection records, keyed by stable package name.
    /// `BTreeMap` keeps serialization order deterministic.
    pub packages: BTreeMap<PackageId, DependencyRecord>,
}

impl Default for ArchSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchSnapshot {
    /// Create an empty snapshot with one default record per known package.
    pub fn new() -> Self {
        Self {
            format_version: crate::SNAPSHOT_FORMAT_VERSION,
            packages: PackageId::ALL
                .into_iter()
                .map(|p| (p, DependencyRecord::default()))
                .collect(),
        }
    }

    /// Immutable access to a package record.
    ///
    /// # Panics
    ///
    /// Never in practice: `new()` seeds a record for every `PackageId`, and
    /// deserialized snapshots that lack one fail the version gate first.
    pub fn record(&self, package: PackageId) -> &DependencyRecord {
        self.packages
            .get(&package)
            .expect("snapshot seeded with all packages")
    }

    /// Mutable access to a package record.
    pub fn record_mut(&mut self, package: PackageId) -> &mut DependencyRecord {
        self.packages.entry(package).or_default()
    }

    /// Validate every record's present-implies-populated invariant.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (&package, record) in &self.packages {
            record.validate(package)?;
        }
        Ok(())
    }

    /// Load the persisted snapshot from `path`.
    ///
    /// Fails closed: a missing, unreadable, corrupt or version-mismatched
    /// file yields `None` ("no saved snapshot", forcing a rebuild) rather
    /// than an error.
    pub fn load(path: &Path) -> Option<Self> {
        let data = match fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("unreadable snapshot at {}: {e}", path.display());
                }
                return None;
            }
        };
        let snapshot: Self = match serde_json::from_str(&data) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("corrupt snapshot at {}: {e}", path.display());
                return None;
            }
        };
        if snapshot.format_version != crate::SNAPSHOT_FORMAT_VERSION {
            tracing::warn!(
                "snapshot format {} != supported {}, ignoring saved copy",
                snapshot.format_version,
                crate::SNAPSHOT_FORMAT_VERSION
            );
            return None;
        }
        Some(snapshot)
    }

    /// Persist the snapshot to `path`.
    ///
    /// All-or-nothing: the JSON is written to a temporary sibling and
    /// renamed into place, so a crash mid-write never leaves a partial file.
    /// The caller is responsible for only invoking this after the rebuild
    /// the snapshot describes has succeeded.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
