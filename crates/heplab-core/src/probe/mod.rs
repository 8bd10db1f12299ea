//! Dependency probes: the per-package search/extract/validate contract.
//!
//! Each concrete probe implements some subset of the optional hooks on
//! [`DependencyProbe`]; every hook has a default no-op implementation, so
//! absence of an operation is a skip, not a failure. Probes never decide
//! mandatory-vs-optional consequences: they return outcomes, and the
//! [orchestrator](crate::probe::orchestrator) is the single place that turns
//! an outcome into "continue" or "abort".

pub mod fastsim;
pub mod histo;
pub mod jetclu;
pub mod orchestrator;
pub mod toolchain;
pub mod zlib;

use std::path::{Path, PathBuf};

use heplab_schema::{ArchSnapshot, PackageId, ProbeOutcome, UserOverrides};

use crate::paths::Paths;

pub use orchestrator::{make_probe, run_all, run_probe};

/// Outcome + human-readable message from one detection stage.
#[derive(Debug, Clone)]
pub struct Detection {
    pub outcome: ProbeOutcome,
    pub message: String,
}

impl Detection {
    pub fn found(message: impl Into<String>) -> Self {
        Self {
            outcome: ProbeOutcome::Found,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            outcome: ProbeOutcome::NotFound,
            message: message.into(),
        }
    }

    pub fn issue(message: impl Into<String>) -> Self {
        Self {
            outcome: ProbeOutcome::Issue,
            message: message.into(),
        }
    }

    pub fn deactivated(message: impl Into<String>) -> Self {
        Self {
            outcome: ProbeOutcome::Deactivated,
            message: message.into(),
        }
    }
}

/// Shared state every hook receives. The snapshot is mutated in place by
/// `save_info`; overrides and paths are read-only inputs.
#[derive(Debug)]
pub struct ProbeContext<'a> {
    pub snapshot: &'a mut ArchSnapshot,
    pub overrides: &'a UserOverrides,
    pub paths: &'a Paths,
}

/// The per-package optional-capability contract.
///
/// Hooks run in the fixed order documented on
/// [`run_probe`](orchestrator::run_probe). Detection hooks return a
/// [`Detection`]; `NotFound` from `manual_detection` means "the user gave no
/// override" and falls through to the next search strategy.
pub trait DependencyProbe: Send {
    /// The package this probe detects.
    fn package(&self) -> PackageId;

    /// One-time setup, e.g. verifying a prerequisite binary runs at all.
    fn initialize(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        true
    }

    /// True if the user overrides explicitly disable this package.
    fn is_vetoed(&self, ctx: &ProbeContext<'_>) -> bool {
        ctx.overrides.is_vetoed(self.package())
    }

    /// True only if the packages this one depends on are themselves present
    /// in the snapshot.
    fn dependencies_installed(&self, ctx: &ProbeContext<'_>) -> bool {
        self.package()
            .requires()
            .iter()
            .all(|&dep| ctx.snapshot.record(dep).present)
    }

    /// Search only the path the user forced, if any.
    fn manual_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        Detection::not_found("no manual override")
    }

    /// Search the self-managed install directory bundled with the program.
    fn tools_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        Detection::not_found("not in tools directory")
    }

    /// Search the process environment (PATH-style lookup).
    fn auto_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        Detection::not_found("not found on this system")
    }

    /// Run the package's own introspection tool on the found candidate to
    /// obtain version/flags. Failure here is `Issue`-equivalent.
    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        true
    }

    /// Copy extracted facts into the architecture snapshot.
    fn save_info(&self, _ctx: &mut ProbeContext<'_>) -> bool {
        true
    }

    /// Last-chance validation after saving.
    fn finalize(&self, _ctx: &mut ProbeContext<'_>) -> bool {
        true
    }
}

/// Filename stems a native library may carry for a given base name.
const LIB_EXTENSIONS: [&str; 3] = ["so", "a", "dylib"];

/// Look for `lib<stem>.{so,a,dylib}` (or a versioned `lib<stem>.so.*`)
/// directly inside `dir`.
pub fn find_library(dir: &Path, stem: &str) -> Option<PathBuf> {
    for ext in LIB_EXTENSIONS {
        let candidate = dir.join(format!("lib{stem}.{ext}"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    // Versioned shared objects: libz.so.1.3.1
    let prefix = format!("lib{stem}.so.");
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
}

/// Collect every `lib<stem>.*` under `dir` (non-recursive). Used to record
/// the original library files for the symlink farm.
pub fn list_libraries(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let prefix = format!("lib{stem}.");
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut libs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();
    libs.sort();
    libs
}
