//! Probe for the fast detector-simulation backends.
//!
//! One probe type serves both the plain and the tuned variant; they differ
//! only in package id and install directory. Both require the histogramming
//! library, and at most one of the pair may be active at a time. An install
//! directory carrying the deactivation prefix reports `Deactivated` rather
//! than `NotFound`, so the detection pass can tell "switched off" from
//! "never installed".

use std::path::{Path, PathBuf};

use heplab_schema::{DEACTIVATED_PREFIX, PackageId};

use crate::probe::{Detection, DependencyProbe, ProbeContext, find_library, list_libraries};

#[derive(Debug)]
pub struct FastsimProbe {
    package: PackageId,
    prefix: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    version: String,
}

impl FastsimProbe {
    pub fn new(package: PackageId) -> Self {
        debug_assert!(matches!(
            package,
            PackageId::Fastsim | PackageId::FastsimTuned
        ));
        Self {
            package,
            prefix: None,
            lib_dir: None,
            version: String::new(),
        }
    }

    /// Library stem: `libfastsim.*` for both variants (the tuned variant is
    /// a drop-in replacement exposing the same link interface).
    fn lib_stem() -> &'static str {
        "fastsim"
    }

    fn inspect_prefix(&mut self, prefix: &Path) -> bool {
        let lib_dir = prefix.join("lib");
        if find_library(&lib_dir, Self::lib_stem()).is_none() {
            return false;
        }
        if !prefix.join("include").is_dir() {
            return false;
        }
        self.prefix = Some(prefix.to_path_buf());
        self.lib_dir = Some(lib_dir);
        true
    }

    /// Path the variant's install dir takes when deactivated.
    pub fn deactivated_dir(paths: &crate::paths::Paths, package: PackageId) -> PathBuf {
        paths
            .tools_path()
            .join(format!("{DEACTIVATED_PREFIX}{}", package.name()))
    }
}

impl DependencyProbe for FastsimProbe {
    fn package(&self) -> PackageId {
        self.package
    }

    fn manual_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let Some(forced) = ctx.overrides.forced_path(self.package) else {
            return Detection::not_found("no manual override");
        };
        if self.inspect_prefix(forced) {
            Detection::found(format!("using forced prefix {}", forced.display()))
        } else {
            Detection::issue(format!(
                "forced prefix {} has no usable {} install",
                forced.display(),
                self.package
            ))
        }
    }

    fn tools_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let tool_dir = ctx.paths.tool_dir(self.package);
        if self.inspect_prefix(&tool_dir) {
            return Detection::found(format!("using install at {}", tool_dir.display()));
        }
        if Self::deactivated_dir(ctx.paths, self.package).is_dir() {
            return Detection::deactivated(format!("{} is deactivated", self.package));
        }
        Detection::not_found("not installed")
    }

    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        let Some(prefix) = &self.prefix else {
            return false;
        };
        match std::fs::read_to_string(prefix.join("VERSION")) {
            Ok(v) if !v.trim().is_empty() => {
                self.version = v.trim().to_string();
                true
            }
            _ => {
                tracing::debug!(
                    "{} install at {} has no VERSION file",
                    self.package,
                    prefix.display()
                );
                false
            }
        }
    }

    fn save_info(&self, ctx: &mut ProbeContext<'_>) -> bool {
        let (Some(prefix), Some(lib_dir)) = (&self.prefix, &self.lib_dir) else {
            return false;
        };
        let rec = ctx.snapshot.record_mut(self.package);
        rec.present = true;
        rec.version = self.version.clone();
        rec.include_paths = vec![prefix.join("include")];
        rec.library_paths = vec![lib_dir.clone()];
        rec.original_libraries = list_libraries(lib_dir, Self::lib_stem());
        // Self-managed installs always shadow any system copy.
        rec.priority = true;
        true
    }

    fn finalize(&self, ctx: &mut ProbeContext<'_>) -> bool {
        // The pair is mutually exclusive; both present at once means the
        // variant resolver was bypassed.
        let Some(sibling) = self.package.competitor() else {
            return true;
        };
        !ctx.snapshot.record(sibling).present
    }
}
