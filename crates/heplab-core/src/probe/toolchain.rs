//! Probe for the C++ toolchain used to build the analysis core.
//!
//! This is the one mandatory package: without a working compiler there is
//! nothing to (re)build, so the orchestrator aborts startup if this probe
//! fails.

use std::path::PathBuf;

use heplab_schema::PackageId;

use crate::probe::{Detection, DependencyProbe, ProbeContext};
use crate::process::CommandSpec;

/// Compiler binaries tried in order during auto-detection.
const COMPILER_CANDIDATES: [&str; 3] = ["c++", "g++", "clang++"];

#[derive(Debug, Default)]
pub struct ToolchainProbe {
    compiler: Option<PathBuf>,
    version: String,
}

impl DependencyProbe for ToolchainProbe {
    fn package(&self) -> PackageId {
        PackageId::Cxx
    }

    fn manual_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let Some(forced) = ctx.overrides.forced_path(self.package()) else {
            return Detection::not_found("no manual override");
        };
        if forced.is_file() {
            self.compiler = Some(forced.to_path_buf());
            Detection::found(format!("using forced compiler {}", forced.display()))
        } else {
            // A forced path that does not exist is a broken override, not a
            // fall-through: the user asked for this exact compiler.
            Detection::issue(format!("forced compiler {} does not exist", forced.display()))
        }
    }

    fn auto_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        for name in COMPILER_CANDIDATES {
            if let Ok(path) = which::which(name) {
                self.compiler = Some(path.clone());
                return Detection::found(format!("found {name} at {}", path.display()));
            }
        }
        Detection::not_found("no C++ compiler on PATH")
    }

    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        // Verify the compiler actually runs; a found binary that crashes
        // when probed is an Issue, surfaced here as extract failure.
        let Some(compiler) = &self.compiler else {
            return false;
        };
        let out = match CommandSpec::new(compiler.to_string_lossy())
            .arg("--version")
            .run()
        {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!("compiler probe failed to spawn: {e}");
                return false;
            }
        };
        if !out.success {
            tracing::debug!("'{} --version' exited with {:?}", compiler.display(), out.exit_code);
            return false;
        }
        self.version = out.stdout.lines().next().unwrap_or("unknown").to_string();
        true
    }

    fn save_info(&self, ctx: &mut ProbeContext<'_>) -> bool {
        let Some(compiler) = &self.compiler else {
            return false;
        };
        let Some(bin_dir) = compiler.parent() else {
            return false;
        };
        let rec = ctx.snapshot.record_mut(self.package());
        rec.present = true;
        rec.version = self.version.clone();
        // The toolchain has no headers of its own; record the bin dir as
        // its "library" location so the present-invariant holds.
        rec.library_paths = vec![bin_dir.to_path_buf()];
        rec.original_libraries = vec![compiler.clone()];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use heplab_schema::{ArchSnapshot, ProbeOutcome, UserOverrides};

    #[test]
    fn forced_missing_compiler_is_an_issue_not_a_fallthrough() {
        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::parse("path_cxx = /no/such/c++").unwrap();
        let paths = Paths::at("/nonexistent");
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };
        let mut probe = ToolchainProbe::default();
        let det = probe.manual_detection(&mut ctx);
        assert_eq!(det.outcome, ProbeOutcome::Issue);
    }

    #[test]
    fn extract_without_candidate_fails() {
        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let paths = Paths::at("/nonexistent");
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };
        let mut probe = ToolchainProbe::default();
        assert!(!probe.extract_info(&mut ctx));
    }
}
