//! Full detection pass plus the rebuild decision.

use std::process::ExitCode;

use anyhow::{Context, Result};

use heplab_core::paths::Paths;
use heplab_core::probe::{self, ProbeContext};
use heplab_core::rebuild::{self, CoreBuilder, RebuildReason};
use heplab_schema::{ArchSnapshot, UserOverrides};

use crate::ui::ConsoleReporter;

/// Probe every package in declaration order, then rebuild the analysis
/// core when the freshly probed snapshot differs from the persisted one.
pub fn detect(force_rebuild: bool) -> Result<ExitCode> {
    let paths = Paths::discover()?;
    std::fs::create_dir_all(paths.root())
        .with_context(|| format!("Failed to create {}", paths.root().display()))?;

    let overrides = UserOverrides::load(&paths.overrides_path())
        .with_context(|| format!("Bad overrides file {}", paths.overrides_path().display()))?;

    let reporter = ConsoleReporter;
    let mut snapshot = ArchSnapshot::new();
    let all_ok = {
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };
        probe::run_all(&mut ctx, &reporter)
    };
    if !all_ok {
        // A mandatory dependency is unusable; nothing below can proceed.
        return Ok(ExitCode::FAILURE);
    }

    let saved = ArchSnapshot::load(&paths.snapshot_path());
    let builder = CoreBuilder::new(&paths);
    let artifacts = builder.artifacts_present(&snapshot);

    match rebuild::evaluate(&snapshot, saved.as_ref(), artifacts, force_rebuild) {
        Some(reason) => {
            println!("Rebuilding the analysis core: {}", describe(reason));
            builder.rebuild(&snapshot)?;
            println!("Analysis core rebuilt");
        }
        None => println!("Analysis core is up to date"),
    }
    Ok(ExitCode::SUCCESS)
}

fn describe(reason: RebuildReason) -> &'static str {
    match reason {
        RebuildReason::FirstRun => "no previous build recorded",
        RebuildReason::MissingArtifacts => "compiled libraries are missing",
        RebuildReason::SnapshotDrift => "the dependency configuration changed",
        RebuildReason::UserForced => "forced by --force-rebuild",
    }
}
