//! Activate/deactivate commands for the detector-simulation variants.

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};

use heplab_core::paths::Paths;
use heplab_core::variant::{ActivationOutcome, VariantResolver};
use heplab_schema::{ArchSnapshot, PackageId, UserOverrides};

use crate::ui::ConsoleReporter;

/// Make the named variant the active member of its pair.
pub fn activate(name: &str) -> Result<ExitCode> {
    let package = PackageId::from_str(name)?;
    let paths = Paths::discover()?;
    std::fs::create_dir_all(paths.root())?;

    let overrides = UserOverrides::load(&paths.overrides_path())?;
    let mut snapshot = ArchSnapshot::load(&paths.snapshot_path()).unwrap_or_default();

    let resolver = VariantResolver::new(&paths);
    let outcome = resolver.activate(package, &mut snapshot, &overrides, &ConsoleReporter)?;
    snapshot
        .save(&paths.snapshot_path())
        .context("Failed to persist the snapshot")?;

    match outcome {
        ActivationOutcome::NothingToDo => println!("{package}: nothing to do"),
        ActivationOutcome::Activated => println!("{package} activated"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Switch the named variant off, keeping its install around.
pub fn deactivate(name: &str) -> Result<ExitCode> {
    let package = PackageId::from_str(name)?;
    let paths = Paths::discover()?;
    std::fs::create_dir_all(paths.root())?;

    let mut snapshot = ArchSnapshot::load(&paths.snapshot_path()).unwrap_or_default();
    let resolver = VariantResolver::new(&paths);
    resolver.deactivate(package, &mut snapshot)?;
    snapshot
        .save(&paths.snapshot_path())
        .context("Failed to persist the snapshot")?;

    println!("{package} deactivated");
    Ok(ExitCode::SUCCESS)
}
