//! Activate/deactivate mechanism for mutually-exclusive package pairs
//! (the two detector-simulation backends).
//!
//! Deactivation renames the install directory with a reserved prefix so a
//! later detection pass sees "switched off" rather than "never installed",
//! strips the package from the snapshot and drops its symlinks. Activation
//! reverses the rename, deactivating the sibling first, then re-probes and
//! triggers a targeted rebuild of only the simulation sub-libraries.

use std::path::PathBuf;

use heplab_schema::{ArchSnapshot, DetectionStatus, PackageId, UserOverrides};
use thiserror::Error;

use crate::links;
use crate::paths::Paths;
use crate::probe::{self, ProbeContext, fastsim::FastsimProbe};
use crate::rebuild::CoreBuilder;
use crate::reporter::Reporter;

/// Tri-state result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Already active, or nothing installed to activate.
    NothingToDo,
    /// The package was activated (and its sibling deactivated).
    Activated,
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("{0} does not belong to a variant pair")]
    NotAVariant(PackageId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("re-detection of {0} failed after activation")]
    ProbeFailed(PackageId),

    #[error("targeted rebuild failed: {0}")]
    Rebuild(#[from] anyhow::Error),

    #[error("symlink update failed: {0}")]
    Links(anyhow::Error),
}

/// Resolver for one installation root.
#[derive(Debug)]
pub struct VariantResolver<'a> {
    paths: &'a Paths,
}

impl<'a> VariantResolver<'a> {
    pub fn new(paths: &'a Paths) -> Self {
        Self { paths }
    }

    fn active_dir(&self, package: PackageId) -> PathBuf {
        self.paths.tool_dir(package)
    }

    fn inactive_dir(&self, package: PackageId) -> PathBuf {
        FastsimProbe::deactivated_dir(self.paths, package)
    }

    /// Mark a package inactive. Idempotent: a no-op when the package is
    /// already inactive or was never installed.
    pub fn deactivate(
        &self,
        package: PackageId,
        snapshot: &mut ArchSnapshot,
    ) -> Result<(), VariantError> {
        if package.competitor().is_none() {
            return Err(VariantError::NotAVariant(package));
        }

        let active = self.active_dir(package);
        if active.is_dir() {
            links::unlink_into(&self.paths.links_path(), &active).map_err(VariantError::Links)?;
            std::fs::rename(&active, self.inactive_dir(package))?;
            tracing::info!("{package} deactivated");
        }
        snapshot.record_mut(package).clear();
        Ok(())
    }

    /// Make a package the active member of its pair.
    pub fn activate<R: Reporter + ?Sized>(
        &self,
        package: PackageId,
        snapshot: &mut ArchSnapshot,
        overrides: &UserOverrides,
        reporter: &R,
    ) -> Result<ActivationOutcome, VariantError> {
        let Some(sibling) = package.competitor() else {
            return Err(VariantError::NotAVariant(package));
        };

        let active = self.active_dir(package);
        let inactive = self.inactive_dir(package);

        if active.is_dir() && snapshot.record(package).present {
            return Ok(ActivationOutcome::NothingToDo);
        }
        if !active.is_dir() && !inactive.is_dir() {
            // Never installed; activation has nothing to work on.
            return Ok(ActivationOutcome::NothingToDo);
        }

        // Invariant: at most one of the pair active at a time.
        self.deactivate(sibling, snapshot)?;

        if inactive.is_dir() {
            std::fs::rename(&inactive, &active)?;
        }

        // Repopulate the snapshot from a fresh probe of the reinstated dir.
        let mut probe = probe::make_probe(package);
        let mut ctx = ProbeContext {
            snapshot,
            overrides,
            paths: self.paths,
        };
        let status = probe::run_probe(probe.as_mut(), &mut ctx, false, reporter);
        if status != DetectionStatus::Enabled {
            return Err(VariantError::ProbeFailed(package));
        }

        links::link_libraries(
            &self.paths.links_path(),
            &snapshot.record(package).original_libraries,
        )
        .map_err(VariantError::Links)?;

        // Only the simulation sub-libraries depend on which variant is
        // active; the rest of the core is untouched.
        CoreBuilder::new(self.paths).rebuild_simulation_libs(snapshot)?;

        tracing::info!("{package} activated");
        Ok(ActivationOutcome::Activated)
    }
}
