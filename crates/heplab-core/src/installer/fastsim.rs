//! Installer for the fast detector simulation, stock or tuned variant.
//!
//! Both variants install the same way; they differ only in which tarball is
//! fetched and which tool directory receives the tree. An existing install
//! (active or parked) is only overwritten after explicit confirmation, and
//! a successful install requests a process restart because the simulation
//! headers were already scanned at startup.

use async_trait::async_trait;
use heplab_schema::PackageId;

use crate::io::extract::{strip_components, unpack_tar_gz};
use crate::probe::fastsim::FastsimProbe;
use crate::process::CommandSpec;

use super::{
    InstallContext, InstallError, InstallManifest, PackageInstaller, StepResult, run_stage_command,
};

const VERSION: &str = "3.5.1";

#[derive(Debug)]
pub struct FastsimInstaller {
    package: PackageId,
    jobs: usize,
}

impl FastsimInstaller {
    /// # Panics
    ///
    /// Panics if `package` is not a detector-simulation variant.
    pub fn new(package: PackageId) -> Self {
        assert!(
            matches!(package, PackageId::Fastsim | PackageId::FastsimTuned),
            "not a detector-simulation variant: {package}"
        );
        Self { package, jobs: 1 }
    }

    fn manifest(&self, ctx: &InstallContext<'_>) -> InstallManifest {
        let name = self.package.name();
        InstallManifest {
            files: vec![(
                format!("{name}-{VERSION}.tar.gz"),
                format!("https://heplab-mirror.web.cern.ch/releases/{name}-{VERSION}.tar.gz"),
            )],
            destination: ctx.paths.tool_dir(self.package),
        }
    }
}

#[async_trait]
impl PackageInstaller for FastsimInstaller {
    fn package(&self) -> PackageId {
        self.package
    }

    fn needs_restart(&self) -> bool {
        true
    }

    async fn detect_existing(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        let active = ctx.paths.tool_dir(self.package);
        let parked = FastsimProbe::deactivated_dir(ctx.paths, self.package);
        let existing = [&active, &parked].into_iter().find(|d| d.is_dir());
        let Some(existing) = existing else {
            return Ok(StepResult::Advance);
        };

        let prompt = format!(
            "{} is already installed at {}. Overwrite it?",
            self.package,
            existing.display()
        );
        if !ctx.confirm.confirm(&prompt, false) {
            return Ok(StepResult::Skip);
        }
        for dir in [&active, &parked] {
            if dir.is_dir() {
                std::fs::remove_dir_all(dir)?;
            }
        }
        Ok(StepResult::Advance)
    }

    async fn choose_parallelism(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        self.jobs = ctx.jobs.max(1);
        Ok(StepResult::Advance)
    }

    async fn download(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        let manifest = self.manifest(ctx);
        ctx.fetch_manifest(self.package, &manifest).await?;
        Ok(StepResult::Advance)
    }

    async fn unpack(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let archive = ctx
            .workspace
            .join(format!("{}-{VERSION}.tar.gz", self.package.name()));
        let src = ctx.workspace.join("src");
        unpack_tar_gz(&archive, &src)?;
        strip_components(&src)?;
        Ok(StepResult::Advance)
    }

    async fn compile(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        // The simulation links against the histogramming library from the
        // tools area.
        let histo = ctx.paths.tool_dir(PackageId::Histo);
        let cmd = CommandSpec::new("make")
            .arg(format!("-j{}", self.jobs))
            .env_paths("CPLUS_INCLUDE_PATH", &[histo.join("include")])
            .env_paths("LIBRARY_PATH", &[histo.join("lib")])
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, self.package, "compile", &cmd)
    }

    async fn install(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        // The built tree is used in place; move it from scratch into the
        // tools area (same volume, see Paths::tmp_path).
        let dest = self.manifest(ctx).destination;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::rename(ctx.workspace.join("src"), &dest) {
            Ok(()) => {}
            Err(_) => {
                // Cross-volume fallback.
                let mut options = fs_extra::dir::CopyOptions::new();
                options.copy_inside = true;
                fs_extra::dir::copy(ctx.workspace.join("src"), &dest, &options).map_err(|e| {
                    InstallError::Stage {
                        stage: "install",
                        message: e.to_string(),
                    }
                })?;
            }
        }
        Ok(StepResult::Advance)
    }

    async fn clean(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        std::fs::remove_dir_all(ctx.workspace.join("src")).ok();
        Ok(StepResult::Advance)
    }

    async fn verify(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let dest = self.manifest(ctx).destination;
        if crate::probe::find_library(&dest.join("lib"), "fastsim").is_some() {
            Ok(StepResult::Advance)
        } else {
            Err(InstallError::Stage {
                stage: "verify",
                message: format!("no simulation library under {}", dest.display()),
            })
        }
    }
}
