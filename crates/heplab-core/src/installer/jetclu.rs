//! Installer for the jet-clustering library.
//!
//! Autotools package shipping its own `jetclu-config` query helper; the
//! post-install check runs that helper from the fresh tree to make sure the
//! version floor is met before the probe ever sees it.

use async_trait::async_trait;
use heplab_schema::PackageId;

use crate::io::extract::{strip_components, unpack_tar_gz};
use crate::process::CommandSpec;

use super::{
    InstallContext, InstallError, InstallManifest, PackageInstaller, StepResult, run_stage_command,
};

const VERSION: &str = "3.4.2";

#[derive(Debug)]
pub struct JetcluInstaller {
    jobs: usize,
}

impl JetcluInstaller {
    pub fn new() -> Self {
        Self { jobs: 1 }
    }

    fn manifest(ctx: &InstallContext<'_>) -> InstallManifest {
        InstallManifest {
            files: vec![(
                format!("jetclu-{VERSION}.tar.gz"),
                format!("https://heplab-mirror.web.cern.ch/releases/jetclu-{VERSION}.tar.gz"),
            )],
            destination: ctx.paths.tool_dir(PackageId::Jetclu),
        }
    }
}

impl Default for JetcluInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageInstaller for JetcluInstaller {
    fn package(&self) -> PackageId {
        PackageId::Jetclu
    }

    async fn choose_parallelism(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        self.jobs = ctx.jobs.max(1);
        Ok(StepResult::Advance)
    }

    async fn create_destination(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        std::fs::create_dir_all(Self::manifest(ctx).destination)?;
        Ok(StepResult::Advance)
    }

    async fn download(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        let manifest = Self::manifest(ctx);
        ctx.fetch_manifest(PackageId::Jetclu, &manifest).await?;
        Ok(StepResult::Advance)
    }

    async fn unpack(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let archive = ctx.workspace.join(format!("jetclu-{VERSION}.tar.gz"));
        let src = ctx.workspace.join("src");
        unpack_tar_gz(&archive, &src)?;
        strip_components(&src)?;
        Ok(StepResult::Advance)
    }

    async fn configure(
        &mut self,
        ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        let dest = Self::manifest(ctx).destination;
        let cmd = CommandSpec::shell(format!("./configure --prefix={}", dest.display()))
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, PackageId::Jetclu, "configure", &cmd)
    }

    async fn compile(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let cmd = CommandSpec::new("make")
            .arg(format!("-j{}", self.jobs))
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, PackageId::Jetclu, "compile", &cmd)
    }

    async fn install(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let cmd = CommandSpec::new("make")
            .arg("install")
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, PackageId::Jetclu, "install", &cmd)
    }

    async fn clean(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        std::fs::remove_dir_all(ctx.workspace.join("src")).ok();
        Ok(StepResult::Advance)
    }

    async fn verify(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let helper = Self::manifest(ctx)
            .destination
            .join("bin")
            .join("jetclu-config");
        let out = CommandSpec::new(helper.display().to_string())
            .arg("--version")
            .run()
            .map_err(|e| InstallError::Stage {
                stage: "verify",
                message: e.to_string(),
            })?;
        if out.success && !out.stdout.is_empty() {
            Ok(StepResult::Advance)
        } else {
            Err(InstallError::Stage {
                stage: "verify",
                message: "jetclu-config did not answer a version query".into(),
            })
        }
    }
}
