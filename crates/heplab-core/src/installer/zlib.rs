//! Installer for a private zlib copy.
//!
//! Installed only when no usable system zlib was detected. Classic
//! autotools flow: configure with a prefix, make, make install.

use async_trait::async_trait;
use heplab_schema::PackageId;

use crate::io::extract::{strip_components, unpack_tar_gz};
use crate::probe::find_library;
use crate::process::CommandSpec;

use super::{
    InstallContext, InstallError, InstallManifest, PackageInstaller, StepResult, run_stage_command,
};

const VERSION: &str = "1.3.1";

#[derive(Debug)]
pub struct ZlibInstaller {
    jobs: usize,
}

impl ZlibInstaller {
    pub fn new() -> Self {
        Self { jobs: 1 }
    }

    fn manifest(ctx: &InstallContext<'_>) -> InstallManifest {
        InstallManifest {
            files: vec![(
                format!("zlib-{VERSION}.tar.gz"),
                format!("https://zlib.net/fossils/zlib-{VERSION}.tar.gz"),
            )],
            destination: ctx.paths.tool_dir(PackageId::Zlib),
        }
    }
}

impl Default for ZlibInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageInstaller for ZlibInstaller {
    fn package(&self) -> PackageId {
        PackageId::Zlib
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
        ctx.fetch_manifest(PackageId::Zlib, &manifest).await?;
        Ok(StepResult::Advance)
    }

    async fn unpack(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let archive = ctx.workspace.join(format!("zlib-{VERSION}.tar.gz"));
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
        run_stage_command(ctx, PackageId::Zlib, "configure", &cmd)
    }

    async fn compile(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let cmd = CommandSpec::new("make")
            .arg(format!("-j{}", self.jobs))
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, PackageId::Zlib, "compile", &cmd)
    }

    async fn install(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let cmd = CommandSpec::new("make")
            .arg("install")
            .current_dir(ctx.workspace.join("src"));
        run_stage_command(ctx, PackageId::Zlib, "install", &cmd)
    }

    async fn clean(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        std::fs::remove_dir_all(ctx.workspace.join("src")).ok();
        Ok(StepResult::Advance)
    }

    async fn verify(&mut self, ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        let dest = Self::manifest(ctx).destination;
        let header = dest.join("include").join("zlib.h");
        let library = find_library(&dest.join("lib"), "z");
        if header.is_file() && library.is_some() {
            Ok(StepResult::Advance)
        } else {
            Err(InstallError::Stage {
                stage: "verify",
                message: format!("installed tree at {} is incomplete", dest.display()),
            })
        }
    }
}
