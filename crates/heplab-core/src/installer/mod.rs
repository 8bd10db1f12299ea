//! Generic package-installer pipeline.
//!
//! A concrete installer implements any subset of the ordered lifecycle
//! hooks on [`PackageInstaller`]; absent hooks are silent skips. The
//! executor stops at the first failing hook and reports one of OK / SKIPPED
//! / RESTART / FAILURE, where FAILURE always names the stage log file. One
//! package's failure never aborts installation of unrelated packages
//! requested in the same session.

pub mod fastsim;
pub mod histo;
pub mod jetclu;
pub mod zlib;

use std::path::PathBuf;

use async_trait::async_trait;
use heplab_schema::PackageId;
use reqwest::Client;
use thiserror::Error;

use crate::io::download::{DownloadError, DownloadRequest};
use crate::paths::Paths;
use crate::reporter::{Confirm, Reporter};

/// Per package: ordered remote files plus a destination directory.
/// Consumed once by the pipeline and discarded.
#[derive(Debug, Clone)]
pub struct InstallManifest {
    /// `(file_name, url)` pairs, fetched in order.
    pub files: Vec<(String, String)>,
    /// Final install prefix.
    pub destination: PathBuf,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{stage} failed: {message}")]
    Stage { stage: &'static str, message: String },

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for InstallError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// What one hook asks the executor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Proceed to the next hook.
    Advance,
    /// Stop the pipeline without error (user declined a destructive
    /// action).
    Skip,
}

/// Distinguished result of one package installation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallReport {
    /// Installed (or already present and left alone).
    Ok,
    /// User declined an overwrite; not an error.
    Skipped,
    /// Installed, and the process must restart before the artifact is
    /// visible (environment already read into the running process).
    Restart,
    /// A stage failed; `log` points at the file to consult.
    Failure { log: PathBuf },
}

/// Shared state threaded through every hook.
pub struct InstallContext<'a> {
    pub paths: &'a Paths,
    pub client: &'a Client,
    pub reporter: &'a dyn Reporter,
    pub confirm: &'a dyn Confirm,
    /// Network access globally disabled; the download hook is skipped
    /// entirely.
    pub offline: bool,
    /// Core count handed to external compile steps.
    pub jobs: usize,
    /// Scratch directory, created before the first hook runs.
    pub workspace: PathBuf,
}

impl std::fmt::Debug for InstallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallContext")
            .field("offline", &self.offline)
            .field("jobs", &self.jobs)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl InstallContext<'_> {
    /// Log file for the named stage of this package.
    pub fn stage_log(&self, package: PackageId, stage: &str) -> PathBuf {
        self.paths.install_log_path(package, stage)
    }

    /// Fetch every manifest file into the workspace, sequentially.
    pub async fn fetch_manifest(
        &self,
        package: PackageId,
        manifest: &InstallManifest,
    ) -> Result<(), InstallError> {
        for (file_name, url) in &manifest.files {
            let dest = self.workspace.join(file_name);
            DownloadRequest {
                client: self.client,
                package,
                url,
                dest: &dest,
                expected_hash: None,
                reporter: self.reporter,
            }
            .execute()
            .await?;
        }
        Ok(())
    }
}

/// The optional-hook contract. Hooks run in declaration order; every
/// default is a silent `Advance`.
#[async_trait]
pub trait PackageInstaller: Send {
    /// The package this installer provides.
    fn package(&self) -> PackageId;

    /// Whether a successful run must be followed by a process restart.
    fn needs_restart(&self) -> bool {
        false
    }

    /// Detect an existing install; may ask for overwrite confirmation.
    async fn detect_existing(
        &mut self,
        _ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Pick the parallelism for compile steps.
    async fn choose_parallelism(
        &mut self,
        _ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Create the final destination directory.
    async fn create_destination(
        &mut self,
        _ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Fetch remote files. Skipped entirely when offline.
    async fn download(
        &mut self,
        _ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Unpack fetched archives into the workspace.
    async fn unpack(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Configure the source tree.
    async fn configure(
        &mut self,
        _ctx: &mut InstallContext<'_>,
    ) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Compile.
    async fn compile(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Post-build self-check.
    async fn check(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Copy the built tree into place.
    async fn install(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Remove intermediate files once the installed tree no longer needs
    /// them.
    async fn clean(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }

    /// Final verification of the installed tree.
    async fn verify(&mut self, _ctx: &mut InstallContext<'_>) -> Result<StepResult, InstallError> {
        Ok(StepResult::Advance)
    }
}

/// Run one external command for a pipeline stage, logging to the stage's
/// log file and converting a non-zero exit into a stage failure.
pub(crate) fn run_stage_command(
    ctx: &InstallContext<'_>,
    package: PackageId,
    stage: &'static str,
    cmd: &crate::process::CommandSpec,
) -> Result<StepResult, InstallError> {
    let log = ctx.stage_log(package, stage);
    let ok = cmd
        .run_logged(&log)
        .map_err(|e| InstallError::Stage {
            stage,
            message: e.to_string(),
        })?;
    if ok {
        Ok(StepResult::Advance)
    } else {
        Err(InstallError::Stage {
            stage,
            message: format!("command exited with an error, see {}", log.display()),
        })
    }
}

/// Stage names in execution order, paired with whether the offline flag
/// suppresses them.
const STAGES: [(&str, bool); 11] = [
    ("detect-existing", false),
    ("parallelism", false),
    ("destination", false),
    ("download", true),
    ("unpack", false),
    ("configure", false),
    ("compile", false),
    ("check", false),
    ("install", false),
    ("clean", false),
    ("verify", false),
];

/// Run one installer through the pipeline.
pub async fn run_pipeline(
    installer: &mut dyn PackageInstaller,
    ctx: &mut InstallContext<'_>,
) -> InstallReport {
    let package = installer.package();

    if let Err(e) = std::fs::create_dir_all(&ctx.workspace) {
        ctx.reporter
            .error(&format!("{package}: cannot create workspace: {e}"));
        return InstallReport::Failure {
            log: ctx.stage_log(package, "workspace"),
        };
    }

    for (stage, skipped_offline) in STAGES {
        if skipped_offline && ctx.offline {
            tracing::info!("{package}: offline, skipping {stage}");
            continue;
        }
        ctx.reporter.stage(package, stage);

        let result = match stage {
            "detect-existing" => installer.detect_existing(ctx).await,
            "parallelism" => installer.choose_parallelism(ctx).await,
            "destination" => installer.create_destination(ctx).await,
            "download" => installer.download(ctx).await,
            "unpack" => installer.unpack(ctx).await,
            "configure" => installer.configure(ctx).await,
            "compile" => installer.compile(ctx).await,
            "check" => installer.check(ctx).await,
            "install" => installer.install(ctx).await,
            "clean" => installer.clean(ctx).await,
            "verify" => installer.verify(ctx).await,
            _ => unreachable!(),
        };

        match result {
            Ok(StepResult::Advance) => {}
            Ok(StepResult::Skip) => {
                ctx.reporter
                    .info(&format!("{package}: installation skipped at {stage}"));
                return InstallReport::Skipped;
            }
            Err(e) => {
                let log = ctx.stage_log(package, stage);
                ctx.reporter.error(&format!(
                    "{package}: {stage} failed: {e}. See {}",
                    log.display()
                ));
                return InstallReport::Failure { log };
            }
        }
    }

    if installer.needs_restart() {
        InstallReport::Restart
    } else {
        InstallReport::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ForcedConfirm, NullReporter};
    use tempfile::tempdir;

    /// Installer implementing only download and check.
    struct MinimalInstaller {
        download_ok: bool,
        calls: Vec<&'static str>,
    }

    #[async_trait]
    impl PackageInstaller for MinimalInstaller {
        fn package(&self) -> PackageId {
            PackageId::Zlib
        }

        async fn download(
            &mut self,
            _ctx: &mut InstallContext<'_>,
        ) -> Result<StepResult, InstallError> {
            self.calls.push("download");
            if self.download_ok {
                Ok(StepResult::Advance)
            } else {
                Err(InstallError::Stage {
                    stage: "download",
                    message: "connection refused".into(),
                })
            }
        }

        async fn check(
            &mut self,
            _ctx: &mut InstallContext<'_>,
        ) -> Result<StepResult, InstallError> {
            self.calls.push("check");
            Ok(StepResult::Advance)
        }
    }

    struct DecliningInstaller;

    #[async_trait]
    impl PackageInstaller for DecliningInstaller {
        fn package(&self) -> PackageId {
            PackageId::Fastsim
        }

        async fn detect_existing(
            &mut self,
            ctx: &mut InstallContext<'_>,
        ) -> Result<StepResult, InstallError> {
            if ctx.confirm.confirm("overwrite existing install?", false) {
                Ok(StepResult::Advance)
            } else {
                Ok(StepResult::Skip)
            }
        }
    }

    struct RestartingInstaller;

    #[async_trait]
    impl PackageInstaller for RestartingInstaller {
        fn package(&self) -> PackageId {
            PackageId::FastsimTuned
        }

        fn needs_restart(&self) -> bool {
            true
        }
    }

    fn test_ctx<'a>(
        paths: &'a Paths,
        client: &'a Client,
        confirm: &'a ForcedConfirm,
        offline: bool,
    ) -> InstallContext<'a> {
        InstallContext {
            paths,
            client,
            reporter: &NullReporter,
            confirm,
            offline,
            jobs: 1,
            workspace: paths.tmp_path().join("test"),
        }
    }

    #[tokio::test]
    async fn minimal_installer_succeeds_skipping_absent_hooks() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let client = Client::new();
        let confirm = ForcedConfirm(true);
        let mut ctx = test_ctx(&paths, &client, &confirm, false);
        let mut installer = MinimalInstaller {
            download_ok: true,
            calls: Vec::new(),
        };
        let report = run_pipeline(&mut installer, &mut ctx).await;
        assert_eq!(report, InstallReport::Ok);
        assert_eq!(installer.calls, vec!["download", "check"]);
    }

    #[tokio::test]
    async fn failure_aborts_and_names_the_stage_log() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let client = Client::new();
        let confirm = ForcedConfirm(true);
        let mut ctx = test_ctx(&paths, &client, &confirm, false);
        let mut installer = MinimalInstaller {
            download_ok: false,
            calls: Vec::new(),
        };
        let report = run_pipeline(&mut installer, &mut ctx).await;
        let InstallReport::Failure { log } = report else {
            panic!("expected failure");
        };
        assert!(log.ends_with("install-zlib-download.log"));
        // check never ran
        assert_eq!(installer.calls, vec!["download"]);
    }

    #[tokio::test]
    async fn offline_skips_the_download_hook_entirely() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let client = Client::new();
        let confirm = ForcedConfirm(true);
        let mut ctx = test_ctx(&paths, &client, &confirm, true);
        let mut installer = MinimalInstaller {
            download_ok: false, // would fail if invoked
            calls: Vec::new(),
        };
        let report = run_pipeline(&mut installer, &mut ctx).await;
        assert_eq!(report, InstallReport::Ok);
        assert_eq!(installer.calls, vec!["check"]);
    }

    #[tokio::test]
    async fn declined_overwrite_is_skipped_not_failed() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let client = Client::new();
        let confirm = ForcedConfirm(false);
        let mut ctx = test_ctx(&paths, &client, &confirm, false);
        let report = run_pipeline(&mut DecliningInstaller, &mut ctx).await;
        assert_eq!(report, InstallReport::Skipped);
    }

    #[tokio::test]
    async fn restart_request_is_a_distinguished_result() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let client = Client::new();
        let confirm = ForcedConfirm(true);
        let mut ctx = test_ctx(&paths, &client, &confirm, false);
        let report = run_pipeline(&mut RestartingInstaller, &mut ctx).await;
        assert_eq!(report, InstallReport::Restart);
    }
}
