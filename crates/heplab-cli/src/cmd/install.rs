//! Package installation command.

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use heplab_core::installer::fastsim::FastsimInstaller;
use heplab_core::installer::histo::HistoInstaller;
use heplab_core::installer::jetclu::JetcluInstaller;
use heplab_core::installer::zlib::ZlibInstaller;
use heplab_core::installer::{self, InstallContext, InstallReport, PackageInstaller};
use heplab_core::paths::Paths;
use heplab_core::probe::{self, ProbeContext};
use heplab_core::reporter::{Confirm, ForcedConfirm, Reporter};
use heplab_schema::{ArchSnapshot, PackageId, UserOverrides};

use crate::ui::{ConsoleReporter, StdinConfirm};

fn make_installer(package: PackageId) -> Result<Box<dyn PackageInstaller>> {
    Ok(match package {
        PackageId::Zlib => Box::new(ZlibInstaller::new()),
        PackageId::Histo => Box::new(HistoInstaller::new()),
        PackageId::Jetclu => Box::new(JetcluInstaller::new()),
        PackageId::Fastsim | PackageId::FastsimTuned => Box::new(FastsimInstaller::new(package)),
        PackageId::Cxx => bail!("The C++ toolchain must be installed through your system"),
    })
}

/// Install each requested package through the pipeline. A failure is
/// reported and counted, but never stops the remaining packages.
pub async fn install(
    packages: &[String],
    offline: bool,
    yes: bool,
    jobs: Option<usize>,
) -> Result<ExitCode> {
    let paths = Paths::discover()?;
    std::fs::create_dir_all(paths.root())?;

    let requested: Vec<PackageId> = packages
        .iter()
        .map(|name| PackageId::from_str(name))
        .collect::<Result<_, _>>()?;

    let client = reqwest::Client::new();
    let reporter = ConsoleReporter;
    let stdin_confirm = StdinConfirm;
    let forced_confirm = ForcedConfirm(true);
    let confirm: &dyn Confirm = if yes { &forced_confirm } else { &stdin_confirm };
    let jobs = jobs.unwrap_or_else(num_cpus::get).max(1);

    let mut failed = false;
    let mut skipped = false;
    let mut restart = false;
    let mut installed: Vec<PackageId> = Vec::new();
    for package in requested {
        let mut installer = make_installer(package)?;
        let mut ctx = InstallContext {
            paths: &paths,
            client: &client,
            reporter: &reporter,
            confirm,
            offline,
            jobs,
            workspace: paths.tmp_path().join(package.name()),
        };
        match installer::run_pipeline(installer.as_mut(), &mut ctx).await {
            InstallReport::Ok => {
                println!("{package} installed");
                installed.push(package);
            }
            InstallReport::Skipped => {
                println!("{package} skipped");
                skipped = true;
            }
            InstallReport::Restart => {
                // Re-probing is pointless until the process restarts.
                println!("{package} installed");
                restart = true;
            }
            InstallReport::Failure { log } => {
                println!("{package} failed, see {}", log.display());
                failed = true;
            }
        }
    }

    if !installed.is_empty() {
        refresh_detection(&paths, &installed, &reporter)?;
    }
    if restart {
        println!("Restart the program for the new packages to take effect");
    }

    // Failure dominates; a restart request outranks a mere skip.
    let code = if failed {
        ExitCode::FAILURE
    } else if restart {
        ExitCode::from(3)
    } else if skipped {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };
    Ok(code)
}

/// Re-run detection for freshly installed packages and persist the updated
/// snapshot, so callers see the new state without a separate `detect`.
fn refresh_detection<R: Reporter + ?Sized>(
    paths: &Paths,
    packages: &[PackageId],
    reporter: &R,
) -> Result<()> {
    let overrides = UserOverrides::load(&paths.overrides_path())
        .with_context(|| format!("Bad overrides file {}", paths.overrides_path().display()))?;
    let mut snapshot = ArchSnapshot::load(&paths.snapshot_path()).unwrap_or_default();
    {
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths,
        };
        for &package in packages {
            let mut probe = probe::make_probe(package);
            probe::run_probe(probe.as_mut(), &mut ctx, package.mandatory(), reporter);
        }
    }
    snapshot
        .save(&paths.snapshot_path())
        .context("Failed to persist the snapshot")
}
