//! Build decision engine and core (re)build orchestration.
//!
//! The analysis core is compiled against a fixed dependency configuration,
//! so the decision is deliberately conservative: any drift between the
//! freshly probed snapshot and the one persisted after the last successful
//! build forces a full rebuild. The snapshot on disk is only overwritten
//! after `make` succeeds, so an interrupted rebuild is retried on the next
//! start instead of being silently accepted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use heplab_schema::{ArchSnapshot, PackageId};

use crate::paths::Paths;
use crate::process::{CommandSpec, read_last_lines};

/// Static core library every build must produce.
const CORE_ARTIFACT: &str = "libanalysis.a";

/// Sub-library that depends on which detector-simulation variant is active.
const SIMULATION_ARTIFACT: &str = "libanalysis_fastsim.so";

/// Why a rebuild is (not) needed. Carried for the log line; the caller only
/// branches on `Option::is_some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    FirstRun,
    MissingArtifacts,
    SnapshotDrift,
    UserForced,
}

/// Decide whether the analysis core must be rebuilt.
///
/// `saved` is `None` on a first-ever run or when the persisted snapshot was
/// unreadable (fail closed). Snapshot comparison is full structural
/// equality over every field.
pub fn evaluate(
    current: &ArchSnapshot,
    saved: Option<&ArchSnapshot>,
    artifacts_present: bool,
    forced: bool,
) -> Option<RebuildReason> {
    if forced {
        return Some(RebuildReason::UserForced);
    }
    let Some(saved) = saved else {
        return Some(RebuildReason::FirstRun);
    };
    if !artifacts_present {
        return Some(RebuildReason::MissingArtifacts);
    }
    if current != saved {
        return Some(RebuildReason::SnapshotDrift);
    }
    None
}

/// Orchestrates the external `make` invocation for the analysis core.
#[derive(Debug)]
pub struct CoreBuilder<'a> {
    paths: &'a Paths,
    jobs: usize,
}

impl<'a> CoreBuilder<'a> {
    pub fn new(paths: &'a Paths) -> Self {
        Self {
            paths,
            jobs: num_cpus::get(),
        }
    }

    /// Core count handed to `make -j`; the engine itself stays
    /// single-threaded.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Whether every expected compiled artifact exists on disk.
    pub fn artifacts_present(&self, snapshot: &ArchSnapshot) -> bool {
        let lib = self.paths.core_lib_path();
        if !lib.join(CORE_ARTIFACT).is_file() {
            return false;
        }
        let simulation_active = snapshot.record(PackageId::Fastsim).present
            || snapshot.record(PackageId::FastsimTuned).present;
        if simulation_active && !lib.join(SIMULATION_ARTIFACT).is_file() {
            return false;
        }
        true
    }

    /// Aggregate include/library search paths from every present package,
    /// priority copies first.
    fn search_paths(snapshot: &ArchSnapshot) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut includes = Vec::new();
        let mut libs = Vec::new();
        let records = || {
            PackageId::ALL
                .into_iter()
                .map(|p| snapshot.record(p))
                .filter(|r| r.present)
        };
        for record in records().filter(|r| r.priority) {
            includes.extend(record.include_paths.iter().cloned());
            libs.extend(record.library_paths.iter().cloned());
        }
        for record in records().filter(|r| !r.priority) {
            includes.extend(record.include_paths.iter().cloned());
            libs.extend(record.library_paths.iter().cloned());
        }
        (includes, libs)
    }

    fn make_command(&self, snapshot: &ArchSnapshot, target: Option<&str>) -> CommandSpec {
        let (includes, libs) = Self::search_paths(snapshot);
        let mut cmd = CommandSpec::new("make")
            .arg(format!("-j{}", self.jobs))
            .current_dir(self.paths.core_path())
            .env_paths("HEPLAB_INCLUDE_PATH", &includes)
            .env_paths("HEPLAB_LIBRARY_PATH", &libs)
            .env_paths("LIBRARY_PATH", &[self.paths.links_path()]);
        if let Some(target) = target {
            cmd = cmd.arg(target);
        }
        cmd
    }

    /// Full rebuild. On success the snapshot is persisted; on failure the
    /// old persisted snapshot is left untouched and the log file is named.
    pub fn rebuild(&self, snapshot: &ArchSnapshot) -> Result<()> {
        let log_path = self.paths.core_build_log_path();
        let ok = self
            .make_command(snapshot, None)
            .run_logged(&log_path)
            .context("Failed to run make for the analysis core")?;
        if !ok {
            if let Ok(tail) = read_last_lines(&log_path, 20) {
                tracing::error!("core build failed. Last lines:\n{tail}");
            }
            anyhow::bail!("Core build failed. See {}", log_path.display());
        }
        snapshot
            .save(&self.paths.snapshot_path())
            .context("Core built but the snapshot could not be persisted")?;
        Ok(())
    }

    /// Targeted rebuild of the simulation sub-libraries only, used when a
    /// detector-simulation variant is switched. A missing core tree means
    /// nothing has been built yet, so there is nothing to refresh.
    pub fn rebuild_simulation_libs(&self, snapshot: &ArchSnapshot) -> Result<()> {
        if !self.paths.core_path().is_dir() {
            tracing::debug!("no core tree, skipping targeted rebuild");
            return Ok(());
        }
        let log_path = self.paths.core_build_log_path();
        let ok = self
            .make_command(snapshot, Some("simulation"))
            .run_logged(&log_path)
            .context("Failed to run make for the simulation sub-libraries")?;
        if !ok {
            anyhow::bail!(
                "Simulation sub-library build failed. See {}",
                log_path.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot_with_zlib(version: &str) -> ArchSnapshot {
        let mut snap = ArchSnapshot::new();
        let rec = snap.record_mut(PackageId::Zlib);
        rec.present = true;
        rec.version = version.into();
        rec.include_paths = vec!["/usr/include".into()];
        rec.library_paths = vec!["/usr/lib".into()];
        snap
    }

    #[test]
    fn identical_snapshots_do_not_rebuild() {
        let snap = snapshot_with_zlib("1.3.1");
        assert_eq!(evaluate(&snap, Some(&snap.clone()), true, false), None);
    }

    #[test]
    fn single_version_drift_forces_rebuild() {
        let current = snapshot_with_zlib("1.3.1");
        let saved = snapshot_with_zlib("1.3.0");
        assert_eq!(
            evaluate(&current, Some(&saved), true, false),
            Some(RebuildReason::SnapshotDrift)
        );
    }

    #[test]
    fn first_run_forces_rebuild() {
        let snap = snapshot_with_zlib("1.3.1");
        assert_eq!(
            evaluate(&snap, None, true, false),
            Some(RebuildReason::FirstRun)
        );
    }

    #[test]
    fn missing_artifacts_force_rebuild() {
        let snap = snapshot_with_zlib("1.3.1");
        assert_eq!(
            evaluate(&snap, Some(&snap.clone()), false, false),
            Some(RebuildReason::MissingArtifacts)
        );
    }

    #[test]
    fn user_force_wins_even_when_clean() {
        let snap = snapshot_with_zlib("1.3.1");
        assert_eq!(
            evaluate(&snap, Some(&snap.clone()), true, true),
            Some(RebuildReason::UserForced)
        );
    }

    #[test]
    fn informational_drift_still_forces_rebuild() {
        // A compiler version string change alone invalidates the build.
        let mut current = ArchSnapshot::new();
        let rec = current.record_mut(PackageId::Cxx);
        rec.present = true;
        rec.version = "g++ 13.2.0".into();
        rec.library_paths = vec!["/usr/bin".into()];
        let mut saved = current.clone();
        saved.record_mut(PackageId::Cxx).version = "g++ 12.3.0".into();
        assert_eq!(
            evaluate(&current, Some(&saved), true, false),
            Some(RebuildReason::SnapshotDrift)
        );
    }

    #[test]
    fn artifact_presence_accounts_for_active_simulation() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let builder = CoreBuilder::new(&paths);

        let mut snap = snapshot_with_zlib("1.3.1");
        assert!(!builder.artifacts_present(&snap));

        std::fs::create_dir_all(paths.core_lib_path()).unwrap();
        std::fs::write(paths.core_lib_path().join(CORE_ARTIFACT), b"").unwrap();
        assert!(builder.artifacts_present(&snap));

        let rec = snap.record_mut(PackageId::Fastsim);
        rec.present = true;
        rec.version = "3.5.0".into();
        rec.library_paths = vec!["/x/lib".into()];
        assert!(!builder.artifacts_present(&snap));

        std::fs::write(paths.core_lib_path().join(SIMULATION_ARTIFACT), b"").unwrap();
        assert!(builder.artifacts_present(&snap));
    }

    #[test]
    fn snapshot_persists_only_after_successful_build() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        // A core tree whose Makefile always fails.
        std::fs::create_dir_all(paths.core_path()).unwrap();
        std::fs::write(
            paths.core_path().join("Makefile"),
            "all:\n\tfalse\n",
        )
        .unwrap();

        let snap = snapshot_with_zlib("1.3.1");
        let builder = CoreBuilder::new(&paths).jobs(1);
        assert!(builder.rebuild(&snap).is_err());
        assert!(!paths.snapshot_path().exists());
    }

    #[test]
    fn successful_build_persists_the_snapshot() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        std::fs::create_dir_all(paths.core_path()).unwrap();
        std::fs::write(paths.core_path().join("Makefile"), "all:\n\ttrue\n").unwrap();

        let snap = snapshot_with_zlib("1.3.1");
        let builder = CoreBuilder::new(&paths).jobs(1);
        builder.rebuild(&snap).unwrap();
        let saved = ArchSnapshot::load(&paths.snapshot_path()).unwrap();
        assert_eq!(saved, snap);
    }

    #[test]
    fn priority_paths_come_first() {
        let mut snap = snapshot_with_zlib("1.3.1");
        let rec = snap.record_mut(PackageId::Histo);
        rec.present = true;
        rec.version = "2.4.0".into();
        rec.include_paths = vec!["/tools/histo/include".into()];
        rec.library_paths = vec!["/tools/histo/lib".into()];
        rec.priority = true;

        let (includes, libs) = CoreBuilder::search_paths(&snap);
        assert_eq!(includes[0], PathBuf::from("/tools/histo/include"));
        assert_eq!(libs[0], PathBuf::from("/tools/histo/lib"));
        assert!(includes.contains(&PathBuf::from("/usr/include")));
    }
}
