//! Probe for the jet-clustering library.
//!
//! The library is introspected through its `jetclu-config` helper, the same
//! way the library's own build system expects consumers to locate it. A
//! helper that exists but fails to run is an `Issue`, not a miss.

use std::path::{Path, PathBuf};

use heplab_schema::PackageId;

use crate::probe::{Detection, DependencyProbe, ProbeContext, list_libraries};
use crate::process::CommandSpec;

const CONFIG_HELPER: &str = "jetclu-config";

/// Oldest release whose plugin ABI the analysis core supports.
const MIN_VERSION: semver::Version = semver::Version::new(3, 0, 0);

#[derive(Debug, Default)]
pub struct JetcluProbe {
    helper: Option<PathBuf>,
    version: String,
    prefix: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    from_tools: bool,
}

impl JetcluProbe {
    /// Ask the config helper one question, trimming the answer.
    fn query(&self, flag: &str) -> Option<String> {
        let helper = self.helper.as_ref()?;
        let out = CommandSpec::new(helper.to_string_lossy())
            .arg(flag)
            .run()
            .ok()?;
        out.success.then_some(out.stdout)
    }
}

impl DependencyProbe for JetcluProbe {
    fn package(&self) -> PackageId {
        PackageId::Jetclu
    }

    fn manual_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let Some(forced) = ctx.overrides.forced_path(self.package()) else {
            return Detection::not_found("no manual override");
        };
        // Accept either the helper itself or a prefix containing bin/.
        let candidate = if forced.is_file() {
            forced.to_path_buf()
        } else {
            forced.join("bin").join(CONFIG_HELPER)
        };
        if candidate.is_file() {
            self.helper = Some(candidate);
            Detection::found(format!("using forced path {}", forced.display()))
        } else {
            Detection::issue(format!(
                "forced path {} has no {CONFIG_HELPER}",
                forced.display()
            ))
        }
    }

    fn tools_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let candidate = ctx
            .paths
            .tool_dir(self.package())
            .join("bin")
            .join(CONFIG_HELPER);
        if candidate.is_file() {
            self.helper = Some(candidate);
            self.from_tools = true;
            Detection::found("using bundled copy from tools directory")
        } else {
            Detection::not_found("not in tools directory")
        }
    }

    fn auto_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        match which::which(CONFIG_HELPER) {
            Ok(path) => {
                self.helper = Some(path.clone());
                Detection::found(format!("found {CONFIG_HELPER} at {}", path.display()))
            }
            Err(_) => Detection::not_found(format!("{CONFIG_HELPER} not on PATH")),
        }
    }

    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        let Some(version) = self.query("--version") else {
            tracing::debug!("{CONFIG_HELPER} exists but does not answer --version");
            return false;
        };
        let Some(prefix) = self.query("--prefix") else {
            return false;
        };
        match semver::Version::parse(&version) {
            Ok(v) if v >= MIN_VERSION => {}
            Ok(v) => {
                tracing::debug!("jetclu {v} is older than supported {MIN_VERSION}");
                return false;
            }
            Err(e) => {
                tracing::debug!("unparseable jetclu version '{version}': {e}");
                return false;
            }
        }
        let prefix = PathBuf::from(prefix);
        self.lib_dir = Some(prefix.join("lib"));
        self.prefix = Some(prefix);
        self.version = version;
        true
    }

    fn save_info(&self, ctx: &mut ProbeContext<'_>) -> bool {
        let (Some(prefix), Some(lib_dir)) = (&self.prefix, &self.lib_dir) else {
            return false;
        };
        let rec = ctx.snapshot.record_mut(self.package());
        rec.present = true;
        rec.version = self.version.clone();
        rec.include_paths = vec![prefix.join("include")];
        rec.library_paths = vec![lib_dir.clone()];
        rec.original_libraries = list_libraries(lib_dir, "jetclu");
        rec.priority = self.from_tools;
        true
    }

    fn finalize(&self, _ctx: &mut ProbeContext<'_>) -> bool {
        // The helper may report a prefix that was since moved or deleted.
        self.prefix.as_deref().is_some_and(Path::exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use heplab_schema::{ArchSnapshot, ProbeOutcome, UserOverrides};
    use tempfile::tempdir;

    #[cfg(unix)]
    fn fake_helper(prefix: &Path, version: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        std::fs::create_dir_all(prefix.join("bin")).unwrap();
        std::fs::create_dir_all(prefix.join("lib")).unwrap();
        std::fs::create_dir_all(prefix.join("include")).unwrap();
        std::fs::write(prefix.join("lib/libjetclu.so"), b"").unwrap();
        let helper = prefix.join("bin").join(CONFIG_HELPER);
        std::fs::write(
            &helper,
            format!(
                "#!/bin/sh\ncase \"$1\" in\n--version) echo {version};;\n--prefix) echo {};;\nesac\n",
                prefix.display()
            ),
        )
        .unwrap();
        let mut perms = std::fs::metadata(&helper).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&helper, perms).unwrap();
        helper
    }

    #[cfg(unix)]
    #[test]
    fn helper_introspection_populates_the_record() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        fake_helper(&paths.tool_dir(PackageId::Jetclu), "3.4.1");

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = JetcluProbe::default();
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(probe.extract_info(&mut ctx));
        assert!(probe.save_info(&mut ctx));
        assert!(probe.finalize(&mut ctx));

        let rec = snapshot.record(PackageId::Jetclu);
        assert!(rec.present);
        assert_eq!(rec.version, "3.4.1");
        assert!(rec.priority);
        assert_eq!(rec.original_libraries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn too_old_version_fails_extract() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        fake_helper(&paths.tool_dir(PackageId::Jetclu), "2.9.0");

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = JetcluProbe::default();
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(!probe.extract_info(&mut ctx));
    }

    #[cfg(unix)]
    #[test]
    fn broken_helper_fails_extract() {
        use std::os::unix::fs::PermissionsExt;
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let prefix = paths.tool_dir(PackageId::Jetclu);
        std::fs::create_dir_all(prefix.join("bin")).unwrap();
        let helper = prefix.join("bin").join(CONFIG_HELPER);
        std::fs::write(&helper, "#!/bin/sh\nexit 1\n").unwrap();
        let mut perms = std::fs::metadata(&helper).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&helper, perms).unwrap();

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = JetcluProbe::default();
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(!probe.extract_info(&mut ctx));
    }
}
