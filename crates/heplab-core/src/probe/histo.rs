//! Probe for the math / histogramming library.
//!
//! A usable install is a prefix containing `include/histo/histo.h` and a
//! `libhisto.*`. The version is read from the `VERSION` file the library
//! ships at its prefix root.

use std::path::{Path, PathBuf};

use heplab_schema::PackageId;

use crate::probe::{Detection, DependencyProbe, ProbeContext, find_library, list_libraries};

const SYSTEM_PREFIXES: [&str; 2] = ["/usr/local", "/opt/histo"];

#[derive(Debug, Default)]
pub struct HistoProbe {
    prefix: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    version: String,
    from_tools: bool,
}

impl HistoProbe {
    fn inspect_prefix(&mut self, prefix: &Path) -> bool {
        if !prefix.join("include").join("histo").join("histo.h").is_file() {
            return false;
        }
        let lib_dir = prefix.join("lib");
        if find_library(&lib_dir, "histo").is_none() {
            return false;
        }
        self.prefix = Some(prefix.to_path_buf());
        self.lib_dir = Some(lib_dir);
        true
    }
}

impl DependencyProbe for HistoProbe {
    fn package(&self) -> PackageId {
        PackageId::Histo
    }

    fn manual_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let Some(forced) = ctx.overrides.forced_path(self.package()) else {
            return Detection::not_found("no manual override");
        };
        if self.inspect_prefix(forced) {
            Detection::found(format!("using forced prefix {}", forced.display()))
        } else {
            Detection::issue(format!(
                "forced prefix {} has no usable histo install",
                forced.display()
            ))
        }
    }

    fn tools_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let tool_dir = ctx.paths.tool_dir(self.package());
        if self.inspect_prefix(&tool_dir) {
            self.from_tools = true;
            Detection::found(format!("using bundled copy at {}", tool_dir.display()))
        } else {
            Detection::not_found("not in tools directory")
        }
    }

    fn auto_detection(&mut self, _ctx: &mut ProbeContext<'_>) -> Detection {
        for prefix in SYSTEM_PREFIXES {
            if self.inspect_prefix(Path::new(prefix)) {
                return Detection::found(format!("found under {prefix}"));
            }
        }
        Detection::not_found("no system histo install")
    }

    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        let Some(prefix) = &self.prefix else {
            return false;
        };
        match std::fs::read_to_string(prefix.join("VERSION")) {
            Ok(v) if !v.trim().is_empty() => {
                self.version = v.trim().to_string();
                true
            }
            _ => {
                tracing::debug!("histo install at {} has no VERSION file", prefix.display());
                false
            }
        }
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
        rec.original_libraries = list_libraries(lib_dir, "histo");
        rec.priority = self.from_tools;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use heplab_schema::{ArchSnapshot, ProbeOutcome, UserOverrides};
    use tempfile::tempdir;

    pub(crate) fn fake_histo(prefix: &Path, version: &str) {
        std::fs::create_dir_all(prefix.join("include/histo")).unwrap();
        std::fs::create_dir_all(prefix.join("lib")).unwrap();
        std::fs::write(prefix.join("include/histo/histo.h"), "").unwrap();
        std::fs::write(prefix.join("lib/libhisto.so"), b"").unwrap();
        std::fs::write(prefix.join("VERSION"), version).unwrap();
    }

    #[test]
    fn full_probe_through_tools_dir() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        fake_histo(&paths.tool_dir(PackageId::Histo), "2.4.0\n");

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = HistoProbe::default();
        assert_eq!(
            probe.manual_detection(&mut ctx).outcome,
            ProbeOutcome::NotFound
        );
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(probe.extract_info(&mut ctx));
        assert!(probe.save_info(&mut ctx));

        let rec = snapshot.record(PackageId::Histo);
        assert!(rec.present);
        assert_eq!(rec.version, "2.4.0");
        assert!(rec.priority);
    }

    #[test]
    fn missing_version_file_fails_extract() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        let prefix = paths.tool_dir(PackageId::Histo);
        fake_histo(&prefix, "x");
        std::fs::remove_file(prefix.join("VERSION")).unwrap();

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = HistoProbe::default();
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(!probe.extract_info(&mut ctx));
    }
}
