//! Probe for the compression library.
//!
//! A usable install is a prefix containing `include/zlib.h` and a `libz.*`
//! under `lib/` (or `lib64/`). The version is parsed out of the
//! `ZLIB_VERSION` define in the header.

use std::path::{Path, PathBuf};

use heplab_schema::PackageId;

use crate::probe::{Detection, DependencyProbe, ProbeContext, find_library, list_libraries};

/// System prefixes tried during auto-detection, in order.
const SYSTEM_PREFIXES: [&str; 3] = ["/usr", "/usr/local", "/opt/local"];

#[derive(Debug, Default)]
pub struct ZlibProbe {
    include_dir: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    version: String,
    /// True when the accepted candidate came from the self-managed tools
    /// directory; that copy must be searched before system copies.
    from_tools: bool,
}

impl ZlibProbe {
    /// Check a single install prefix for header + library.
    fn inspect_prefix(&mut self, prefix: &Path) -> bool {
        let header = prefix.join("include").join("zlib.h");
        if !header.is_file() {
            return false;
        }
        for lib_name in ["lib", "lib64"] {
            let lib_dir = prefix.join(lib_name);
            if find_library(&lib_dir, "z").is_some() {
                self.include_dir = Some(prefix.join("include"));
                self.lib_dir = Some(lib_dir);
                return true;
            }
        }
        false
    }
}

impl DependencyProbe for ZlibProbe {
    fn package(&self) -> PackageId {
        PackageId::Zlib
    }

    fn manual_detection(&mut self, ctx: &mut ProbeContext<'_>) -> Detection {
        let Some(forced) = ctx.overrides.forced_path(self.package()) else {
            return Detection::not_found("no manual override");
        };
        if self.inspect_prefix(forced) {
            Detection::found(format!("using forced prefix {}", forced.display()))
        } else {
            Detection::issue(format!(
                "forced prefix {} has no usable zlib (need include/zlib.h and libz)",
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
        Detection::not_found("no system zlib")
    }

    fn extract_info(&mut self, _ctx: &mut ProbeContext<'_>) -> bool {
        let Some(include_dir) = &self.include_dir else {
            return false;
        };
        match parse_header_version(&include_dir.join("zlib.h")) {
            Some(v) => {
                self.version = v;
                true
            }
            None => {
                tracing::debug!("zlib.h found but ZLIB_VERSION could not be parsed");
                false
            }
        }
    }

    fn save_info(&self, ctx: &mut ProbeContext<'_>) -> bool {
        let (Some(include_dir), Some(lib_dir)) = (&self.include_dir, &self.lib_dir) else {
            return false;
        };
        let rec = ctx.snapshot.record_mut(self.package());
        rec.present = true;
        rec.version = self.version.clone();
        rec.include_paths = vec![include_dir.clone()];
        rec.library_paths = vec![lib_dir.clone()];
        rec.original_libraries = list_libraries(lib_dir, "z");
        rec.priority = self.from_tools;
        true
    }
}

/// Extract the version literal from `#define ZLIB_VERSION "1.3.1"`.
fn parse_header_version(header: &Path) -> Option<String> {
    let text = std::fs::read_to_string(header).ok()?;
    let re = regex::Regex::new(r#"#\s*define\s+ZLIB_VERSION\s+"([^"]+)""#).ok()?;
    re.captures(&text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use heplab_schema::{ArchSnapshot, ProbeOutcome, UserOverrides};
    use tempfile::tempdir;

    fn fake_prefix(root: &Path, version: &str) {
        std::fs::create_dir_all(root.join("include")).unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(
            root.join("include/zlib.h"),
            format!("#define ZLIB_VERSION \"{version}\"\n"),
        )
        .unwrap();
        std::fs::write(root.join("lib/libz.so.1.3.1"), b"").unwrap();
    }

    #[test]
    fn forced_prefix_is_accepted_and_versioned() {
        let dir = tempdir().unwrap();
        fake_prefix(dir.path(), "1.3.1");

        let mut snapshot = ArchSnapshot::new();
        let overrides =
            UserOverrides::parse(&format!("path_zlib = {}", dir.path().display())).unwrap();
        let paths = Paths::at("/nonexistent");
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = ZlibProbe::default();
        assert_eq!(probe.manual_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(probe.extract_info(&mut ctx));
        assert!(probe.save_info(&mut ctx));

        let rec = snapshot.record(PackageId::Zlib);
        assert!(rec.present);
        assert_eq!(rec.version, "1.3.1");
        assert_eq!(rec.include_paths, vec![dir.path().join("include")]);
        assert!(!rec.priority);
        assert_eq!(rec.original_libraries.len(), 1);
    }

    #[test]
    fn forced_prefix_without_library_is_an_issue() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("include")).unwrap();
        std::fs::write(dir.path().join("include/zlib.h"), "").unwrap();

        let mut snapshot = ArchSnapshot::new();
        let overrides =
            UserOverrides::parse(&format!("path_zlib = {}", dir.path().display())).unwrap();
        let paths = Paths::at("/nonexistent");
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = ZlibProbe::default();
        assert_eq!(probe.manual_detection(&mut ctx).outcome, ProbeOutcome::Issue);
    }

    #[test]
    fn tools_copy_gets_priority() {
        let home = tempdir().unwrap();
        let paths = Paths::at(home.path());
        fake_prefix(&paths.tool_dir(PackageId::Zlib), "1.3.0");

        let mut snapshot = ArchSnapshot::new();
        let overrides = UserOverrides::default();
        let mut ctx = ProbeContext {
            snapshot: &mut snapshot,
            overrides: &overrides,
            paths: &paths,
        };

        let mut probe = ZlibProbe::default();
        assert_eq!(probe.tools_detection(&mut ctx).outcome, ProbeOutcome::Found);
        assert!(probe.extract_info(&mut ctx));
        assert!(probe.save_info(&mut ctx));
        assert!(snapshot.record(PackageId::Zlib).priority);
    }

    #[test]
    fn header_version_parsing() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("zlib.h");
        std::fs::write(&header, "/* zlib */\n#define ZLIB_VERSION \"1.2.13\"\n").unwrap();
        assert_eq!(parse_header_version(&header).unwrap(), "1.2.13");

        std::fs::write(&header, "#define SOMETHING_ELSE 1\n").unwrap();
        assert!(parse_header_version(&header).is_none());
    }
}
