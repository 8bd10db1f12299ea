//! User-declared veto flags and forced paths, read once per process from a
//! flat `key = value` file. Pure input: no behavior lives here.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::package::PackageId;

/// Errors from parsing the overrides file.
#[derive(Debug, thiserror::Error)]
pub enum OverridesError {
    #[error("IO error reading overrides: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 'key = value', got '{text}'")]
    Malformed { line: usize, text: String },

    #[error("line {line}: boolean key '{key}' accepts only 0 or 1, got '{value}'")]
    BadBool {
        line: usize,
        key: String,
        value: String,
    },
}

/// Immutable per-package overrides. Vetoes are only honored for optional
/// packages; the orchestrator ignores a veto on a mandatory one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserOverrides {
    vetoed: BTreeMap<PackageId, bool>,
    forced_paths: BTreeMap<PackageId, PathBuf>,
}

impl UserOverrides {
    /// Parse an overrides file. A missing file is an empty override set.
    ///
    /// Format: one `key = value` per line, `#` starts a comment, blank
    /// lines are ignored. Unknown keys log a warning and are skipped;
    /// malformed lines and non-`0`/`1` booleans are hard errors.
    pub fn load(path: &Path) -> Result<Self, OverridesError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&text)
    }

    /// Parse overrides from a string (see [`load`](Self::load)).
    pub fn parse(text: &str) -> Result<Self, OverridesError> {
        let mut overrides = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(OverridesError::Malformed {
                    line: line_no,
                    text: raw.trim().to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim();

            if let Some(pkg_name) = key.strip_prefix("veto_") {
                let Ok(pkg) = pkg_name.parse::<PackageId>() else {
                    tracing::warn!("overrides line {line_no}: unknown key '{key}', ignored");
                    continue;
                };
                let flag = match value {
                    "0" => false,
                    "1" => true,
                    other => {
                        return Err(OverridesError::BadBool {
                            line: line_no,
                            key: key.to_string(),
                            value: other.to_string(),
                        });
                    }
                };
                overrides.vetoed.insert(pkg, flag);
            } else if let Some(pkg_name) = key.strip_prefix("path_") {
                let Ok(pkg) = pkg_name.parse::<PackageId>() else {
                    tracing::warn!("overrides line {line_no}: unknown key '{key}', ignored");
                    continue;
                };
                overrides.forced_paths.insert(pkg, PathBuf::from(value));
            } else {
                tracing::warn!("overrides line {line_no}: unknown key '{key}', ignored");
            }
        }

        Ok(overrides)
    }

    /// Whether the user explicitly disabled this package.
    pub fn is_vetoed(&self, package: PackageId) -> bool {
        self.vetoed.get(&package).copied().unwrap_or(false)
    }

    /// The user-forced search path for this package, if any.
    pub fn forced_path(&self, package: PackageId) -> Option<&Path> {
        self.forced_paths.get(&package).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vetoes_and_paths() {
        let ov = UserOverrides::parse(
            "# local site config\n\
             veto_jetclu = 1\n\
             veto_zlib = 0\n\
             path_histo = /opt/histo  # forced\n",
        )
        .unwrap();
        assert!(ov.is_vetoed(PackageId::Jetclu));
        assert!(!ov.is_vetoed(PackageId::Zlib));
        assert_eq!(
            ov.forced_path(PackageId::Histo),
            Some(Path::new("/opt/histo"))
        );
        assert_eq!(ov.forced_path(PackageId::Zlib), None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let ov = UserOverrides::parse("veto_pythia = 1\ncolor = blue\n").unwrap();
        assert!(!ov.is_vetoed(PackageId::Jetclu));
    }

    #[test]
    fn non_binary_boolean_is_rejected() {
        let err = UserOverrides::parse("veto_jetclu = yes\n").unwrap_err();
        assert!(matches!(err, OverridesError::BadBool { line: 1, .. }));
    }

    #[test]
    fn malformed_line_is_rejected() {
        let err = UserOverrides::parse("veto_jetclu\n").unwrap_err();
        assert!(matches!(err, OverridesError::Malformed { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_empty() {
        let ov = UserOverrides::load(Path::new("/nonexistent/overrides.cfg")).unwrap();
        assert!(!ov.is_vetoed(PackageId::Zlib));
    }
}
