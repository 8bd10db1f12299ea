//! Directory layout under the installation root.
//!
//! Everything the engine touches lives under one home directory, resolved
//! from `HEPLAB_HOME` or `~/.heplab`. The layout is carried explicitly in a
//! [`Paths`] value (threaded through probe and installer contexts) so tests
//! can point the whole engine at a temporary root.

use dirs::home_dir;
use std::path::{Path, PathBuf};

use heplab_schema::PackageId;

/// Returns the installation root, or None if the user's home cannot be
/// resolved.
pub fn try_heplab_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("HEPLAB_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".heplab"))
}

/// Resolved directory layout for one installation root.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Layout rooted at the discovered home directory.
    ///
    /// # Errors
    ///
    /// Fails when neither `HEPLAB_HOME` is set nor the user's home directory
    /// can be resolved.
    pub fn discover() -> anyhow::Result<Self> {
        try_heplab_home().map(Self::at).ok_or_else(|| {
            anyhow::anyhow!("Could not determine home directory. Set HEPLAB_HOME to override.")
        })
    }

    /// Layout rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The installation root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persisted architecture snapshot: `<root>/arch-snapshot.json`
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join("arch-snapshot.json")
    }

    /// User overrides file: `<root>/overrides.cfg`
    pub fn overrides_path(&self) -> PathBuf {
        self.root.join("overrides.cfg")
    }

    /// Self-managed installs bundled with the program: `<root>/tools`
    pub fn tools_path(&self) -> PathBuf {
        self.root.join("tools")
    }

    /// Install directory of one self-managed package.
    pub fn tool_dir(&self, package: PackageId) -> PathBuf {
        self.tools_path().join(package.name())
    }

    /// Symlink farm pointing at detected original libraries:
    /// `<root>/lib/links`
    pub fn links_path(&self) -> PathBuf {
        self.root.join("lib").join("links")
    }

    /// Analysis-core source and build tree: `<root>/core`
    pub fn core_path(&self) -> PathBuf {
        self.root.join("core")
    }

    /// Compiled analysis-core libraries: `<root>/core/lib`
    pub fn core_lib_path(&self) -> PathBuf {
        self.core_path().join("lib")
    }

    /// Logs directory: `<root>/logs`
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// One log file per installer stage per package, at a predictable path
    /// so failure messages can name it.
    pub fn install_log_path(&self, package: PackageId, stage: &str) -> PathBuf {
        self.log_dir().join(format!("install-{package}-{stage}.log"))
    }

    /// Timestamped log for a core (re)build.
    pub fn core_build_log_path(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        self.log_dir().join(format!("core-build-{timestamp}.log"))
    }

    /// Scratch space for installer workspaces: `<root>/tmp`
    /// (guaranteed same volume as the tools dir)
    pub fn tmp_path(&self) -> PathBuf {
        self.root.join("tmp")
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let p = Paths::at("/tmp/hl");
        assert_eq!(p.snapshot_path(), PathBuf::from("/tmp/hl/arch-snapshot.json"));
        assert_eq!(p.tool_dir(PackageId::Jetclu), PathBuf::from("/tmp/hl/tools/jetclu"));
        assert_eq!(
            p.install_log_path(PackageId::Zlib, "compile"),
            PathBuf::from("/tmp/hl/logs/install-zlib-compile.log")
        );
    }

    #[test]
    fn filename_extraction() {
        assert_eq!(filename_from_url("https://x.org/a/b/zlib-1.3.tar.gz"), "zlib-1.3.tar.gz");
        assert_eq!(filename_from_url(""), "");
    }
}
