//! Archive extraction for installer workspaces.
//!
//! Upstream packages ship as plain `.tar.gz`; extraction is synchronous and
//! happens inside the installer's scratch directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Unpack a gzipped tarball into `dest`, creating it as needed.
pub fn unpack_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to unpack {}", archive_path.display()))?;
    Ok(())
}

/// If `dir` contains exactly one directory and nothing else, hoist that
/// directory's contents up one level. Upstream tarballs almost always wrap
/// everything in a `name-version/` root.
pub fn strip_components(dir: &Path) -> Result<()> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    let [only] = entries.as_slice() else {
        return Ok(());
    };
    if !only.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(only)? {
        let entry = entry?;
        let target = dir.join(entry.file_name());
        fs::rename(entry.path(), target)?;
    }
    fs::remove_dir(only)?;
    Ok(())
}
