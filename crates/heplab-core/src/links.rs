//! Symlink farm under `<home>/lib/links`.
//!
//! The analysis core links against one flat directory of symlinks instead
//! of a per-package zoo of lib dirs. Each detected package contributes
//! links to its original library files; deactivating a package removes
//! exactly the links that point into it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create one symlink per original library inside `links_dir`, replacing
/// stale links of the same name.
pub fn link_libraries(links_dir: &Path, originals: &[PathBuf]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(links_dir)
        .with_context(|| format!("Failed to create {}", links_dir.display()))?;

    let mut created = Vec::with_capacity(originals.len());
    for original in originals {
        let Some(name) = original.file_name() else {
            continue;
        };
        let link = links_dir.join(name);
        if link.symlink_metadata().is_ok() {
            std::fs::remove_file(&link)?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(original, &link)
            .with_context(|| format!("Failed to link {}", link.display()))?;
        created.push(link);
    }
    Ok(created)
}

/// Remove every symlink in `links_dir` whose target lives under `prefix`.
/// A no-op when the farm does not exist.
pub fn unlink_into(links_dir: &Path, prefix: &Path) -> Result<()> {
    let Ok(entries) = std::fs::read_dir(links_dir) else {
        return Ok(());
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Ok(meta) = path.symlink_metadata() else {
            continue;
        };
        if !meta.is_symlink() {
            continue;
        }
        let Ok(target) = std::fs::read_link(&path) else {
            continue;
        };
        if target.starts_with(prefix) {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove link {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn links_then_selectively_unlinks() {
        let dir = tempdir().unwrap();
        let pkg_a = dir.path().join("a/lib");
        let pkg_b = dir.path().join("b/lib");
        std::fs::create_dir_all(&pkg_a).unwrap();
        std::fs::create_dir_all(&pkg_b).unwrap();
        std::fs::write(pkg_a.join("liba.so"), b"").unwrap();
        std::fs::write(pkg_b.join("libb.so"), b"").unwrap();

        let links = dir.path().join("links");
        link_libraries(&links, &[pkg_a.join("liba.so")]).unwrap();
        link_libraries(&links, &[pkg_b.join("libb.so")]).unwrap();
        assert!(links.join("liba.so").exists());
        assert!(links.join("libb.so").exists());

        unlink_into(&links, &dir.path().join("a")).unwrap();
        assert!(links.join("liba.so").symlink_metadata().is_err());
        assert!(links.join("libb.so").exists());
    }

    #[test]
    fn relinking_replaces_stale_links() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old/libx.so");
        let new = dir.path().join("new/libx.so");
        std::fs::create_dir_all(old.parent().unwrap()).unwrap();
        std::fs::create_dir_all(new.parent().unwrap()).unwrap();
        std::fs::write(&old, b"").unwrap();
        std::fs::write(&new, b"").unwrap();

        let links = dir.path().join("links");
        link_libraries(&links, std::slice::from_ref(&old)).unwrap();
        link_libraries(&links, std::slice::from_ref(&new)).unwrap();
        assert_eq!(std::fs::read_link(links.join("libx.so")).unwrap(), new);
    }

    #[test]
    fn unlink_on_missing_farm_is_a_noop() {
        let dir = tempdir().unwrap();
        unlink_into(&dir.path().join("nope"), Path::new("/x")).unwrap();
    }
}
