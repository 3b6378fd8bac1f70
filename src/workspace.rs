//! Workspace paths and cleanup.
//!
//! The image checkout lives next to the primary build root (same parent,
//! fixed suffix). It must be outside the primary tree because it is a
//! separate checkout, and not under /tmp because the initial sync is too
//! expensive to redo for no reason.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Suffix appended to the primary build root to form the checkout root.
const CHECKOUT_SUFFIX: &str = "_image";

#[derive(Debug, Clone)]
pub struct Workspace {
    buildroot: PathBuf,
}

impl Workspace {
    pub fn new(buildroot: impl Into<PathBuf>) -> Self {
        Self {
            buildroot: buildroot.into(),
        }
    }

    /// Checkout root: the primary build root path with a fixed suffix.
    pub fn root(&self) -> PathBuf {
        let mut path = self.buildroot.clone().into_os_string();
        path.push(CHECKOUT_SUFFIX);
        PathBuf::from(path)
    }

    /// Build output directory inside the checkout.
    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Remove build output; with `clobber`, remove the whole checkout too.
    /// Missing targets are not errors.
    pub fn clean(&self, clobber: bool) -> Result<()> {
        remove_dir_if_present(&self.out_dir())?;
        if clobber {
            remove_dir_if_present(&self.root())?;
        }
        Ok(())
    }

    /// Create the checkout root (and parents) if absent.
    pub fn ensure_root(&self) -> Result<()> {
        let root = self.root();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create {}", root.display()))
    }
}

fn remove_dir_if_present(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_in(dir: &Path) -> Workspace {
        Workspace::new(dir.join("build"))
    }

    #[test]
    fn test_root_is_sibling_with_suffix() {
        let ws = Workspace::new("/mnt/data/build");
        assert_eq!(ws.root(), PathBuf::from("/mnt/data/build_image"));
        assert_eq!(ws.out_dir(), PathBuf::from("/mnt/data/build_image/out"));
    }

    #[test]
    fn test_clean_removes_output_but_keeps_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(dir.path());
        std::fs::create_dir_all(ws.out_dir()).unwrap();
        std::fs::write(ws.out_dir().join("image.bin"), b"x").unwrap();
        std::fs::write(ws.root().join("manifest.xml"), b"x").unwrap();

        ws.clean(false).unwrap();

        assert!(!ws.out_dir().exists());
        assert!(ws.root().exists());
        assert!(ws.root().join("manifest.xml").exists());
    }

    #[test]
    fn test_clobber_removes_whole_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(dir.path());
        std::fs::create_dir_all(ws.out_dir()).unwrap();

        ws.clean(true).unwrap();

        assert!(!ws.root().exists());
    }

    #[test]
    fn test_clean_tolerates_absent_targets() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(dir.path());
        ws.clean(false).unwrap();
        ws.clean(true).unwrap();
    }

    #[test]
    fn test_ensure_root_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(dir.path());
        ws.ensure_root().unwrap();
        ws.ensure_root().unwrap();
        assert!(ws.root().is_dir());
    }
}
