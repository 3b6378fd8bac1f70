//! Repository-sync collaborator boundary.
//!
//! The checkout is a manifest-driven multi-repository tree managed by the
//! `repo` tool. This module owns only the consumed interface; checkout
//! internals and retry policy belong to the tool itself.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Consumed interface of the source-sync collaborator.
pub trait SourceSync {
    /// Prepare `dir` as a checkout of `manifest_url` at `branch`.
    fn initialize(&mut self, manifest_url: &str, branch: &str, dir: &Path) -> Result<()>;

    /// Bring the checkout up to date.
    fn sync(&mut self) -> Result<()>;
}

/// `repo`-CLI backed implementation.
#[derive(Default)]
pub struct RepoCli {
    dir: Option<PathBuf>,
}

impl RepoCli {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceSync for RepoCli {
    fn initialize(&mut self, manifest_url: &str, branch: &str, dir: &Path) -> Result<()> {
        let status = Command::new("repo")
            .args(["init", "-u", manifest_url, "-b", branch])
            .current_dir(dir)
            .status()
            .context("Failed to run repo init")?;
        if !status.success() {
            bail!("repo init failed for {manifest_url} @ {branch}");
        }
        self.dir = Some(dir.to_path_buf());
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let dir = self.dir.as_ref().context("Checkout not initialized")?;
        let status = Command::new("repo")
            .arg("sync")
            .current_dir(dir)
            .status()
            .context("Failed to run repo sync")?;
        if !status.success() {
            bail!("repo sync failed");
        }
        Ok(())
    }
}
