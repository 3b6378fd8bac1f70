//! Pipeline configuration.
//!
//! One `BuildConfig` drives a whole run. It is loaded from a TOML file and
//! never mutated afterwards; the few CLI overrides (clobber, jobs) are
//! applied before the pipeline starts.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

fn default_branch() -> String {
    "main".to_string()
}

fn default_bridge() -> String {
    "adb".to_string()
}

fn default_jobs() -> u32 {
    32
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Build configuration selected via `lunch`.
    pub build_target: String,

    /// Manifest repository for the image checkout.
    pub manifest_url: String,

    /// Branch of the manifest repository.
    #[serde(default = "default_branch")]
    pub manifest_branch: String,

    /// Command line that launches the emulator from the build environment.
    pub emulator: String,

    /// Test driver executable, invoked with `--debug <serial> <suite>`.
    pub test_runner: String,

    /// Suite name passed to the test driver.
    pub test_suite: String,

    /// Device bridge CLI (`devices` and `kill-server` subcommands).
    #[serde(default = "default_bridge")]
    pub bridge: String,

    /// `make` parallelism.
    #[serde(default = "default_jobs")]
    pub jobs: u32,
}

impl BuildConfig {
    /// Load a config file, with actionable errors for the usual mistakes.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Config not found: {}. Create it or pass --config",
                path.display()
            )
        })?;
        let config: BuildConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
pub fn test_config() -> BuildConfig {
    BuildConfig {
        build_target: "imgboard-eng".to_string(),
        manifest_url: "https://example.com/platform/manifest.git".to_string(),
        manifest_branch: "main".to_string(),
        emulator: "emulator".to_string(),
        test_runner: "test-driver".to_string(),
        test_suite: "device_smoke".to_string(),
        bridge: "adb".to_string(),
        jobs: 32,
    }
}
