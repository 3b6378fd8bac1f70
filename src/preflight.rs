//! Host tool preflight checks.
//!
//! The pipeline shells out to a handful of host binaries; checking them all
//! up front beats failing twenty minutes into a sync.

use crate::config::BuildConfig;
use anyhow::{bail, Result};
use std::process::{Command, Stdio};

/// Verify every host binary the pipeline needs, reporting all missing
/// tools at once.
pub fn check(cfg: &BuildConfig) -> Result<()> {
    println!("Running preflight checks...");

    let mut required: Vec<&str> = vec!["bash", "make", "repo"];
    required.push(&cfg.bridge);

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|tool| !tool_exists(tool))
        .collect();

    if !missing.is_empty() {
        println!("Missing tools:");
        for tool in &missing {
            println!("  - {tool}");
        }
        bail!("Missing required tools: {}", missing.join(", "));
    }

    println!("Preflight checks passed.");
    Ok(())
}

fn tool_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
