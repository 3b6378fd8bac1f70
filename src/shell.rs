//! Shell line formatting and execution.
//!
//! Every command that touches the build tree runs through one formatted
//! line that sources the environment setup, selects the build target, and
//! sets the output directory before the payload. The setup steps chain with
//! `&&`, so the payload never runs against a half-configured environment.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Outcome of one synchronous shell invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    /// Combined stdout and stderr text.
    pub output: String,
    pub duration: Duration,
}

/// Options for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Fail with `CommandFailed` on non-zero exit. Turn off to inspect the
    /// exit code manually.
    pub check: bool,
    /// Do not echo the captured output to stdout.
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: true,
            quiet: false,
        }
    }
}

/// Format one shell line that prepares the build environment and then runs
/// `payload`. Setup output is discarded; payload output is kept.
pub fn lunch_line(out_dir: &Path, target: &str, payload: &[&str]) -> String {
    let steps = [
        ". build/envsetup.sh".to_string(),
        format!("lunch {target}"),
        format!("OUT_DIR={}", out_dir.display()),
        payload.join(" "),
    ];
    steps.join(" > /dev/null && ")
}

/// Run a formatted line with `bash -c` in `cwd`, blocking until it exits
/// and capturing combined output.
pub fn run(line: &str, cwd: &Path, opts: RunOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let output = Command::new("bash")
        .args(["-c", line])
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run shell line: {line}"))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    let exit_code = output.status.code().unwrap_or(-1);
    let result = CommandResult {
        exit_code,
        output: text,
        duration: start.elapsed(),
    };

    if !opts.quiet && !result.output.is_empty() {
        print!("{}", result.output);
    }

    if opts.check && !output.status.success() {
        return Err(PipelineError::CommandFailed {
            code: exit_code,
            output: result.output,
        }
        .into());
    }

    Ok(result)
}

/// Spawn a line in the background, combined output redirected to `log`.
/// The caller owns the returned child.
pub fn spawn_logged(line: &str, cwd: &Path, log: &std::fs::File) -> Result<Child> {
    let stdout = log.try_clone().context("Failed to clone log handle")?;
    let stderr = log.try_clone().context("Failed to clone log handle")?;

    Command::new("bash")
        .args(["-c", line])
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .with_context(|| format!("Failed to spawn: {line}"))
}
