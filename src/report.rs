//! Per-run stage report.
//!
//! Written into the primary build root after every full run, success or
//! failure, so a failed run can be diagnosed without re-running.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    pub fn ok(stage: &str, duration: Duration) -> Self {
        Self {
            stage: stage.to_string(),
            outcome: StageOutcome::Ok,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    pub fn failed(stage: &str, duration: Duration, err: &anyhow::Error) -> Self {
        Self {
            stage: stage.to_string(),
            outcome: StageOutcome::Failed,
            duration_ms: duration.as_millis() as u64,
            error: Some(format!("{err:#}")),
        }
    }

    pub fn skipped(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            outcome: StageOutcome::Skipped,
            duration_ms: 0,
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(|s| s.outcome == StageOutcome::Ok)
    }

    /// Write the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// One line per stage.
    pub fn print_summary(&self) {
        println!("\n=== Pipeline summary ===");
        for stage in &self.stages {
            let mark = match stage.outcome {
                StageOutcome::Ok => "ok",
                StageOutcome::Failed => "FAILED",
                StageOutcome::Skipped => "skipped",
            };
            println!("  {:8} {:8} {:>6} ms", stage.stage, mark, stage.duration_ms);
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
