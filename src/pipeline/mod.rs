//! Ordered stage pipeline.
//!
//! Stages run strictly in declared order. The first failure halts the run;
//! the remaining stages never execute and are recorded as skipped. This
//! layer never retries anything: all recoverable complexity lives inside
//! the stage bodies themselves.

pub mod build;
pub mod clean;
pub mod sync;
pub mod vmtest;

use crate::config::BuildConfig;
use crate::report::{RunReport, StageReport};
use crate::workspace::Workspace;
use anyhow::Result;
use std::time::Instant;

/// Everything a stage body needs for one run.
pub struct PipelineContext {
    pub config: BuildConfig,
    pub workspace: Workspace,
    /// Remove the whole checkout during Clean, not just build output.
    pub clobber: bool,
}

/// One discrete unit of pipeline work with a pass/fail outcome. The host
/// instantiates stages and calls `perform` in sequence.
pub trait Stage {
    fn name(&self) -> &'static str;
    fn perform(&self, ctx: &PipelineContext) -> Result<()>;
}

/// Result of a full run: the per-stage record plus the failing stage's
/// error, if any.
pub struct PipelineOutcome {
    pub report: RunReport,
    pub error: Option<anyhow::Error>,
}

/// The fixed stage order for a full run.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(clean::CleanStage),
        Box::new(sync::SyncStage::default()),
        Box::new(build::BuildStage),
        Box::new(vmtest::VmTestStage),
    ]
}

/// Run `stages` in order, fail-fast.
pub fn run(ctx: &PipelineContext, stages: &[Box<dyn Stage>]) -> PipelineOutcome {
    let mut report = RunReport::new();
    let mut error = None;

    for stage in stages {
        if error.is_some() {
            report.push(StageReport::skipped(stage.name()));
            continue;
        }

        println!("=== Stage: {} ===", stage.name());
        let start = Instant::now();
        match stage.perform(ctx) {
            Ok(()) => report.push(StageReport::ok(stage.name(), start.elapsed())),
            Err(err) => {
                println!("Stage {} failed: {err:#}", stage.name());
                report.push(StageReport::failed(stage.name(), start.elapsed(), &err));
                error = Some(err);
            }
        }
    }

    PipelineOutcome { report, error }
}
