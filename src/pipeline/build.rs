//! Build stage: `make` inside the configured build environment.

use super::{PipelineContext, Stage};
use crate::shell::{self, RunOptions};
use anyhow::Result;

pub struct BuildStage;

impl Stage for BuildStage {
    fn name(&self) -> &'static str {
        "build"
    }

    fn perform(&self, ctx: &PipelineContext) -> Result<()> {
        let jobs = ctx.config.jobs.to_string();
        let line = shell::lunch_line(
            &ctx.workspace.out_dir(),
            &ctx.config.build_target,
            &["make", "-j", jobs.as_str()],
        );
        let result = shell::run(&line, &ctx.workspace.root(), RunOptions::default())?;
        println!("Build completed in {:.1}s", result.duration.as_secs_f64());
        Ok(())
    }
}
