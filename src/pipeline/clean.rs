//! Clean stage: drop build output, and the whole checkout when clobbering.

use super::{PipelineContext, Stage};
use anyhow::Result;

pub struct CleanStage;

impl Stage for CleanStage {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn perform(&self, ctx: &PipelineContext) -> Result<()> {
        ctx.workspace.clean(ctx.clobber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::workspace::Workspace;

    #[test]
    fn test_clean_stage_honors_clobber_flag() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("build"));
        std::fs::create_dir_all(ws.out_dir()).unwrap();

        let ctx = PipelineContext {
            config: test_config(),
            workspace: ws.clone(),
            clobber: true,
        };
        CleanStage.perform(&ctx).unwrap();

        assert!(!ws.root().exists());
    }
}
