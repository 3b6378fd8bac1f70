//! Sync stage: initialize and update the manifest-driven checkout.
//!
//! Any collaborator failure surfaces as `SyncFailed`, unretried. The sync
//! tool owns its own retry policy.

use super::{PipelineContext, Stage};
use crate::error::PipelineError;
use crate::repo::{RepoCli, SourceSync};
use anyhow::Result;
use std::cell::RefCell;

pub struct SyncStage {
    client: RefCell<Box<dyn SourceSync>>,
}

impl SyncStage {
    pub fn new(client: Box<dyn SourceSync>) -> Self {
        Self {
            client: RefCell::new(client),
        }
    }
}

impl Default for SyncStage {
    fn default() -> Self {
        Self::new(Box::new(RepoCli::new()))
    }
}

fn sync_failed(err: anyhow::Error) -> anyhow::Error {
    PipelineError::SyncFailed(format!("{err:#}")).into()
}

impl Stage for SyncStage {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn perform(&self, ctx: &PipelineContext) -> Result<()> {
        ctx.workspace.ensure_root()?;

        let root = ctx.workspace.root();
        let mut client = self.client.borrow_mut();
        client
            .initialize(
                &ctx.config.manifest_url,
                &ctx.config.manifest_branch,
                &root,
            )
            .map_err(sync_failed)?;
        client.sync().map_err(sync_failed)
    }
}
