//! Failure taxonomy for pipeline stages.
//!
//! Every variant is stage-fatal: the first one aborts the run. Nothing at
//! this level is retried; bounded retry lives inside the device poller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A shell invocation exited non-zero.
    #[error("command failed with exit code {code}\n{output}")]
    CommandFailed { code: i32, output: String },

    /// The repository-sync tool reported failure.
    #[error("source sync failed: {0}")]
    SyncFailed(String),

    /// The emulator process was no longer alive after the startup grace
    /// period. A crash during startup is not self-healing, so no retry.
    #[error("emulator is not running after the startup grace period")]
    EmulatorFailedToStart,

    /// No attached device reached the `device` state within the polling
    /// budget.
    #[error("no emulator device became ready within the polling budget")]
    EmulatorNotReady,
}
