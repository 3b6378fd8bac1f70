//! VmTest stage: boot the emulator, wait for the device, run the suite.
//!
//! Everything here happens inside the emulator's supervised scope, so the
//! process is reaped and its log dumped no matter where this stage fails.

use super::{PipelineContext, Stage};
use crate::device::DevicePoller;
use crate::emulator;
use crate::shell::{self, RunOptions};
use anyhow::Result;

pub struct VmTestStage;

impl Stage for VmTestStage {
    fn name(&self) -> &'static str {
        "vmtest"
    }

    fn perform(&self, ctx: &PipelineContext) -> Result<()> {
        let cfg = &ctx.config;
        let ws = &ctx.workspace;

        emulator::with_emulator(cfg, ws, || {
            // Bridge daemons sometimes keep a stale device list and must be
            // restarted to see a freshly booted device. Best effort: a
            // failed restart is logged, not fatal.
            let kill_line = shell::lunch_line(
                &ws.out_dir(),
                &cfg.build_target,
                &[cfg.bridge.as_str(), "kill-server"],
            );
            let restart = shell::run(
                &kill_line,
                &ws.root(),
                RunOptions {
                    check: false,
                    quiet: false,
                },
            );
            match restart {
                Ok(result) if result.exit_code != 0 => {
                    println!(
                        "Bridge restart failed (continuing): exit code {}",
                        result.exit_code
                    );
                }
                Ok(_) => {}
                Err(err) => println!("Bridge restart failed (continuing): {err:#}"),
            }

            println!("Waiting for the device to come up...");
            let serial = DevicePoller::default().wait_for_serial(|| {
                let line = shell::lunch_line(
                    &ws.out_dir(),
                    &cfg.build_target,
                    &[cfg.bridge.as_str(), "devices"],
                );
                let result = shell::run(
                    &line,
                    &ws.root(),
                    RunOptions {
                        check: true,
                        quiet: true,
                    },
                )?;
                Ok(result.output)
            })?;

            println!("Running tests against {serial}");
            let test_line = shell::lunch_line(
                &ws.out_dir(),
                &cfg.build_target,
                &[
                    cfg.test_runner.as_str(),
                    "--debug",
                    serial.as_str(),
                    cfg.test_suite.as_str(),
                ],
            );
            shell::run(&test_line, &ws.root(), RunOptions::default())?;
            Ok(())
        })
    }
}
