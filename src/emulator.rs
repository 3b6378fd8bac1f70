//! Emulator process supervision.
//!
//! The emulator runs as a background process for the whole test stage. The
//! supervisor owns it as a scoped resource: spawn with output redirected to
//! a temporary log, give the process a grace period to crash early, hand
//! control to the caller, then tear down and dump the captured log no
//! matter how the caller's work ended.

use crate::config::BuildConfig;
use crate::error::PipelineError;
use crate::shell;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Child;
use std::time::Duration;

/// Time allowed for the emulator to either stabilize or crash outright.
/// Failure here could be a crash, another copy left running, etc.
pub const STARTUP_GRACE: Duration = Duration::from_secs(10);

/// Minimal control surface over the spawned emulator. Teardown is verified
/// against this trait with a test double.
pub trait EmulatorProcess {
    fn is_running(&mut self) -> Result<bool>;

    /// Request graceful termination.
    fn terminate(&mut self) -> Result<()>;

    /// Reap the process.
    fn wait(&mut self) -> Result<()>;
}

impl EmulatorProcess for Child {
    fn is_running(&mut self) -> Result<bool> {
        Ok(self.try_wait().context("Failed to poll emulator")?.is_none())
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        let rc = unsafe { libc::kill(self.id() as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            anyhow::bail!("Failed to signal emulator (pid {})", self.id());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        self.kill().context("Failed to kill emulator")
    }

    fn wait(&mut self) -> Result<()> {
        Child::wait(self).context("Failed to reap emulator")?;
        Ok(())
    }
}

/// Supervisor policy. The grace period is only overridden by tests.
pub struct Supervisor {
    grace: Duration,
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Drive `child` through the grace check, the caller's `work`, and
    /// unconditional teardown. The log at `log_path` is emitted between
    /// markers exactly once, on every path. A teardown failure never masks
    /// the work's own failure; if both fail, both are reported.
    pub fn run<T>(
        &self,
        mut child: impl EmulatorProcess,
        log_path: &Path,
        work: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        std::thread::sleep(self.grace);

        let result = match child.is_running() {
            Ok(true) => work(),
            Ok(false) => {
                println!(
                    "Emulator is not running after {}s, aborting.",
                    self.grace.as_secs()
                );
                Err(PipelineError::EmulatorFailedToStart.into())
            }
            Err(err) => Err(err),
        };

        let teardown = teardown(&mut child, log_path);

        match (result, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(td)) => Err(td),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(td)) => Err(err.context(format!("teardown also failed: {td:#}"))),
        }
    }
}

/// Stop the emulator if it is still alive, reap it, and dump the captured
/// log. Every step is attempted even when an earlier one fails; the first
/// failure is reported.
fn teardown(child: &mut impl EmulatorProcess, log_path: &Path) -> Result<()> {
    let mut first_err: Option<anyhow::Error> = None;

    match child.is_running() {
        Ok(true) => {
            println!("Stopping emulator.");
            if let Err(err) = child.terminate() {
                first_err = Some(err);
            }
        }
        Ok(false) => {}
        Err(err) => first_err = Some(err),
    }

    if let Err(err) = child.wait() {
        if first_err.is_none() {
            first_err = Some(err);
        }
    }

    let log = std::fs::read_to_string(log_path)
        .unwrap_or_else(|err| format!("<failed to read emulator log: {err}>\n"));
    println!("=== Emulator log (begin) ===");
    print!("{log}");
    println!("=== Emulator log (end) ===");

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Launch the emulator and run `work` inside its supervised scope.
pub fn with_emulator<T>(
    cfg: &BuildConfig,
    ws: &Workspace,
    work: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let log = tempfile::Builder::new()
        .prefix("emulator")
        .suffix(".log")
        .tempfile()
        .context("Failed to create emulator log file")?;

    let line = shell::lunch_line(&ws.out_dir(), &cfg.build_target, &[cfg.emulator.as_str()]);
    println!("Starting emulator: {line}");

    let child = shell::spawn_logged(&line, &ws.root(), log.as_file())?;
    Supervisor::new(STARTUP_GRACE).run(child, log.path(), work)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counters {
        terminates: Cell<u32>,
        waits: Cell<u32>,
    }

    struct FakeProcess {
        /// Scripted `is_running` answers; empty means "exited".
        running: VecDeque<bool>,
        counters: Rc<Counters>,
        fail_wait: bool,
    }

    impl FakeProcess {
        fn new(running: &[bool], counters: &Rc<Counters>) -> Self {
            Self {
                running: running.iter().copied().collect(),
                counters: Rc::clone(counters),
                fail_wait: false,
            }
        }
    }

    impl EmulatorProcess for FakeProcess {
        fn is_running(&mut self) -> Result<bool> {
            Ok(self.running.pop_front().unwrap_or(false))
        }

        fn terminate(&mut self) -> Result<()> {
            self.counters.terminates.set(self.counters.terminates.get() + 1);
            Ok(())
        }

        fn wait(&mut self) -> Result<()> {
            self.counters.waits.set(self.counters.waits.get() + 1);
            if self.fail_wait {
                bail!("reap failed");
            }
            Ok(())
        }
    }

    fn fake_log(content: &str) -> tempfile::NamedTempFile {
        let mut log = tempfile::NamedTempFile::new().unwrap();
        log.write_all(content.as_bytes()).unwrap();
        log
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(Duration::ZERO)
    }

    #[test]
    fn test_success_terminates_and_reaps_exactly_once() {
        let counters = Rc::new(Counters::default());
        let proc = FakeProcess::new(&[true, true], &counters);
        let log = fake_log("boot ok\n");

        let value = supervisor().run(proc, log.path(), || Ok(42)).unwrap();

        assert_eq!(value, 42);
        assert_eq!(counters.terminates.get(), 1);
        assert_eq!(counters.waits.get(), 1);
    }

    #[test]
    fn test_work_failure_still_tears_down() {
        let counters = Rc::new(Counters::default());
        let proc = FakeProcess::new(&[true, true], &counters);
        let log = fake_log("");

        let err = supervisor()
            .run(proc, log.path(), || -> Result<()> { bail!("tests failed") })
            .unwrap_err();

        assert!(format!("{err:#}").contains("tests failed"));
        assert_eq!(counters.terminates.get(), 1);
        assert_eq!(counters.waits.get(), 1);
    }

    #[test]
    fn test_early_exit_fails_before_work_runs() {
        let counters = Rc::new(Counters::default());
        let proc = FakeProcess::new(&[false], &counters);
        let log = fake_log("segfault\n");
        let work_ran = Cell::new(false);

        let err = supervisor()
            .run(proc, log.path(), || {
                work_ran.set(true);
                Ok(())
            })
            .unwrap_err();

        assert!(!work_ran.get());
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmulatorFailedToStart)
        ));
        // Already dead: reaped but never signalled.
        assert_eq!(counters.terminates.get(), 0);
        assert_eq!(counters.waits.get(), 1);
    }

    #[test]
    fn test_process_that_died_during_work_is_not_signalled() {
        let counters = Rc::new(Counters::default());
        let proc = FakeProcess::new(&[true, false], &counters);
        let log = fake_log("");

        supervisor().run(proc, log.path(), || Ok(())).unwrap();

        assert_eq!(counters.terminates.get(), 0);
        assert_eq!(counters.waits.get(), 1);
    }

    #[test]
    fn test_teardown_failure_does_not_mask_work_failure() {
        let counters = Rc::new(Counters::default());
        let mut proc = FakeProcess::new(&[true, true], &counters);
        proc.fail_wait = true;
        let log = fake_log("");

        let err = supervisor()
            .run(proc, log.path(), || -> Result<()> { bail!("suite exploded") })
            .unwrap_err();

        let text = format!("{err:#}");
        assert!(text.contains("suite exploded"));
        assert!(text.contains("teardown also failed"));
    }

    #[test]
    fn test_teardown_failure_alone_surfaces() {
        let counters = Rc::new(Counters::default());
        let mut proc = FakeProcess::new(&[true, true], &counters);
        proc.fail_wait = true;
        let log = fake_log("");

        let err = supervisor().run(proc, log.path(), || Ok(())).unwrap_err();
        assert!(format!("{err:#}").contains("reap failed"));
    }

    #[test]
    fn test_real_child_is_terminated_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let log = tempfile::NamedTempFile::new().unwrap();
        let child = shell::spawn_logged("echo booting && exec sleep 30", dir.path(), log.as_file())
            .unwrap();

        Supervisor::new(Duration::from_millis(200))
            .run(child, log.path(), || Ok(()))
            .unwrap();
    }

    #[test]
    fn test_real_child_early_exit_is_failed_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let log = tempfile::NamedTempFile::new().unwrap();
        let child = shell::spawn_logged("true", dir.path(), log.as_file()).unwrap();

        let err = Supervisor::new(Duration::from_millis(200))
            .run(child, log.path(), || Ok(()))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmulatorFailedToStart)
        ));
    }
}
