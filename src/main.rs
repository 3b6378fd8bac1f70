//! # trybot
//!
//! Build-and-test pipeline driver for an embedded OS image: clean previous
//! output, sync the source checkout, build, then boot the emulator and run
//! the device test suite against it.
//!
//! ## Usage
//!
//! ```bash
//! trybot run                 # Full pipeline: clean -> sync -> build -> vmtest
//! trybot run --clobber       # Also drop the whole checkout first
//! trybot clean               # Individual stages
//! trybot sync
//! trybot build
//! trybot vmtest
//! trybot preflight           # Check host tools
//! ```
//!
//! ## Architecture
//!
//! - Stages: fixed order, fail-fast, no retries (`pipeline`)
//! - Emulator: scoped background process with guaranteed teardown
//!   (`emulator`)
//! - Readiness: bounded fixed-interval device polling (`device`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod config;
mod device;
mod emulator;
mod error;
mod pipeline;
mod preflight;
mod repo;
mod report;
mod shell;
mod workspace;

use pipeline::Stage;

#[derive(Parser)]
#[command(name = "trybot", about = "Embedded OS image build-and-test pipeline")]
struct Cli {
    /// Pipeline configuration file.
    #[arg(long, default_value = "trybot.toml", global = true)]
    config: PathBuf,

    /// Primary build root; the image checkout is created next to it.
    #[arg(long, default_value = ".", global = true)]
    buildroot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline (clean, sync, build, vmtest).
    Run {
        /// Remove the whole checkout, not just build output.
        #[arg(long)]
        clobber: bool,
        /// Override the configured make parallelism.
        #[arg(long)]
        jobs: Option<u32>,
    },
    /// Remove build output (and the checkout with --clobber).
    Clean {
        #[arg(long)]
        clobber: bool,
    },
    /// Initialize and sync the source checkout.
    Sync,
    /// Build the image.
    Build {
        /// Override the configured make parallelism.
        #[arg(long)]
        jobs: Option<u32>,
    },
    /// Boot the emulator and run the device test suite.
    Vmtest,
    /// Verify required host tools are installed.
    Preflight,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::BuildConfig::load(&cli.config)?;
    let buildroot = resolve_buildroot(&cli.buildroot)?;

    match cli.command {
        Command::Run { clobber, jobs } => {
            if let Some(jobs) = jobs {
                cfg.jobs = jobs;
            }
            let ctx = make_ctx(cfg, &buildroot, clobber);
            let stages = pipeline::default_stages();
            let outcome = pipeline::run(&ctx, &stages);

            outcome.report.print_summary();
            let report_path = buildroot.join("trybot-report.json");
            match outcome.report.write(&report_path) {
                Ok(()) => println!("Report: {}", report_path.display()),
                Err(err) => println!("Failed to write report: {err:#}"),
            }

            if outcome.report.succeeded() {
                println!("Pipeline succeeded.");
            }
            match outcome.error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        Command::Clean { clobber } => {
            let ctx = make_ctx(cfg, &buildroot, clobber);
            pipeline::clean::CleanStage.perform(&ctx)
        }
        Command::Sync => {
            let ctx = make_ctx(cfg, &buildroot, false);
            pipeline::sync::SyncStage::default().perform(&ctx)
        }
        Command::Build { jobs } => {
            if let Some(jobs) = jobs {
                cfg.jobs = jobs;
            }
            let ctx = make_ctx(cfg, &buildroot, false);
            pipeline::build::BuildStage.perform(&ctx)
        }
        Command::Vmtest => {
            let ctx = make_ctx(cfg, &buildroot, false);
            pipeline::vmtest::VmTestStage.perform(&ctx)
        }
        Command::Preflight => preflight::check(&cfg),
    }
}

/// Absolutize the build root so the derived checkout path does not depend
/// on the invocation directory.
fn resolve_buildroot(buildroot: &Path) -> Result<PathBuf> {
    if buildroot.exists() {
        buildroot
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", buildroot.display()))
    } else {
        Ok(buildroot.to_path_buf())
    }
}

fn make_ctx(
    config: config::BuildConfig,
    buildroot: &Path,
    clobber: bool,
) -> pipeline::PipelineContext {
    pipeline::PipelineContext {
        config,
        workspace: workspace::Workspace::new(buildroot),
        clobber,
    }
}
