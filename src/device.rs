//! Device readiness polling.
//!
//! A freshly booted emulator first shows up in the bridge's device list as
//! `offline`, then flips to `device` once it is addressable. Bring-up time
//! varies a lot but has a practical outer bound, so the poll is a
//! fixed-interval loop with a hard attempt cap. No backoff: the win is in
//! catching the transition promptly, not in being gentle on a local query.

use crate::error::PipelineError;
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Hard cap on device-listing attempts.
pub const POLL_ATTEMPTS: u32 = 20;

/// Fixed sleep between attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A ready device line: `<serial>\tdevice`. Any other state word
/// (`offline`, `unauthorized`, ...) stays unmatched.
static READY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([\w-]+)\tdevice$").expect("ready-line pattern"));

/// Extract the first ready serial from a device listing.
pub fn parse_ready_serial(listing: &str) -> Option<String> {
    READY_LINE
        .captures(listing)
        .map(|captures| captures[1].to_string())
}

/// Bounded fixed-interval poller for a ready device serial.
#[derive(Debug, Clone, Copy)]
pub struct DevicePoller {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for DevicePoller {
    fn default() -> Self {
        Self {
            attempts: POLL_ATTEMPTS,
            interval: POLL_INTERVAL,
        }
    }
}

impl DevicePoller {
    /// Run `query` until its output contains a ready device line, sleeping
    /// between attempts. Query errors propagate immediately; exhausting the
    /// budget is `EmulatorNotReady`.
    pub fn wait_for_serial(&self, mut query: impl FnMut() -> Result<String>) -> Result<String> {
        for attempt in 1..=self.attempts {
            let listing = query()?;
            if let Some(serial) = parse_ready_serial(&listing) {
                return Ok(serial);
            }
            if attempt < self.attempts {
                std::thread::sleep(self.interval);
            }
        }
        Err(PipelineError::EmulatorNotReady.into())
    }
}
