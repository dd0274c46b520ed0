//! Drivers behind the `poll` and `detect` subcommands.

mod detect;
mod poll;

use std::time::Duration;

pub use detect::run_detect;
pub use poll::run_poll;

/// Outcome counts of one CLI run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Outputs written to stdout
    pub delivered: usize,
    /// Inputs that produced no output (busy backend, unparsable input)
    pub dropped: usize,
    /// Requests that failed
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
