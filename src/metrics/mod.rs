//! Request metrics.
//!
//! Reports elapsed time, bytes read and (with the timing log enabled) the
//! per-phase timing breakdown of each request. Samples go to a
//! [`MetricsSink`]; nothing here affects request control flow.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::fetch::PhaseTimings;

pub const METRIC_ELAPSED: &str = "Milliseconds";
pub const METRIC_SIZE: &str = "size.bytes";

/// Log target carrying metric samples, one `<name> <value>` record each.
pub const METRICS_TARGET: &str = "vision_bridge::metrics";

/// Destination for metric samples.
pub trait MetricsSink: Send + Sync {
    /// Whether the runtime wants metrics at all.
    fn enabled(&self) -> bool;

    fn record(&self, name: &str, value: f64);
}

/// Writes each sample to the log under [`METRICS_TARGET`].
#[derive(Debug, Clone, Copy)]
pub struct LogMetricsSink {
    enabled: bool,
}

impl LogMetricsSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl MetricsSink for LogMetricsSink {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn record(&self, name: &str, value: f64) {
        log::info!(target: METRICS_TARGET, "{} {}", name, value);
    }
}

/// Keeps every sample in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    samples: Mutex<Vec<(String, f64)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples recorded so far, oldest first.
    pub fn samples(&self) -> Vec<(String, f64)> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    /// Names of the samples recorded so far.
    pub fn names(&self) -> Vec<String> {
        self.samples().into_iter().map(|(name, _)| name).collect()
    }
}

impl MetricsSink for RecordingSink {
    fn enabled(&self) -> bool {
        true
    }

    fn record(&self, name: &str, value: f64) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push((name.to_string(), value));
        }
    }
}

/// Emits request metrics to a sink.
#[derive(Clone)]
pub struct MetricsEmitter {
    sink: Arc<dyn MetricsSink>,
    timing_log: bool,
}

impl std::fmt::Debug for MetricsEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEmitter")
            .field("enabled", &self.enabled())
            .field("timing_log", &self.timing_log)
            .finish()
    }
}

impl MetricsEmitter {
    pub fn new(sink: Arc<dyn MetricsSink>, timing_log: bool) -> Self {
        Self { sink, timing_log }
    }

    /// Log-backed emitter following the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LogMetricsSink::new(config.metrics_enabled)),
            config.timing_log,
        )
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(LogMetricsSink::new(false)), false)
    }

    pub fn enabled(&self) -> bool {
        self.sink.enabled()
    }

    /// Metrics for a completed request.
    pub fn emit_completion(&self, elapsed: Duration, bytes_read: Option<u64>, timings: &PhaseTimings) {
        if !self.enabled() {
            return;
        }
        self.sink.record(METRIC_ELAPSED, elapsed_millis(elapsed));
        if let Some(bytes) = bytes_read.filter(|b| *b > 0) {
            self.sink.record(METRIC_SIZE, bytes as f64);
        }
        if self.timing_log {
            self.emit_timings(timings);
        }
    }

    /// Metrics for a failed request: only the timings, and only with the timing log.
    pub fn emit_failure(&self, timings: &PhaseTimings) {
        if self.enabled() && self.timing_log {
            self.emit_timings(timings);
        }
    }

    fn emit_timings(&self, timings: &PhaseTimings) {
        for (phase, value) in timings.entries() {
            if let Some(value) = value.filter(|v| *v != 0.0) {
                self.sink.record(&format!("timings.{}", phase), value);
            }
        }
    }
}

/// Milliseconds rounded to three decimal places.
fn elapsed_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1_000_000.0).round() / 1000.0
}
