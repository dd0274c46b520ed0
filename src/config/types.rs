//! Configuration types.
//!
//! This module defines the runtime settings shared by both nodes and the
//! per-node settings for the detection and video-input variants.

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_DETECTION_URL, DEFAULT_FPS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_VIDEO_URL,
    MIN_TICK_PERIOD_MS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Runtime settings shared by every node instance.
///
/// # Examples
///
/// ```
/// use vision_bridge::Config;
///
/// let config = Config {
///     metrics_enabled: true,
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 120_000);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Default per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Emit per-phase timing metrics (only when metrics are enabled)
    pub timing_log: bool,

    /// Emit request duration and size metrics
    pub metrics_enabled: bool,

    /// Detection backend URL
    pub detection_url: String,

    /// Frame sampling backend URL
    pub video_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            timing_log: false,
            metrics_enabled: false,
            detection_url: DEFAULT_DETECTION_URL.to_string(),
            video_url: DEFAULT_VIDEO_URL.to_string(),
        }
    }
}

/// Parses a configured timeout setting.
///
/// Leading digits are taken as milliseconds; anything unparsable or zero
/// falls back to [`DEFAULT_REQUEST_TIMEOUT_MS`].
pub fn parse_timeout_setting(raw: &str) -> u64 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => DEFAULT_REQUEST_TIMEOUT_MS,
    }
}

/// Settings of a detection node.
#[derive(Debug, Clone, Default)]
pub struct DetectionSettings {
    /// Model requested from the backend (sent as the `modelName` header)
    pub model_name: String,
    /// Whether the backend should render results (sent as the `showResult` header)
    pub show_result: bool,
}

/// Camera source sampled by a video-input node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSource {
    /// Network stream, e.g. `rtsp://cam/1`
    Rtsp(String),
    /// Local capture device name under `/dev`, e.g. `video0`
    Local(String),
}

/// Settings of a video-input node.
#[derive(Debug, Clone)]
pub struct VideoInputSettings {
    pub device: DeviceSource,
    /// Frame size requested from the backend, e.g. `640x480`
    pub resolution: String,
    /// Frames per second; zero or negative falls back to [`DEFAULT_FPS`]
    pub frequency: i64,
    /// Start polling as soon as the node is created
    pub active: bool,
}

impl VideoInputSettings {
    /// Effective frames per second.
    pub fn fps(&self) -> u32 {
        if self.frequency <= 0 {
            DEFAULT_FPS
        } else {
            u32::try_from(self.frequency).unwrap_or(u32::MAX)
        }
    }

    /// Tick period derived from the frame rate, never shorter than
    /// [`MIN_TICK_PERIOD_MS`].
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / u64::from(self.fps()))
            .max(std::time::Duration::from_millis(MIN_TICK_PERIOD_MS))
    }
}

impl Default for VideoInputSettings {
    fn default() -> Self {
        Self {
            device: DeviceSource::Local("video0".to_string()),
            resolution: "640x480".to_string(),
            frequency: i64::from(DEFAULT_FPS),
            active: false,
        }
    }
}
