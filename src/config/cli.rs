//! Command-line options.
//!
//! Every runtime setting can also come from the environment (or a `.env`
//! file loaded at startup), mirroring how the flow runtime supplied them.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{DEFAULT_ADMIN_PORT, DEFAULT_DETECTION_URL, DEFAULT_VIDEO_URL};
use crate::config::types::{
    parse_timeout_setting, Config, DetectionSettings, DeviceSource, LogFormat, LogLevel,
    VideoInputSettings,
};

/// Command-line options and configuration.
///
/// # Examples
///
/// ```bash
/// # Sample an RTSP camera at 5 fps and accept enable/disable on port 1881
/// vision_bridge poll --device-type rtsp --rtsp rtsp://cam/1 --frequency 5
///
/// # Send one detection request
/// vision_bridge detect --model-name yolo --payload '{"x":1}'
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "vision_bridge",
    about = "Relays flow messages to a local computer-vision backend."
)]
pub struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// Per-request timeout in milliseconds (0 or unparsable means 120000)
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "120000", global = true)]
    pub request_timeout: String,

    /// Emit per-phase timing metrics
    #[arg(long, env = "HTTP_REQUEST_TIMING_LOG", global = true)]
    pub timing_log: bool,

    /// Emit request duration and size metrics
    #[arg(long, env = "VISION_BRIDGE_METRICS", global = true)]
    pub metrics: bool,

    /// Detection backend URL
    #[arg(long, env = "DETECTION_URL", default_value = DEFAULT_DETECTION_URL, global = true)]
    pub detection_url: String,

    /// Frame sampling backend URL
    #[arg(long, env = "VIDEO_URL", default_value = DEFAULT_VIDEO_URL, global = true)]
    pub video_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the frame sampling backend on a timer
    Poll(PollArgs),
    /// Send payloads to the detection backend
    Detect(DetectArgs),
}

/// Device kind selector for `poll`.
#[derive(Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum DeviceKind {
    Rtsp,
    Local,
}

#[derive(Debug, Args)]
pub struct PollArgs {
    /// Camera source kind
    #[arg(long, value_enum, default_value_t = DeviceKind::Local)]
    pub device_type: DeviceKind,

    /// RTSP stream URL (used with --device-type rtsp)
    #[arg(long, default_value = "")]
    pub rtsp: String,

    /// Local device name under /dev (used with --device-type local)
    #[arg(long, default_value = "video0")]
    pub local: String,

    /// Requested frame size
    #[arg(long, default_value = "640x480")]
    pub resolution: String,

    /// Frames per second (0 or negative means 10)
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub frequency: i64,

    /// Start with polling disabled
    #[arg(long)]
    pub inactive: bool,

    /// Node id used by the admin endpoint
    #[arg(long, default_value = "video-input")]
    pub node_id: String,

    /// Admin endpoint port
    #[arg(long, default_value_t = DEFAULT_ADMIN_PORT)]
    pub admin_port: u16,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Model requested from the backend
    #[arg(long, default_value = "")]
    pub model_name: String,

    /// Ask the backend to render results
    #[arg(long)]
    pub show_result: bool,

    /// JSON payload to send once; reads one payload per line from stdin when absent
    #[arg(long)]
    pub payload: Option<String>,
}

impl Cli {
    /// Builds the shared runtime configuration from the parsed options.
    pub fn to_config(&self) -> Config {
        Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            request_timeout_ms: parse_timeout_setting(&self.request_timeout),
            timing_log: self.timing_log,
            metrics_enabled: self.metrics,
            detection_url: self.detection_url.clone(),
            video_url: self.video_url.clone(),
        }
    }
}

impl PollArgs {
    pub fn to_settings(&self) -> VideoInputSettings {
        let device = match self.device_type {
            DeviceKind::Rtsp => DeviceSource::Rtsp(self.rtsp.clone()),
            DeviceKind::Local => DeviceSource::Local(self.local.clone()),
        };
        VideoInputSettings {
            device,
            resolution: self.resolution.clone(),
            frequency: self.frequency,
            active: !self.inactive,
        }
    }
}

impl DetectArgs {
    pub fn to_settings(&self) -> DetectionSettings {
        DetectionSettings {
            model_name: self.model_name.clone(),
            show_result: self.show_result,
        }
    }
}
