//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, reserved header names)
//! - Runtime and per-node settings
//! - CLI option types and parsing

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::{Cli, Command, DetectArgs, DeviceKind, PollArgs};
pub use constants::*;
pub use types::{
    parse_timeout_setting, Config, DetectionSettings, DeviceSource, LogFormat, LogLevel,
    VideoInputSettings,
};
