//! Logger initialization.
//!
//! Two line formats share one `env_logger` builder:
//! - plain: `HH:MM:SS.mmm LEVEL target message`, coloured
//! - json: one object per line; metric samples become `metric`/`value` fields
//!
//! `RUST_LOG` is read first and the CLI level overrides it for this crate.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use colored::*;
use log::{Level, LevelFilter};
use serde_json::{json, Value};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use crate::metrics::METRICS_TARGET;

const CRATE_PREFIX: &str = "vision_bridge::";

/// Initializes the logger with the specified level and format.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` when a logger is already
/// installed in this process.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Warn);
    builder.filter_module("vision_bridge", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = json_line(
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{}", line)
            });
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(|buf, record| {
                let time = Utc::now().format("%H:%M:%S%.3f").to_string();
                let level = match record.level() {
                    Level::Error => "ERROR".red().bold(),
                    Level::Warn => "WARN ".yellow(),
                    Level::Info => "INFO ".green(),
                    Level::Debug => "DEBUG".blue(),
                    Level::Trace => "TRACE".dimmed(),
                };
                writeln!(
                    buf,
                    "{} {} {} {}",
                    time.as_str().dimmed(),
                    level,
                    short_target(record.target()).cyan(),
                    record.args()
                )
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)
}

/// Target without the crate prefix; the crate root reads as `main`.
fn short_target(target: &str) -> &str {
    match target.strip_prefix(CRATE_PREFIX) {
        Some(rest) => rest,
        None if target == "vision_bridge" => "main",
        None => target,
    }
}

/// One JSON log line. Records on [`METRICS_TARGET`] shaped `<name> <number>`
/// are emitted as `{"metric": name, "value": number}`.
fn json_line(level: Level, target: &str, message: &str) -> Value {
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    if target == METRICS_TARGET {
        if let Some((name, value)) = message
            .rsplit_once(' ')
            .and_then(|(name, value)| value.parse::<f64>().ok().map(|v| (name, v)))
        {
            return json!({ "ts": ts, "metric": name, "value": value });
        }
    }
    json!({
        "ts": ts,
        "level": level.as_str(),
        "target": short_target(target),
        "msg": message,
    })
}
