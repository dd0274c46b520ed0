//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `vision_bridge` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use vision_bridge::config::{Cli, Command};
use vision_bridge::initialization::init_logger_with;
use vision_bridge::{run_detect, run_poll};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), first from the
    // current directory, then next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();
    let config = cli.to_config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let result = match cli.command {
        Command::Poll(args) => run_poll(config, args).await,
        Command::Detect(args) => run_detect(config, args).await,
    };

    match result {
        Ok(report) => {
            eprintln!(
                "✅ {} output{} ({} dropped, {} failed) in {:.1}s",
                report.delivered,
                if report.delivered == 1 { "" } else { "s" },
                report.dropped,
                report.failed,
                report.elapsed_seconds()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("vision_bridge error: {:#}", e);
            process::exit(1);
        }
    }
}
