//! vision_bridge library: HTTP relay to a local computer-vision backend
//!
//! This library provides the request engine shared by two flow nodes:
//! a detection node that posts inputs to the detection backend, and a
//! video-input node that samples frames on a timer. An admin endpoint
//! toggles polling at runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vision_bridge::error_handling::ProcessingStats;
//! use vision_bridge::fetch::{RequestEngine, RequestMessage};
//! use vision_bridge::initialization::init_client;
//! use vision_bridge::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let engine = RequestEngine::new(init_client()?, &config, Arc::new(ProcessingStats::new()));
//!
//! let envelope = engine
//!     .send(reqwest::Method::GET, &config.video_url, &RequestMessage::default())
//!     .await?;
//! println!("{} {} bytes", envelope.status_code, envelope.payload.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod admin_server;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
pub mod metrics;
pub mod nodes;
mod run;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{NodeError, ProcessingStats, RequestError, RequestFailure};
pub use fetch::{RequestEngine, RequestMessage, ResponseEnvelope};
pub use run::{run_detect, run_poll, RunReport};
