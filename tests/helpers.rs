// Shared test helpers for building engines against mock backends.

use std::sync::Arc;

use vision_bridge::initialization::init_client;
use vision_bridge::{Config, ProcessingStats, RequestEngine};

/// Engine with default settings and its own statistics.
#[allow(dead_code)] // Used by other test files
pub fn test_engine() -> RequestEngine {
    test_engine_with(Config::default())
}

/// Engine built from `config`.
#[allow(dead_code)]
pub fn test_engine_with(config: Config) -> RequestEngine {
    let client = init_client().expect("Failed to build HTTP client");
    RequestEngine::new(client, &config, Arc::new(ProcessingStats::new()))
}
