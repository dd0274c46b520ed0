//! Configuration constants.
//!
//! This module defines the defaults and fixed policy values shared by the
//! request engine and both nodes.

/// Default per-request timeout in milliseconds (two minutes)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

// Redirect handling
/// Maximum number of redirect hops followed before a request fails
pub const MAX_REDIRECT_HOPS: usize = 21;

// Polling
/// Frames per second used when the configured frequency is missing or not positive
pub const DEFAULT_FPS: u32 = 10;
/// Shortest tick period; higher frame rates are clamped to it
pub const MIN_TICK_PERIOD_MS: u64 = 1;

/// Reserved header carrying the header fingerprint between request nodes.
pub const REQUEST_NODE_HEADER: &str = "x-node-red-request-node";

// Backend endpoints
/// Detection service (POST with a body)
pub const DEFAULT_DETECTION_URL: &str = "http://127.0.0.1:5560";
/// Frame sampling service (GET with device query parameters)
pub const DEFAULT_VIDEO_URL: &str = "http://127.0.0.1:5550";

/// Default port for the admin control endpoint
pub const DEFAULT_ADMIN_PORT: u16 = 1881;

// Canonical header names used when the engine introduces a header itself
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";

// Backend response headers
pub const HEADER_VISION: &str = "vision";
pub const HEADER_BUSY: &str = "busy";

/// Phase names reported by the timing metrics, in emission order.
pub const TIMING_PHASES: [&str; 10] = [
    "start",
    "socket",
    "lookup",
    "connect",
    "secureConnect",
    "upload",
    "response",
    "end",
    "error",
    "abort",
];
