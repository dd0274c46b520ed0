//! Error handling and processing statistics.
//!
//! This module provides:
//! - The request failure taxonomy and legacy error codes
//! - Transport error classification
//! - Processing statistics tracking (errors, warnings, info metrics)
//!
//! Counters are categorized into:
//! - **Errors**: Failures that terminate a request
//! - **Warnings**: Malformed local data or overrides recovered with a default
//! - **Info**: Notable events (redirects, busy drops, non-2xx completions)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_request_error, classify_reqwest_error, update_error_stats};
pub use stats::ProcessingStats;
pub use types::{
    codes, ErrorType, InfoType, InitializationError, NodeError, RequestError, RequestFailure,
    WarningType,
};
