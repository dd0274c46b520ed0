//! HTTP client initialization.
//!
//! The engine shares one client across every request. Cookies are never stored
//! on the client: each request carries its own jar.

use std::sync::Arc;

use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Initializes the shared HTTP client.
///
/// Creates a `reqwest::Client` configured with:
/// - Redirects disabled, so the engine follows them itself and records every hop
/// - No client-wide timeout; each request carries its own
/// - HTTP/1 header names sent in title case (`Content-Type`), not lower case
/// - HTTP/2 support enabled
/// - Rustls TLS backend (no native TLS)
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client() -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .http1_title_case_headers()
        .use_rustls_tls()
        .build()?;
    Ok(Arc::new(client))
}
