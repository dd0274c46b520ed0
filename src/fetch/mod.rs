//! HTTP request engine shared by the detection and video-input nodes.
//!
//! A request passes through these stages:
//! 1. Query-string repair ([`normalize_url`])
//! 2. Forwarded-header check ([`strip_forwarded_headers`])
//! 3. Header assembly, cookie jar seeding and body encoding
//! 4. Header case snapshot, taken after every header the engine adds
//! 5. Execution with manual redirect capture ([`executor::execute`])
//! 6. Translation into a [`ResponseEnvelope`] and metrics
//!
//! Nothing is retried. Non-2xx statuses complete normally.

mod body;
mod cookies;
pub mod executor;
mod fingerprint;
mod headers;
mod response;
mod types;
mod url;

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use serde_json::Value;

use crate::config::Config;
use crate::error_handling::{
    update_error_stats, InfoType, ProcessingStats, RequestError, RequestFailure, WarningType,
};
use crate::metrics::MetricsEmitter;

pub use body::{encode_body, media_essence, RequestBody};
pub use cookies::{extract_cookies, RequestCookies, ResponseCookie};
pub use executor::{ExchangeState, PhaseTimings, RawResponse, RedirectHop};
pub use fingerprint::{header_fingerprint, stamp_fingerprint, strip_forwarded_headers};
pub use headers::{HeaderCaseRegistry, OutboundHeaders};
pub use response::{headers_to_mapping, translate, ResponseEnvelope};
pub use types::{
    CookieSpec, FormField, HeaderField, HeaderMapping, PartOptions, Payload, RequestMessage,
};
pub use url::{encode_uri_component, normalize_url, URI_COMPONENT};

/// A fully assembled request, ready to send.
///
/// Owns its cookie jar; executing it a second time reuses cookies received
/// by the first execution.
#[derive(Debug)]
pub struct PreparedRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) url_text: String,
    pub(crate) headers: OutboundHeaders,
    pub(crate) registry: HeaderCaseRegistry,
    pub(crate) cookies: RequestCookies,
    pub(crate) body: Option<RequestBody>,
    pub(crate) timeout_ms: u64,
    pub(crate) follow_redirects: bool,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target after query-string repair.
    pub fn url(&self) -> &str {
        &self.url_text
    }

    pub fn headers(&self) -> &OutboundHeaders {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn cookies(&self) -> &RequestCookies {
        &self.cookies
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Sets a header after the case snapshot. A header the caller already
    /// supplied keeps the caller's spelling; a new one is sent under the
    /// transport's spelling.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Headers as they will be transmitted, with the recorded casing restored.
    pub fn transmit_headers(&self) -> Result<Vec<(String, String)>, RequestError> {
        Ok(self.registry.restore(&self.header_map()?))
    }

    pub(crate) fn header_map(&self) -> Result<HeaderMap, RequestError> {
        self.headers.to_header_map()
    }
}

/// The shared request pipeline.
#[derive(Debug, Clone)]
pub struct RequestEngine {
    client: Arc<Client>,
    default_timeout_ms: u64,
    metrics: MetricsEmitter,
    stats: Arc<ProcessingStats>,
}

impl RequestEngine {
    /// Creates an engine using `client`, which must have redirects disabled.
    pub fn new(client: Arc<Client>, config: &Config, stats: Arc<ProcessingStats>) -> Self {
        Self {
            client,
            default_timeout_ms: config.request_timeout_ms,
            metrics: MetricsEmitter::from_config(config),
            stats,
        }
    }

    /// Replaces the metrics emitter.
    pub fn with_metrics(mut self, metrics: MetricsEmitter) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// Assembles a request from a flow message.
    ///
    /// Malformed cookies and invalid timeout overrides are recovered with a
    /// warning. Fails only when the URL, a header or the body cannot be built.
    pub fn prepare(
        &self,
        method: Method,
        url: &str,
        message: &RequestMessage,
    ) -> Result<PreparedRequest, RequestFailure> {
        let url_text = normalize_url(url);
        let parsed = Url::parse(&url_text)
            .map_err(|e| self.reject(RequestError::InvalidUrl(format!("{}: {}", url_text, e)), &url_text))?;
        let timeout_ms = self.resolve_timeout(message.request_timeout.as_ref());

        let caller_headers = message.headers.clone().and_then(strip_forwarded_headers);
        let mut headers = caller_headers
            .as_ref()
            .map(OutboundHeaders::from_caller)
            .unwrap_or_default();

        let cookies = RequestCookies::new(parsed.clone());
        if let Some(cookie_header) = headers.remove("cookie") {
            cookies.add_header_cookies(&cookie_header, &self.stats);
        }
        if let Some(map) = &message.cookies {
            cookies.add_cookie_map(map, &self.stats);
        }

        let body = encode_body(&method, message.payload.as_ref(), &mut headers)
            .map_err(|e| self.reject(e, &url_text))?;
        headers.restore_content_header_case();
        let registry = HeaderCaseRegistry::snapshot(&headers);

        Ok(PreparedRequest {
            method,
            url: parsed,
            url_text,
            headers,
            registry,
            cookies,
            body,
            timeout_ms,
            follow_redirects: message.follow_redirects.unwrap_or(true),
        })
    }

    /// Sends a prepared request.
    ///
    /// On failure the error is counted and, with the timing log enabled, the
    /// timings gathered before the failure are emitted.
    pub async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, RequestFailure> {
        match executor::execute(&self.client, request, &self.stats).await {
            Ok(raw) => Ok(raw),
            Err(failure) => {
                update_error_stats(&self.stats, &failure.error);
                self.metrics.emit_failure(&failure.timings);
                Err(failure)
            }
        }
    }

    /// Translates a raw response and emits completion metrics.
    pub fn complete(&self, raw: RawResponse) -> ResponseEnvelope {
        self.metrics
            .emit_completion(raw.elapsed, raw.bytes_read, &raw.timings);
        let envelope = translate(raw);
        if !envelope.is_success() {
            log::debug!(
                "{} completed with status {}",
                envelope.response_url,
                envelope.status_code
            );
            self.stats.increment_info(InfoType::NonSuccessStatus);
        }
        envelope
    }

    /// Prepares, executes and translates in one step.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        message: &RequestMessage,
    ) -> Result<ResponseEnvelope, RequestFailure> {
        let request = self.prepare(method, url, message)?;
        let raw = self.execute(&request).await?;
        Ok(self.complete(raw))
    }

    fn reject(&self, error: RequestError, url: &str) -> RequestFailure {
        update_error_stats(&self.stats, &error);
        RequestFailure {
            error,
            url: url.to_string(),
            timings: PhaseTimings::default(),
        }
    }

    /// Applies a per-call timeout override, keeping the default when it is
    /// not a number or is below one millisecond.
    fn resolve_timeout(&self, requested: Option<&Value>) -> u64 {
        let Some(requested) = requested else {
            return self.default_timeout_ms;
        };
        let millis = match requested {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match millis {
            Some(ms) if ms.is_finite() && ms >= 1.0 => ms.round() as u64,
            Some(_) => {
                log::warn!("Timeout value is negative, ignoring");
                self.stats.increment_warning(WarningType::NegativeTimeoutOverride);
                self.default_timeout_ms
            }
            None => {
                log::warn!("Timeout value is not a valid number, ignoring");
                self.stats.increment_warning(WarningType::InvalidTimeoutOverride);
                self.default_timeout_ms
            }
        }
    }
}
