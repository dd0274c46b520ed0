//! Error type definitions.
//!
//! This module defines the request failure taxonomy plus the error, warning,
//! and info categories counted by [`super::ProcessingStats`].

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::fetch::PhaseTimings;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Legacy error codes reported to callers as the failure status.
pub mod codes {
    pub const ETIMEDOUT: &str = "ETIMEDOUT";
    pub const ESOCKETTIMEDOUT: &str = "ESOCKETTIMEDOUT";
    pub const ECONNREFUSED: &str = "ECONNREFUSED";
    pub const ECONNRESET: &str = "ECONNRESET";
    pub const ECONNABORTED: &str = "ECONNABORTED";
    pub const ENOTFOUND: &str = "ENOTFOUND";
    pub const EPIPE: &str = "EPIPE";
    pub const ERR_CONNECT: &str = "ERR_CONNECT";
    pub const ERR_TOO_MANY_REDIRECTS: &str = "ERR_TOO_MANY_REDIRECTS";
    pub const ERR_INVALID_URL: &str = "ERR_INVALID_URL";
    pub const ERR_INVALID_HEADER: &str = "ERR_INVALID_HEADER";
    pub const ERR_BODY: &str = "ERR_BODY";
    pub const ERR_REQUEST: &str = "ERR_REQUEST";
}

/// Why a request did not produce a response.
///
/// Non-2xx responses are never represented here; they complete normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Connect or socket-level timeout.
    #[error("TimeoutError: Timeout awaiting response for {timeout_ms}ms")]
    Timeout { code: &'static str, timeout_ms: u64 },

    /// Any other transport failure (DNS, reset, TLS, ...).
    #[error("RequestError: {message}")]
    Transport { code: &'static str, message: String },

    /// Redirect chain longer than the allowed number of hops.
    #[error("MaxRedirectsError: Redirected {max} times. Aborting.")]
    TooManyRedirects { max: usize },

    /// Target (or redirect location) could not be parsed.
    #[error("RequestError: Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value cannot be transmitted.
    #[error("RequestError: Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The request body could not be built.
    #[error("RequestError: {0}")]
    Body(String),
}

impl RequestError {
    /// Legacy error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Timeout { code, .. } => code,
            RequestError::Transport { code, .. } => code,
            RequestError::TooManyRedirects { .. } => codes::ERR_TOO_MANY_REDIRECTS,
            RequestError::InvalidUrl(_) => codes::ERR_INVALID_URL,
            RequestError::InvalidHeader { .. } => codes::ERR_INVALID_HEADER,
            RequestError::Body(_) => codes::ERR_BODY,
        }
    }

    /// Whether this is the timeout class reported as "no response from server".
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }
}

/// A failed request: the error, where it was headed, and how far it got.
#[derive(Error, Debug, Clone)]
#[error("{error} : {url}")]
pub struct RequestFailure {
    pub error: RequestError,
    pub url: String,
    pub timings: PhaseTimings,
}

impl RequestFailure {
    /// Status reported to the caller in place of an HTTP status code.
    pub fn status_code(&self) -> &'static str {
        self.error.code()
    }
}

/// Error returned by a node invocation.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The request pipeline failed; terminal for this invocation.
    #[error(transparent)]
    Request(#[from] RequestFailure),

    /// The sample URL names a scheme other than http(s); nothing was sent.
    #[error("non-http transport requested: {0}")]
    NonHttpTransport(String),
}

/// Types of errors that can occur while executing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    HttpRequestTimeoutError,
    HttpRequestConnectError,
    HttpRequestRedirectError,
    HttpRequestBuilderError,
    HttpRequestBodyError,
    HttpRequestOtherError,
}

/// Types of locally recovered problems.
///
/// Warnings never fail a request; a safe default is substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    InvalidTimeoutOverride,  // Non-numeric timeout override
    NegativeTimeoutOverride, // Timeout override below 1 ms
    VisionParseError,        // Detection result header is not JSON
    MalformedCookie,         // Cookie rejected by the jar
}

/// Types of informational metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    HttpRedirect,     // A redirect hop was followed
    BusyDrop,         // Detection dropped while the backend was busy
    BackendBusy,      // Backend reported itself busy
    NonSuccessStatus, // Completed with a non-2xx status
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
        }
    }
}

impl std::fmt::Display for WarningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::InvalidTimeoutOverride => "Timeout value is not a valid number",
            WarningType::NegativeTimeoutOverride => "Timeout value is negative",
            WarningType::VisionParseError => "JSON parse error",
            WarningType::MalformedCookie => "Malformed cookie ignored",
        }
    }
}

impl std::fmt::Display for InfoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::HttpRedirect => "HTTP redirect",
            InfoType::BusyDrop => "Dropped while backend busy",
            InfoType::BackendBusy => "Backend reported busy",
            InfoType::NonSuccessStatus => "Non-2xx response",
        }
    }
}
