//! Error categorization.
//!
//! Maps transport errors onto the legacy error codes and onto the
//! [`ErrorType`] counters.

use std::error::Error as StdError;
use std::io;

use super::stats::ProcessingStats;
use super::types::{codes, ErrorType, RequestError};

/// Converts a `reqwest::Error` into a [`RequestError`] carrying a legacy code.
///
/// The source chain is searched for an `io::Error` first so that resets and
/// refusals keep their specific codes; timeouts always land in the timeout
/// class.
///
/// # Arguments
///
/// * `error` - The transport error
/// * `timeout_ms` - Timeout in force for the request, echoed in the message
pub fn classify_reqwest_error(error: &reqwest::Error, timeout_ms: u64) -> RequestError {
    if error.is_timeout() {
        return RequestError::Timeout {
            code: codes::ETIMEDOUT,
            timeout_ms,
        };
    }

    if let Some(io_error) = find_io_error(error) {
        let code = match io_error.kind() {
            io::ErrorKind::TimedOut => {
                return RequestError::Timeout {
                    code: codes::ESOCKETTIMEDOUT,
                    timeout_ms,
                }
            }
            io::ErrorKind::ConnectionRefused => codes::ECONNREFUSED,
            io::ErrorKind::ConnectionReset => codes::ECONNRESET,
            io::ErrorKind::ConnectionAborted => codes::ECONNABORTED,
            io::ErrorKind::BrokenPipe => codes::EPIPE,
            _ => fallback_code(error),
        };
        return RequestError::Transport {
            code,
            message: error_message(error),
        };
    }

    RequestError::Transport {
        code: fallback_code(error),
        message: error_message(error),
    }
}

/// Categorizes a [`RequestError`] into an [`ErrorType`].
pub fn categorize_request_error(error: &RequestError) -> ErrorType {
    match error {
        RequestError::Timeout { .. } => ErrorType::HttpRequestTimeoutError,
        RequestError::Transport { code, .. } => match *code {
            codes::ECONNREFUSED | codes::ENOTFOUND | codes::ERR_CONNECT => {
                ErrorType::HttpRequestConnectError
            }
            codes::ERR_BODY => ErrorType::HttpRequestBodyError,
            _ => ErrorType::HttpRequestOtherError,
        },
        RequestError::TooManyRedirects { .. } => ErrorType::HttpRequestRedirectError,
        RequestError::InvalidUrl(_) | RequestError::InvalidHeader { .. } => {
            ErrorType::HttpRequestBuilderError
        }
        RequestError::Body(_) => ErrorType::HttpRequestBodyError,
    }
}

/// Updates processing statistics for a failed request.
pub fn update_error_stats(stats: &ProcessingStats, error: &RequestError) {
    stats.increment_error(categorize_request_error(error));
}

fn find_io_error(error: &reqwest::Error) -> Option<&io::Error> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error);
        }
        source = cause.source();
    }
    None
}

fn fallback_code(error: &reqwest::Error) -> &'static str {
    let text = error_message(error).to_ascii_lowercase();
    if text.contains("dns error") || text.contains("failed to lookup address") {
        codes::ENOTFOUND
    } else if error.is_connect() {
        codes::ERR_CONNECT
    } else if error.is_body() || error.is_decode() {
        codes::ERR_BODY
    } else if error.is_builder() {
        codes::ERR_INVALID_URL
    } else {
        codes::ERR_REQUEST
    }
}

/// Full error text including causes, e.g. `error sending request: connection refused`.
fn error_message(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_timeout() {
        let error = RequestError::Timeout {
            code: codes::ETIMEDOUT,
            timeout_ms: 10,
        };
        assert_eq!(
            categorize_request_error(&error),
            ErrorType::HttpRequestTimeoutError
        );
    }

    #[test]
    fn test_categorize_connect_codes() {
        for code in [codes::ECONNREFUSED, codes::ENOTFOUND, codes::ERR_CONNECT] {
            let error = RequestError::Transport {
                code,
                message: "boom".to_string(),
            };
            assert_eq!(
                categorize_request_error(&error),
                ErrorType::HttpRequestConnectError
            );
        }
    }

    #[test]
    fn test_categorize_reset_is_other() {
        let error = RequestError::Transport {
            code: codes::ECONNRESET,
            message: "reset".to_string(),
        };
        assert_eq!(
            categorize_request_error(&error),
            ErrorType::HttpRequestOtherError
        );
    }

    #[test]
    fn test_categorize_redirect_and_builder() {
        assert_eq!(
            categorize_request_error(&RequestError::TooManyRedirects { max: 21 }),
            ErrorType::HttpRequestRedirectError
        );
        assert_eq!(
            categorize_request_error(&RequestError::InvalidUrl("::".to_string())),
            ErrorType::HttpRequestBuilderError
        );
    }

    #[test]
    fn test_update_error_stats_increments() {
        let stats = ProcessingStats::new();
        update_error_stats(&stats, &RequestError::TooManyRedirects { max: 21 });
        assert_eq!(
            stats.get_error_count(ErrorType::HttpRequestRedirectError),
            1
        );
    }

    #[tokio::test]
    async fn test_classify_connection_refused() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = reqwest::Client::new();
        let error = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .expect_err("nothing should be listening");
        let classified = classify_reqwest_error(&error, 1000);
        assert!(!classified.is_timeout());
        assert!(matches!(classified, RequestError::Transport { .. }));
    }
}
