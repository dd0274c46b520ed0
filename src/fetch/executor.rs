//! Request execution and redirect capture.
//!
//! Redirects are followed by hand so that every hop can be recorded (with the
//! cookies it set) before the next request is sent. The shared client is built
//! with redirects disabled and without a cookie store; cookies live in the
//! request's own jar.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE,
};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use url::Url;

use crate::config::{MAX_REDIRECT_HOPS, TIMING_PHASES};
use crate::error_handling::{
    classify_reqwest_error, codes, InfoType, ProcessingStats, RequestError, RequestFailure,
};
use crate::fetch::body::RequestBody;
use crate::fetch::cookies::{extract_cookies, ResponseCookie};
use crate::fetch::PreparedRequest;

/// Lifecycle of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    Succeeded,
    Failed,
}

/// Timestamps (epoch milliseconds) of the request phases.
///
/// Phases the transport does not expose stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub start: Option<f64>,
    pub socket: Option<f64>,
    pub lookup: Option<f64>,
    pub connect: Option<f64>,
    pub secure_connect: Option<f64>,
    pub upload: Option<f64>,
    pub response: Option<f64>,
    pub end: Option<f64>,
    pub error: Option<f64>,
    pub abort: Option<f64>,
}

impl PhaseTimings {
    /// Phase name and value pairs, in reporting order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> {
        let values = [
            self.start,
            self.socket,
            self.lookup,
            self.connect,
            self.secure_connect,
            self.upload,
            self.response,
            self.end,
            self.error,
            self.abort,
        ];
        TIMING_PHASES.into_iter().zip(values)
    }
}

fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1000.0
}

/// One followed redirect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedirectHop {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, ResponseCookie>>,
}

/// Final response as received, before translation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub body: Bytes,
    pub redirect_list: Vec<RedirectHop>,
    pub timings: PhaseTimings,
    pub bytes_read: Option<u64>,
    /// Wall-clock time from the start of the exchange to the end of the body
    pub elapsed: Duration,
}

/// State, redirect record and timings of one in-flight request.
///
/// Lives outside the timed future so partial timings survive a timeout.
#[derive(Debug)]
pub struct Exchange {
    state: ExchangeState,
    redirect_list: Vec<RedirectHop>,
    timings: PhaseTimings,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            state: ExchangeState::Idle,
            redirect_list: Vec::new(),
            timings: PhaseTimings::default(),
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn redirect_list(&self) -> &[RedirectHop] {
        &self.redirect_list
    }

    /// Idle -> Sending. The redirect record starts empty.
    pub fn begin(&mut self) {
        self.redirect_list.clear();
        self.timings = PhaseTimings {
            start: Some(now_ms()),
            ..PhaseTimings::default()
        };
        self.state = ExchangeState::Sending;
    }

    fn record_redirect(&mut self, hop: RedirectHop) {
        self.redirect_list.push(hop);
    }

    fn mark_response(&mut self) {
        self.timings.response = Some(now_ms());
    }

    /// Sending -> Succeeded; hands over the redirect record and timings.
    fn succeed(&mut self) -> (Vec<RedirectHop>, PhaseTimings) {
        self.timings.end = Some(now_ms());
        self.state = ExchangeState::Succeeded;
        (
            std::mem::take(&mut self.redirect_list),
            self.timings.clone(),
        )
    }

    /// Sending -> Failed; returns the timings collected so far.
    fn fail(&mut self) -> PhaseTimings {
        self.timings.error = Some(now_ms());
        self.state = ExchangeState::Failed;
        self.timings.clone()
    }
}

struct FinalHop {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

/// Sends `request`, following redirects unless disabled.
///
/// Non-2xx statuses complete normally. The timeout covers the whole exchange,
/// redirects and body included.
pub async fn execute(
    client: &Client,
    request: &PreparedRequest,
    stats: &ProcessingStats,
) -> Result<RawResponse, RequestFailure> {
    let started = Instant::now();
    let mut exchange = Exchange::new();
    exchange.begin();

    let timeout = Duration::from_millis(request.timeout_ms);
    let outcome =
        tokio::time::timeout(timeout, send_following(client, request, &mut exchange, stats)).await;

    let result = match outcome {
        Ok(result) => result,
        Err(_) => Err(RequestError::Timeout {
            code: codes::ETIMEDOUT,
            timeout_ms: request.timeout_ms,
        }),
    };

    match result {
        Ok(hop) => {
            let (redirect_list, timings) = exchange.succeed();
            let bytes_read = Some(hop.body.len() as u64);
            Ok(RawResponse {
                status: hop.status,
                headers: hop.headers,
                url: hop.url,
                body: hop.body,
                redirect_list,
                timings,
                bytes_read,
                elapsed: started.elapsed(),
            })
        }
        Err(error) => Err(RequestFailure {
            error,
            url: request.url_text.clone(),
            timings: exchange.fail(),
        }),
    }
}

async fn send_following(
    client: &Client,
    request: &PreparedRequest,
    exchange: &mut Exchange,
    stats: &ProcessingStats,
) -> Result<FinalHop, RequestError> {
    let classify = |e: reqwest::Error| classify_reqwest_error(&e, request.timeout_ms);

    let mut method = request.method.clone();
    let mut url = request.url.clone();
    let mut headers = request.header_map()?;
    let mut body: Option<&RequestBody> = request.body.as_ref();
    let mut followed = 0usize;

    loop {
        log::debug!(
            "{} {} headers={:?}",
            method,
            url,
            request
                .registry
                .restore(&headers)
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
        );

        let mut builder = client
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(cookie) = request.cookies.header_for(&url) {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(body) = body {
            builder = body.apply(builder)?;
        }
        let response = builder.send().await.map_err(classify)?;
        exchange.mark_response();

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let location = match location {
            Some(location) if request.follow_redirects && is_redirect(status) => location,
            _ => {
                let headers = response.headers().clone();
                let final_url = response.url().clone();
                let body = response.bytes().await.map_err(classify)?;
                return Ok(FinalHop {
                    status,
                    headers,
                    url: final_url,
                    body,
                });
            }
        };

        if followed >= MAX_REDIRECT_HOPS {
            return Err(RequestError::TooManyRedirects {
                max: MAX_REDIRECT_HOPS,
            });
        }

        request.cookies.store_response(response.headers(), &url);
        let set_cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        exchange.record_redirect(RedirectHop {
            location: location.clone(),
            cookies: (!set_cookies.is_empty()).then(|| extract_cookies(set_cookies)),
        });

        let next = url
            .join(&location)
            .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", location, e)))?;
        log::debug!("Following {} redirect {} -> {}", status.as_u16(), url, next);
        stats.increment_info(InfoType::HttpRedirect);

        if status == StatusCode::SEE_OTHER && method != Method::GET && method != Method::HEAD {
            method = Method::GET;
            body = None;
            headers.remove(CONTENT_TYPE);
            headers.remove(CONTENT_LENGTH);
        }
        if !same_host(&url, &next) {
            headers.remove(AUTHORIZATION);
            headers.remove(HOST);
        }
        followed += 1;
        url = next;
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 300..=303 | 307 | 308)
}

/// Credentials only follow a redirect that stays on the same host and port.
fn same_host(from: &Url, to: &Url) -> bool {
    from.host_str() == to.host_str() && from.port_or_known_default() == to.port_or_known_default()
}
