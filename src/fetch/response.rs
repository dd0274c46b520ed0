//! Response translation.
//!
//! Turns a [`RawResponse`] into the envelope handed to downstream steps.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::Serialize;

use crate::fetch::cookies::{extract_cookies, ResponseCookie};
use crate::fetch::executor::{RawResponse, RedirectHop};
use crate::fetch::fingerprint::stamp_fingerprint;
use crate::fetch::types::{HeaderField, HeaderMapping};

/// Outbound message produced for a completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    /// Response headers plus the fingerprint under the reserved key
    pub headers: HeaderMapping,
    pub response_url: String,
    /// Body decoded as UTF-8 (lossy)
    pub payload: String,
    /// Body exactly as received
    #[serde(skip)]
    pub body: Bytes,
    pub redirect_list: Vec<RedirectHop>,
    pub retry: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_cookies: Option<BTreeMap<String, ResponseCookie>>,
}

impl ResponseEnvelope {
    /// Case-insensitive header lookup; multi-valued headers are joined.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.joined())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Builds the envelope for `raw`.
pub fn translate(raw: RawResponse) -> ResponseEnvelope {
    let set_cookies: Vec<&str> = raw
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let response_cookies = (!set_cookies.is_empty()).then(|| extract_cookies(set_cookies));

    let mut headers = headers_to_mapping(&raw.headers);
    stamp_fingerprint(&mut headers);

    ResponseEnvelope {
        status_code: raw.status.as_u16(),
        headers,
        response_url: raw.url.to_string(),
        payload: String::from_utf8_lossy(&raw.body).into_owned(),
        body: raw.body,
        redirect_list: raw.redirect_list,
        retry: 0,
        response_cookies,
    }
}

/// Converts transport headers into a mapping keyed by lower-case name.
///
/// `set-cookie` is always a list; other repeated headers are joined with `", "`.
pub fn headers_to_mapping(headers: &HeaderMap) -> HeaderMapping {
    let mut mapping = HeaderMapping::new();
    for name in headers.keys() {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        let field = if *name == SET_COOKIE {
            HeaderField::List(values)
        } else {
            HeaderField::Text(values.join(", "))
        };
        mapping.insert(name.as_str().to_string(), field);
    }
    mapping
}
