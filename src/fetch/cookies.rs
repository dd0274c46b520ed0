//! Per-request cookie jar and `Set-Cookie` extraction.
//!
//! Each request gets a fresh [`Jar`]. It is seeded from the caller's `Cookie`
//! header and cookie map, sends cookies on every hop and receives cookies set
//! by redirect responses. Malformed cookies never fail a request.

use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use serde::Serialize;
use url::Url;

use crate::error_handling::{ProcessingStats, WarningType};
use crate::fetch::types::CookieSpec;
use crate::fetch::url::encode_uri_component;

/// Bytes that are not cookie-octets. `%` is absent, so existing escapes stay intact.
const COOKIE_OCTET_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\');

/// Cookie store owned by a single request.
#[derive(Debug)]
pub struct RequestCookies {
    jar: Jar,
    url: Url,
}

impl RequestCookies {
    /// Creates an empty jar scoped to the request target.
    pub fn new(url: Url) -> Self {
        Self {
            jar: Jar::default(),
            url,
        }
    }

    /// Seeds the jar from a raw `Cookie` header value.
    ///
    /// Pairs without `=` are ignored; the first occurrence of a name wins.
    pub fn add_header_cookies(&self, header: &str, stats: &ProcessingStats) {
        for (name, value) in parse_pairs(header) {
            let encoded = utf8_percent_encode(&value, COOKIE_OCTET_ESCAPE).to_string();
            self.insert(&name, &encoded, stats);
        }
    }

    /// Seeds the jar from a structured cookie map. Later entries win.
    pub fn add_cookie_map(&self, cookies: &BTreeMap<String, CookieSpec>, stats: &ProcessingStats) {
        for (name, spec) in cookies {
            let value = match spec {
                CookieSpec::Skip => continue,
                CookieSpec::Plain(value) => encode_uri_component(value),
                CookieSpec::Detailed { value, encode: true } => encode_uri_component(value),
                CookieSpec::Detailed {
                    value,
                    encode: false,
                } => value.clone(),
            };
            self.insert(name, &value, stats);
        }
    }

    fn insert(&self, name: &str, value: &str, stats: &ProcessingStats) {
        if !is_token(name) || !is_storable_value(value) {
            log::warn!("Ignoring malformed cookie {:?}", name);
            stats.increment_warning(WarningType::MalformedCookie);
            return;
        }
        self.jar
            .add_cookie_str(&format!("{}={}", name, value), &self.url);
    }

    /// `Cookie` header to send to `url`, if any cookie matches.
    pub fn header_for(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }

    /// Stores every `Set-Cookie` in `headers`, as received from `url`.
    pub fn store_response(&self, headers: &HeaderMap, url: &Url) {
        let mut values = headers.get_all(SET_COOKIE).iter();
        self.jar.set_cookies(&mut values, url);
    }

    /// Stored value of `name` for the request target.
    pub fn value_of(&self, name: &str) -> Option<String> {
        let header = self.header_for(&self.url)?;
        let text = header.to_str().ok()?;
        text.split("; ").find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

/// A cookie set by a response: its value plus the remaining attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseCookie {
    pub value: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

/// Parses `Set-Cookie` values into a map keyed by cookie name.
///
/// Values are percent-decoded when they decode cleanly. Attributes without a
/// value (`HttpOnly`, `Secure`) are not reported.
pub fn extract_cookies<'a, I>(set_cookies: I) -> BTreeMap<String, ResponseCookie>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cookies = BTreeMap::new();
    for raw in set_cookies {
        let Some((key, _)) = raw.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let mut attributes: BTreeMap<String, String> = parse_pairs(raw)
            .into_iter()
            .map(|(name, value)| (name, decode_value(&value)))
            .collect();
        let value = attributes.remove(&key).unwrap_or_default();
        cookies.insert(key, ResponseCookie { value, attributes });
    }
    cookies
}

/// `name=value` pairs separated by `;`, first occurrence of a name wins.
fn parse_pairs(text: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in text.split(';') {
        let Some((name, value)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || pairs.iter().any(|(seen, _)| seen == name) {
            continue;
        }
        pairs.push((name.to_string(), unquote(value.trim()).to_string()));
    }
    pairs
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn decode_value(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// RFC 7230 token.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn is_storable_value(value: &str) -> bool {
    !value.bytes().any(|b| b == b';' || b.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("http://127.0.0.1:5560/").expect("valid url")
    }

    fn detailed(value: &str, encode: bool) -> CookieSpec {
        CookieSpec::Detailed {
            value: value.to_string(),
            encode,
        }
    }

    #[test]
    fn test_unencoded_map_cookie_is_stored_verbatim() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        let map = BTreeMap::from([("name".to_string(), detailed("a b", false))]);
        cookies.add_cookie_map(&map, &stats);
        assert_eq!(cookies.value_of("name"), Some("a b".to_string()));
    }

    #[test]
    fn test_plain_map_cookie_is_percent_encoded() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        let map = BTreeMap::from([
            ("name".to_string(), CookieSpec::Plain("a b".to_string())),
            ("other".to_string(), detailed("x;y", true)),
        ]);
        cookies.add_cookie_map(&map, &stats);
        assert_eq!(cookies.value_of("name"), Some("a%20b".to_string()));
        assert_eq!(cookies.value_of("other"), Some("x%3By".to_string()));
    }

    #[test]
    fn test_skipped_cookie_is_never_set() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        let map = BTreeMap::from([("name".to_string(), CookieSpec::Skip)]);
        cookies.add_cookie_map(&map, &stats);
        assert_eq!(cookies.value_of("name"), None);
        assert!(cookies.header_for(&target()).is_none());
    }

    #[test]
    fn test_map_cookie_overrides_header_cookie() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        cookies.add_header_cookies("sid=old; theme=dark", &stats);
        let map = BTreeMap::from([("sid".to_string(), CookieSpec::Plain("new".to_string()))]);
        cookies.add_cookie_map(&map, &stats);
        assert_eq!(cookies.value_of("sid"), Some("new".to_string()));
        assert_eq!(cookies.value_of("theme"), Some("dark".to_string()));
    }

    #[test]
    fn test_header_cookies_keep_existing_escapes() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        cookies.add_header_cookies(r#"a=x%20y; b="quoted"; c=one two; a=ignored; junk"#, &stats);
        assert_eq!(cookies.value_of("a"), Some("x%20y".to_string()));
        assert_eq!(cookies.value_of("b"), Some("quoted".to_string()));
        assert_eq!(cookies.value_of("c"), Some("one%20two".to_string()));
        assert_eq!(stats.get_warning_count(WarningType::MalformedCookie), 0);
    }

    #[test]
    fn test_malformed_cookie_is_swallowed_with_warning() {
        let cookies = RequestCookies::new(target());
        let stats = ProcessingStats::new();
        let map = BTreeMap::from([
            ("bad name".to_string(), CookieSpec::Plain("v".to_string())),
            ("raw".to_string(), detailed("x;y", false)),
            ("good".to_string(), CookieSpec::Plain("v".to_string())),
        ]);
        cookies.add_cookie_map(&map, &stats);
        assert_eq!(cookies.value_of("good"), Some("v".to_string()));
        assert_eq!(cookies.value_of("raw"), None);
        assert_eq!(stats.get_warning_count(WarningType::MalformedCookie), 2);
    }

    #[test]
    fn test_response_cookies_are_stored() {
        let cookies = RequestCookies::new(target());
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("hop=1; Path=/"));
        cookies.store_response(&headers, &target());
        assert_eq!(cookies.value_of("hop"), Some("1".to_string()));
    }

    #[test]
    fn test_extract_cookies_reports_value_and_attributes() {
        let extracted = extract_cookies([
            "sid=a%20b; Path=/; Max-Age=60; HttpOnly",
            "theme=dark",
            "broken",
        ]);
        assert_eq!(extracted.len(), 2);

        let sid = &extracted["sid"];
        assert_eq!(sid.value, "a b");
        assert_eq!(sid.attributes["Path"], "/");
        assert_eq!(sid.attributes["Max-Age"], "60");
        assert!(!sid.attributes.contains_key("HttpOnly"));

        let json = serde_json::to_value(&extracted["theme"]).expect("serializable");
        assert_eq!(json, serde_json::json!({"value": "dark"}));
    }

    #[test]
    fn test_extract_cookies_keeps_undecodable_value() {
        let extracted = extract_cookies(["k=%E0%A4; Path=/"]);
        assert_eq!(extracted["k"].value, "%E0%A4");
    }
}
