//! Outbound header assembly and case restoration.
//!
//! Headers are matched case-insensitively but sent with the casing the caller
//! supplied. `Content-Type` and `Content-Length` are tracked under lowercase
//! keys while the body is encoded and renamed back afterwards; every other
//! header keeps its caller casing throughout.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE};
use crate::error_handling::RequestError;
use crate::fetch::types::HeaderMapping;

const CONTENT_TYPE: &str = "content-type";
const CONTENT_LENGTH: &str = "content-length";

/// Ordered outbound header list; names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundHeaders {
    entries: Vec<(String, String)>,
    content_type_name: String,
    content_length_name: String,
}

impl Default for OutboundHeaders {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            content_type_name: HEADER_CONTENT_TYPE.to_string(),
            content_length_name: HEADER_CONTENT_LENGTH.to_string(),
        }
    }
}

impl OutboundHeaders {
    /// Copies the caller mapping, remembering how content headers were spelled.
    pub fn from_caller(headers: &HeaderMapping) -> Self {
        let mut out = Self::default();
        for (name, field) in headers {
            let lower = name.to_ascii_lowercase();
            let key = match lower.as_str() {
                CONTENT_TYPE => {
                    out.content_type_name = name.clone();
                    lower
                }
                CONTENT_LENGTH => {
                    out.content_length_name = name.clone();
                    lower
                }
                _ => name.clone(),
            };
            for value in field.values() {
                out.entries.push((key.clone(), value));
            }
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every entry named `name`, returning the values joined by `"; "`.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = Vec::new();
        self.entries.retain(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            None
        } else {
            Some(removed.join("; "))
        }
    }

    /// Replaces any entry named `name` (in place) or appends a new one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(idx) => {
                self.entries[idx].1 = value;
                let mut seen = false;
                self.entries.retain(|(k, _)| {
                    if k.eq_ignore_ascii_case(name) {
                        let keep = !seen;
                        seen = true;
                        keep
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Appends without replacing existing entries of the same name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_string(), value.into()));
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    pub fn set_content_type(&mut self, value: impl Into<String>) {
        self.set(CONTENT_TYPE, value);
    }

    pub fn remove_content_type(&mut self) -> Option<String> {
        self.remove(CONTENT_TYPE)
    }

    pub fn has_content_length(&self) -> bool {
        self.contains(CONTENT_LENGTH)
    }

    pub fn set_content_length(&mut self, len: usize) {
        self.set(CONTENT_LENGTH, len.to_string());
    }

    /// Renames the content headers back to the caller's spelling
    /// (or `Content-Type`/`Content-Length` when the engine introduced them).
    pub fn restore_content_header_case(&mut self) {
        for (name, _) in self.entries.iter_mut() {
            if name.eq_ignore_ascii_case(CONTENT_TYPE) {
                *name = self.content_type_name.clone();
            } else if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                *name = self.content_length_name.clone();
            }
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a transport header map. Names are lower-cased by the map.
    pub fn to_header_map(&self) -> Result<HeaderMap, RequestError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }
}

/// Remembers the original casing of header names, keyed by lowercase name.
///
/// Scoped to one request; the last spelling recorded for a name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCaseRegistry {
    originals: HashMap<String, String>,
}

impl HeaderCaseRegistry {
    /// Records the spelling of every header currently in `headers`.
    pub fn snapshot(headers: &OutboundHeaders) -> Self {
        let mut registry = Self::default();
        for (name, _) in headers.entries() {
            registry.record(name);
        }
        registry
    }

    pub fn record(&mut self, name: &str) {
        self.originals
            .insert(name.to_ascii_lowercase(), name.to_string());
    }

    /// Original spelling of `name`, if one was recorded.
    pub fn original(&self, name: &str) -> Option<&str> {
        self.originals
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Renames each pending header to its recorded spelling.
    ///
    /// Headers never recorded keep the name the transport gave them.
    pub fn restore(&self, pending: &HeaderMap) -> Vec<(String, String)> {
        pending
            .iter()
            .map(|(name, value)| {
                let restored = self
                    .original(name.as_str())
                    .unwrap_or(name.as_str())
                    .to_string();
                let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (restored, text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::types::HeaderField;

    fn caller(headers: &[(&str, &str)]) -> HeaderMapping {
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), HeaderField::from(*v)))
            .collect()
    }

    #[test]
    fn test_content_headers_tracked_lowercase() {
        let headers = OutboundHeaders::from_caller(&caller(&[
            ("CONTENT-TYPE", "text/plain"),
            ("X-Custom", "1"),
        ]));
        assert!(headers
            .entries()
            .iter()
            .any(|(k, _)| k == "content-type"));
        assert!(headers.entries().iter().any(|(k, _)| k == "X-Custom"));
        assert_eq!(headers.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_restore_uses_caller_spelling() {
        let mut headers = OutboundHeaders::from_caller(&caller(&[
            ("content-TYPE", "text/plain"),
            ("CONTENT-length", "4"),
        ]));
        headers.restore_content_header_case();
        let names: Vec<&str> = headers.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.contains(&"content-TYPE"));
        assert!(names.contains(&"CONTENT-length"));
    }

    #[test]
    fn test_engine_introduced_headers_use_canonical_case() {
        let mut headers = OutboundHeaders::default();
        headers.set_content_type("application/json");
        headers.set_content_length(7);
        headers.restore_content_header_case();
        assert_eq!(
            headers.entries(),
            &[
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Content-Length".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_replaces_case_insensitively() {
        let mut headers = OutboundHeaders::from_caller(&caller(&[("Accept", "a")]));
        headers.append("ACCEPT", "b");
        headers.set("accept", "c");
        assert_eq!(headers.entries(), &[("Accept".to_string(), "c".to_string())]);
    }

    #[test]
    fn test_remove_returns_all_values() {
        let mut headers = OutboundHeaders::from_caller(&caller(&[("Cookie", "a=1")]));
        headers.append("cookie", "b=2");
        assert_eq!(headers.remove("COOKIE"), Some("a=1; b=2".to_string()));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_registry_round_trip_after_lowercasing() {
        let mut headers = OutboundHeaders::from_caller(&caller(&[
            ("X-MiXeD-Case", "1"),
            ("content-Type", "text/plain"),
            ("authorization", "token"),
        ]));
        headers.restore_content_header_case();
        let registry = HeaderCaseRegistry::snapshot(&headers);

        let lowered = headers.to_header_map().expect("valid headers");
        assert!(lowered.keys().all(|k| k.as_str() == k.as_str().to_ascii_lowercase()));

        let mut restored = registry.restore(&lowered);
        restored.sort();
        let mut expected: Vec<(String, String)> = headers.entries().to_vec();
        expected.sort();
        assert_eq!(restored, expected);
    }

    #[test]
    fn test_unrecorded_headers_keep_transport_name() {
        let registry = HeaderCaseRegistry::default();
        let mut map = HeaderMap::new();
        map.insert("modelname", HeaderValue::from_static("yolo"));
        assert_eq!(
            registry.restore(&map),
            vec![("modelname".to_string(), "yolo".to_string())]
        );
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let mut headers = OutboundHeaders::default();
        headers.set("X-Bad", "line\nbreak");
        assert!(matches!(
            headers.to_header_map(),
            Err(RequestError::InvalidHeader { .. })
        ));
    }
}
