//! Message and payload types flowing into the request engine.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One header value as carried in a flow message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Text(String),
    List(Vec<String>),
    Number(serde_json::Number),
    Flag(bool),
}

impl HeaderField {
    /// Values to transmit, one per header line.
    pub fn values(&self) -> Vec<String> {
        match self {
            HeaderField::Text(s) => vec![s.clone()],
            HeaderField::List(items) => items.clone(),
            HeaderField::Number(n) => vec![number_text(n)],
            HeaderField::Flag(b) => vec![b.to_string()],
        }
    }

    /// Single-line rendering; list values are joined with `", "`.
    pub fn joined(&self) -> String {
        self.values().join(", ")
    }
}

impl From<&str> for HeaderField {
    fn from(value: &str) -> Self {
        HeaderField::Text(value.to_string())
    }
}

impl From<String> for HeaderField {
    fn from(value: String) -> Self {
        HeaderField::Text(value)
    }
}

/// Header name to value mapping, keyed by the name exactly as supplied.
pub type HeaderMapping = BTreeMap<String, HeaderField>;

/// Cookie entry supplied by the caller in `cookies`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum CookieSpec {
    /// `null` or `{ value: null }`: never set, never cleared.
    Skip,
    /// Plain scalar, stored percent-encoded.
    Plain(String),
    /// `{ value, encode }`; only `encode: false` stores the value verbatim.
    Detailed { value: String, encode: bool },
}

impl From<Value> for CookieSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CookieSpec::Skip,
            Value::Object(map) => match map.get("value") {
                None | Some(Value::Null) => CookieSpec::Skip,
                Some(inner) => CookieSpec::Detailed {
                    value: scalar_text(inner),
                    encode: !matches!(map.get("encode"), Some(Value::Bool(false))),
                },
            },
            other => CookieSpec::Plain(scalar_text(&other)),
        }
    }
}

/// String form of a JSON scalar; strings lose their quotes.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    }
}

/// Number rendered the way string coercion does: whole floats drop the
/// fraction, so `1.0` becomes `1`.
pub(crate) fn number_text(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(v) if number.is_f64() && v.fract() == 0.0 && v.abs() < 1e21 => {
            if v == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", v)
            }
        }
        _ => number.to_string(),
    }
}

/// Options accompanying a multipart field given as `{ value, options }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartOptions {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// One member of an object payload, as interpreted for multipart bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text(String),
    Bytes(Bytes),
    /// `{ value, options }` member
    Part { value: Bytes, options: PartOptions },
    /// Anything else; JSON-stringified before appending
    Json(Value),
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
    Number(serde_json::Number),
    /// Object payload whose members may carry binary data
    Fields(Vec<(String, FormField)>),
    Json(Value),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Text(s),
            Value::Number(n) => Payload::Number(n),
            other => Payload::Json(other),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Payload::from)
    }
}

impl FormField {
    /// Interprets one JSON object member; `None` for `null` members.
    pub fn from_json(value: &Value) -> Option<FormField> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(FormField::Text(s.clone())),
            Value::Object(map) if map.contains_key("value") => {
                let inner = map.get("value").unwrap_or(&Value::Null);
                let options = map.get("options").map(part_options).unwrap_or_default();
                Some(FormField::Part {
                    value: Bytes::from(scalar_text(inner)),
                    options,
                })
            }
            other => Some(FormField::Json(other.clone())),
        }
    }

    /// Text rendering used by the form-urlencoded and JSON encoders.
    pub fn to_json(&self) -> Value {
        match self {
            FormField::Text(s) => Value::String(s.clone()),
            FormField::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            FormField::Part { value, .. } => {
                Value::String(String::from_utf8_lossy(value).into_owned())
            }
            FormField::Json(v) => v.clone(),
        }
    }
}

fn part_options(value: &Value) -> PartOptions {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    PartOptions {
        filename: text("filename"),
        content_type: text("contentType"),
    }
}

/// Inbound flow message consumed by the request engine.
///
/// Every field is optional; absent fields leave the engine defaults in place.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    #[serde(default)]
    pub headers: Option<HeaderMapping>,
    #[serde(default)]
    pub cookies: Option<BTreeMap<String, CookieSpec>>,
    #[serde(default)]
    pub payload: Option<Payload>,
    /// Per-call timeout override in milliseconds; validated at prepare time
    #[serde(default)]
    pub request_timeout: Option<Value>,
    #[serde(default)]
    pub follow_redirects: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cookie_spec_from_json() {
        assert_eq!(CookieSpec::from(Value::Null), CookieSpec::Skip);
        assert_eq!(CookieSpec::from(json!({"value": null})), CookieSpec::Skip);
        assert_eq!(
            CookieSpec::from(json!("a b")),
            CookieSpec::Plain("a b".to_string())
        );
        assert_eq!(CookieSpec::from(json!(42)), CookieSpec::Plain("42".to_string()));
        assert_eq!(
            CookieSpec::from(json!({"value": "a b", "encode": false})),
            CookieSpec::Detailed {
                value: "a b".to_string(),
                encode: false
            }
        );
        assert_eq!(
            CookieSpec::from(json!({"value": "x", "encode": "no"})),
            CookieSpec::Detailed {
                value: "x".to_string(),
                encode: true
            }
        );
    }

    #[test]
    fn test_payload_from_json() {
        assert_eq!(Payload::from(json!("hi")), Payload::Text("hi".to_string()));
        assert!(matches!(Payload::from(json!(3)), Payload::Number(_)));
    }

    #[test]
    fn test_number_text_drops_whole_fraction() {
        let text = |v: Value| match v {
            Value::Number(n) => number_text(&n),
            _ => unreachable!(),
        };
        assert_eq!(text(json!(1.0)), "1");
        assert_eq!(text(json!(-0.0)), "0");
        assert_eq!(text(json!(2.5)), "2.5");
        assert_eq!(text(json!(42)), "42");
        assert_eq!(text(json!(1e21)), "1e21");
        assert_eq!(Payload::from(json!({"a": 1})), Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn test_request_message_deserializes_camel_case() {
        let msg: RequestMessage = serde_json::from_value(json!({
            "headers": {"X-Trace": "1", "Accept": ["a", "b"]},
            "cookies": {"sid": {"value": "s", "encode": false}, "gone": null},
            "payload": {"x": 1},
            "requestTimeout": 500,
            "followRedirects": false
        }))
        .expect("valid message");

        let headers = msg.headers.expect("headers");
        assert_eq!(headers["Accept"].joined(), "a, b");
        let cookies = msg.cookies.expect("cookies");
        assert_eq!(cookies["gone"], CookieSpec::Skip);
        assert_eq!(msg.payload, Some(Payload::Json(json!({"x": 1}))));
        assert_eq!(msg.request_timeout, Some(json!(500)));
        assert_eq!(msg.follow_redirects, Some(false));
    }

    #[test]
    fn test_form_field_from_json() {
        assert_eq!(FormField::from_json(&Value::Null), None);
        assert_eq!(
            FormField::from_json(&json!("t")),
            Some(FormField::Text("t".to_string()))
        );
        assert_eq!(
            FormField::from_json(&json!({"value": "img", "options": {"filename": "a.jpg", "contentType": "image/jpeg"}})),
            Some(FormField::Part {
                value: Bytes::from("img"),
                options: PartOptions {
                    filename: Some("a.jpg".to_string()),
                    content_type: Some("image/jpeg".to_string()),
                }
            })
        );
        assert_eq!(
            FormField::from_json(&json!([1, 2])),
            Some(FormField::Json(json!([1, 2])))
        );
    }
}
