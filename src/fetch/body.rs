//! Request body encoding.
//!
//! Decides how a payload is serialized from the request method, the effective
//! `Content-Type` and the payload shape, and keeps `Content-Type` and
//! `Content-Length` consistent with the chosen encoding.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value};

use crate::error_handling::RequestError;
use crate::fetch::headers::OutboundHeaders;
use crate::fetch::types::{number_text, scalar_text, FormField, Payload};
use crate::fetch::url::encode_uri_component;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const APPLICATION_JSON: &str = "application/json";

/// An encoded request body.
///
/// Multipart bodies keep their fields so the form can be rebuilt for every
/// redirect hop; a built form is single-use.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Bytes(Bytes),
    Multipart(Vec<(String, FormField)>),
}

impl RequestBody {
    /// Attaches this body to `builder`.
    pub fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder, RequestError> {
        match self {
            RequestBody::Bytes(bytes) => Ok(builder.body(bytes.clone())),
            RequestBody::Multipart(fields) => Ok(builder.multipart(build_form(fields)?)),
        }
    }
}

/// Lower-cased media type without parameters.
pub fn media_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Encodes `payload` for `method`, adjusting `headers` as needed.
///
/// Returns `Ok(None)` for `GET`/`HEAD` or when there is no payload.
pub fn encode_body(
    method: &Method,
    payload: Option<&Payload>,
    headers: &mut OutboundHeaders,
) -> Result<Option<RequestBody>, RequestError> {
    if *method == Method::GET || *method == Method::HEAD {
        return Ok(None);
    }
    let Some(payload) = payload else {
        return Ok(None);
    };
    let essence = headers.content_type().map(media_essence);

    if essence.as_deref() == Some(MULTIPART_FORM_DATA) {
        if let Some(fields) = form_fields(payload) {
            // The transport sets the header again, with the boundary.
            headers.remove_content_type();
            return Ok(Some(RequestBody::Multipart(fields)));
        }
    }

    let bytes = match payload {
        Payload::Bytes(bytes) => bytes.clone(),
        Payload::Text(text) => Bytes::from(text.clone()),
        Payload::Number(number) => Bytes::from(number_text(number)),
        Payload::Fields(_) | Payload::Json(_) => {
            let value = structured_value(payload);
            if essence.as_deref() == Some(FORM_URLENCODED) {
                Bytes::from(form_urlencode(&value))
            } else {
                if essence.is_none() {
                    headers.set_content_type(APPLICATION_JSON);
                }
                let json = serde_json::to_vec(&value).map_err(|e| RequestError::Body(e.to_string()))?;
                Bytes::from(json)
            }
        }
    };

    if !headers.has_content_length() {
        headers.set_content_length(bytes.len());
    }
    Ok(Some(RequestBody::Bytes(bytes)))
}

/// Members of an object payload; `None` for any other shape.
fn form_fields(payload: &Payload) -> Option<Vec<(String, FormField)>> {
    match payload {
        Payload::Fields(fields) => Some(fields.clone()),
        Payload::Json(Value::Object(map)) => Some(
            map.iter()
                .filter_map(|(name, value)| {
                    FormField::from_json(value).map(|field| (name.clone(), field))
                })
                .collect(),
        ),
        _ => None,
    }
}

fn structured_value(payload: &Payload) -> Value {
    match payload {
        Payload::Fields(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), field.to_json()))
                .collect::<Map<String, Value>>(),
        ),
        Payload::Json(value) => value.clone(),
        Payload::Text(text) => Value::String(text.clone()),
        Payload::Number(number) => Value::Number(number.clone()),
        Payload::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Query-string encoding of an object: arrays repeat the key, nested
/// objects and `null` encode as an empty value.
fn form_urlencode(value: &Value) -> String {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return String::new(),
    };

    let mut pairs = Vec::new();
    for (key, value) in entries {
        let key = encode_uri_component(&key);
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push(format!("{}={}", key, encode_uri_component(&primitive_text(item))));
                }
            }
            other => pairs.push(format!("{}={}", key, encode_uri_component(&primitive_text(other)))),
        }
    }
    pairs.join("&")
}

fn primitive_text(value: &Value) -> String {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => scalar_text(value),
        _ => String::new(),
    }
}

fn build_form(fields: &[(String, FormField)]) -> Result<Form, RequestError> {
    let mut form = Form::new();
    for (name, field) in fields {
        form = match field {
            FormField::Text(text) => form.text(name.clone(), text.clone()),
            FormField::Bytes(bytes) => form.part(name.clone(), Part::bytes(bytes.to_vec())),
            FormField::Part { value, options } => {
                let mut part = Part::bytes(value.to_vec());
                if let Some(filename) = &options.filename {
                    part = part.file_name(filename.clone());
                }
                if let Some(content_type) = &options.content_type {
                    part = part
                        .mime_str(content_type)
                        .map_err(|e| RequestError::Body(e.to_string()))?;
                }
                form.part(name.clone(), part)
            }
            FormField::Json(value) => form.text(name.clone(), value.to_string()),
        };
    }
    Ok(form)
}
