//! Header fingerprinting.
//!
//! Response headers leave the engine stamped with a hash of themselves under
//! [`REQUEST_NODE_HEADER`]. When such a message is fed into another request,
//! an unchanged header set is recognised by its hash and dropped instead of
//! being replayed against the backend.

use sha2::{Digest, Sha256};

use crate::config::REQUEST_NODE_HEADER;
use crate::fetch::types::{HeaderField, HeaderMapping};

/// Hex digits kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Deterministic hash of a header mapping.
///
/// The mapping is serialized as canonical JSON (keys sorted by the
/// `BTreeMap`), so equal mappings always hash equally.
pub fn header_fingerprint(headers: &HeaderMapping) -> String {
    let canonical = serde_json::to_vec(headers).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(&canonical));
    digest[..FINGERPRINT_LEN].to_string()
}

/// Stores the fingerprint of `headers` under the reserved key.
pub fn stamp_fingerprint(headers: &mut HeaderMapping) {
    let fingerprint = header_fingerprint(headers);
    headers.insert(
        REQUEST_NODE_HEADER.to_string(),
        HeaderField::Text(fingerprint),
    );
}

/// Removes the reserved key and decides whether the remaining headers are kept.
///
/// Returns `None` when the carried fingerprint matches the remaining headers:
/// they are untouched defaults from an earlier response and must not be sent.
/// Headers without the reserved key are returned unchanged.
pub fn strip_forwarded_headers(mut headers: HeaderMapping) -> Option<HeaderMapping> {
    let key = headers
        .keys()
        .find(|k| k.eq_ignore_ascii_case(REQUEST_NODE_HEADER))
        .cloned();
    let Some(key) = key else {
        return Some(headers);
    };
    let carried = headers.remove(&key).map(|field| field.joined());
    if carried.as_deref() == Some(header_fingerprint(&headers).as_str()) {
        log::debug!("Discarding forwarded response headers (fingerprint match)");
        None
    } else {
        Some(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_headers() -> HeaderMapping {
        let mut headers = HeaderMapping::new();
        headers.insert("content-type".to_string(), "text/plain".into());
        headers.insert("busy".to_string(), "0".into());
        headers.insert(
            "set-cookie".to_string(),
            HeaderField::List(vec!["a=1".to_string(), "b=2".to_string()]),
        );
        headers
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let headers = sample_headers();
        assert_eq!(header_fingerprint(&headers), header_fingerprint(&headers));
        assert_eq!(header_fingerprint(&headers).len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let headers = sample_headers();
        let mut changed = headers.clone();
        changed.insert("busy".to_string(), "1".into());
        assert_ne!(header_fingerprint(&headers), header_fingerprint(&changed));
    }

    #[test]
    fn test_matching_fingerprint_clears_headers() {
        let mut headers = sample_headers();
        stamp_fingerprint(&mut headers);
        assert!(headers.contains_key(REQUEST_NODE_HEADER));
        assert_eq!(strip_forwarded_headers(headers), None);
    }

    #[test]
    fn test_modified_headers_are_kept_without_reserved_key() {
        let mut headers = sample_headers();
        stamp_fingerprint(&mut headers);
        headers.insert("X-Extra".to_string(), "yes".into());

        let kept = strip_forwarded_headers(headers).expect("modified headers are kept");
        assert!(!kept.contains_key(REQUEST_NODE_HEADER));
        assert_eq!(kept["X-Extra"].joined(), "yes");
    }

    #[test]
    fn test_headers_without_fingerprint_pass_through() {
        let headers = sample_headers();
        assert_eq!(strip_forwarded_headers(headers.clone()), Some(headers));
    }
}
