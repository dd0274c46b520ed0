//! Query-string repair.
//!
//! Callers often hand over URLs whose query is only partly encoded, e.g.
//! `?a=hello%20there&b=20%`. Valid `%XX` escapes must survive untouched while a
//! bare `%` is escaped to `%25`; nothing else is rewritten.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped by [`encode_uri_component`]: everything except
/// alphanumerics and `- _ . ! ~ * ' ( )`.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a single query or cookie component.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Normalizes the query component of `url`.
///
/// Everything before the first `?` is returned verbatim. Within the query,
/// each `%` not followed by two hexadecimal digits becomes `%25`. The
/// operation is total and idempotent.
///
/// # Examples
///
/// ```
/// use vision_bridge::fetch::normalize_url;
///
/// assert_eq!(
///     normalize_url("http://host/p?a=hi%20there&b=20%"),
///     "http://host/p?a=hi%20there&b=20%25"
/// );
/// ```
pub fn normalize_url(url: &str) -> String {
    let Some((host_path, query)) = url.split_once('?') else {
        return url.to_string();
    };
    if query.is_empty() || !query.contains('%') {
        return url.to_string();
    }
    format!("{}?{}", host_path, escape_stray_percents(query))
}

fn escape_stray_percents(query: &str) -> String {
    let bytes = query.as_bytes();
    let mut out = String::with_capacity(query.len() + 8);
    for (i, ch) in query.char_indices() {
        if ch == '%' && !is_escape_at(bytes, i) {
            out.push_str("%25");
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_escape_at(bytes: &[u8], i: usize) -> bool {
    matches!(
        (bytes.get(i + 1), bytes.get(i + 2)),
        (Some(a), Some(b)) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit()
    )
}
