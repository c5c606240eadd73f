//! Header storage and the header codec.
//!
//! Headers are kept as a multimap from lower-cased names to ordered value
//! lists. The codec turns name/value pairs into RFC 2047-safe header
//! lines and decodes incoming encoded-word values.

use crate::encoding::{decode_encoded_words, encode_rfc2047};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Collection of headers for one part or message.
///
/// Names are normalized to lower-case; each name maps to an ordered list
/// of values, so duplicates are preserved in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Sets a header value, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, vec![value.into()]);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header, in insertion order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether at least one value is stored for a header.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.remove(&name.to_lowercase());
    }

    /// Removes the first exactly-matching value for a header.
    pub fn remove_value(&mut self, name: &str, value: &str) {
        let name = name.to_lowercase();
        if let Some(values) = self.headers.get_mut(&name) {
            if let Some(pos) = values.iter().position(|v| v == value) {
                values.remove(pos);
            }
            if values.is_empty() {
                self.headers.remove(&name);
            }
        }
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.headers.clear();
    }

    /// Whether no headers are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Returns (name, values) entries with names in sorted order.
    ///
    /// Rendering iterates this way so output is deterministic.
    pub(crate) fn iter_sorted(&self) -> impl Iterator<Item = (&str, &[String])> {
        let mut entries: Vec<_> = self.headers.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
            .into_iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// Validates an already lower-cased header name against `^[a-z][a-z0-9-]+$`.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && name.len() >= 2
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidHeaderName(name.to_string()))
    }
}

/// Strips CR, LF, and TAB from a header value.
pub(crate) fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect()
}

/// Validates and appends a header, rejecting prohibited names.
pub(crate) fn checked_add(
    headers: &mut Headers,
    prohibited: &[&str],
    name: &str,
    value: &str,
) -> Result<()> {
    let name = name.to_lowercase();
    if prohibited.contains(&name.as_str()) {
        return Err(Error::ProhibitedHeader(name));
    }
    validate_name(&name)?;
    headers.add(name, sanitize_value(value));
    Ok(())
}

/// Validates and sets a header, replacing any existing values.
///
/// Equivalent to clearing the name and adding one value; nothing is
/// cleared when validation fails.
pub(crate) fn checked_set(
    headers: &mut Headers,
    prohibited: &[&str],
    name: &str,
    value: &str,
) -> Result<()> {
    let name = name.to_lowercase();
    if prohibited.contains(&name.as_str()) {
        return Err(Error::ProhibitedHeader(name));
    }
    validate_name(&name)?;
    headers.set(name, sanitize_value(value));
    Ok(())
}

/// Title-cases a lower-cased header name (`content-type` → `Content-Type`).
pub(crate) fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// A decoded header value and the charset it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    /// The decoded text.
    pub text: String,
    /// The charset used, when one was known or detected.
    pub charset: Option<String>,
}

/// Encodes and decodes header values.
///
/// Carries the default charset applied when a part declares none; the
/// default is injected here rather than read from global state.
#[derive(Debug, Clone)]
pub struct HeaderCodec {
    default_charset: String,
}

impl Default for HeaderCodec {
    fn default() -> Self {
        Self::new("UTF-8")
    }
}

impl HeaderCodec {
    /// Creates a codec with the given default charset.
    pub fn new(default_charset: impl Into<String>) -> Self {
        Self {
            default_charset: default_charset.into(),
        }
    }

    /// Returns the default charset.
    #[must_use]
    pub fn default_charset(&self) -> &str {
        &self.default_charset
    }

    /// Renders one header line, without a terminator.
    ///
    /// The value is trimmed and, when not ASCII-safe, folded into an
    /// RFC 2047 encoded-word using `charset` (or the codec default).
    /// `Message-ID` values are emitted verbatim: message identifiers
    /// must stay ASCII-safe and are never transformed.
    #[must_use]
    pub fn encode_line(&self, name: &str, value: &str, charset: Option<&str>) -> String {
        let value = value.trim();
        if name.eq_ignore_ascii_case("message-id") {
            return format!("{name}: {value}");
        }

        let charset = charset.unwrap_or(&self.default_charset);
        format!("{name}: {}", encode_rfc2047(value, charset))
    }

    /// Decodes a raw header value.
    ///
    /// Folding continuations (CR/LF followed by TAB) collapse to a single
    /// space first. Encoded-words are decoded with `known_charset` when
    /// given, otherwise with the charset each word names; the first
    /// word's charset is reported back. Never fails: malformed
    /// encoded-words degrade to their verbatim text.
    #[must_use]
    pub fn decode_value(&self, raw: &str, known_charset: Option<&str>) -> DecodedHeader {
        let unfolded = raw.replace("\r\n\t", " ").replace("\n\t", " ");
        let (text, detected) = decode_encoded_words(&unfolded, known_charset);

        DecodedHeader {
            text,
            charset: known_charset.map(str::to_string).or(detected),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_add_get_round_trip() {
        let mut headers = Headers::new();
        headers.add("X-Custom", "value one");
        assert_eq!(headers.get("x-custom"), Some("value one"));
        assert_eq!(headers.get("X-CUSTOM"), Some("value one"));
    }

    #[test]
    fn test_headers_duplicates_keep_order() {
        let mut headers = Headers::new();
        headers.add("received", "first");
        headers.add("received", "second");
        assert_eq!(headers.get_all("received"), vec!["first", "second"]);
    }

    #[test]
    fn test_headers_set_replaces_all() {
        let mut headers = Headers::new();
        headers.add("x-tag", "a");
        headers.add("x-tag", "b");
        headers.set("x-tag", "c");
        assert_eq!(headers.get_all("x-tag"), vec!["c"]);
    }

    #[test]
    fn test_headers_remove_value_first_match_only() {
        let mut headers = Headers::new();
        headers.add("x-tag", "dup");
        headers.add("x-tag", "keep");
        headers.add("x-tag", "dup");
        headers.remove_value("x-tag", "dup");
        assert_eq!(headers.get_all("x-tag"), vec!["keep", "dup"]);
    }

    #[test]
    fn test_headers_remove_value_drops_empty_entry() {
        let mut headers = Headers::new();
        headers.add("x-tag", "only");
        headers.remove_value("x-tag", "only");
        assert!(!headers.contains("x-tag"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("x-custom-header").is_ok());
        assert!(validate_name("to").is_ok());
        assert!(validate_name("x2").is_ok());
        assert!(validate_name("X-Bad").is_err());
        assert!(validate_name("2x").is_err());
        assert!(validate_name("x").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
    }

    #[test]
    fn test_sanitize_value_strips_crlf_tab() {
        assert_eq!(sanitize_value("line1\r\nline2\tend"), "line1line2end");
    }

    #[test]
    fn test_checked_add_rejects_prohibited() {
        let mut headers = Headers::new();
        let err = checked_add(&mut headers, &["content-type"], "Content-Type", "text/plain");
        assert!(matches!(err, Err(Error::ProhibitedHeader(_))));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("content-type"), "Content-Type");
        assert_eq!(title_case("x-my-header"), "X-My-Header");
    }

    #[test]
    fn test_encode_line_plain() {
        let codec = HeaderCodec::default();
        assert_eq!(
            codec.encode_line("Subject", "  Hi  ", None),
            "Subject: Hi"
        );
    }

    #[test]
    fn test_encode_line_non_ascii() {
        let codec = HeaderCodec::default();
        let line = codec.encode_line("Subject", "Héllo", None);
        assert_eq!(line, "Subject: =?UTF-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_encode_line_explicit_charset() {
        let codec = HeaderCodec::default();
        let line = codec.encode_line("Subject", "Héllo", Some("ISO-8859-1"));
        assert!(line.starts_with("Subject: =?ISO-8859-1?B?"));
    }

    #[test]
    fn test_encode_line_message_id_verbatim() {
        let codec = HeaderCodec::default();
        let line = codec.encode_line("Message-ID", "<ab=?c@example.com>", None);
        assert_eq!(line, "Message-ID: <ab=?c@example.com>");
    }

    #[test]
    fn test_decode_value_detects_charset() {
        let codec = HeaderCodec::default();
        let decoded = codec.decode_value("=?UTF-8?B?aGVsbG8=?=", None);
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_decode_value_known_charset_wins() {
        let codec = HeaderCodec::default();
        let decoded = codec.decode_value("=?ISO-8859-1?Q?caf=E9?=", Some("ISO-8859-1"));
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.charset.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_decode_value_collapses_folding() {
        let codec = HeaderCodec::default();
        let decoded = codec.decode_value("first\r\n\tsecond", None);
        assert_eq!(decoded.text, "first second");
    }

    #[test]
    fn test_decode_value_plain_passthrough() {
        let codec = HeaderCodec::default();
        let decoded = codec.decode_value("just text", None);
        assert_eq!(decoded.text, "just text");
        assert!(decoded.charset.is_none());
    }
}
