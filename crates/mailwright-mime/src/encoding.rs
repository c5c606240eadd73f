//! Body and header-word encoding utilities.
//!
//! Supports Base64, Quoted-Printable, 7bit/8bit passthrough, and RFC 2047
//! encoded-words.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use charset::Charset;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

/// Maximum line length for encoded body output.
const MAX_LINE_LENGTH: usize = 76;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII; bytes above 0x7F are stripped on output.
    SevenBit,
    /// 8-bit passthrough.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses a declared transfer encoding leniently.
    ///
    /// Unrecognized values fall back to the given default, matching how
    /// declared encodings from external sources are treated.
    #[must_use]
    pub fn from_declared(s: &str, default: Self) -> Self {
        Self::from_str(s).unwrap_or(default)
    }
}

impl FromStr for TransferEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "7bit" => Ok(Self::SevenBit),
            "8bit" => Ok(Self::EightBit),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            other => Err(Error::InvalidEncoding(other.to_string())),
        }
    }
}

impl Default for TransferEncoding {
    fn default() -> Self {
        Self::QuotedPrintable
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Encodes body bytes according to the given transfer encoding.
///
/// Base64 output is hard-wrapped at 76 columns with CRLF separators and
/// no trailing line terminator. 8bit passes bytes through; 7bit
/// additionally strips any byte above 0x7F.
#[must_use]
pub fn encode_body(content: &[u8], encoding: TransferEncoding) -> String {
    match encoding {
        TransferEncoding::Base64 => encode_base64(content),
        TransferEncoding::QuotedPrintable => encode_quoted_printable(content),
        TransferEncoding::SevenBit => content
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| b as char)
            .collect(),
        TransferEncoding::EightBit => String::from_utf8_lossy(content).into_owned(),
    }
}

/// Encodes data as Base64, wrapped at 76 columns with CRLF separators.
///
/// The result carries no trailing line terminator.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        // Chunks of the standard alphabet are always valid UTF-8
        result.push_str(&String::from_utf8_lossy(chunk));
    }

    result
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Base64 data tolerantly.
///
/// Whitespace is ignored and a corrupt tail is dropped one quantum at a
/// time, so a truncated input still yields its unambiguous prefix.
pub(crate) fn decode_base64_tolerant(data: &str) -> Vec<u8> {
    let mut cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.truncate(cleaned.len() - cleaned.len() % 4);

    while !cleaned.is_empty() {
        if let Ok(decoded) = STANDARD.decode(&cleaned) {
            return decoded;
        }
        cleaned.truncate(cleaned.len() - 4);
    }

    Vec::new()
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Existing CRLF (or bare LF) line breaks are preserved as hard breaks;
/// soft breaks keep encoded lines within 76 columns.
#[must_use]
pub fn encode_quoted_printable(content: &[u8]) -> String {
    let mut result = String::new();
    let mut line_length = 0;
    let mut bytes = content.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        // Hard line break: trailing space on the line must be encoded
        if byte == b'\r' && bytes.peek() == Some(&b'\n') || byte == b'\n' {
            if byte == b'\r' {
                bytes.next();
            }
            if result.ends_with(' ') {
                result.truncate(result.len() - 1);
                result.push_str("=20");
            }
            result.push_str("\r\n");
            line_length = 0;
            continue;
        }

        if line_length >= MAX_LINE_LENGTH - 3 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        match byte {
            // Printable ASCII except '='
            b'!'..=b'<' | b'>'..=b'~' => {
                result.push(byte as char);
                line_length += 1;
            }
            b' ' => {
                result.push(' ');
                line_length += 1;
            }
            _ => {
                result.push('=');
                let _ = write!(result, "{byte:02X}");
                line_length += 3;
            }
        }
    }

    result
}

/// Decodes Quoted-Printable text tolerantly.
///
/// Malformed escape sequences are preserved verbatim rather than
/// rejected; this decoder backs encoded-word handling, which must never
/// fail on corrupt input.
pub(crate) fn decode_quoted_printable(text: &str) -> Vec<u8> {
    let mut result = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            // Soft line break
            if bytes[i + 1..].starts_with(b"\r\n") {
                i += 3;
                continue;
            }
            if bytes[i + 1..].starts_with(b"\n") {
                i += 2;
                continue;
            }
            if let Some(hex) = bytes.get(i + 1..i + 3)
                && let Ok(hex) = std::str::from_utf8(hex)
                && let Ok(byte) = u8::from_str_radix(hex, 16)
            {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }

    result
}

/// Encodes a header value as an RFC 2047 encoded-word if needed.
///
/// ASCII-safe values pass through unchanged; anything else becomes a
/// single B-encoded word in the given charset.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if is_header_safe(text) {
        return text.to_string();
    }

    let encoded = STANDARD.encode(text.as_bytes());
    format!("=?{charset}?B?{encoded}?=")
}

/// Whether a header value can be emitted without an encoded-word.
fn is_header_safe(text: &str) -> bool {
    !text.contains("=?") && text.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

/// One parsed `=?charset?encoding?payload?=` token.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: char,
    payload: &'a str,
    consumed: usize,
}

/// Parses an encoded-word at the start of `s` (which begins with `=?`).
fn parse_encoded_word(s: &str) -> Option<EncodedWord<'_>> {
    let inner = s.get(2..)?;
    let charset_end = inner.find('?')?;
    let charset = &inner[..charset_end];

    let mut rest = inner[charset_end + 1..].chars();
    let encoding = rest.next()?;
    if !matches!(encoding, 'b' | 'B' | 'q' | 'Q') || rest.next() != Some('?') {
        return None;
    }

    let payload_start = charset_end + 3;
    let payload_len = inner[payload_start..].find("?=")?;
    let payload = &inner[payload_start..payload_start + payload_len];
    if payload.contains(char::is_whitespace) {
        return None;
    }

    Some(EncodedWord {
        // RFC 2231 language suffix is not part of the charset label
        charset: charset.split('*').next().unwrap_or(charset),
        encoding,
        payload,
        consumed: 2 + payload_start + payload_len + 2,
    })
}

/// Decodes every RFC 2047 encoded-word in `value`.
///
/// Returns the decoded text and the charset named by the first
/// encoded-word found, if any. When `known_charset` is given it is used
/// to decode every word regardless of the charset each token names.
/// Malformed tokens are emitted verbatim; decoding never fails.
pub(crate) fn decode_encoded_words(
    value: &str,
    known_charset: Option<&str>,
) -> (String, Option<String>) {
    let mut out = String::new();
    let mut detected: Option<String> = None;
    let mut seen_word = false;
    let mut rest = value;

    while let Some(pos) = rest.find("=?") {
        let (before, at) = rest.split_at(pos);

        if let Some(word) = parse_encoded_word(at) {
            // Whitespace between adjacent encoded-words is transparent
            let separator_only =
                seen_word && !before.is_empty() && before.chars().all(char::is_whitespace);
            if !separator_only {
                out.push_str(before);
            }

            let bytes = match word.encoding {
                'b' | 'B' => decode_base64_tolerant(word.payload),
                // Literal '_' in a Q payload is an encoded space
                _ => decode_quoted_printable(&word.payload.replace('_', "=20")),
            };
            let label = known_charset.unwrap_or(word.charset);
            out.push_str(&decode_charset_bytes(&bytes, label));

            if detected.is_none() {
                detected = Some(word.charset.to_string());
            }
            seen_word = true;
            rest = &at[word.consumed..];
        } else {
            out.push_str(before);
            out.push_str("=?");
            seen_word = false;
            rest = &at[2..];
        }
    }

    out.push_str(rest);
    (out, detected)
}

/// Decodes bytes in the named charset, falling back to lossy UTF-8 when
/// the label is unknown.
fn decode_charset_bytes(bytes: &[u8], label: &str) -> String {
    Charset::for_label(label.as_bytes()).map_or_else(
        || String::from_utf8_lossy(bytes).into_owned(),
        |cs| cs.decode_without_bom_handling(bytes).0.into_owned(),
    )
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
    use proptest::prelude::*;

    #[test]
    fn test_transfer_encoding_from_str() {
        assert_eq!(
            "7bit".parse::<TransferEncoding>().unwrap(),
            TransferEncoding::SevenBit
        );
        assert_eq!(
            "Base64".parse::<TransferEncoding>().unwrap(),
            TransferEncoding::Base64
        );
        assert_eq!(
            "quoted-printable".parse::<TransferEncoding>().unwrap(),
            TransferEncoding::QuotedPrintable
        );
        assert!("binary".parse::<TransferEncoding>().is_err());
    }

    #[test]
    fn test_transfer_encoding_from_declared_lenient() {
        assert_eq!(
            TransferEncoding::from_declared("x-uuencode", TransferEncoding::QuotedPrintable),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::from_declared("8BIT", TransferEncoding::QuotedPrintable),
            TransferEncoding::EightBit
        );
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wraps_at_76() {
        let encoded = encode_base64(&[0xAB; 100]);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert!(!encoded.ends_with("\r\n"));
    }

    #[test]
    fn test_base64_tolerant_truncated() {
        // "aGVsbG8=" is "hello"; chop mid-quantum
        let decoded = decode_base64_tolerant("aGVsbG8=xy");
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn test_quoted_printable_ascii_identity() {
        let encoded = encode_quoted_printable(b"Hello, World!");
        assert_eq!(encoded, "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_encodes_non_ascii() {
        let encoded = encode_quoted_printable("Héllo".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_hard_break_resets_line() {
        let encoded = encode_quoted_printable(b"line one\r\nline two");
        assert_eq!(encoded, "line one\r\nline two");
    }

    #[test]
    fn test_quoted_printable_trailing_space_before_break() {
        let encoded = encode_quoted_printable(b"ends with space \r\nnext");
        assert_eq!(encoded, "ends with space=20\r\nnext");
    }

    #[test]
    fn test_quoted_printable_decode_tolerant() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld"), b"HelloWorld");
        // Malformed escape survives verbatim
        assert_eq!(decode_quoted_printable("bad =ZZ tail"), b"bad =ZZ tail");
        assert_eq!(decode_quoted_printable("cut ="), b"cut =");
    }

    #[test]
    fn test_seven_bit_strips_high_bytes() {
        let encoded = encode_body("caf\u{e9}!".as_bytes(), TransferEncoding::SevenBit);
        assert_eq!(encoded, "caf!");
    }

    #[test]
    fn test_eight_bit_passthrough() {
        let encoded = encode_body("café".as_bytes(), TransferEncoding::EightBit);
        assert_eq!(encoded, "café");
    }

    #[test]
    fn test_rfc2047_encode_ascii_passthrough() {
        assert_eq!(encode_rfc2047("Hello", "UTF-8"), "Hello");
    }

    #[test]
    fn test_rfc2047_encode_non_ascii() {
        let encoded = encode_rfc2047("Héllo", "UTF-8");
        assert_eq!(encoded, "=?UTF-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_decode_encoded_words_base64() {
        let (text, charset) = decode_encoded_words("=?UTF-8?B?aGVsbG8=?=", None);
        assert_eq!(text, "hello");
        assert_eq!(charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_decode_encoded_words_q_underscore() {
        let (text, _) = decode_encoded_words("=?UTF-8?Q?hello_world?=", None);
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_decode_encoded_words_latin1() {
        // 0xE9 is é in ISO-8859-1
        let (text, charset) = decode_encoded_words("=?ISO-8859-1?Q?caf=E9?=", None);
        assert_eq!(text, "café");
        assert_eq!(charset.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_decode_encoded_words_adjacent_separator_dropped() {
        let (text, _) = decode_encoded_words("=?UTF-8?B?YWI=?= =?UTF-8?B?Y2Q=?=", None);
        assert_eq!(text, "abcd");
    }

    #[test]
    fn test_decode_encoded_words_literal_text_kept() {
        let (text, _) = decode_encoded_words("before =?UTF-8?B?bWlk?= after", None);
        assert_eq!(text, "before mid after");
    }

    #[test]
    fn test_decode_encoded_words_malformed_never_fails() {
        let (text, charset) = decode_encoded_words("=?UTF-8?B?broken", None);
        assert_eq!(text, "=?UTF-8?B?broken");
        assert!(charset.is_none());

        let (text, _) = decode_encoded_words("=?bogus", None);
        assert_eq!(text, "=?bogus");
    }

    #[test]
    fn test_decode_encoded_words_truncated_base64_keeps_prefix() {
        // "hello" is aGVsbG8=; corrupt the final quantum
        let (text, _) = decode_encoded_words("=?UTF-8?B?aGVsbG8=!!?=", None);
        assert!(text.starts_with("hell"));
    }

    proptest! {
        #[test]
        fn prop_base64_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_base64(&data);
            let unwrapped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            prop_assert_eq!(decode_base64(&unwrapped).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_ascii_identity(s in "[a-zA-Z0-9 !#-<>-~]{0,60}") {
            let encoded = encode_quoted_printable(s.as_bytes());
            prop_assert_eq!(encoded, s);
        }

        #[test]
        fn prop_quoted_printable_round_trip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            // Exclude raw line-break bytes: they are framing, not content
            let data: Vec<u8> = data.into_iter().filter(|b| *b != b'\r' && *b != b'\n').collect();
            let encoded = encode_quoted_printable(&data);
            prop_assert_eq!(decode_quoted_printable(&encoded), data);
        }
    }
}
