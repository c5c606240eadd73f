//! Email addresses and mailbox formatting.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates an email address (basic syntax check).
    fn validate(addr: &str) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidAddress(format!("{addr:?}: {reason}"));

        let (local, domain) = addr
            .split_once('@')
            .ok_or_else(|| invalid("must contain @"))?;

        if local.is_empty() || domain.is_empty() {
            return Err(invalid("local and domain parts cannot be empty"));
        }
        if domain.contains('@') {
            return Err(invalid("must have exactly one @"));
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(invalid("domain must have non-empty dot-separated parts"));
        }
        if addr
            .chars()
            .any(|c| c.is_ascii_control() || c.is_whitespace())
        {
            return Err(invalid("must not contain whitespace or control characters"));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional, sanitized on construction).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// The display name is sanitized for safe embedding in a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(sanitize_display_name(&name.into())),
            address: Address::new(address)?,
        })
    }

    /// Formats this mailbox for an address header.
    ///
    /// Non-ASCII display names become RFC 2047 encoded-words in the
    /// given charset.
    #[must_use]
    pub fn format(&self, charset: &str) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => {
                format!("{} <{}>", encode_rfc2047(name, charset), self.address)
            }
            _ => self.address.to_string(),
        }
    }
}

/// Sanitizes a display name for embedding in a header.
///
/// CR, LF, and TAB are stripped; `"`, `<`, and `>` are replaced with
/// safe substitutes.
#[must_use]
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .map(|c| match c {
            '"' => '\'',
            '<' => '(',
            '>' => ')',
            c => c,
        })
        .collect()
}

/// One address produced by the external address-list grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Display name, when the source carried one.
    pub display: Option<String>,
    /// The bare address.
    pub address: String,
    /// Whether this entry is an RFC 822 group rather than a mailbox.
    pub is_group: bool,
}

/// External collaborator that parses RFC 822 address lists.
///
/// Address-list grammar is out of scope for this crate; the tree
/// assembler delegates to an implementation of this trait.
pub trait AddressParser {
    /// Parses a raw header value into an ordered address list.
    fn parse_address_list(&self, raw: &str) -> Vec<ParsedAddress>;
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
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_double_at() {
        assert!(Address::new("user@@example.com").is_err());
    }

    #[test]
    fn test_invalid_address_bare_domain() {
        assert!(Address::new("user@example").is_err());
        assert!(Address::new("user@example..com").is_err());
    }

    #[test]
    fn test_invalid_address_whitespace() {
        assert!(Address::new("us er@example.com").is_err());
        assert!(Address::new("user@example.com\r\n").is_err());
    }

    #[test]
    fn test_mailbox_format_bare() {
        let mailbox = Mailbox::new("a@example.com").unwrap();
        assert_eq!(mailbox.format("UTF-8"), "a@example.com");
    }

    #[test]
    fn test_mailbox_format_with_name() {
        let mailbox = Mailbox::with_name("Alice", "a@example.com").unwrap();
        assert_eq!(mailbox.format("UTF-8"), "Alice <a@example.com>");
    }

    #[test]
    fn test_mailbox_format_non_ascii_name() {
        let mailbox = Mailbox::with_name("Ålice", "a@example.com").unwrap();
        assert_eq!(
            mailbox.format("UTF-8"),
            "=?UTF-8?B?w4VsaWNl?= <a@example.com>"
        );
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(
            sanitize_display_name("\"Evil\"\r\n <spoof>"),
            "'Evil' (spoof)"
        );
    }
}
