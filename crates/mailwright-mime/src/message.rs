//! The message root.
//!
//! A [`Message`] wraps exactly one body [`Part`] and carries the
//! message-level headers: recipients, sender, subject, date, and the
//! charset applied to text parts that declare none.

use crate::address::Mailbox;
use crate::error::{Error, Result};
use crate::header::{self, HeaderCodec, Headers};
use crate::part::Part;
use chrono::{DateTime, FixedOffset};

/// Headers managed through dedicated message state; rejected by the
/// generic header API.
const MESSAGE_PROHIBITED: &[&str] = &[
    "content-type",
    "content-transfer-encoding",
    "mime-version",
    "subject",
    "to",
    "from",
    "cc",
    "reply-to",
    "return-path",
];

/// Default message charset.
const DEFAULT_CHARSET: &str = "UTF-8";

/// A complete email message wrapping one body part.
#[derive(Debug, Clone, Default)]
pub struct Message {
    headers: Headers,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    from: Option<Mailbox>,
    reply_to: Option<Mailbox>,
    return_path: Option<Mailbox>,
    subject: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    charset: Option<String>,
    body: Option<Part>,
    attachment_count: u32,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `To` recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn add_to(&mut self, address: impl Into<String>, name: Option<&str>) -> Result<()> {
        self.to.push(make_mailbox(address, name)?);
        Ok(())
    }

    /// Adds a `Cc` recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn add_cc(&mut self, address: impl Into<String>, name: Option<&str>) -> Result<()> {
        self.cc.push(make_mailbox(address, name)?);
        Ok(())
    }

    /// Sets the `From` sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn set_from(&mut self, address: impl Into<String>, name: Option<&str>) -> Result<()> {
        self.from = Some(make_mailbox(address, name)?);
        Ok(())
    }

    /// Sets the `Reply-To` address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn set_reply_to(&mut self, address: impl Into<String>, name: Option<&str>) -> Result<()> {
        self.reply_to = Some(make_mailbox(address, name)?);
        Ok(())
    }

    /// Sets the `Return-Path` address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn set_return_path(&mut self, address: impl Into<String>, name: Option<&str>) -> Result<()> {
        self.return_path = Some(make_mailbox(address, name)?);
        Ok(())
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Sets the `Date` header value.
    pub const fn set_date(&mut self, date: DateTime<FixedOffset>) {
        self.date = Some(date);
    }

    /// Sets the message charset (default UTF-8).
    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = Some(charset.into());
    }

    /// Returns the `To` recipients.
    #[must_use]
    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    /// Returns the `Cc` recipients.
    #[must_use]
    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    /// Returns the `From` sender, if set.
    #[must_use]
    pub const fn from(&self) -> Option<&Mailbox> {
        self.from.as_ref()
    }

    /// Returns the `Reply-To` address, if set.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Mailbox> {
        self.reply_to.as_ref()
    }

    /// Returns the `Return-Path` address, if set.
    #[must_use]
    pub const fn return_path(&self) -> Option<&Mailbox> {
        self.return_path.as_ref()
    }

    /// Returns the subject, if set.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the `Date` header value, if set.
    #[must_use]
    pub const fn date(&self) -> Option<&DateTime<FixedOffset>> {
        self.date.as_ref()
    }

    /// Returns the message charset.
    #[must_use]
    pub fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    /// Whether a charset was explicitly set or discovered.
    pub(crate) const fn charset_is_set(&self) -> bool {
        self.charset.is_some()
    }

    /// Appends a message-level header.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or prohibited header name;
    /// address headers and the subject are managed through their
    /// dedicated mutators.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        header::checked_add(&mut self.headers, MESSAGE_PROHIBITED, name, value)
    }

    /// Sets a message-level header, replacing any existing values.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or prohibited header name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        header::checked_set(&mut self.headers, MESSAGE_PROHIBITED, name, value)
    }

    /// Gets all stored values for a header, in insertion order.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    /// Whether at least one value is stored for a header.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Returns the full header multimap.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Removes all values for a header.
    pub fn clear_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Removes every stored header.
    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Removes the first exactly-matching value for a header.
    pub fn remove_header(&mut self, name: &str, value: &str) {
        self.headers.remove_value(name, value);
    }

    /// Sets the body part, replacing any previous one.
    pub fn set_body(&mut self, body: Part) {
        self.body = Some(body);
    }

    /// Returns the body part.
    ///
    /// # Errors
    ///
    /// Returns an error if no body part has been set.
    pub fn body(&self) -> Result<&Part> {
        self.body.as_ref().ok_or(Error::MissingBody)
    }

    /// Returns the body part mutably.
    ///
    /// # Errors
    ///
    /// Returns an error if no body part has been set.
    pub fn body_mut(&mut self) -> Result<&mut Part> {
        self.body.as_mut().ok_or(Error::MissingBody)
    }

    /// Returns the number of attachment-classified parts.
    #[must_use]
    pub const fn attachment_count(&self) -> u32 {
        self.attachment_count
    }

    /// Whether any attachment-classified part was counted.
    #[must_use]
    pub const fn has_attachment(&self) -> bool {
        self.attachment_count > 0
    }

    /// Records one more attachment-classified part.
    pub const fn increment_attachment_count(&mut self) {
        self.attachment_count += 1;
    }

    /// Records the removal of an attachment-classified part.
    ///
    /// The counter never drops below zero.
    pub const fn decrement_attachment_count(&mut self) {
        self.attachment_count = self.attachment_count.saturating_sub(1);
    }

    /// Serializes the whole message to a CRLF-delimited string.
    ///
    /// Message-level headers come first, then `MIME-Version: 1.0` when
    /// the body is a container, then the body part's own rendering. Text
    /// leaves with no charset inherit the message charset. The output
    /// always ends with a line terminator; some re-parsers truncate a
    /// final non-terminated line.
    ///
    /// # Errors
    ///
    /// Returns an error if no body part is set or the body fails to
    /// render.
    pub fn render(&mut self) -> Result<String> {
        let charset = self.charset().to_string();
        let codec = HeaderCodec::new(charset.clone());
        let body = self.body.as_mut().ok_or(Error::MissingBody)?;
        body.apply_charset_default(&charset);

        let mut out = String::new();
        if let Some(return_path) = &self.return_path {
            out.push_str(&format!("Return-Path: <{}>\r\n", return_path.address));
        }
        if let Some(from) = &self.from {
            out.push_str(&format!("From: {}\r\n", from.format(&charset)));
        }
        if let Some(subject) = &self.subject {
            out.push_str(&codec.encode_line("Subject", subject, None));
            out.push_str("\r\n");
        }
        if !self.to.is_empty() {
            out.push_str(&format!("To: {}\r\n", format_list(&self.to, &charset)));
        }
        if !self.cc.is_empty() {
            out.push_str(&format!("Cc: {}\r\n", format_list(&self.cc, &charset)));
        }
        if let Some(reply_to) = &self.reply_to {
            out.push_str(&format!("Reply-To: {}\r\n", reply_to.format(&charset)));
        }
        if let Some(date) = &self.date {
            out.push_str(&format!("Date: {}\r\n", date.to_rfc2822()));
        }

        for (name, values) in self.headers.iter_sorted() {
            let title = header::title_case(name);
            for value in values {
                out.push_str(&codec.encode_line(&title, value, None));
                out.push_str("\r\n");
            }
        }

        if body.is_multipart() {
            out.push_str("MIME-Version: 1.0\r\n");
        }

        out.push_str(&body.render()?);
        if !out.ends_with("\r\n") {
            out.push_str("\r\n");
        }
        Ok(out)
    }
}

fn make_mailbox(address: impl Into<String>, name: Option<&str>) -> Result<Mailbox> {
    match name {
        Some(name) => Mailbox::with_name(name, address),
        None => Mailbox::new(address),
    }
}

fn format_list(mailboxes: &[Mailbox], charset: &str) -> String {
    mailboxes
        .iter()
        .map(|mb| mb.format(charset))
        .collect::<Vec<_>>()
        .join(", ")
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
    use chrono::TimeZone;

    #[test]
    fn test_body_missing() {
        let message = Message::new();
        assert!(matches!(message.body(), Err(Error::MissingBody)));

        let mut message = Message::new();
        assert!(matches!(message.render(), Err(Error::MissingBody)));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut message = Message::new();
        assert!(matches!(
            message.add_to("not-an-address", None),
            Err(Error::InvalidAddress(_))
        ));
        assert!(message.to().is_empty());
    }

    #[test]
    fn test_message_prohibited_headers() {
        let mut message = Message::new();
        for name in ["Subject", "To", "From", "Cc", "Reply-To", "Return-Path"] {
            assert!(matches!(
                message.add_header(name, "x"),
                Err(Error::ProhibitedHeader(_))
            ));
        }
        // Part-level prohibitions also apply at the root
        assert!(message.add_header("Content-Type", "text/plain").is_err());
    }

    #[test]
    fn test_attachment_counter() {
        let mut message = Message::new();
        assert_eq!(message.attachment_count(), 0);
        assert!(!message.has_attachment());

        message.increment_attachment_count();
        message.increment_attachment_count();
        assert_eq!(message.attachment_count(), 2);
        assert!(message.has_attachment());

        message.decrement_attachment_count();
        message.decrement_attachment_count();
        message.decrement_attachment_count();
        assert_eq!(message.attachment_count(), 0);
        assert!(!message.has_attachment());
    }

    #[test]
    fn test_render_simple_text_message() {
        let mut message = Message::new();
        message.set_from("a@example.com", None).unwrap();
        message.add_to("b@example.com", None).unwrap();
        message.set_subject("Hi");
        message.set_body(Part::text("hello"));

        let rendered = message.render().unwrap();
        assert_eq!(
            rendered,
            "From: a@example.com\r\n\
             Subject: Hi\r\n\
             To: b@example.com\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             \r\n\
             hello\r\n"
        );
    }

    #[test]
    fn test_render_recipients_and_names() {
        let mut message = Message::new();
        message.set_from("a@example.com", Some("Alice")).unwrap();
        message.add_to("b@example.com", Some("Bob <spoof>")).unwrap();
        message.add_to("c@example.com", None).unwrap();
        message.add_cc("d@example.com", None).unwrap();
        message.set_reply_to("e@example.com", None).unwrap();
        message.set_return_path("bounce@example.com", None).unwrap();
        message.set_body(Part::text("x"));

        let rendered = message.render().unwrap();
        assert!(rendered.starts_with("Return-Path: <bounce@example.com>\r\n"));
        assert!(rendered.contains("From: Alice <a@example.com>\r\n"));
        assert!(rendered.contains("To: Bob (spoof) <b@example.com>, c@example.com\r\n"));
        assert!(rendered.contains("Cc: d@example.com\r\n"));
        assert!(rendered.contains("Reply-To: e@example.com\r\n"));
    }

    #[test]
    fn test_render_non_ascii_subject_encoded() {
        let mut message = Message::new();
        message.set_subject("Héllo");
        message.set_body(Part::text("x"));
        let rendered = message.render().unwrap();
        assert!(rendered.contains("Subject: =?UTF-8?B?SMOpbGxv?=\r\n"));
    }

    #[test]
    fn test_render_mime_version_only_for_containers() {
        let mut message = Message::new();
        message.set_body(Part::text("x"));
        assert!(!message.render().unwrap().contains("MIME-Version"));

        let mut container = Part::mixed();
        container.add_part(Part::text("x")).unwrap();
        let mut message = Message::new();
        message.set_body(container);
        assert!(message.render().unwrap().contains("MIME-Version: 1.0\r\n"));
    }

    #[test]
    fn test_render_date_header() {
        let mut message = Message::new();
        let date = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
            .unwrap();
        message.set_date(date);
        message.set_body(Part::text("x"));
        let rendered = message.render().unwrap();
        assert!(rendered.contains("Date: Sat, 14 Mar 2026 09:26:53 +0100\r\n"));
    }

    #[test]
    fn test_render_custom_headers() {
        let mut message = Message::new();
        message.add_header("X-Mailer", "mailwright").unwrap();
        message.set_body(Part::text("x"));
        let rendered = message.render().unwrap();
        assert!(rendered.contains("X-Mailer: mailwright\r\n"));
    }

    #[test]
    fn test_render_always_ends_with_terminator() {
        let mut message = Message::new();
        let mut body = Part::text("no trailing newline");
        body.set_encoding(crate::encoding::TransferEncoding::EightBit)
            .unwrap();
        message.set_body(body);
        assert!(message.render().unwrap().ends_with("\r\n"));
    }

    #[test]
    fn test_message_charset_flows_to_text_body() {
        let mut message = Message::new();
        message.set_charset("ISO-8859-1");
        message.set_body(Part::text("x"));
        let rendered = message.render().unwrap();
        assert!(rendered.contains("Content-Type: text/plain; charset=\"ISO-8859-1\"\r\n"));
    }
}
