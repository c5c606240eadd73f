//! The message part tree.
//!
//! A [`Part`] is either a leaf carrying one body payload or a multipart
//! container holding an ordered list of child parts. All variants share
//! the header contract; rendering recursively serializes the tree with a
//! collision-checked boundary between container children.

use crate::encoding::{TransferEncoding, encode_body};
use crate::error::{Error, Result};
use crate::header::{self, HeaderCodec, Headers};

/// Headers derived from part state; rejected by the generic header API.
pub(crate) const PART_PROHIBITED: &[&str] =
    &["content-type", "content-transfer-encoding", "mime-version"];

const OCTET_STREAM: &str = "application/octet-stream";

/// Multipart container flavors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartKind {
    /// `multipart/mixed`.
    Mixed,
    /// `multipart/alternative`; the first child is the least-preferred
    /// rendering.
    Alternative,
    /// `multipart/related`.
    Related,
    /// `multipart/report` with an optional `report-type` parameter.
    Report {
        /// The `report-type` Content-Type parameter, when present.
        report_type: Option<String>,
    },
    /// Any other container type, carried literally.
    Other(String),
}

impl MultipartKind {
    fn content_type(&self) -> &str {
        match self {
            Self::Mixed => "multipart/mixed",
            Self::Alternative => "multipart/alternative",
            Self::Related => "multipart/related",
            Self::Report { .. } => "multipart/report",
            Self::Other(content_type) => content_type,
        }
    }
}

/// Per-variant payload of a part.
#[derive(Debug, Clone)]
enum PartKind {
    /// Generic leaf with a settable content type.
    Content {
        content_type: String,
        body: Option<Vec<u8>>,
    },
    /// Leaf framed as an attachment; name and disposition are fixed at
    /// construction and the transfer encoding is locked to base64.
    Attachment {
        content_type: String,
        name: String,
        disposition: Option<String>,
        body: Option<Vec<u8>>,
    },
    /// `text/html` leaf.
    Html { body: Option<Vec<u8>> },
    /// `text/plain` leaf.
    Text { body: Option<Vec<u8>> },
    /// Container with exclusively-owned children.
    Multipart {
        kind: MultipartKind,
        children: Vec<Part>,
        boundary: Option<String>,
    },
}

/// One node of the message tree.
#[derive(Debug, Clone)]
pub struct Part {
    headers: Headers,
    charset: Option<String>,
    encoding: TransferEncoding,
    kind: PartKind,
}

impl Part {
    fn new(encoding: TransferEncoding, kind: PartKind) -> Self {
        Self {
            headers: Headers::new(),
            charset: None,
            encoding,
            kind,
        }
    }

    /// Creates a `text/plain` leaf with the given content.
    pub fn text(content: impl Into<Vec<u8>>) -> Self {
        Self::new(
            TransferEncoding::QuotedPrintable,
            PartKind::Text {
                body: Some(content.into()),
            },
        )
    }

    /// Creates a `text/html` leaf with the given content.
    pub fn html(content: impl Into<Vec<u8>>) -> Self {
        Self::new(
            TransferEncoding::QuotedPrintable,
            PartKind::Html {
                body: Some(content.into()),
            },
        )
    }

    /// Creates a generic content leaf (`application/octet-stream` until
    /// a type is set) with an empty body.
    #[must_use]
    pub fn content() -> Self {
        Self::new(
            TransferEncoding::QuotedPrintable,
            PartKind::Content {
                content_type: OCTET_STREAM.to_string(),
                body: Some(Vec::new()),
            },
        )
    }

    /// Creates an attachment leaf with the given name and no content.
    ///
    /// Attachments are always base64-framed; content must be supplied
    /// via [`Part::set_content`] before rendering.
    pub fn attachment(name: impl Into<String>) -> Self {
        Self::new(
            TransferEncoding::Base64,
            PartKind::Attachment {
                content_type: OCTET_STREAM.to_string(),
                name: name.into(),
                disposition: None,
                body: None,
            },
        )
    }

    /// Creates an attachment leaf with a disposition (`attachment`,
    /// `inline`, ...).
    pub fn attachment_with_disposition(
        name: impl Into<String>,
        disposition: impl Into<String>,
    ) -> Self {
        let mut part = Self::attachment(name);
        if let PartKind::Attachment { disposition: slot, .. } = &mut part.kind {
            *slot = Some(disposition.into());
        }
        part
    }

    /// Creates a generic container carrying the given content type
    /// literally.
    pub fn mime(content_type: impl Into<String>) -> Self {
        Self::container(MultipartKind::Other(content_type.into()))
    }

    /// Creates a `multipart/mixed` container.
    #[must_use]
    pub fn mixed() -> Self {
        Self::container(MultipartKind::Mixed)
    }

    /// Creates a `multipart/alternative` container.
    #[must_use]
    pub fn alternative() -> Self {
        Self::container(MultipartKind::Alternative)
    }

    /// Creates a `multipart/related` container.
    #[must_use]
    pub fn related() -> Self {
        Self::container(MultipartKind::Related)
    }

    /// Creates a `multipart/report` container.
    #[must_use]
    pub fn report() -> Self {
        Self::container(MultipartKind::Report { report_type: None })
    }

    /// Creates a `multipart/report` container with a `report-type`
    /// parameter.
    pub fn report_with_type(report_type: impl Into<String>) -> Self {
        Self::container(MultipartKind::Report {
            report_type: Some(report_type.into()),
        })
    }

    fn container(kind: MultipartKind) -> Self {
        // Multipart envelopes are pure ASCII framing
        Self::new(
            TransferEncoding::SevenBit,
            PartKind::Multipart {
                kind,
                children: Vec::new(),
                boundary: None,
            },
        )
    }

    /// Appends a header value.
    ///
    /// The name is normalized to lower-case and must match
    /// `^[a-z][a-z0-9-]+$`; CR, LF, and TAB are stripped from the value.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or prohibited header name.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        header::checked_add(&mut self.headers, PART_PROHIBITED, name, value)
    }

    /// Sets a header, replacing any existing values with this one.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or prohibited header name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        header::checked_set(&mut self.headers, PART_PROHIBITED, name, value)
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
    pub fn headers(&self) -> &Headers {
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

    /// Returns the content type this part declares.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match &self.kind {
            PartKind::Content { content_type, .. } | PartKind::Attachment { content_type, .. } => {
                content_type
            }
            PartKind::Html { .. } => "text/html",
            PartKind::Text { .. } => "text/plain",
            PartKind::Multipart { kind, .. } => kind.content_type(),
        }
    }

    /// Sets the content type.
    ///
    /// Only the generic content leaf, attachments, and the generic
    /// container accept a type; every other variant's type is fixed.
    ///
    /// # Errors
    ///
    /// Returns an error when this variant's content type is fixed.
    pub fn set_content_type(&mut self, value: impl Into<String>) -> Result<()> {
        match &mut self.kind {
            PartKind::Content { content_type, .. }
            | PartKind::Attachment { content_type, .. }
            | PartKind::Multipart {
                kind: MultipartKind::Other(content_type),
                ..
            } => {
                *content_type = value.into();
                Ok(())
            }
            _ => Err(Error::InvalidPart(format!(
                "content type of {} parts is fixed",
                self.content_type()
            ))),
        }
    }

    /// Returns the declared charset, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Sets the charset rendered into the Content-Type line.
    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = Some(charset.into());
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub const fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Sets the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error on an attachment for anything but base64:
    /// attachment bodies are arbitrary binary and must survive
    /// transport.
    pub fn set_encoding(&mut self, encoding: TransferEncoding) -> Result<()> {
        if matches!(self.kind, PartKind::Attachment { .. }) && encoding != TransferEncoding::Base64
        {
            return Err(Error::InvalidEncoding(format!(
                "attachments are always base64, got {encoding}"
            )));
        }
        self.encoding = encoding;
        Ok(())
    }

    /// Returns this leaf's content.
    ///
    /// # Errors
    ///
    /// Returns an error on a container, or on a leaf whose content was
    /// never set.
    pub fn content(&self) -> Result<&[u8]> {
        match &self.kind {
            PartKind::Multipart { .. } => Err(Error::InvalidPart(
                "containers do not carry content".to_string(),
            )),
            _ => self.leaf_body().ok_or(Error::MissingContent),
        }
    }

    /// Replaces this leaf's content.
    ///
    /// # Errors
    ///
    /// Returns an error on a container.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> Result<()> {
        match &mut self.kind {
            PartKind::Content { body, .. }
            | PartKind::Attachment { body, .. }
            | PartKind::Html { body }
            | PartKind::Text { body } => {
                *body = Some(content.into());
                Ok(())
            }
            PartKind::Multipart { .. } => Err(Error::InvalidPart(
                "containers do not carry content".to_string(),
            )),
        }
    }

    /// Appends a child part to a container.
    ///
    /// # Errors
    ///
    /// Returns an error on a leaf.
    pub fn add_part(&mut self, part: Self) -> Result<()> {
        match &mut self.kind {
            PartKind::Multipart { children, .. } => {
                children.push(part);
                Ok(())
            }
            _ => Err(Error::InvalidPart(
                "only containers accept child parts".to_string(),
            )),
        }
    }

    /// Returns the child parts (empty for a leaf).
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.kind {
            PartKind::Multipart { children, .. } => children,
            _ => &[],
        }
    }

    /// Whether this part is a multipart container.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.kind, PartKind::Multipart { .. })
    }

    /// Returns the boundary chosen by the most recent render.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Multipart { boundary, .. } => boundary.as_deref(),
            _ => None,
        }
    }

    /// Returns the attachment name, if this part is an attachment.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Attachment { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the attachment disposition, if one was set.
    #[must_use]
    pub fn disposition(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Attachment { disposition, .. } => disposition.as_deref(),
            _ => None,
        }
    }

    /// Returns the `report-type` parameter of a report container.
    #[must_use]
    pub fn report_type(&self) -> Option<&str> {
        match &self.kind {
            PartKind::Multipart {
                kind: MultipartKind::Report { report_type },
                ..
            } => report_type.as_deref(),
            _ => None,
        }
    }

    fn leaf_body(&self) -> Option<&[u8]> {
        match &self.kind {
            PartKind::Content { body, .. }
            | PartKind::Attachment { body, .. }
            | PartKind::Html { body }
            | PartKind::Text { body } => body.as_deref(),
            PartKind::Multipart { .. } => None,
        }
    }

    /// Sets the message charset on text leaves that declare none.
    pub(crate) fn apply_charset_default(&mut self, charset: &str) {
        if matches!(self.kind, PartKind::Text { .. } | PartKind::Html { .. }) {
            if self.charset.is_none() {
                self.charset = Some(charset.to_string());
            }
        } else if let PartKind::Multipart { children, .. } = &mut self.kind {
            for child in children {
                child.apply_charset_default(charset);
            }
        }
    }

    /// Renders the stored headers plus the derived Content-Type,
    /// Content-Disposition, and Content-Transfer-Encoding lines.
    ///
    /// A non-empty result always ends with a line terminator.
    #[must_use]
    pub fn render_headers(&self) -> String {
        let codec = HeaderCodec::default();
        let mut out = String::new();

        for (name, values) in self.headers.iter_sorted() {
            let title = header::title_case(name);
            for value in values {
                out.push_str(&codec.encode_line(&title, value, self.charset.as_deref()));
                out.push_str("\r\n");
            }
        }

        out.push_str("Content-Type: ");
        out.push_str(self.content_type());
        if !self.is_multipart()
            && let Some(charset) = &self.charset
        {
            out.push_str(&format!("; charset=\"{charset}\""));
        }
        match &self.kind {
            PartKind::Attachment { name, .. } => {
                out.push_str(&format!("; name=\"{name}\""));
            }
            PartKind::Multipart { kind, boundary, .. } => {
                if let MultipartKind::Report {
                    report_type: Some(report_type),
                } = kind
                {
                    out.push_str(&format!("; report-type={report_type}"));
                }
                if let Some(boundary) = boundary {
                    out.push_str(&format!("; boundary=\"{boundary}\""));
                }
            }
            _ => {}
        }
        out.push_str("\r\n");

        if let PartKind::Attachment {
            name,
            disposition: Some(disposition),
            ..
        } = &self.kind
        {
            out.push_str(&format!(
                "Content-Disposition: {disposition}; filename=\"{name}\"\r\n"
            ));
        }

        out.push_str(&format!("Content-Transfer-Encoding: {}\r\n", self.encoding));
        out
    }

    /// Renders this part (headers, blank line, encoded body or multipart
    /// envelope).
    ///
    /// Containers render children first and pick a boundary that occurs
    /// nowhere in the combined child output.
    ///
    /// # Errors
    ///
    /// Returns an error when an attachment has no content, or when any
    /// descendant fails to render.
    pub fn render(&mut self) -> Result<String> {
        if self.is_multipart() {
            let rendered = match &mut self.kind {
                PartKind::Multipart { children, .. } => children
                    .iter_mut()
                    .map(Self::render)
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };

            let boundary = generate_boundary(&rendered.concat());
            if let PartKind::Multipart { boundary: slot, .. } = &mut self.kind {
                *slot = Some(boundary.clone());
            }

            let mut out = self.render_headers();
            for child in &rendered {
                out.push_str("\r\n--");
                out.push_str(&boundary);
                out.push_str("\r\n");
                out.push_str(child);
            }
            out.push_str("\r\n--");
            out.push_str(&boundary);
            out.push_str("--\r\n");
            Ok(out)
        } else {
            if matches!(self.kind, PartKind::Attachment { body: None, .. }) {
                return Err(Error::MissingContent);
            }
            let encoded = encode_body(self.leaf_body().unwrap_or_default(), self.encoding);
            Ok(format!("{}\r\n{encoded}", self.render_headers()))
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = seed;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derives a boundary token guaranteed absent from the rendered children.
///
/// The candidate is a 32-digit hex string hashed from the content itself,
/// re-mixed until it collides with nothing, so identical children always
/// produce the same boundary.
fn generate_boundary(combined: &str) -> String {
    let mut seed = fnv1a(combined.as_bytes(), FNV_OFFSET);
    loop {
        let candidate = format!(
            "{seed:016x}{:016x}",
            seed.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        );
        if !combined.contains(&candidate) {
            return candidate;
        }
        seed = fnv1a(candidate.as_bytes(), seed);
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
    fn test_add_header_get_header_round_trip() {
        let mut part = Part::text("hi");
        part.add_header("X-Tag", "one").unwrap();
        part.add_header("x-tag", "two").unwrap();
        assert_eq!(part.get_header("X-TAG"), vec!["one", "two"]);
    }

    #[test]
    fn test_add_header_strips_crlf_tab() {
        let mut part = Part::text("hi");
        part.add_header("x-note", "line1\r\nline2\tend").unwrap();
        assert_eq!(part.get_header("x-note"), vec!["line1line2end"]);
    }

    #[test]
    fn test_set_header_replaces_all() {
        let mut part = Part::text("hi");
        part.add_header("x-tag", "one").unwrap();
        part.add_header("x-tag", "two").unwrap();
        part.set_header("x-tag", "three").unwrap();
        assert_eq!(part.get_header("x-tag"), vec!["three"]);
    }

    #[test]
    fn test_prohibited_headers_rejected() {
        let mut part = Part::text("hi");
        for name in ["Content-Type", "content-transfer-encoding", "MIME-Version"] {
            assert!(matches!(
                part.add_header(name, "x"),
                Err(Error::ProhibitedHeader(_))
            ));
        }
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut part = Part::text("hi");
        assert!(matches!(
            part.add_header("bad name", "x"),
            Err(Error::InvalidHeaderName(_))
        ));
        assert!(part.add_header("9lives", "x").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(Part::text("").content_type(), "text/plain");
        assert_eq!(Part::html("").content_type(), "text/html");
        assert_eq!(Part::content().content_type(), "application/octet-stream");
        assert_eq!(Part::mixed().content_type(), "multipart/mixed");
        assert_eq!(Part::alternative().content_type(), "multipart/alternative");
        assert_eq!(Part::related().content_type(), "multipart/related");
        assert_eq!(Part::report().content_type(), "multipart/report");
    }

    #[test]
    fn test_set_content_type_generic_only() {
        let mut content = Part::content();
        content.set_content_type("application/pdf").unwrap();
        assert_eq!(content.content_type(), "application/pdf");

        let mut mime = Part::mime("multipart/digest");
        mime.set_content_type("multipart/parallel").unwrap();
        assert_eq!(mime.content_type(), "multipart/parallel");

        let mut att = Part::attachment("data.pdf");
        att.set_content_type("application/pdf").unwrap();
        assert_eq!(att.content_type(), "application/pdf");

        assert!(Part::text("").set_content_type("text/csv").is_err());
        assert!(Part::html("").set_content_type("text/csv").is_err());
        assert!(Part::mixed().set_content_type("text/csv").is_err());
    }

    #[test]
    fn test_attachment_encoding_locked_to_base64() {
        let mut att = Part::attachment("file.bin");
        assert_eq!(att.encoding(), TransferEncoding::Base64);
        assert!(att.set_encoding(TransferEncoding::Base64).is_ok());
        assert!(matches!(
            att.set_encoding(TransferEncoding::QuotedPrintable),
            Err(Error::InvalidEncoding(_))
        ));
        assert_eq!(att.encoding(), TransferEncoding::Base64);
    }

    #[test]
    fn test_leaf_encoding_settable() {
        let mut part = Part::text("hi");
        assert_eq!(part.encoding(), TransferEncoding::QuotedPrintable);
        part.set_encoding(TransferEncoding::EightBit).unwrap();
        assert_eq!(part.encoding(), TransferEncoding::EightBit);
    }

    #[test]
    fn test_attachment_content_missing() {
        let att = Part::attachment("file.bin");
        assert!(matches!(att.content(), Err(Error::MissingContent)));

        let mut att = Part::attachment("file.bin");
        assert!(matches!(att.render(), Err(Error::MissingContent)));
    }

    #[test]
    fn test_container_content_rejected() {
        let mut container = Part::mixed();
        assert!(container.set_content(b"x".to_vec()).is_err());
        assert!(container.content().is_err());
    }

    #[test]
    fn test_add_part_leaf_rejected() {
        let mut leaf = Part::text("hi");
        assert!(leaf.add_part(Part::text("child")).is_err());
    }

    #[test]
    fn test_render_text_leaf() {
        let mut part = Part::text("hello");
        let rendered = part.render().unwrap();
        assert_eq!(
            rendered,
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\nhello"
        );
    }

    #[test]
    fn test_render_leaf_with_charset() {
        let mut part = Part::text("hello");
        part.set_charset("UTF-8");
        let rendered = part.render().unwrap();
        assert!(rendered.starts_with("Content-Type: text/plain; charset=\"UTF-8\"\r\n"));
    }

    #[test]
    fn test_render_attachment_with_disposition() {
        let mut att = Part::attachment_with_disposition("report.pdf", "attachment");
        att.set_content_type("application/pdf").unwrap();
        att.set_content(b"%PDF".to_vec()).unwrap();
        let rendered = att.render().unwrap();
        assert!(rendered.contains("Content-Type: application/pdf; name=\"report.pdf\"\r\n"));
        assert!(
            rendered.contains("Content-Disposition: attachment; filename=\"report.pdf\"\r\n")
        );
        assert!(rendered.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(rendered.ends_with("\r\nJVBERg=="));
    }

    #[test]
    fn test_render_report_type_parameter() {
        let mut report = Part::report_with_type("delivery-status");
        report.add_part(Part::text("ok")).unwrap();
        let rendered = report.render().unwrap();
        assert!(rendered.contains("Content-Type: multipart/report; report-type=delivery-status;"));
    }

    #[test]
    fn test_container_render_layout() {
        let mut container = Part::mixed();
        container.add_part(Part::text("first")).unwrap();
        container.add_part(Part::text("second")).unwrap();
        let rendered = container.render().unwrap();
        let boundary = container.boundary().unwrap().to_string();

        assert!(rendered.starts_with(&format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\nContent-Transfer-Encoding: 7bit\r\n\r\n--{boundary}\r\n"
        )));
        assert!(rendered.ends_with(&format!("\r\n--{boundary}--\r\n")));
        let occurrences = rendered.matches(&format!("--{boundary}")).count();
        // two openers plus the closer
        assert_eq!(occurrences, 3);
    }

    #[test]
    fn test_boundary_not_in_children() {
        let mut container = Part::mixed();
        container.add_part(Part::text("some content here")).unwrap();
        container.add_part(Part::html("<p>more</p>")).unwrap();
        let mut children_rendered = String::new();
        for child in container.parts() {
            children_rendered.push_str(&child.clone().render().unwrap());
        }
        container.render().unwrap();
        let boundary = container.boundary().unwrap();
        assert!(!children_rendered.contains(boundary));
    }

    #[test]
    fn test_boundary_deterministic_for_identical_children() {
        let build = || {
            let mut c = Part::mixed();
            c.add_part(Part::text("stable content")).unwrap();
            c
        };
        let mut a = build();
        let mut b = build();
        assert_eq!(a.render().unwrap(), b.render().unwrap());
        assert_eq!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_container_no_charset_parameter() {
        let mut container = Part::mixed();
        container.set_charset("UTF-8");
        container.add_part(Part::text("x")).unwrap();
        let rendered = container.render().unwrap();
        assert!(!rendered.starts_with("Content-Type: multipart/mixed; charset"));
    }

    #[test]
    fn test_apply_charset_default_recurses() {
        let mut container = Part::mixed();
        container.add_part(Part::text("plain")).unwrap();
        let mut html = Part::html("<p>x</p>");
        html.set_charset("ISO-8859-1");
        container.add_part(html).unwrap();
        container.add_part(Part::attachment("a.bin")).unwrap();

        container.apply_charset_default("UTF-8");
        assert_eq!(container.parts()[0].charset(), Some("UTF-8"));
        assert_eq!(container.parts()[1].charset(), Some("ISO-8859-1"));
        assert_eq!(container.parts()[2].charset(), None);
    }

    #[test]
    fn test_render_headers_sorted_and_title_cased() {
        let mut part = Part::text("hi");
        part.add_header("x-zulu", "z").unwrap();
        part.add_header("x-alpha", "a").unwrap();
        let headers = part.render_headers();
        let alpha = headers.find("X-Alpha: a").unwrap();
        let zulu = headers.find("X-Zulu: z").unwrap();
        assert!(alpha < zulu);
    }
}
