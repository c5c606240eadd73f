//! Reconstruction of a typed part tree from an externally-parsed
//! message.
//!
//! The low-level byte-stream tokenizer lives outside this crate; it
//! exposes each parsed node through [`SourceNode`]. The assembler walks
//! that structure top-down, decides which concrete [`Part`] variant each
//! node becomes, and rebuilds the [`Message`] around it.

use crate::address::AddressParser;
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use crate::header::HeaderCodec;
use crate::message::Message;
use crate::part::Part;
use tracing::{debug, warn};

/// Error reported by the external message source.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct SourceError(
    /// Human-readable reason for the failure.
    pub String,
);

/// Result alias for source reads.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// One structural node of an externally-parsed message.
///
/// Every accessor may signal a read failure; any such failure aborts
/// the whole reconstruction.
pub trait SourceNode {
    /// Declared content type, when present.
    fn content_type(&self) -> SourceResult<Option<String>>;

    /// Whether this node is a multipart container.
    fn is_multipart(&self) -> SourceResult<bool>;

    /// Number of structural children (containers only).
    fn child_count(&self) -> SourceResult<usize>;

    /// Child node at `index`.
    fn child(&self, index: usize) -> SourceResult<&Self>;

    /// Already-decoded body bytes (leaves only).
    fn body(&self) -> SourceResult<Vec<u8>>;

    /// Header (name, raw value) pairs in original order.
    fn headers(&self) -> SourceResult<Vec<(String, String)>>;

    /// Content-Type `name` parameter, when present.
    fn content_name(&self) -> SourceResult<Option<String>>;

    /// Content-Disposition value, when present.
    fn disposition(&self) -> SourceResult<Option<String>>;

    /// Declared charset, when present.
    fn charset(&self) -> SourceResult<Option<String>>;

    /// Declared transfer encoding, when present.
    fn transfer_encoding(&self) -> SourceResult<Option<String>>;

    /// `report-type` parameter (`multipart/report` only).
    fn report_type(&self) -> SourceResult<Option<String>>;
}

/// Headers already represented structurally on the typed node; never
/// copied through the generic header path.
const STRUCTURAL_HEADERS: &[&str] = &[
    "content-type",
    "content-transfer-encoding",
    "mime-version",
    "content-disposition",
];

/// Message-level headers extracted into dedicated [`Message`] state.
const ROOT_HEADERS: &[&str] = &["from", "to", "cc", "reply-to", "return-path", "subject"];

/// Rebuilds typed [`Message`] trees from externally-parsed structure.
pub struct MessageAssembler<'a, P> {
    parser: &'a P,
    codec: HeaderCodec,
}

impl<'a, P: AddressParser> MessageAssembler<'a, P> {
    /// Creates an assembler delegating address-list parsing to `parser`.
    pub fn new(parser: &'a P) -> Self {
        Self {
            parser,
            codec: HeaderCodec::default(),
        }
    }

    /// Creates an assembler with an explicit header codec.
    pub const fn with_codec(parser: &'a P, codec: HeaderCodec) -> Self {
        Self { parser, codec }
    }

    /// Reconstructs a [`Message`] from the root structural node.
    ///
    /// Message-level headers are extracted from the root's own header
    /// list; the root's content becomes the wrapped body part. A header
    /// that fails to decode or apply is dropped with a warning; a source
    /// read failure aborts with the failing node's path.
    ///
    /// # Errors
    ///
    /// Returns an error when the source signals a read failure for any
    /// node.
    pub fn assemble<N: SourceNode>(&self, root: &N) -> Result<Message> {
        let mut message = Message::new();

        if let Some(charset) = read(root, "root", N::charset)? {
            message.set_charset(charset);
        }

        for (name, raw) in read(root, "root", N::headers)? {
            self.apply_root_header(&mut message, &name, &raw);
        }

        let body = self.classify(root, true, "root", &mut message)?;
        message.set_body(body);
        Ok(message)
    }

    /// Applies one root header to the message, extracting the address
    /// and subject headers into dedicated state.
    fn apply_root_header(&self, message: &mut Message, name: &str, raw: &str) {
        let lower = name.to_lowercase();
        if ROOT_HEADERS.contains(&lower.as_str()) {
            let decoded = self.codec.decode_value(raw, None);
            if !message.charset_is_set()
                && let Some(charset) = &decoded.charset
            {
                message.set_charset(charset.clone());
            }

            match lower.as_str() {
                "subject" => message.set_subject(decoded.text),
                "to" => self.add_recipients(&decoded.text, |addr, disp| {
                    message.add_to(addr, disp)
                }),
                "cc" => self.add_recipients(&decoded.text, |addr, disp| {
                    message.add_cc(addr, disp)
                }),
                "from" => self.set_single(&decoded.text, |addr, disp| {
                    message.set_from(addr, disp)
                }),
                "reply-to" => self.set_single(&decoded.text, |addr, disp| {
                    message.set_reply_to(addr, disp)
                }),
                _ => self.set_single(&decoded.text, |addr, disp| {
                    message.set_return_path(addr, disp)
                }),
            }
            return;
        }

        let decoded = self.codec.decode_value(raw, None);
        if let Err(error) = message.add_header(&lower, &decoded.text) {
            warn!(%error, header = %name, "dropping message header");
        }
    }

    /// Adds every non-group address in a decoded list via `add`,
    /// dropping invalid entries individually.
    fn add_recipients(
        &self,
        decoded: &str,
        mut add: impl FnMut(String, Option<&str>) -> Result<()>,
    ) {
        for parsed in self.parser.parse_address_list(decoded) {
            if parsed.is_group {
                continue;
            }
            let address = parsed.address.clone();
            if let Err(error) = add(parsed.address, parsed.display.as_deref()) {
                warn!(%error, address = %address, "dropping recipient");
            }
        }
    }

    /// Applies the first non-group address in a decoded list via `set`.
    fn set_single(&self, decoded: &str, set: impl FnOnce(String, Option<&str>) -> Result<()>) {
        if let Some(parsed) = self
            .parser
            .parse_address_list(decoded)
            .into_iter()
            .find(|parsed| !parsed.is_group)
        {
            let address = parsed.address.clone();
            if let Err(error) = set(parsed.address, parsed.display.as_deref()) {
                warn!(%error, address = %address, "dropping address header");
            }
        }
    }

    /// Classifies one structural node into a typed part, recursing into
    /// children.
    fn classify<N: SourceNode>(
        &self,
        node: &N,
        primary: bool,
        path: &str,
        message: &mut Message,
    ) -> Result<Part> {
        let mut part = if read(node, path, N::is_multipart)? {
            self.classify_container(node, path, message)?
        } else {
            self.classify_leaf(node, primary, path, message)?
        };

        if !primary {
            self.copy_headers(node, &mut part, path)?;
        }
        Ok(part)
    }

    fn classify_container<N: SourceNode>(
        &self,
        node: &N,
        path: &str,
        message: &mut Message,
    ) -> Result<Part> {
        let declared = read(node, path, N::content_type)?;
        let lowered = declared.as_deref().unwrap_or_default().to_lowercase();

        let mut part = match lowered.as_str() {
            "multipart/alternative" => Part::alternative(),
            "multipart/mixed" => Part::mixed(),
            "multipart/related" => Part::related(),
            "multipart/report" => match read(node, path, N::report_type)? {
                Some(report_type) => Part::report_with_type(report_type),
                None => Part::report(),
            },
            // Unrecognized container types carry their literal string
            _ => Part::mime(declared.unwrap_or_else(|| "multipart/mixed".to_string())),
        };
        debug!(content_type = %part.content_type(), path, "classified container");

        for index in 0..read(node, path, N::child_count)? {
            let child = node.child(index).map_err(|e| source_error(path, e))?;
            let child_path = format!("{path}.{index}");
            let child_part = self.classify(child, false, &child_path, message)?;
            part.add_part(child_part)?;
        }
        Ok(part)
    }

    fn classify_leaf<N: SourceNode>(
        &self,
        node: &N,
        primary: bool,
        path: &str,
        message: &mut Message,
    ) -> Result<Part> {
        let declared = read(node, path, N::content_type)?;
        let content_name = if primary {
            None
        } else {
            read(node, path, N::content_name)?
        };

        let mut part = if let Some(name) = content_name {
            let mut part = match read(node, path, N::disposition)? {
                Some(disposition) => Part::attachment_with_disposition(name, disposition),
                None => Part::attachment(name),
            };
            if let Some(content_type) = declared {
                part.set_content_type(content_type)?;
            }
            message.increment_attachment_count();
            part
        } else {
            let lowered = declared.as_deref().map(str::to_lowercase);
            match lowered.as_deref() {
                Some("text/html") => Part::html(Vec::new()),
                // An absent type defaults to text/plain per RFC 2045
                Some("text/plain") | None => Part::text(Vec::new()),
                Some(_) => {
                    let mut part = Part::content();
                    if let Some(content_type) = declared {
                        part.set_content_type(content_type)?;
                    }
                    if let Some(value) = read(node, path, N::transfer_encoding)? {
                        let encoding = TransferEncoding::from_declared(&value, part.encoding());
                        part.set_encoding(encoding)?;
                    }
                    // Neither text nor HTML: counts as an attachment
                    // even without an explicit name
                    message.increment_attachment_count();
                    part
                }
            }
        };
        debug!(content_type = %part.content_type(), path, "classified leaf");

        part.set_content(read(node, path, N::body)?)?;
        if let Some(charset) = read(node, path, N::charset)? {
            if !message.charset_is_set() {
                message.set_charset(charset.clone());
            }
            part.set_charset(charset);
        }
        Ok(part)
    }

    /// Copies non-structural headers onto a part, dropping any header
    /// that fails to decode or apply.
    fn copy_headers<N: SourceNode>(&self, node: &N, part: &mut Part, path: &str) -> Result<()> {
        for (name, raw) in read(node, path, N::headers)? {
            if STRUCTURAL_HEADERS.contains(&name.to_lowercase().as_str()) {
                continue;
            }
            let decoded = self.codec.decode_value(&raw, part.charset());
            if let Err(error) = part.add_header(&name, &decoded.text) {
                warn!(%error, header = %name, path, "dropping part header");
            }
        }
        Ok(())
    }
}

fn source_error(path: &str, error: SourceError) -> Error {
    Error::SourceRead {
        path: path.to_string(),
        reason: error.0,
    }
}

/// Reads one field from a source node, converting a read failure into a
/// fatal error carrying the node path.
fn read<N: SourceNode, T>(
    node: &N,
    path: &str,
    accessor: impl FnOnce(&N) -> SourceResult<T>,
) -> Result<T> {
    accessor(node).map_err(|e| source_error(path, e))
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
    use crate::address::ParsedAddress;

    /// In-memory structural node for assembler tests.
    #[derive(Debug, Clone, Default)]
    struct FakeNode {
        content_type: Option<String>,
        multipart: bool,
        children: Vec<FakeNode>,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
        content_name: Option<String>,
        disposition: Option<String>,
        charset: Option<String>,
        transfer_encoding: Option<String>,
        report_type: Option<String>,
        fail_body: bool,
    }

    impl FakeNode {
        fn leaf(content_type: &str, body: &[u8]) -> Self {
            Self {
                content_type: Some(content_type.to_string()),
                body: body.to_vec(),
                ..Self::default()
            }
        }

        fn container(content_type: &str, children: Vec<Self>) -> Self {
            Self {
                content_type: Some(content_type.to_string()),
                multipart: true,
                children,
                ..Self::default()
            }
        }
    }

    impl SourceNode for FakeNode {
        fn content_type(&self) -> SourceResult<Option<String>> {
            Ok(self.content_type.clone())
        }

        fn is_multipart(&self) -> SourceResult<bool> {
            Ok(self.multipart)
        }

        fn child_count(&self) -> SourceResult<usize> {
            Ok(self.children.len())
        }

        fn child(&self, index: usize) -> SourceResult<&Self> {
            self.children
                .get(index)
                .ok_or_else(|| SourceError(format!("no child {index}")))
        }

        fn body(&self) -> SourceResult<Vec<u8>> {
            if self.fail_body {
                return Err(SourceError("backing store gone".to_string()));
            }
            Ok(self.body.clone())
        }

        fn headers(&self) -> SourceResult<Vec<(String, String)>> {
            Ok(self.headers.clone())
        }

        fn content_name(&self) -> SourceResult<Option<String>> {
            Ok(self.content_name.clone())
        }

        fn disposition(&self) -> SourceResult<Option<String>> {
            Ok(self.disposition.clone())
        }

        fn charset(&self) -> SourceResult<Option<String>> {
            Ok(self.charset.clone())
        }

        fn transfer_encoding(&self) -> SourceResult<Option<String>> {
            Ok(self.transfer_encoding.clone())
        }

        fn report_type(&self) -> SourceResult<Option<String>> {
            Ok(self.report_type.clone())
        }
    }

    /// Minimal comma-splitting address parser for tests.
    struct SplitParser;

    impl AddressParser for SplitParser {
        fn parse_address_list(&self, raw: &str) -> Vec<ParsedAddress> {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    if let Some((display, rest)) = entry.split_once('<') {
                        ParsedAddress {
                            display: Some(display.trim().to_string())
                                .filter(|d| !d.is_empty()),
                            address: rest.trim_end_matches('>').trim().to_string(),
                            is_group: false,
                        }
                    } else {
                        ParsedAddress {
                            display: None,
                            address: entry.to_string(),
                            is_group: entry.contains(':'),
                        }
                    }
                })
                .collect()
        }
    }

    fn assembler() -> MessageAssembler<'static, SplitParser> {
        MessageAssembler::new(&SplitParser)
    }

    #[test]
    fn test_text_leaf_does_not_count_as_attachment() {
        let root = FakeNode::leaf("text/plain", b"hello");
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.attachment_count(), 0);
        assert_eq!(message.body().unwrap().content_type(), "text/plain");
        assert_eq!(message.body().unwrap().content().unwrap(), b"hello");
    }

    #[test]
    fn test_named_leaf_becomes_attachment_and_counts() {
        let mut named = FakeNode::leaf("text/plain", b"notes");
        named.content_name = Some("notes.txt".to_string());
        let root = FakeNode::container("multipart/mixed", vec![named]);

        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.attachment_count(), 1);
        let attachment = &message.body().unwrap().parts()[0];
        assert_eq!(attachment.name(), Some("notes.txt"));
        assert_eq!(attachment.content_type(), "text/plain");
    }

    #[test]
    fn test_primary_leaf_ignores_content_name() {
        let mut root = FakeNode::leaf("text/plain", b"hello");
        root.content_name = Some("body.txt".to_string());
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.attachment_count(), 0);
        assert!(message.body().unwrap().name().is_none());
    }

    #[test]
    fn test_unnamed_binary_leaf_counts_as_attachment() {
        let mut pdf = FakeNode::leaf("application/pdf", b"%PDF");
        pdf.transfer_encoding = Some("base64".to_string());
        let root = FakeNode::container("multipart/mixed", vec![pdf]);

        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.attachment_count(), 1);
        let part = &message.body().unwrap().parts()[0];
        assert_eq!(part.content_type(), "application/pdf");
        assert_eq!(part.encoding(), TransferEncoding::Base64);
        assert!(part.name().is_none());
    }

    #[test]
    fn test_container_variants() {
        for (content_type, expect) in [
            ("multipart/alternative", "multipart/alternative"),
            ("multipart/mixed", "multipart/mixed"),
            ("multipart/related", "multipart/related"),
            ("multipart/report", "multipart/report"),
            ("multipart/digest", "multipart/digest"),
        ] {
            let root = FakeNode::container(
                content_type,
                vec![FakeNode::leaf("text/plain", b"x")],
            );
            let message = assembler().assemble(&root).unwrap();
            assert_eq!(message.body().unwrap().content_type(), expect);
        }
    }

    #[test]
    fn test_report_type_copied() {
        let mut root = FakeNode::container(
            "multipart/report",
            vec![FakeNode::leaf("text/plain", b"x")],
        );
        root.report_type = Some("delivery-status".to_string());
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(
            message.body().unwrap().report_type(),
            Some("delivery-status")
        );
    }

    #[test]
    fn test_child_order_preserved() {
        let root = FakeNode::container(
            "multipart/alternative",
            vec![
                FakeNode::leaf("text/plain", b"plain"),
                FakeNode::leaf("text/html", b"<p>html</p>"),
            ],
        );
        let message = assembler().assemble(&root).unwrap();
        let parts = message.body().unwrap().parts();
        assert_eq!(parts[0].content_type(), "text/plain");
        assert_eq!(parts[1].content_type(), "text/html");
    }

    #[test]
    fn test_root_headers_extracted() {
        let mut root = FakeNode::leaf("text/plain", b"hello");
        root.headers = vec![
            ("From".to_string(), "Alice <a@example.com>".to_string()),
            (
                "To".to_string(),
                "b@example.com, Carol <c@example.com>".to_string(),
            ),
            ("Subject".to_string(), "=?UTF-8?B?SMOpbGxv?=".to_string()),
            ("X-Mailer".to_string(), "other".to_string()),
        ];

        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.from().unwrap().address.as_str(), "a@example.com");
        assert_eq!(message.from().unwrap().name.as_deref(), Some("Alice"));
        assert_eq!(message.to().len(), 2);
        assert_eq!(message.to()[1].name.as_deref(), Some("Carol"));
        assert_eq!(message.subject(), Some("Héllo"));
        assert_eq!(message.charset(), "UTF-8");
        assert_eq!(message.get_header("x-mailer"), vec!["other"]);
    }

    #[test]
    fn test_bad_root_header_dropped_not_fatal() {
        let mut root = FakeNode::leaf("text/plain", b"hello");
        root.headers = vec![
            ("Bad Name".to_string(), "x".to_string()),
            ("X-Good".to_string(), "kept".to_string()),
        ];
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.get_header("x-good"), vec!["kept"]);
        assert!(!message.has_header("bad name"));
    }

    #[test]
    fn test_child_headers_copied_and_structural_skipped() {
        let mut child = FakeNode::leaf("text/plain", b"x");
        child.headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("X-Part-Id".to_string(), "abc".to_string()),
        ];
        let root = FakeNode::container("multipart/mixed", vec![child]);
        let message = assembler().assemble(&root).unwrap();
        let part = &message.body().unwrap().parts()[0];
        assert_eq!(part.get_header("x-part-id"), vec!["abc"]);
        // content-type is structural, never copied as a stored header
        assert!(!part.has_header("content-type"));
    }

    #[test]
    fn test_declared_charset_applied() {
        let mut root = FakeNode::leaf("text/plain", b"x");
        root.charset = Some("ISO-8859-1".to_string());
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.charset(), "ISO-8859-1");
        assert_eq!(message.body().unwrap().charset(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_source_failure_reports_path() {
        let mut broken = FakeNode::leaf("text/plain", b"");
        broken.fail_body = true;
        let root = FakeNode::container(
            "multipart/mixed",
            vec![FakeNode::leaf("text/plain", b"ok"), broken],
        );

        let error = assembler().assemble(&root).unwrap_err();
        match error {
            Error::SourceRead { path, reason } => {
                assert_eq!(path, "root.1");
                assert_eq!(reason, "backing store gone");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_recipient_dropped_others_kept() {
        let mut root = FakeNode::leaf("text/plain", b"x");
        root.headers = vec![(
            "To".to_string(),
            "not-an-address, b@example.com".to_string(),
        )];
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.to().len(), 1);
        assert_eq!(message.to()[0].address.as_str(), "b@example.com");
    }

    #[test]
    fn test_group_addresses_skipped() {
        let mut root = FakeNode::leaf("text/plain", b"x");
        root.headers = vec![(
            "To".to_string(),
            "undisclosed-recipients:;, b@example.com".to_string(),
        )];
        let message = assembler().assemble(&root).unwrap();
        assert_eq!(message.to().len(), 1);
        assert_eq!(message.to()[0].address.as_str(), "b@example.com");
    }
}
