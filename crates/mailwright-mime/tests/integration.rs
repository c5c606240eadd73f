//! Integration tests for the part-tree assembler.
//!
//! These tests drive the full loop without a real tokenizer: build a
//! typed tree, serialize it, split the output with a minimal test-only
//! tokenizer, and reassemble a typed tree from the parsed structure.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailwright_mime::{
    AddressParser, MessageAssembler, ParsedAddress, Part, SourceNode, SourceResult,
};

/// Parsed structural node produced by the test tokenizer.
#[derive(Debug, Default)]
struct RawNode {
    content_type: Option<String>,
    multipart: bool,
    children: Vec<RawNode>,
    body: Vec<u8>,
    headers: Vec<(String, String)>,
    content_name: Option<String>,
    disposition: Option<String>,
    charset: Option<String>,
    transfer_encoding: Option<String>,
    report_type: Option<String>,
}

impl SourceNode for RawNode {
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
        Ok(&self.children[index])
    }

    fn body(&self) -> SourceResult<Vec<u8>> {
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

/// Comma-splitting address parser standing in for the real grammar.
struct SplitParser;

impl AddressParser for SplitParser {
    fn parse_address_list(&self, raw: &str) -> Vec<ParsedAddress> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                if let Some((display, rest)) = entry.split_once('<') {
                    ParsedAddress {
                        display: Some(display.trim().to_string()).filter(|d| !d.is_empty()),
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

fn parse_headers(head: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.split("\r\n") {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

fn parse_params(value: &str) -> (String, Vec<(String, String)>) {
    let mut parts = value.split(';');
    let ctype = parts.next().unwrap_or("").trim().to_lowercase();
    let params = parts
        .filter_map(|p| {
            p.split_once('=').map(|(k, v)| {
                (
                    k.trim().to_lowercase(),
                    v.trim().trim_matches('"').to_string(),
                )
            })
        })
        .collect();
    (ctype, params)
}

fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let open = format!("--{boundary}\r\n");
    let sep = format!("\r\n--{boundary}\r\n");
    let close = format!("\r\n--{boundary}--");

    let start = body.find(&open).map_or(0, |p| p + open.len());
    let end = body.find(&close).unwrap_or(body.len());
    body[start..end].split(&sep).map(str::to_string).collect()
}

fn decode_qp(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' {
            if bytes[i + 1..].starts_with(b"\r\n") {
                i += 3;
                continue;
            }
            if let Some(hex) = bytes.get(i + 1..i + 3)
                && let Ok(byte) = u8::from_str_radix(std::str::from_utf8(hex).unwrap(), 16)
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn decode_body(body: &str, encoding: Option<&str>) -> Vec<u8> {
    match encoding {
        Some("base64") => {
            let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(cleaned).unwrap()
        }
        Some("quoted-printable") => decode_qp(body),
        _ => body.as_bytes().to_vec(),
    }
}

/// Splits one rendered MIME entity into a structural node tree.
fn tokenize(raw: &str) -> RawNode {
    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));

    let headers = parse_headers(head);
    let mut node = RawNode {
        headers: headers.clone(),
        ..RawNode::default()
    };

    if let Some(value) = header_value(&headers, "content-type") {
        let (ctype, params) = parse_params(&value);
        node.charset = param(&params, "charset");
        node.content_name = param(&params, "name");
        node.report_type = param(&params, "report-type");

        if ctype.starts_with("multipart/") {
            node.content_type = Some(ctype);
            node.multipart = true;
            let boundary = param(&params, "boundary").expect("container must carry a boundary");
            node.children = split_multipart(body, &boundary)
                .iter()
                .map(|segment| tokenize(segment))
                .collect();
            return node;
        }
        node.content_type = Some(ctype);
    }

    node.disposition = header_value(&headers, "content-disposition")
        .and_then(|v| v.split(';').next().map(|d| d.trim().to_string()));
    node.transfer_encoding = header_value(&headers, "content-transfer-encoding");
    // The message-level trailing terminator is framing, not content
    let body = body.strip_suffix("\r\n").unwrap_or(body);
    node.body = decode_body(body, node.transfer_encoding.as_deref());
    node
}

#[test]
fn text_message_survives_serialize_and_reassemble() {
    let mut message = mailwright_mime::Message::new();
    message.set_from("a@example.com", None).unwrap();
    message.add_to("b@example.com", None).unwrap();
    message.set_subject("Hi");
    message.set_body(Part::text("hello"));

    let rendered = message.render().unwrap();
    let root = tokenize(&rendered);
    let rebuilt = MessageAssembler::new(&SplitParser).assemble(&root).unwrap();

    assert_eq!(rebuilt.subject(), Some("Hi"));
    assert_eq!(rebuilt.from().unwrap().address.as_str(), "a@example.com");
    assert_eq!(rebuilt.to()[0].address.as_str(), "b@example.com");
    assert_eq!(rebuilt.body().unwrap().content().unwrap(), b"hello");
    assert_eq!(rebuilt.attachment_count(), 0);
}

#[test]
fn non_ascii_subject_survives_encoded_word_round_trip() {
    let mut message = mailwright_mime::Message::new();
    message.set_subject("Héllo wörld");
    message.set_body(Part::text("x"));

    let rendered = message.render().unwrap();
    assert!(rendered.contains("Subject: =?UTF-8?B?"));

    let rebuilt = MessageAssembler::new(&SplitParser)
        .assemble(&tokenize(&rendered))
        .unwrap();
    assert_eq!(rebuilt.subject(), Some("Héllo wörld"));
    assert_eq!(rebuilt.charset(), "UTF-8");
}

#[test]
fn alternative_body_round_trips_with_child_order() {
    let mut alternative = Part::alternative();
    alternative.add_part(Part::text("plain version")).unwrap();
    alternative
        .add_part(Part::html("<p>html version</p>"))
        .unwrap();

    let mut message = mailwright_mime::Message::new();
    message.set_body(alternative);

    let rendered = message.render().unwrap();
    assert!(rendered.contains("MIME-Version: 1.0\r\n"));

    let rebuilt = MessageAssembler::new(&SplitParser)
        .assemble(&tokenize(&rendered))
        .unwrap();

    let body = rebuilt.body().unwrap();
    assert_eq!(body.content_type(), "multipart/alternative");
    assert_eq!(body.parts().len(), 2);
    assert_eq!(body.parts()[0].content_type(), "text/plain");
    assert_eq!(body.parts()[0].content().unwrap(), b"plain version");
    assert_eq!(body.parts()[1].content_type(), "text/html");
    assert_eq!(body.parts()[1].content().unwrap(), b"<p>html version</p>");
    assert_eq!(rebuilt.attachment_count(), 0);
}

#[test]
fn attachment_round_trips_and_counts() {
    let mut mixed = Part::mixed();
    mixed.add_part(Part::text("see attachment")).unwrap();
    let mut attachment = Part::attachment_with_disposition("notes.txt", "attachment");
    attachment.set_content(b"hi".to_vec()).unwrap();
    mixed.add_part(attachment).unwrap();

    let mut message = mailwright_mime::Message::new();
    message.set_body(mixed);

    let rendered = message.render().unwrap();
    let rebuilt = MessageAssembler::new(&SplitParser)
        .assemble(&tokenize(&rendered))
        .unwrap();

    assert_eq!(rebuilt.attachment_count(), 1);
    assert!(rebuilt.has_attachment());

    let attachment = &rebuilt.body().unwrap().parts()[1];
    assert_eq!(attachment.name(), Some("notes.txt"));
    assert_eq!(attachment.disposition(), Some("attachment"));
    assert_eq!(attachment.content().unwrap(), b"hi");
    assert_eq!(
        attachment.encoding(),
        mailwright_mime::TransferEncoding::Base64
    );
}

#[test]
fn nested_containers_round_trip() {
    let mut alternative = Part::alternative();
    alternative.add_part(Part::text("plain")).unwrap();
    alternative.add_part(Part::html("<p>rich</p>")).unwrap();

    let mut mixed = Part::mixed();
    mixed.add_part(alternative).unwrap();
    let mut attachment = Part::attachment("data.bin");
    attachment.set_content(vec![0, 1, 2, 250]).unwrap();
    mixed.add_part(attachment).unwrap();

    let mut message = mailwright_mime::Message::new();
    message.set_from("a@example.com", Some("Alice")).unwrap();
    message.set_body(mixed);

    let rendered = message.render().unwrap();
    let rebuilt = MessageAssembler::new(&SplitParser)
        .assemble(&tokenize(&rendered))
        .unwrap();

    let body = rebuilt.body().unwrap();
    assert_eq!(body.content_type(), "multipart/mixed");
    assert_eq!(body.parts().len(), 2);

    let inner = &body.parts()[0];
    assert_eq!(inner.content_type(), "multipart/alternative");
    assert_eq!(inner.parts().len(), 2);
    assert_eq!(inner.parts()[1].content().unwrap(), b"<p>rich</p>");

    let attachment = &body.parts()[1];
    assert_eq!(attachment.name(), Some("data.bin"));
    assert_eq!(attachment.content().unwrap(), &[0, 1, 2, 250]);
    assert_eq!(rebuilt.attachment_count(), 1);
}

#[test]
fn custom_root_header_round_trips() {
    let mut message = mailwright_mime::Message::new();
    message.add_header("x-mailer", "mailwright").unwrap();
    message.set_body(Part::text("x"));

    let rendered = message.render().unwrap();
    let rebuilt = MessageAssembler::new(&SplitParser)
        .assemble(&tokenize(&rendered))
        .unwrap();
    assert_eq!(rebuilt.get_header("x-mailer"), vec!["mailwright"]);
}
