//! # mailwright-mime
//!
//! MIME part-tree construction and serialization library for email.
//!
//! ## Features
//!
//! - **Typed part tree**: text, HTML, generic content, and attachment
//!   leaves; mixed/alternative/related/report containers
//! - **Message generation**: byte-exact MIME output with
//!   collision-checked multipart boundaries
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header
//!   encoded-words with charset detection
//! - **Tree reconstruction**: rebuild a typed tree from an externally
//!   tokenized message structure
//!
//! ## Quick Start
//!
//! ### Building a message
//!
//! ```ignore
//! use mailwright_mime::{Message, Part};
//!
//! let mut message = Message::new();
//! message.set_from("sender@example.com", Some("Sender"))?;
//! message.add_to("recipient@example.com", None)?;
//! message.set_subject("Test Message");
//! message.set_body(Part::text("Hello, World!"));
//!
//! println!("{}", message.render()?);
//! ```
//!
//! ### Multipart with an attachment
//!
//! ```ignore
//! use mailwright_mime::{Message, Part};
//!
//! let mut mixed = Part::mixed();
//! mixed.add_part(Part::text("See attachment."))?;
//!
//! let mut attachment = Part::attachment_with_disposition("report.pdf", "attachment");
//! attachment.set_content_type("application/pdf")?;
//! attachment.set_content(pdf_bytes)?;
//! mixed.add_part(attachment)?;
//!
//! let mut message = Message::new();
//! message.set_body(mixed);
//! let rendered = message.render()?;
//! ```
//!
//! ### Reconstructing a parsed message
//!
//! ```ignore
//! use mailwright_mime::{MessageAssembler, SourceNode};
//!
//! // `root` implements SourceNode over your tokenizer's output;
//! // `parser` implements AddressParser for RFC 822 address lists.
//! let assembler = MessageAssembler::new(&parser);
//! let message = assembler.assemble(&root)?;
//! println!("{} attachments", message.attachment_count());
//! ```
//!
//! ### Encoding utilities
//!
//! ```ignore
//! use mailwright_mime::encoding::{encode_body, encode_rfc2047, TransferEncoding};
//!
//! let body = encode_body(data, TransferEncoding::Base64);
//! let header = encode_rfc2047("Héllo", "UTF-8");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
mod error;
mod header;
mod message;
mod part;

pub mod encoding;

pub use address::{Address, AddressParser, Mailbox, ParsedAddress, sanitize_display_name};
pub use builder::{MessageAssembler, SourceError, SourceNode, SourceResult};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::{DecodedHeader, HeaderCodec, Headers};
pub use message::Message;
pub use part::{MultipartKind, Part};
