//! # mailcodec-mime
//!
//! Email message codec: raw wire bytes to a structured part tree and back.
//!
//! ## Features
//!
//! - **Decoding**: nested multipart trees with hierarchical part ids,
//!   text/HTML body selection and attachment extraction
//! - **Recovery**: fallback across transfer encodings and charsets when
//!   declarations are missing or wrong
//! - **Charsets**: detection (BOM, UTF-8, GBK, Big5, Shift-JIS, EUC-KR) and
//!   conversion through a fixed codec registry
//! - **Encoding**: multipart/mixed and multipart/alternative output with
//!   quoted-printable text, wrapped Base64 attachments and RFC 2047 headers
//!
//! ## Quick Start
//!
//! ### Decoding
//!
//! ```
//! use mailcodec_mime::{DecodeOptions, decode};
//!
//! let raw = b"Subject: Test\r\n\
//!             Content-Type: multipart/mixed; boundary=X\r\n\
//!             \r\n\
//!             --X\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             hello\r\n\
//!             --X\r\n\
//!             Content-Type: application/pdf\r\n\
//!             Content-Disposition: attachment; filename=a.pdf\r\n\
//!             \r\n\
//!             %PDF\r\n\
//!             --X--";
//!
//! let message = decode(raw, &DecodeOptions::default())?;
//! assert_eq!(message.text_body, "hello");
//! assert_eq!(message.attachments[0].filename, "a.pdf");
//! assert_eq!(message.attachments[0].part_id, "2");
//! # Ok::<(), mailcodec_mime::Error>(())
//! ```
//!
//! ### Encoding
//!
//! ```
//! use mailcodec_mime::{ContentType, Mailbox, OutgoingAttachment, OutgoingMessage, encode};
//!
//! let message = OutgoingMessage::builder()
//!     .from(Mailbox::with_name("Alice", "alice@example.com"))
//!     .to(Mailbox::new("bob@example.com"))
//!     .subject("Report")
//!     .text_body("Plain text version")
//!     .html_body("<p>HTML version</p>")
//!     .attach(OutgoingAttachment::from_bytes(
//!         "report.pdf",
//!         ContentType::new("application", "pdf"),
//!         b"%PDF-1.7".to_vec(),
//!     ))
//!     .build();
//!
//! let bytes = encode(message)?;
//! assert!(bytes.starts_with(b"Date: "));
//! # Ok::<(), mailcodec_mime::Error>(())
//! ```
//!
//! ### Charsets
//!
//! ```
//! use mailcodec_mime::charset;
//!
//! let gbk = [0xC4, 0xE3, 0xBA, 0xC3];
//! let converted = charset::auto_convert_to_utf8(&gbk)?;
//! assert_eq!(converted.text, "你好");
//! # Ok::<(), mailcodec_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod decode;
mod encode;
mod error;
mod header;
mod part;

pub mod charset;
pub mod encoding;
pub mod transfer;

pub use address::Mailbox;
pub use content_type::ContentType;
pub use decode::{AttachmentInfo, DEFAULT_MAX_DEPTH, DecodeOptions, ParsedMessage, decode, decode_parts};
pub use encode::{MessageBuilder, OutgoingAttachment, OutgoingMessage, Priority, encode};
pub use error::{Error, ErrorKind, Result};
pub use header::{Headers, split_header_body};
pub use part::{Disposition, DispositionKind, MessagePart};
pub use transfer::TransferEncoding;
