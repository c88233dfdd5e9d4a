//! Outbound message encoding.

use crate::address::Mailbox;
use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::part::DispositionKind;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;
use std::io::{self, Cursor, Read};

/// Preferred maximum header line length (RFC 5322).
const FOLD_WIDTH: usize = 78;

/// 57 raw bytes encode to exactly one 76-column Base64 line.
const BASE64_READ_CHUNK: usize = 57 * 64;

/// Headers the encoder writes itself; custom headers with these names are dropped.
const RESERVED_HEADERS: [&str; 12] = [
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "content-type",
    "content-transfer-encoding",
    "content-disposition",
];

/// Message priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// X-Priority 1.
    Highest,
    /// X-Priority 2.
    High,
    /// No priority headers are written.
    #[default]
    Normal,
    /// X-Priority 4.
    Low,
    /// X-Priority 5.
    Lowest,
}

impl Priority {
    /// Value of the `X-Priority` header.
    #[must_use]
    pub const fn x_priority(self) -> &'static str {
        match self {
            Self::Highest => "1 (Highest)",
            Self::High => "2 (High)",
            Self::Normal => "3 (Normal)",
            Self::Low => "4 (Low)",
            Self::Lowest => "5 (Lowest)",
        }
    }

    /// Value of the `Importance` header.
    #[must_use]
    pub const fn importance(self) -> &'static str {
        match self {
            Self::Highest | Self::High => "high",
            Self::Normal => "normal",
            Self::Low | Self::Lowest => "low",
        }
    }
}

/// An attachment to be encoded.
///
/// Content is read from a stream while the message is encoded.
pub struct OutgoingAttachment {
    /// Filename offered to the recipient.
    pub filename: String,
    /// Content type (a `name` parameter is added on output).
    pub content_type: ContentType,
    /// Content-ID for `cid:` references, without angle brackets.
    pub content_id: Option<String>,
    /// Attachment or inline.
    pub disposition: DispositionKind,
    /// Content stream. `None` makes encoding fail.
    pub content: Option<Box<dyn Read + Send>>,
}

impl OutgoingAttachment {
    /// Creates an attachment read from `reader`.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: ContentType, reader: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            content_id: None,
            disposition: DispositionKind::Attachment,
            content: Some(Box::new(reader)),
        }
    }

    /// Creates an attachment from bytes already in memory.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, content_type: ContentType, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(filename, content_type, Cursor::new(bytes.into()))
    }

    /// Creates an inline part referenced from HTML as `cid:<content_id>`.
    #[must_use]
    pub fn inline(
        filename: impl Into<String>,
        content_type: ContentType,
        content_id: impl Into<String>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_id: Some(content_id.into()),
            disposition: DispositionKind::Inline,
            ..Self::new(filename, content_type, reader)
        }
    }
}

impl fmt::Debug for OutgoingAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingAttachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("content_id", &self.content_id)
            .field("disposition", &self.disposition)
            .field("content", &self.content.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// A message to be encoded.
#[derive(Debug, Default)]
pub struct OutgoingMessage {
    /// From addresses.
    pub from: Vec<Mailbox>,
    /// To addresses.
    pub to: Vec<Mailbox>,
    /// Cc addresses.
    pub cc: Vec<Mailbox>,
    /// Bcc addresses. Never written to the headers.
    pub bcc: Vec<Mailbox>,
    /// Reply-To addresses.
    pub reply_to: Vec<Mailbox>,
    /// Subject.
    pub subject: Option<String>,
    /// Plain text body.
    pub text_body: Option<String>,
    /// HTML body.
    pub html_body: Option<String>,
    /// Attachments, in output order.
    pub attachments: Vec<OutgoingAttachment>,
    /// Extra headers, in output order.
    pub headers: Vec<(String, String)>,
    /// Priority.
    pub priority: Priority,
    /// Date header; now if unset.
    pub date: Option<DateTime<Utc>>,
    /// Message-ID; generated if unset.
    pub message_id: Option<String>,
}

impl OutgoingMessage {
    /// Creates a message builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// All recipients for the transport envelope: To, Cc, then Bcc.
    #[must_use]
    pub fn envelope_recipients(&self) -> Vec<&Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc).collect()
    }
}

/// Builder for [`OutgoingMessage`].
#[derive(Debug, Default)]
pub struct MessageBuilder {
    message: OutgoingMessage,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a From address.
    #[must_use]
    pub fn from(mut self, mailbox: Mailbox) -> Self {
        self.message.from.push(mailbox);
        self
    }

    /// Adds a To address.
    #[must_use]
    pub fn to(mut self, mailbox: Mailbox) -> Self {
        self.message.to.push(mailbox);
        self
    }

    /// Adds a Cc address.
    #[must_use]
    pub fn cc(mut self, mailbox: Mailbox) -> Self {
        self.message.cc.push(mailbox);
        self
    }

    /// Adds a Bcc address.
    #[must_use]
    pub fn bcc(mut self, mailbox: Mailbox) -> Self {
        self.message.bcc.push(mailbox);
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, mailbox: Mailbox) -> Self {
        self.message.reply_to.push(mailbox);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.message.subject = Some(subject.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.message.text_body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.message.html_body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: OutgoingAttachment) -> Self {
        self.message.attachments.push(attachment);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.message.priority = priority;
        self
    }

    /// Sets the Date header.
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.message.date = Some(date);
        self
    }

    /// Sets the Message-ID.
    #[must_use]
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message.message_id = Some(message_id.into());
        self
    }

    /// Returns the message.
    #[must_use]
    pub fn build(self) -> OutgoingMessage {
        self.message
    }
}

/// Encodes a message to wire bytes.
///
/// Attachments make the message multipart/mixed; text plus HTML make it
/// multipart/alternative (text first); otherwise it is a single part.
/// Text is quoted-printable UTF-8, attachments are Base64.
///
/// # Errors
///
/// Returns an error if an address is empty or contains control characters,
/// or if an attachment has no content stream or its stream fails. Nothing is returned in that case; the attachment is never
/// silently dropped.
pub fn encode(mut message: OutgoingMessage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut boundaries = BoundaryGenerator::default();

    check_addresses(&message)?;
    write_envelope_headers(&mut out, &message);

    let attachments = std::mem::take(&mut message.attachments);
    let attachment_count = attachments.len();
    let text = message.text_body.as_deref();
    let html = message.html_body.as_deref();

    if attachments.is_empty() {
        write_body(&mut out, text, html, &mut boundaries);
    } else {
        let mut mixed = Multipart::new(boundaries.next());
        write_header(&mut out, "Content-Type", &ContentType::multipart_mixed(mixed.boundary.as_str()).to_string());
        out.extend_from_slice(b"\r\n");

        if text.is_some() || html.is_some() {
            mixed.start_part(&mut out);
            write_body(&mut out, text, html, &mut boundaries);
        }
        for attachment in attachments {
            mixed.start_part(&mut out);
            write_attachment(&mut out, attachment)?;
        }
        mixed.finish(&mut out);
    }

    tracing::debug!(
        attachments = attachment_count,
        boundaries = boundaries.issued,
        bytes = out.len(),
        "message encoded"
    );
    Ok(out)
}

/// Addresses are written verbatim, so a line break would start a new header.
fn check_addresses(message: &OutgoingMessage) -> Result<()> {
    let mailboxes = message
        .from
        .iter()
        .chain(&message.to)
        .chain(&message.cc)
        .chain(&message.bcc)
        .chain(&message.reply_to);
    for mailbox in mailboxes {
        let address = &mailbox.address;
        if address.trim().is_empty() || address.chars().any(char::is_control) {
            return Err(Error::InvalidAddress {
                address: address.clone(),
            });
        }
    }
    Ok(())
}

/// RFC 5322 field name: printable ASCII except `:`.
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

fn write_envelope_headers(out: &mut Vec<u8>, message: &OutgoingMessage) {
    let date = message.date.unwrap_or_else(Utc::now);
    write_header(out, "Date", &date.to_rfc2822());

    for (name, list) in [
        ("From", &message.from),
        ("To", &message.to),
        ("Cc", &message.cc),
        ("Reply-To", &message.reply_to),
    ] {
        if !list.is_empty() {
            write_header(out, name, &Mailbox::format_list(list));
        }
    }

    if let Some(subject) = &message.subject {
        write_header(out, "Subject", &encode_rfc2047(subject));
    }

    let message_id = message.message_id.as_deref().map_or_else(
        || generate_message_id(&message.from),
        |id| format!("<{}>", id.trim().trim_start_matches('<').trim_end_matches('>')),
    );
    write_header(out, "Message-ID", &message_id);
    write_header(out, "MIME-Version", "1.0");

    if message.priority != Priority::Normal {
        write_header(out, "X-Priority", message.priority.x_priority());
        write_header(out, "Importance", message.priority.importance());
    }

    for (name, value) in &message.headers {
        let name = name.trim();
        if !is_field_name(name) {
            tracing::warn!(header = ?name, "dropping custom header with an invalid name");
            continue;
        }
        if RESERVED_HEADERS.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            tracing::warn!(header = name, "dropping custom header the encoder controls");
            continue;
        }
        write_header(out, name, &encode_rfc2047(value));
    }
}

fn write_body(out: &mut Vec<u8>, text: Option<&str>, html: Option<&str>, boundaries: &mut BoundaryGenerator) {
    match (text, html) {
        (Some(text), Some(html)) => {
            let mut alternative = Multipart::new(boundaries.next());
            write_header(
                out,
                "Content-Type",
                &ContentType::multipart_alternative(alternative.boundary.as_str()).to_string(),
            );
            out.extend_from_slice(b"\r\n");
            alternative.start_part(out);
            write_text_part(out, &ContentType::text_plain(), text);
            alternative.start_part(out);
            write_text_part(out, &ContentType::text_html(), html);
            alternative.finish(out);
        }
        (None, Some(html)) => write_text_part(out, &ContentType::text_html(), html),
        (text, None) => write_text_part(out, &ContentType::text_plain(), text.unwrap_or_default()),
    }
}

fn write_text_part(out: &mut Vec<u8>, content_type: &ContentType, body: &str) {
    write_header(out, "Content-Type", &content_type.to_string());
    write_header(out, "Content-Transfer-Encoding", "quoted-printable");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(encode_quoted_printable(body).as_bytes());
}

fn write_attachment(out: &mut Vec<u8>, attachment: OutgoingAttachment) -> Result<()> {
    let OutgoingAttachment {
        filename,
        content_type,
        content_id,
        disposition,
        content,
    } = attachment;

    let Some(mut reader) = content else {
        return Err(Error::MissingAttachmentContent { filename });
    };

    let encoded_name = encode_rfc2047(&filename);
    let content_type = content_type.with_parameter("name", encoded_name.as_str());
    write_header(out, "Content-Type", &content_type.to_string());
    write_header(
        out,
        "Content-Disposition",
        &format!("{disposition}; filename={}", quote(&encoded_name)),
    );
    write_header(out, "Content-Transfer-Encoding", "base64");
    if let Some(id) = content_id {
        write_header(out, "Content-ID", &format!("<{}>", id.trim_start_matches('<').trim_end_matches('>')));
    }
    out.extend_from_slice(b"\r\n");

    let size = write_base64_stream(out, &mut reader).map_err(|source| Error::AttachmentRead {
        filename: filename.clone(),
        source,
    })?;
    tracing::debug!(filename = %filename, size, "attachment encoded");
    Ok(())
}

/// Streams `reader` as wrapped Base64, returning the number of raw bytes.
fn write_base64_stream(out: &mut Vec<u8>, reader: &mut dyn Read) -> io::Result<usize> {
    let mut buf = vec![0; BASE64_READ_CHUNK];
    let mut total = 0;
    loop {
        let filled = fill_buffer(reader, &mut buf)?;
        out.extend_from_slice(encode_base64_wrapped(&buf[..filled]).as_bytes());
        total += filled;
        if filled < buf.len() {
            return Ok(total);
        }
    }
}

fn fill_buffer(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Writes `Name: value`, folded at whitespace to keep lines within 78 columns.
fn write_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(fold_header(name, value).as_bytes());
}

fn fold_header(name: &str, value: &str) -> String {
    let mut folded = format!("{name}:");
    let mut line_length = folded.len();
    let first_line_start = line_length;

    for word in value.split(' ') {
        if line_length + 1 + word.len() > FOLD_WIDTH && line_length > first_line_start {
            folded.push_str("\r\n");
            line_length = 0;
        }
        folded.push(' ');
        folded.push_str(word);
        line_length += 1 + word.len();
    }
    folded.push_str("\r\n");
    folded
}

fn generate_message_id(from: &[Mailbox]) -> String {
    let domain = from.first().and_then(Mailbox::domain).unwrap_or("localhost");
    format!("<{}.{}@{domain}>", Utc::now().timestamp_millis(), random_token(16))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Issues a fresh boundary per multipart level.
///
/// `=_` cannot appear in quoted-printable or Base64 output, so a boundary
/// never collides with encoded content.
#[derive(Debug, Default)]
struct BoundaryGenerator {
    issued: usize,
}

impl BoundaryGenerator {
    fn next(&mut self) -> String {
        self.issued += 1;
        format!("=_mc_{}_{}", self.issued, random_token(24))
    }
}

struct Multipart {
    boundary: String,
    started: bool,
}

impl Multipart {
    const fn new(boundary: String) -> Self {
        Self {
            boundary,
            started: false,
        }
    }

    fn start_part(&mut self, out: &mut Vec<u8>) {
        if self.started {
            out.extend_from_slice(b"\r\n");
        }
        self.started = true;
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    fn finish(self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"\r\n--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
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

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    fn encode_to_string(message: OutgoingMessage) -> String {
        String::from_utf8(encode(message).unwrap()).unwrap()
    }

    #[test]
    fn test_fold_header_short() {
        assert_eq!(fold_header("Subject", "Hello"), "Subject: Hello\r\n");
    }

    #[test]
    fn test_fold_header_long() {
        let value = vec!["word"; 40].join(" ");
        let folded = fold_header("Subject", &value);
        for line in folded.trim_end().split("\r\n") {
            assert!(line.len() <= FOLD_WIDTH, "line too long: {line}");
        }
        assert_eq!(folded.replace("\r\n", "").trim_end(), format!("Subject: {value}"));
    }

    #[test]
    fn test_single_part_headers() {
        let message = OutgoingMessage::builder()
            .from(Mailbox::with_name("Alice", "alice@example.com"))
            .to(Mailbox::new("bob@example.com"))
            .bcc(Mailbox::new("hidden@example.com"))
            .subject("Hello")
            .text_body("Hi Bob")
            .message_id("fixed@example.com")
            .build();
        let encoded = encode_to_string(message);

        assert!(encoded.contains("From: \"Alice\" <alice@example.com>\r\n"));
        assert!(encoded.contains("To: bob@example.com\r\n"));
        assert!(encoded.contains("Subject: Hello\r\n"));
        assert!(encoded.contains("Message-ID: <fixed@example.com>\r\n"));
        assert!(encoded.contains("MIME-Version: 1.0\r\n"));
        assert!(encoded.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
        assert!(encoded.ends_with("\r\n\r\nHi Bob"));
        assert!(!encoded.contains("hidden@example.com"));
        assert!(!encoded.contains("X-Priority"));
    }

    #[test]
    fn test_priority_headers() {
        let message = OutgoingMessage::builder()
            .from(Mailbox::new("a@example.com"))
            .priority(Priority::Highest)
            .text_body("urgent")
            .build();
        let encoded = encode_to_string(message);
        assert!(encoded.contains("X-Priority: 1 (Highest)\r\n"));
        assert!(encoded.contains("Importance: high\r\n"));
    }

    #[test]
    fn test_generated_message_id_uses_sender_domain() {
        let message = OutgoingMessage::builder()
            .from(Mailbox::new("a@mail.example.org"))
            .build();
        let encoded = encode_to_string(message);
        let line = encoded
            .lines()
            .find(|l| l.starts_with("Message-ID: "))
            .unwrap();
        assert!(line.ends_with("@mail.example.org>"));
    }

    #[test]
    fn test_custom_headers_cannot_override_reserved() {
        let message = OutgoingMessage::builder()
            .header("X-Mailer", "mailcodec")
            .header("Bcc", "leak@example.com")
            .text_body("x")
            .build();
        let encoded = encode_to_string(message);
        assert!(encoded.contains("X-Mailer: mailcodec\r\n"));
        assert!(!encoded.contains("leak@example.com"));
    }

    #[test]
    fn test_line_break_in_address_is_rejected() {
        let message = OutgoingMessage::builder()
            .from(Mailbox::new("a@example.com"))
            .to(Mailbox::new("b@example.com\r\nBcc: victim@evil.example"))
            .text_body("x")
            .build();
        let err = encode(message).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { ref address } if address.starts_with("b@example.com")));

        let message = OutgoingMessage::builder()
            .bcc(Mailbox::new("c@example.com\n"))
            .text_body("x")
            .build();
        assert!(matches!(encode(message), Err(Error::InvalidAddress { .. })));

        let message = OutgoingMessage::builder().cc(Mailbox::new(" ")).build();
        assert!(matches!(encode(message), Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_invalid_custom_header_names_are_dropped() {
        let message = OutgoingMessage::builder()
            .header("X-A: 1\r\nBcc", "victim@evil.example")
            .header("X Spaced", "no")
            .header("X-Ok", "yes")
            .text_body("x")
            .build();
        let bytes = encode(message).unwrap();
        let encoded = String::from_utf8(bytes.clone()).unwrap();
        assert!(!encoded.contains("victim@evil.example"));
        assert!(!encoded.contains("X Spaced"));
        assert!(encoded.contains("X-Ok: yes\r\n"));

        let parsed = crate::decode(&bytes, &crate::DecodeOptions::default()).unwrap();
        assert!(parsed.headers.get("bcc").is_none());
    }

    #[test]
    fn test_missing_attachment_stream() {
        let mut attachment = OutgoingAttachment::from_bytes("a.pdf", ContentType::new("application", "pdf"), vec![1, 2, 3]);
        attachment.content = None;
        let message = OutgoingMessage::builder().attach(attachment).build();

        let err = encode(message).unwrap_err();
        assert!(matches!(err, Error::MissingAttachmentContent { ref filename } if filename == "a.pdf"));
    }

    #[test]
    fn test_failing_attachment_stream() {
        let message = OutgoingMessage::builder()
            .text_body("see attached")
            .attach(OutgoingAttachment::new("b.bin", ContentType::octet_stream(), FailingReader))
            .build();

        let err = encode(message).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
        assert!(err.to_string().contains("b.bin"));
    }

    #[test]
    fn test_base64_stream_matches_wrapped_encoding() {
        let data: Vec<u8> = (0..10_000_u32).map(|i| u8::try_from(i % 251).unwrap()).collect();
        let mut out = Vec::new();
        let size = write_base64_stream(&mut out, &mut Cursor::new(data.clone())).unwrap();
        assert_eq!(size, data.len());
        assert_eq!(String::from_utf8(out).unwrap(), encode_base64_wrapped(&data));
    }

    #[test]
    fn test_attachment_headers() {
        let message = OutgoingMessage::builder()
            .html_body("<img src=\"cid:logo\">")
            .attach(OutgoingAttachment::inline(
                "logo.png",
                ContentType::new("image", "png"),
                "logo",
                Cursor::new(vec![0_u8; 4]),
            ))
            .attach(OutgoingAttachment::from_bytes(
                "résumé.pdf",
                ContentType::new("application", "pdf"),
                b"%PDF".to_vec(),
            ))
            .build();
        let encoded = encode_to_string(message);

        assert!(encoded.contains("Content-Type: multipart/mixed; boundary=\"=_mc_1_"));
        assert!(encoded.contains("Content-Disposition: inline; filename=\"logo.png\"\r\n"));
        assert!(encoded.contains("Content-ID: <logo>\r\n"));
        assert!(encoded.contains("filename=\"=?utf-8?B?"));
        assert!(encoded.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(!encoded.contains("résumé"));
    }

    #[test]
    fn test_boundaries_are_distinct() {
        let mut generator = BoundaryGenerator::default();
        let first = generator.next();
        let second = generator.next();
        assert_ne!(first, second);
        assert!(first.starts_with("=_mc_1_"));
        assert!(second.starts_with("=_mc_2_"));
    }
}
