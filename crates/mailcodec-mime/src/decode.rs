//! Multipart tree decoding.
//!
//! Raw message bytes are split into a header block and body, the body is
//! walked recursively along its boundaries, and every leaf is routed into
//! the text body, HTML body or one of the attachment lists.

use crate::address::Mailbox;
use crate::charset;
use crate::content_type::ContentType;
use crate::error::{Error, Result};
use crate::header::{Headers, split_header_body};
use crate::part::{DispositionKind, MessagePart, child_part_id};
use crate::transfer::{self, TransferEncoding};
use chrono::{DateTime, FixedOffset};

/// Default multipart nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Abort on the first part failure instead of skipping the part.
    pub strict: bool,
    /// Fill [`AttachmentInfo::content`] with decoded bytes.
    pub decode_attachments: bool,
    /// Keep the part tree in [`ParsedMessage::root_part`].
    pub preserve_structure: bool,
    /// Maximum multipart nesting depth.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Lenient decoding, metadata only, no tree, depth limit 50.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strict: false,
            decode_attachments: false,
            preserve_structure: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets strict mode.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets whether attachment content is decoded.
    #[must_use]
    pub const fn decode_attachments(mut self, decode: bool) -> Self {
        self.decode_attachments = decode;
        self
    }

    /// Sets whether the part tree is kept.
    #[must_use]
    pub const fn preserve_structure(mut self, preserve: bool) -> Self {
        self.preserve_structure = preserve;
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Metadata (and optionally content) of an attachment leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttachmentInfo {
    /// Id of the part in the tree.
    pub part_id: String,
    /// Filename, from the disposition, the type's `name`, or generated.
    pub filename: String,
    /// `type/subtype`.
    pub content_type: String,
    /// Decoded size in bytes (estimated when content is not decoded).
    pub size: usize,
    /// Content-ID without angle brackets.
    pub content_id: Option<String>,
    /// Attachment or inline.
    pub disposition: DispositionKind,
    /// Declared transfer encoding.
    pub transfer_encoding: TransferEncoding,
    /// Decoded bytes, when requested.
    pub content: Option<Vec<u8>>,
}

/// Result of decoding one message.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedMessage {
    /// Top-level headers.
    pub headers: Headers,
    /// Decoded Subject.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Mailbox>,
    /// To addresses.
    pub to: Vec<Mailbox>,
    /// Cc addresses.
    pub cc: Vec<Mailbox>,
    /// Reply-To addresses.
    pub reply_to: Vec<Mailbox>,
    /// Parsed Date header.
    pub date: Option<DateTime<FixedOffset>>,
    /// Message-ID header value.
    pub message_id: Option<String>,
    /// First text/plain leaf, depth-first. Empty if none.
    pub text_body: String,
    /// First text/html leaf, depth-first. Empty if none.
    pub html_body: String,
    /// Attachment leaves.
    pub attachments: Vec<AttachmentInfo>,
    /// Inline leaves referenced by Content-ID.
    pub inline_attachments: Vec<AttachmentInfo>,
    /// Part tree, if requested.
    pub root_part: Option<MessagePart>,
}

impl ParsedMessage {
    /// Looks up an attachment or inline attachment by part id.
    #[must_use]
    pub fn attachment(&self, part_id: &str) -> Option<&AttachmentInfo> {
        self.attachments
            .iter()
            .chain(&self.inline_attachments)
            .find(|a| a.part_id == part_id)
    }

    /// Looks up an inline attachment by Content-ID (with or without brackets).
    #[must_use]
    pub fn inline_attachment(&self, content_id: &str) -> Option<&AttachmentInfo> {
        let wanted = content_id
            .trim()
            .trim_start_matches("cid:")
            .trim_start_matches('<')
            .trim_end_matches('>');
        self.inline_attachments
            .iter()
            .find(|a| a.content_id.as_deref() == Some(wanted))
    }
}

/// Decodes a complete raw message.
///
/// # Errors
///
/// Only in strict mode: the first part failure, tagged with its part id.
pub fn decode(raw: &[u8], options: &DecodeOptions) -> Result<ParsedMessage> {
    let (header_bytes, body_bytes) = split_header_body(raw);
    decode_parts(header_bytes, body_bytes, options)
}

/// Decodes a message whose header block and body are already separated.
///
/// # Errors
///
/// Only in strict mode: the first part failure, tagged with its part id.
pub fn decode_parts(header_bytes: &[u8], body_bytes: &[u8], options: &DecodeOptions) -> Result<ParsedMessage> {
    let headers = Headers::parse(header_bytes);
    let root = TreeBuilder { options }.build_root(headers.clone(), body_bytes)?;

    let mut collector = Collector::new(options);
    collector.visit(&root)?;
    tracing::debug!(
        attachments = collector.attachments.len(),
        inline = collector.inline_attachments.len(),
        "message decoded"
    );

    Ok(ParsedMessage {
        subject: headers.get_decoded("subject"),
        from: addresses(&headers, "from"),
        to: addresses(&headers, "to"),
        cc: addresses(&headers, "cc"),
        reply_to: addresses(&headers, "reply-to"),
        date: headers.get("date").and_then(parse_date),
        message_id: headers
            .get("message-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string),
        headers,
        text_body: collector.text_body.unwrap_or_default(),
        html_body: collector.html_body.unwrap_or_default(),
        attachments: collector.attachments,
        inline_attachments: collector.inline_attachments,
        root_part: options.preserve_structure.then_some(root),
    })
}

fn addresses(headers: &Headers, name: &str) -> Vec<Mailbox> {
    headers
        .get_all(name)
        .into_iter()
        .flat_map(Mailbox::parse_list)
        .collect()
}

/// RFC 2822 date, tolerating a trailing `(Zone)` comment.
fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value).ok().or_else(|| {
        let (without_comment, _) = value.rsplit_once('(')?;
        DateTime::parse_from_rfc2822(without_comment.trim()).ok()
    })
}

struct TreeBuilder<'a> {
    options: &'a DecodeOptions,
}

impl TreeBuilder<'_> {
    fn build_root(&self, headers: Headers, body: &[u8]) -> Result<MessagePart> {
        let content_type = headers
            .get("content-type")
            .map_or_else(ContentType::default, ContentType::parse);

        match self.build(headers.clone(), content_type.clone(), body, String::new(), 0) {
            Ok(root) => Ok(root),
            Err(e) if self.options.strict => Err(e.in_part("")),
            Err(e) => {
                tracing::warn!(error = %e, "root multipart unusable, parsing as a simple message");
                Ok(simple_part(headers, &content_type, body, String::new()))
            }
        }
    }

    fn build(
        &self,
        headers: Headers,
        content_type: ContentType,
        body: &[u8],
        part_id: String,
        depth: usize,
    ) -> Result<MessagePart> {
        tracing::debug!(part_id = %part_id, content_type = %content_type.full_type(), "classified part");

        if !content_type.is_multipart() {
            return Ok(MessagePart::leaf(headers, content_type, body.to_vec(), part_id));
        }
        if depth >= self.options.max_depth {
            return Err(Error::DepthExceeded {
                depth: self.options.max_depth,
            });
        }
        let Some(boundary) = content_type.boundary() else {
            if self.options.strict {
                return Err(Error::MissingBoundary);
            }
            tracing::warn!(part_id = %part_id, "multipart without boundary, parsing as a single part");
            return Ok(simple_part(headers, &content_type, body, part_id));
        };

        let segments = split_multipart(body, boundary);
        if !segments.closed {
            if self.options.strict {
                return Err(Error::Truncated);
            }
            tracing::warn!(
                part_id = %part_id,
                complete_parts = segments.parts.len(),
                "multipart truncated before closing boundary"
            );
        }

        let child_default = if content_type.sub_type == "digest" {
            ContentType::new("message", "rfc822")
        } else {
            ContentType::default()
        };

        let mut children = Vec::with_capacity(segments.parts.len());
        for (index, segment) in segments.parts.into_iter().enumerate() {
            let child_id = child_part_id(&part_id, index);
            let (child_header_bytes, child_body) = split_header_body(segment);
            let child_headers = Headers::parse(child_header_bytes);
            let child_type = child_headers
                .get("content-type")
                .map_or_else(|| child_default.clone(), ContentType::parse);

            match self.build(child_headers, child_type, child_body, child_id.clone(), depth + 1) {
                Ok(child) => children.push(child),
                Err(e) if self.options.strict => return Err(e.in_part(&child_id)),
                Err(e) => tracing::warn!(part_id = %child_id, error = %e, "skipping malformed part"),
            }
        }

        if children.is_empty() {
            if self.options.strict {
                return Err(Error::InvalidMultipart(format!(
                    "{} has no body parts",
                    content_type.full_type()
                )));
            }
            tracing::warn!(part_id = %part_id, "multipart without usable parts, parsing as a single part");
            return Ok(simple_part(headers, &content_type, body, part_id));
        }

        let mut container = MessagePart::leaf(headers, content_type, Vec::new(), part_id);
        container.children = children;
        Ok(container)
    }
}

/// Degrades an unusable multipart to a text/plain leaf over its raw body.
fn simple_part(headers: Headers, original: &ContentType, body: &[u8], part_id: String) -> MessagePart {
    let mut content_type = ContentType::new("text", "plain");
    if let Some(charset) = original.charset() {
        content_type = content_type.with_parameter("charset", charset);
    }
    MessagePart::leaf(headers, content_type, body.to_vec(), part_id)
}

struct Segments<'a> {
    parts: Vec<&'a [u8]>,
    closed: bool,
}

/// Splits a multipart body on `--boundary` lines.
///
/// The preamble and epilogue are dropped, as is the line break preceding
/// each delimiter. A part not followed by another delimiter is incomplete
/// and dropped; `closed` reports whether the closing delimiter was seen.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Segments<'a> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let newline = body[pos..].iter().position(|&b| b == b'\n');
        let line_end = newline.map_or(body.len(), |i| pos + i);
        let next = newline.map_or(body.len(), |i| pos + i + 1);

        if let Some(rest) = body[pos..line_end].strip_prefix(delimiter) {
            let closing = rest
                .strip_prefix(b"--")
                .is_some_and(|tail| tail.trim_ascii().is_empty());
            if closing || rest.trim_ascii().is_empty() {
                if let Some(start) = current.take() {
                    parts.push(strip_line_break(&body[start..pos]));
                }
                if closing {
                    return Segments { parts, closed: true };
                }
                current = Some(next);
            }
        }
        pos = next;
    }

    Segments {
        parts,
        closed: false,
    }
}

fn strip_line_break(segment: &[u8]) -> &[u8] {
    segment
        .strip_suffix(b"\r\n")
        .or_else(|| segment.strip_suffix(b"\n"))
        .unwrap_or(segment)
}

/// Routes leaves depth-first.
struct Collector<'a> {
    options: &'a DecodeOptions,
    text_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<AttachmentInfo>,
    inline_attachments: Vec<AttachmentInfo>,
}

impl<'a> Collector<'a> {
    const fn new(options: &'a DecodeOptions) -> Self {
        Self {
            options,
            text_body: None,
            html_body: None,
            attachments: Vec::new(),
            inline_attachments: Vec::new(),
        }
    }

    fn visit(&mut self, part: &MessagePart) -> Result<()> {
        if part.content_type.is_multipart() {
            for child in &part.children {
                self.visit(child)?;
            }
            return Ok(());
        }

        match self.route(part) {
            Ok(()) => Ok(()),
            Err(e) if self.options.strict => Err(e.in_part(&part.part_id)),
            Err(e) => {
                tracing::warn!(part_id = %part.part_id, error = %e, "skipping undecodable part");
                Ok(())
            }
        }
    }

    fn route(&mut self, part: &MessagePart) -> Result<()> {
        let content_type = &part.content_type;
        let disposition = part.disposition.as_ref().map(|d| d.kind);

        match disposition {
            Some(DispositionKind::Attachment) => self.push_attachment(part, DispositionKind::Attachment),
            Some(DispositionKind::Inline) if part.content_id().is_some() => {
                self.push_attachment(part, DispositionKind::Inline)
            }
            _ if content_type.is_message() => self.push_attachment(part, DispositionKind::Attachment),
            _ if content_type.is_plain_text() => {
                if self.text_body.is_none() {
                    self.text_body = Some(decode_text(part, self.options.strict)?);
                }
                Ok(())
            }
            _ if content_type.is_html() => {
                if self.html_body.is_none() {
                    self.html_body = Some(decode_text(part, self.options.strict)?);
                }
                Ok(())
            }
            _ if content_type.is_text() => {
                if part.filename().is_some() {
                    self.push_attachment(part, DispositionKind::Attachment)
                } else {
                    tracing::debug!(part_id = %part.part_id, content_type = %content_type.full_type(), "ignoring text part");
                    Ok(())
                }
            }
            _ if part.content_id().is_some() => self.push_attachment(part, DispositionKind::Inline),
            _ => self.push_attachment(part, DispositionKind::Attachment),
        }
    }

    fn push_attachment(&mut self, part: &MessagePart, kind: DispositionKind) -> Result<()> {
        let content = if self.options.decode_attachments {
            Some(self.attachment_content(part)?)
        } else {
            None
        };
        let size = content.as_ref().map_or_else(|| estimated_size(part), Vec::len);

        let info = AttachmentInfo {
            part_id: part.part_id.clone(),
            filename: attachment_filename(part),
            content_type: part.content_type.full_type(),
            size,
            content_id: part.content_id().map(ToString::to_string),
            disposition: kind,
            transfer_encoding: part.transfer_encoding,
            content,
        };

        match kind {
            DispositionKind::Attachment => self.attachments.push(info),
            DispositionKind::Inline => self.inline_attachments.push(info),
        }
        Ok(())
    }

    fn attachment_content(&self, part: &MessagePart) -> Result<Vec<u8>> {
        if self.options.strict {
            return part.decoded_content();
        }
        let (content, used) = transfer::decode_with_fallback(&part.raw_content, part.transfer_encoding);
        if used != part.transfer_encoding {
            tracing::warn!(
                part_id = %part.part_id,
                declared = %part.transfer_encoding,
                used = %used,
                "attachment decoded with fallback transfer encoding"
            );
        }
        Ok(content)
    }
}

fn attachment_filename(part: &MessagePart) -> String {
    if let Some(name) = part.filename() {
        return name.to_string();
    }
    if part.content_type.is_message() {
        return "message.eml".to_string();
    }
    if part.part_id.is_empty() {
        "attachment".to_string()
    } else {
        format!("part-{}", part.part_id)
    }
}

fn estimated_size(part: &MessagePart) -> usize {
    let raw = &part.raw_content;
    match part.transfer_encoding {
        TransferEncoding::Base64 => {
            let significant = raw.iter().filter(|b| !b.is_ascii_whitespace()).count();
            let padding = raw
                .iter()
                .rev()
                .filter(|b| !b.is_ascii_whitespace())
                .take_while(|&&b| b == b'=')
                .count();
            (significant * 3 / 4).saturating_sub(padding)
        }
        TransferEncoding::QuotedPrintable => part.decoded_content().map_or(raw.len(), |d| d.len()),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => raw.len(),
    }
}

/// Decodes a text leaf to UTF-8.
///
/// Declared transfer encoding, then declared charset, then detection. In
/// lenient mode any failure ends in the fallback strategies, which never
/// fail.
fn decode_text(part: &MessagePart, strict: bool) -> Result<String> {
    let declared = part.content_type.charset();
    let fallback = || {
        let bytes = charset::decode_with_fallback_strategies(&part.raw_content, Some(part.transfer_encoding), declared);
        String::from_utf8_lossy(&bytes).into_owned()
    };

    let bytes = match part.transfer_encoding.decode(&part.raw_content) {
        Ok(bytes) => bytes,
        Err(e) if strict => return Err(e),
        Err(e) => {
            tracing::warn!(part_id = %part.part_id, encoding = %part.transfer_encoding, error = %e, "declared transfer encoding failed");
            return Ok(fallback());
        }
    };

    if let Some(name) = declared {
        match charset::convert_to_utf8(&bytes, name) {
            Ok(text) => return Ok(text),
            Err(e) if strict => return Err(e),
            Err(e) => tracing::warn!(part_id = %part.part_id, charset = name, error = %e, "declared charset failed, detecting"),
        }
    }

    match charset::auto_convert_to_utf8(&bytes) {
        Ok(converted) => Ok(converted.text),
        Err(e) if strict => Err(e),
        Err(e) => {
            tracing::warn!(part_id = %part.part_id, error = %e, "charset detection failed, using fallback strategies");
            Ok(fallback())
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
    fn test_options_builder() {
        let options = DecodeOptions::new()
            .strict(true)
            .decode_attachments(true)
            .preserve_structure(true)
            .max_depth(3);
        assert!(options.strict);
        assert!(options.decode_attachments);
        assert!(options.preserve_structure);
        assert_eq!(options.max_depth, 3);
        assert_eq!(DecodeOptions::default().max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_split_multipart() {
        let body = b"preamble\r\n--b\r\nA: 1\r\n\r\none\r\n--b  \r\n\r\ntwo\r\n--b--\r\nepilogue";
        let segments = split_multipart(body, "b");
        assert!(segments.closed);
        assert_eq!(segments.parts, vec![&b"A: 1\r\n\r\none"[..], &b"\r\ntwo"[..]]);
    }

    #[test]
    fn test_split_multipart_ignores_lookalike_lines() {
        let body = b"--b\n\nx\n--bb\ny\n--b--";
        let segments = split_multipart(body, "b");
        assert!(segments.closed);
        assert_eq!(segments.parts, vec![&b"\nx\n--bb\ny"[..]]);
    }

    #[test]
    fn test_split_multipart_truncated() {
        let body = b"--b\r\n\r\none\r\n--b\r\n\r\ntwo (cut";
        let segments = split_multipart(body, "b");
        assert!(!segments.closed);
        assert_eq!(segments.parts, vec![&b"\r\none"[..]]);
    }

    #[test]
    fn test_multipart_without_parts_degrades() {
        let raw = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n--X--\r\n";

        let options = DecodeOptions::new().preserve_structure(true);
        let message = decode(raw, &options).unwrap();
        let root = message.root_part.unwrap();
        assert!(root.is_leaf());
        assert!(root.content_type.is_plain_text());
        assert_eq!(message.text_body, "--X--\r\n");

        let err = decode(raw, &options.strict(true)).unwrap_err();
        assert_eq!(err.part_id(), Some(""));
        assert!(matches!(err, Error::Part { ref source, .. } if matches!(**source, Error::InvalidMultipart(_))));
    }

    #[test]
    fn test_multipart_children_non_empty() {
        fn check(part: &MessagePart) {
            assert_eq!(part.content_type.is_multipart(), !part.children.is_empty(), "part {:?}", part.part_id);
            part.children.iter().for_each(check);
        }

        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
            "--a\r\nContent-Type: text/plain\r\n\r\nhi\r\n",
            "--a\r\nContent-Type: multipart/related; boundary=b\r\n\r\n--b--\r\n",
            "--a--\r\n",
        );
        let options = DecodeOptions::new().preserve_structure(true);
        let root = decode(raw.as_bytes(), &options).unwrap().root_part.unwrap();

        check(&root);
        assert!(root.find("2").unwrap().is_leaf());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date.to_rfc3339(), "2003-07-01T10:52:37+02:00");

        let with_comment = parse_date("Tue, 1 Jul 2003 10:52:37 +0200 (CEST)").unwrap();
        assert_eq!(with_comment, date);

        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_estimated_size() {
        let mut headers = Headers::new();
        headers.add("Content-Transfer-Encoding", "base64");
        let part = MessagePart::leaf(headers, ContentType::octet_stream(), b"SGVs\r\nbG8=\r\n".to_vec(), "2".into());
        assert_eq!(estimated_size(&part), 5);
    }

    #[test]
    fn test_attachment_filename_fallbacks() {
        let part = MessagePart::leaf(Headers::new(), ContentType::octet_stream(), Vec::new(), "1.3".into());
        assert_eq!(attachment_filename(&part), "part-1.3");

        let message = MessagePart::leaf(Headers::new(), ContentType::new("message", "rfc822"), Vec::new(), "2".into());
        assert_eq!(attachment_filename(&message), "message.eml");
    }
}
