//! MIME part tree.

use crate::content_type::{ContentType, parse_parameters, split_unquoted, unquote};
use crate::error::Result;
use crate::header::Headers;
use crate::transfer::TransferEncoding;
use std::collections::BTreeMap;
use std::fmt;

/// Disposition type of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispositionKind {
    /// Displayed as part of the message body.
    Inline,
    /// Offered as a separate download.
    Attachment,
}

impl DispositionKind {
    /// Returns the header token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for DispositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed Content-Disposition header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Disposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// `filename` parameter, decoded.
    pub filename: Option<String>,
    /// `size` parameter, when numeric.
    pub size: Option<u64>,
    /// All parameters.
    pub parameters: BTreeMap<String, String>,
}

impl Disposition {
    /// Parses a Content-Disposition value.
    ///
    /// Anything other than `inline` is treated as an attachment.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let segments = split_unquoted(value, ';');
        let token = segments
            .first()
            .map(|t| unquote(t.trim()).to_ascii_lowercase())
            .unwrap_or_default();
        let kind = if token == "inline" {
            DispositionKind::Inline
        } else {
            DispositionKind::Attachment
        };

        let parameters = value
            .split_once(';')
            .map(|(_, params)| parse_parameters(params))
            .unwrap_or_default();

        Self {
            kind,
            filename: parameters.get("filename").cloned(),
            size: parameters.get("size").and_then(|s| s.trim().parse().ok()),
            parameters,
        }
    }
}

/// One node of a decoded message tree.
///
/// Children are owned by their parent. `part_id` is the dotted 1-based path
/// from the root (`""`), e.g. `"2.1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessagePart {
    /// Part headers.
    pub headers: Headers,
    /// Classified Content-Type.
    pub content_type: ContentType,
    /// Body bytes before transfer decoding. Empty for multipart containers.
    pub raw_content: Vec<u8>,
    /// Declared Content-Transfer-Encoding.
    pub transfer_encoding: TransferEncoding,
    /// Content-Disposition, if declared.
    pub disposition: Option<Disposition>,
    /// Child parts (multipart containers only).
    pub children: Vec<MessagePart>,
    /// Hierarchical part id.
    pub part_id: String,
}

impl MessagePart {
    /// Builds a leaf from its headers and raw body.
    #[must_use]
    pub fn leaf(headers: Headers, content_type: ContentType, raw_content: Vec<u8>, part_id: String) -> Self {
        let transfer_encoding = headers
            .get("content-transfer-encoding")
            .map_or_else(TransferEncoding::default, TransferEncoding::parse);
        let disposition = headers.get("content-disposition").map(Disposition::parse);
        Self {
            headers,
            content_type,
            raw_content,
            transfer_encoding,
            disposition,
            children: Vec::new(),
            part_id,
        }
    }

    /// Returns true if this part has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Finds a part by id, searching this part and its descendants.
    #[must_use]
    pub fn find(&self, part_id: &str) -> Option<&Self> {
        if self.part_id == part_id {
            return Some(self);
        }
        self.children
            .iter()
            .filter(|child| {
                part_id == child.part_id || part_id.starts_with(&format!("{}.", child.part_id))
            })
            .find_map(|child| child.find(part_id))
    }

    /// Returns the raw content with the transfer encoding reversed.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is invalid for its declared encoding.
    pub fn decoded_content(&self) -> Result<Vec<u8>> {
        self.transfer_encoding.decode(&self.raw_content)
    }

    /// Returns the Content-ID without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').trim())
            .filter(|id| !id.is_empty())
    }

    /// Returns the filename from Content-Disposition, then Content-Type `name`.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(|d| d.filename.as_deref())
            .or_else(|| self.content_type.name())
            .filter(|name| !name.trim().is_empty())
    }
}

/// Id of the `index`-th (0-based) child of `parent`.
pub(crate) fn child_part_id(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        (index + 1).to_string()
    } else {
        format!("{parent}.{}", index + 1)
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

    fn leaf_with(headers: &[(&str, &str)], body: &[u8], part_id: &str) -> MessagePart {
        let mut h = Headers::new();
        for (name, value) in headers {
            h.add(*name, *value);
        }
        let ct = h.get("content-type").map_or_else(ContentType::default, ContentType::parse);
        MessagePart::leaf(h, ct, body.to_vec(), part_id.to_string())
    }

    #[test]
    fn test_disposition_parse() {
        let d = Disposition::parse("attachment; filename=\"report; final.pdf\"; size=1024");
        assert_eq!(d.kind, DispositionKind::Attachment);
        assert_eq!(d.filename.as_deref(), Some("report; final.pdf"));
        assert_eq!(d.size, Some(1024));

        let d = Disposition::parse("INLINE");
        assert_eq!(d.kind, DispositionKind::Inline);
        assert!(d.filename.is_none());
    }

    #[test]
    fn test_disposition_unknown_is_attachment() {
        let d = Disposition::parse("x-weird; filename=a.txt");
        assert_eq!(d.kind, DispositionKind::Attachment);
        assert_eq!(d.filename.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_disposition_rfc2231_filename() {
        let d = Disposition::parse("attachment; filename*=utf-8''%E6%8A%A5%E5%91%8A.pdf");
        assert_eq!(d.filename.as_deref(), Some("报告.pdf"));
    }

    #[test]
    fn test_child_part_id() {
        assert_eq!(child_part_id("", 0), "1");
        assert_eq!(child_part_id("1", 1), "1.2");
        assert_eq!(child_part_id("2.3", 0), "2.3.1");
    }

    #[test]
    fn test_leaf_reads_headers() {
        let part = leaf_with(
            &[
                ("Content-Type", "image/png; name=logo.png"),
                ("Content-Transfer-Encoding", "base64"),
                ("Content-ID", "<logo@example>"),
            ],
            b"SGk=",
            "2",
        );
        assert_eq!(part.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(part.content_id(), Some("logo@example"));
        assert_eq!(part.filename(), Some("logo.png"));
        assert_eq!(part.decoded_content().unwrap(), b"Hi");
        assert!(part.is_leaf());
    }

    #[test]
    fn test_find() {
        let text = leaf_with(&[], b"a", "1.1");
        let html = leaf_with(&[("Content-Type", "text/html")], b"b", "1.2");
        let mut alternative = leaf_with(&[("Content-Type", "multipart/alternative; boundary=b")], b"", "1");
        alternative.children = vec![text, html];
        let attachment = leaf_with(&[("Content-Type", "application/pdf")], b"c", "2");
        let mut root = leaf_with(&[("Content-Type", "multipart/mixed; boundary=a")], b"", "");
        root.children = vec![alternative, attachment];

        assert_eq!(root.find("").unwrap().part_id, "");
        assert!(root.find("1.2").unwrap().content_type.is_html());
        assert_eq!(root.find("2").unwrap().raw_content, b"c");
        assert!(root.find("1.3").is_none());
        assert!(root.find("3").is_none());
    }
}
