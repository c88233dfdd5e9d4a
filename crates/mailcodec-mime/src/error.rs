//! Error types for MIME operations.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed framing: missing boundary, truncated stream, nesting too deep.
    Structural,
    /// Unsupported or structurally invalid transfer or character encoding.
    Encoding,
    /// Attachment content could not be read while encoding.
    Io,
}

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing boundary in multipart message.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// Multipart nesting deeper than the configured limit.
    #[error("Multipart nesting exceeds depth limit of {depth}")]
    DepthExceeded {
        /// The configured limit.
        depth: usize,
    },

    /// Multipart body ended before its closing delimiter.
    #[error("Multipart body truncated before closing boundary")]
    Truncated,

    /// Invalid multipart structure.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// Address that cannot be written to a header.
    #[error("Invalid address {address:?}")]
    InvalidAddress {
        /// The offending address.
        address: String,
    },

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Unknown Content-Transfer-Encoding.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// Charset not present in the codec registry.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Bytes are not valid in the named charset.
    #[error("Content is not valid {charset}")]
    MalformedCharset {
        /// Charset the content was decoded as.
        charset: String,
    },

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Attachment stream failed while being read.
    #[error("Failed to read attachment {filename}: {source}")]
    AttachmentRead {
        /// Declared attachment filename.
        filename: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Attachment declared without a content stream.
    #[error("Attachment {filename} has no content stream")]
    MissingAttachmentContent {
        /// Declared attachment filename.
        filename: String,
    },

    /// Failure inside a specific part (strict decoding).
    #[error("Part {part_id:?}: {source}")]
    Part {
        /// Hierarchical id of the failing part.
        part_id: String,
        /// The failure.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error with the id of the part it occurred in.
    #[must_use]
    pub fn in_part(self, part_id: &str) -> Self {
        match self {
            already @ Self::Part { .. } => already,
            other => Self::Part {
                part_id: part_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBoundary
            | Self::DepthExceeded { .. }
            | Self::Truncated
            | Self::InvalidMultipart(_)
            | Self::InvalidAddress { .. }
            | Self::InvalidContentType(_) => ErrorKind::Structural,
            Self::UnsupportedTransferEncoding(_)
            | Self::UnsupportedCharset(_)
            | Self::MalformedCharset { .. }
            | Self::InvalidEncoding(_)
            | Self::Base64Decode(_) => ErrorKind::Encoding,
            Self::AttachmentRead { .. } | Self::MissingAttachmentContent { .. } => ErrorKind::Io,
            Self::Part { source, .. } => source.kind(),
        }
    }

    /// Returns the id of the part this error is tagged with, if any.
    #[must_use]
    pub fn part_id(&self) -> Option<&str> {
        match self {
            Self::Part { part_id, .. } => Some(part_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_unwraps_part() {
        let err = Error::MissingBoundary.in_part("1.2");
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(err.part_id(), Some("1.2"));
    }

    #[test]
    fn test_in_part_keeps_innermost_id() {
        let err = Error::Truncated.in_part("2.1").in_part("2");
        assert_eq!(err.part_id(), Some("2.1"));
    }

    #[test]
    fn test_io_kind() {
        let err = Error::MissingAttachmentContent {
            filename: "a.pdf".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("a.pdf"));
    }
}
