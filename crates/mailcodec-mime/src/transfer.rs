//! Content-Transfer-Encoding handling.

use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Schemes tried, in order, after the declared one fails.
    pub const FALLBACK_ORDER: [Self; 5] = [
        Self::QuotedPrintable,
        Self::Base64,
        Self::SevenBit,
        Self::EightBit,
        Self::Binary,
    ];

    /// Parses transfer encoding from string, treating unknown values as 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!(value = s, "unknown transfer encoding, assuming 7bit");
            Self::SevenBit
        })
    }

    /// Returns the header token for this encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        }
    }

    /// Reverses this transfer encoding.
    ///
    /// 7bit, 8bit and binary are identity transforms.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for this scheme.
    pub fn decode(self, content: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(content),
            Self::QuotedPrintable => decode_quoted_printable(content),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(content.to_vec()),
        }
    }
}

impl FromStr for TransferEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" | "" => Ok(Self::SevenBit),
            "8bit" => Ok(Self::EightBit),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            "binary" => Ok(Self::Binary),
            other => Err(Error::UnsupportedTransferEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes content using a scheme named as in a Content-Transfer-Encoding header.
///
/// # Errors
///
/// Returns an error for an unsupported scheme or content that is invalid
/// for it.
pub fn decode(content: &[u8], scheme: &str) -> Result<Vec<u8>> {
    scheme.parse::<TransferEncoding>()?.decode(content)
}

/// Decodes with the declared scheme, falling back through
/// [`TransferEncoding::FALLBACK_ORDER`] on failure.
///
/// Returns the bytes and the scheme that produced them. Whether the result
/// is meaningful text is for the charset layer to judge; this only rejects
/// structurally invalid input. Since 7bit always succeeds, so does this.
#[must_use]
pub fn decode_with_fallback(content: &[u8], declared: TransferEncoding) -> (Vec<u8>, TransferEncoding) {
    match declared.decode(content) {
        Ok(decoded) => return (decoded, declared),
        Err(e) => tracing::warn!(%declared, error = %e, "declared transfer encoding failed"),
    }

    for scheme in TransferEncoding::FALLBACK_ORDER {
        if scheme == declared {
            continue;
        }
        if let Ok(decoded) = scheme.decode(content) {
            tracing::debug!(%scheme, "fallback transfer encoding succeeded");
            return (decoded, scheme);
        }
    }

    (content.to_vec(), TransferEncoding::SevenBit)
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
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse(" quoted-printable "),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "x-uuencode".parse::<TransferEncoding>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransferEncoding(_)));
    }

    #[test]
    fn test_decode_by_name() {
        assert_eq!(decode(b"SGk=", "base64").unwrap(), b"Hi");
        assert_eq!(decode(b"a=3Db", "Quoted-Printable").unwrap(), b"a=b");
        assert_eq!(decode(b"\xff\x00", "binary").unwrap(), b"\xff\x00");
        assert!(decode(b"abc", "x-custom").is_err());
        assert!(decode(b"@@@", "base64").is_err());
    }

    #[test]
    fn test_decode_with_fallback_uses_declared() {
        let (decoded, used) = decode_with_fallback(b"SGk=", TransferEncoding::Base64);
        assert_eq!(decoded, b"Hi");
        assert_eq!(used, TransferEncoding::Base64);
    }

    #[test]
    fn test_decode_with_fallback_order() {
        // Not base64, but valid quoted-printable, which comes first.
        let (decoded, used) = decode_with_fallback(b"caf=C3=A9!", TransferEncoding::Base64);
        assert_eq!(decoded, "café!".as_bytes());
        assert_eq!(used, TransferEncoding::QuotedPrintable);

        // Neither quoted-printable nor base64.
        let (decoded, used) = decode_with_fallback(b"50% =off", TransferEncoding::QuotedPrintable);
        assert_eq!(decoded, b"50% =off");
        assert_eq!(used, TransferEncoding::SevenBit);
    }
}
