//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::charset;
use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt::Write as _;

/// Maximum line length for Base64 and Quoted-Printable bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Longest raw chunk placed in one encoded word: 45 bytes become 60 Base64
/// characters, which with the `=?utf-8?B?...?=` framing stays under 75.
const ENCODED_WORD_CHUNK: usize = 45;

/// Mail in the wild drops or truncates padding; accept either.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped at 76 characters per line.
///
/// Every line, including the last, ends with CRLF. Empty input yields an
/// empty string.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str boundaries.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(std::str::from_utf8(line).unwrap_or_default());
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks (LF or CRLF) become CRLF hard breaks. Lines longer than 76
/// characters get soft breaks, and whitespace at the end of a line is
/// escaped so transports cannot strip it.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    let normalized = text.replace("\r\n", "\n");

    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        encode_quoted_printable_line(line.as_bytes(), &mut result);
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], result: &mut String) {
    let mut line_length = 0;

    for (index, &byte) in line.iter().enumerate() {
        let at_end = index + 1 == line.len();
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !at_end);
        let width = if literal { 1 } else { 3 };

        // Leave room for the '=' of a soft line break.
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(byte as char);
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks (with or without trailing whitespace after the `=`) are
/// removed and `=XX` escapes are resolved; hex digits may be either case.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < data.len() && matches!(data[j], b' ' | b'\t') {
            j += 1;
        }
        match data.get(j) {
            None => break,
            Some(b'\n') => {
                i = j + 1;
                continue;
            }
            Some(b'\r') if data.get(j + 1) == Some(&b'\n') => {
                i = j + 2;
                continue;
            }
            _ => {}
        }

        match (
            data.get(i + 1).and_then(|&b| hex_value(b)),
            data.get(i + 2).and_then(|&b| hex_value(b)),
        ) {
            (Some(high), Some(low)) => {
                result.push(high << 4 | low);
                i += 3;
            }
            _ => {
                return Err(Error::InvalidEncoding(format!(
                    "Invalid quoted-printable escape at offset {i}"
                )));
            }
        }
    }

    Ok(result)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Returns true if a header value must be written as encoded words.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    !text.is_ascii() || text.contains("=?") || text.chars().any(char::is_control)
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?utf-8?B?encoded-text?=`. Text that does not need encoding is
/// returned unchanged. Long text is split on character boundaries into
/// several space-separated words, none longer than 75 characters.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_end = 0;

    for (offset, ch) in text.char_indices() {
        let next_end = offset + ch.len_utf8();
        if next_end - chunk_start > ENCODED_WORD_CHUNK && chunk_end > chunk_start {
            words.push(encoded_word(&text[chunk_start..chunk_end]));
            chunk_start = chunk_end;
        }
        chunk_end = next_end;
    }
    if chunk_end > chunk_start {
        words.push(encoded_word(&text[chunk_start..chunk_end]));
    }

    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Whitespace between two adjacent encoded words is dropped. Words in an
/// unknown charset or with a broken payload are left as they are.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    if !text.contains("=?") {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        if let Some((word, consumed)) = parse_encoded_word(candidate) {
            let between_words = previous_was_word && before.chars().all(char::is_whitespace);
            if !between_words {
                result.push_str(before);
            }
            result.push_str(&word);
            previous_was_word = true;
            rest = &candidate[consumed..];
        } else {
            result.push_str(before);
            result.push_str("=?");
            previous_was_word = false;
            rest = &candidate[2..];
        }
    }

    result.push_str(rest);
    result
}

/// Parses one `=?charset?enc?text?=` at the start of `input`, returning the
/// decoded text and the number of bytes consumed.
fn parse_encoded_word(input: &str) -> Option<(String, usize)> {
    let inner = input.strip_prefix("=?")?;
    let (charset, rest) = inner.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let payload = &rest[..end];
    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;

    if payload.contains(char::is_whitespace) || charset.is_empty() {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes()).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()).ok()?,
        _ => return None,
    };

    // RFC 2231 allows a language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    let text = charset::convert_to_utf8(&bytes, charset).ok()?;
    Some((text, consumed))
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
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_decode_lenient() {
        assert_eq!(decode_base64(b"SGVs\r\nbG8=\r\n").unwrap(), b"Hello");
        assert_eq!(decode_base64(b"SGVsbG8").unwrap(), b"Hello");
        assert!(decode_base64(b"not*base64!").is_err());
    }

    #[test]
    fn test_base64_wrapped_line_lengths() {
        let data = vec![0xAB_u8; 200];
        let encoded = encode_base64_wrapped(&data);
        assert!(encoded.ends_with("\r\n"));

        let lines: Vec<&str> = encoded.trim_end().split("\r\n").collect();
        for line in &lines[..lines.len() - 1] {
            assert_eq!(line.len(), MAX_LINE_LENGTH);
        }
        assert_eq!(decode_base64(encoded.as_bytes()).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_line_breaks_and_trailing_space() {
        let encoded = encode_quoted_printable("one \ntwo\r\nthree=");
        assert_eq!(encoded, "one=20\r\ntwo\r\nthree=3D");
    }

    #[test]
    fn test_quoted_printable_soft_breaks_respect_width() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        let decoded = decode_quoted_printable(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, text.as_bytes());
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"Hello, World!").unwrap();
        assert_eq!(decoded, b"Hello, World!");

        let decoded = decode_quoted_printable(b"H=C3=A9llo").unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "Héllo");

        let decoded = decode_quoted_printable(b"caf=c3=a9").unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "café");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable(b"Hello=\r\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");

        let decoded = decode_quoted_printable(b"Hello= \nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_invalid_escape() {
        assert!(decode_quoted_printable(b"bad =ZZ escape").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        let encoded = encode_rfc2047("Hello");
        assert_eq!(encoded, "Hello"); // No encoding needed

        let encoded = encode_rfc2047("Héllo");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_rfc2047_encode_splits_long_text() {
        let text = "日本語のテキスト".repeat(10);
        let encoded = encode_rfc2047(&text);
        for word in encoded.split(' ') {
            assert!(word.len() <= 75, "word too long: {word}");
        }
        assert_eq!(decode_rfc2047(&encoded), text);
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?="), "Héllo there");
    }

    #[test]
    fn test_rfc2047_mixed_text_and_adjacent_words() {
        let decoded = decode_rfc2047("Re: =?utf-8?Q?caf=C3=A9?= =?utf-8?Q?_au_lait?= ok");
        assert_eq!(decoded, "Re: café au lait ok");
    }

    #[test]
    fn test_rfc2047_legacy_charset() {
        // "中文" in GBK
        assert_eq!(decode_rfc2047("=?gb2312?B?1tDOxA==?="), "中文");
    }

    #[test]
    fn test_rfc2047_unknown_charset_left_verbatim() {
        let text = "=?x-unknown?B?SMOpbGxv?=";
        assert_eq!(decode_rfc2047(text), text);
    }
}
