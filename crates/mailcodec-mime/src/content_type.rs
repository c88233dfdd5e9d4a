//! MIME content type handling.

use crate::charset;
use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// MIME content type with parameters.
///
/// Type, subtype and parameter names are lowercase. Parameter values keep
/// their case, except `charset` which is lowercased. A `boundary` parameter
/// is only kept on multipart types.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain")
    }
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/related content type with boundary.
    #[must_use]
    pub fn multipart_related(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "related").with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Returns `type/subtype`.
    #[must_use]
    pub fn full_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// Returns the `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Checks for text/plain.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        self.is_text() && self.sub_type == "plain"
    }

    /// Checks for text/html.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.is_text() && self.sub_type == "html"
    }

    /// Checks for multipart/alternative.
    #[must_use]
    pub fn is_alternative(&self) -> bool {
        self.is_multipart() && self.sub_type == "alternative"
    }

    /// Checks for multipart/related.
    #[must_use]
    pub fn is_related(&self) -> bool {
        self.is_multipart() && self.sub_type == "related"
    }

    /// Checks for multipart/mixed.
    #[must_use]
    pub fn is_mixed(&self) -> bool {
        self.is_multipart() && self.sub_type == "mixed"
    }

    /// Checks for message/rfc822 (an attached email).
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.main_type == "message" && self.sub_type == "rfc822"
    }

    /// Parses a content type header value, never failing.
    ///
    /// Malformed input yields a bare text/plain descriptor.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_else(|e| {
            tracing::debug!(value = s, error = %e, "malformed content type, using text/plain");
            Self::default()
        })
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type/subtype is missing or not a token.
    pub fn try_parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {s:?}")))?;
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());

        if !is_token(main_type) || !is_token(sub_type) {
            return Err(Error::InvalidContentType(format!("Invalid content type {s:?}")));
        }

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = parse_parameters(params);

        if let Some(charset) = content_type.parameters.get_mut("charset") {
            *charset = charset.trim().to_ascii_lowercase();
        }
        if !content_type.is_multipart() {
            content_type.parameters.remove("boundary");
        }

        Ok(content_type)
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b))
}

/// Splits `s` on `separator`, ignoring separators inside quoted strings.
pub(crate) fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                pieces.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&s[start..]);
    pieces
}

/// Removes surrounding quotes and backslash escapes.
pub(crate) fn unquote(value: &str) -> String {
    let value = value.trim();
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// RFC 2231 pieces of one parameter.
#[derive(Default)]
struct ExtendedValue {
    charset: Option<String>,
    /// Section number to (value, percent-encoded).
    sections: BTreeMap<u32, (String, bool)>,
}

impl ExtendedValue {
    fn assemble(self) -> String {
        let mut bytes = Vec::new();
        for (_, (value, encoded)) in self.sections {
            if encoded {
                bytes.extend(percent_decode(&value));
            } else {
                bytes.extend_from_slice(value.as_bytes());
            }
        }

        let charset = self.charset.as_deref().unwrap_or("utf-8");
        charset::convert_to_utf8(&bytes, charset)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn percent_decode(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(byte) = value
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            result.push(byte);
            i += 3;
            continue;
        }
        result.push(bytes[i]);
        i += 1;
    }
    result
}

/// Parses `; name=value` parameter lists (the part after type/subtype or
/// disposition type).
///
/// Handles quoted values, RFC 2231 extended and continued values
/// (`filename*=utf-8''%E2%82%AC`, `name*0=`, `name*1*=`), and RFC 2047
/// encoded words in `name` and `filename`. Extended values win over plain
/// ones of the same name.
pub(crate) fn parse_parameters(params: &str) -> BTreeMap<String, String> {
    let mut plain = BTreeMap::new();
    let mut extended: BTreeMap<String, ExtendedValue> = BTreeMap::new();

    for param in split_unquoted(params, ';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }

        let Some((name, section)) = key.split_once('*') else {
            plain.insert(key, unquote(value));
            continue;
        };

        let encoded = section.ends_with('*') || section.is_empty();
        let number = section.trim_end_matches('*').parse::<u32>().unwrap_or(0);
        let mut value = unquote(value);
        let entry = extended.entry(name.to_string()).or_default();

        if encoded && number == 0 {
            // charset'language'value
            let mut pieces = value.splitn(3, '\'');
            if let (Some(cs), Some(_lang), Some(rest)) = (pieces.next(), pieces.next(), pieces.next()) {
                if !cs.is_empty() {
                    entry.charset = Some(cs.to_string());
                }
                value = rest.to_string();
            }
        }
        entry.sections.insert(number, (value, encoded));
    }

    for (name, value) in extended {
        plain.insert(name, value.assemble());
    }

    for key in ["name", "filename"] {
        if let Some(value) = plain.get_mut(key)
            && value.contains("=?")
        {
            *value = decode_rfc2047(value);
        }
    }

    plain
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
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
    fn test_content_type_new() {
        let ct = ContentType::new("Text", "PLAIN");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.full_type(), "text/plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_text_plain() {
        let ct = ContentType::text_plain();
        assert!(ct.is_plain_text());
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_multipart_mixed() {
        let ct = ContentType::multipart_mixed("boundary123");
        assert_eq!(ct.full_type(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("boundary123"));
        assert!(ct.is_multipart());
        assert!(ct.is_mixed());
        assert!(!ct.is_alternative());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; Charset=UTF-8; format=Flowed");
        assert_eq!(ct.full_type(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.parameters.get("format").map(String::as_str), Some("Flowed"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123; x\"");
        assert!(ct.is_mixed());
        assert_eq!(ct.boundary(), Some("----=_Part_123; x"));
    }

    #[test]
    fn test_boundary_only_on_multipart() {
        let ct = ContentType::parse("text/plain; boundary=abc");
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_parse_malformed_falls_back() {
        for input in ["", "garbage", "/html", "text/", "te xt/plain"] {
            let ct = ContentType::parse(input);
            assert!(ct.is_plain_text(), "input {input:?}");
            assert!(ContentType::try_parse(input).is_err());
        }
    }

    #[test]
    fn test_rfc2231_parameters() {
        let ct = ContentType::parse("application/pdf; name*=utf-8''%E2%82%AC%20rates.pdf");
        assert_eq!(ct.name(), Some("€ rates.pdf"));

        let ct = ContentType::parse(
            "application/pdf; name*0=\"long \"; name*1*=%C3%A9t%C3%A9; name*2=\".pdf\"",
        );
        assert_eq!(ct.name(), Some("long été.pdf"));
    }

    #[test]
    fn test_rfc2047_name_parameter() {
        let ct = ContentType::parse("image/png; name=\"=?utf-8?B?5Zu+54mHLnBuZw==?=\"");
        assert_eq!(ct.name(), Some("图片.png"));
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::text_plain();
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8");

        let ct = ContentType::multipart_alternative("=_abc");
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=\"=_abc\"");
    }

    #[test]
    fn test_content_type_with_parameter() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");

        assert_eq!(ct.charset(), Some("iso-8859-1"));
        assert_eq!(ct.parameters.get("format"), Some(&"flowed".to_string()));
    }
}
