//! Character set detection and conversion.
//!
//! All text leaving this crate is UTF-8. Incoming bytes are converted through
//! a registry of named codecs (backed by `encoding_rs`), and when the declared
//! charset is missing or wrong the detection heuristics below pick one.
//!
//! The registry and detection rules are immutable statics built on first
//! use, so every function here is safe to call from any number of threads.

use crate::error::{Error, Result};
use crate::transfer::TransferEncoding;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// A detection result must exceed this to be taken without the statistical fallback.
const CONFIDENT: f64 = 0.8;

/// Minimum pair coverage for a double-byte charset to be considered at all.
const DOUBLE_BYTE_THRESHOLD: f64 = 0.3;

/// Below this, [`auto_convert_to_utf8`] probes the Chinese charsets first.
const PROBE_THRESHOLD: f64 = 0.6;

/// Confidence reported when a probe charset decodes cleanly.
const PROBE_CONFIDENCE: f64 = 0.5;

/// Charsets probed, in order, when detection is unsure.
const PROBE_ORDER: [&str; 4] = ["gbk", "gb2312", "big5", "gb18030"];

/// Charsets tried, in order, by [`decode_with_fallback_strategies`].
pub const FALLBACK_CHARSETS: [&str; 6] = ["utf-8", "gbk", "gb2312", "big5", "gb18030", "iso-8859-1"];

/// Result of charset detection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Detection {
    /// Canonical charset name (e.g. `"utf-8"`, `"gbk"`).
    pub encoding: &'static str,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    const fn new(encoding: &'static str, confidence: f64) -> Self {
        Self {
            encoding,
            confidence,
        }
    }
}

/// Text produced by [`auto_convert_to_utf8`].
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// The decoded text.
    pub text: String,
    /// Charset the input was decoded as.
    pub encoding: &'static str,
    /// How sure the detector was.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
enum Codec {
    Utf8,
    /// UTF-16 with BOM sniffing, big-endian when no BOM.
    Utf16,
    Utf16Le,
    Utf16Be,
    Ascii,
    Latin1,
    Legacy(&'static Encoding),
}

#[derive(Debug, Clone, Copy)]
struct Charset {
    name: &'static str,
    codec: Codec,
}

static REGISTRY: LazyLock<HashMap<String, Charset>> = LazyLock::new(|| {
    // Canonical name, codec, aliases.
    let table: [(&'static str, Codec, &[&str]); 19] = [
        ("utf-8", Codec::Utf8, &["utf8", "unicode-1-1-utf-8"]),
        ("utf-16", Codec::Utf16, &["utf16", "unicode"]),
        ("utf-16le", Codec::Utf16Le, &[]),
        ("utf-16be", Codec::Utf16Be, &[]),
        ("us-ascii", Codec::Ascii, &["ascii", "ansi_x3.4-1968", "iso646-us"]),
        ("iso-8859-1", Codec::Latin1, &["latin1", "latin-1", "l1", "iso_8859-1", "cp819"]),
        ("windows-1252", Codec::Legacy(encoding_rs::WINDOWS_1252), &["cp1252"]),
        ("gbk", Codec::Legacy(encoding_rs::GBK), &["cp936", "ms936", "windows-936"]),
        ("gb2312", Codec::Legacy(encoding_rs::GBK), &["euc-cn", "x-gbk", "csgb2312"]),
        ("gb18030", Codec::Legacy(encoding_rs::GB18030), &[]),
        ("big5", Codec::Legacy(encoding_rs::BIG5), &["big5-hkscs", "cp950", "x-x-big5"]),
        ("shift_jis", Codec::Legacy(encoding_rs::SHIFT_JIS), &["sjis", "ms_kanji", "cp932", "windows-31j", "x-sjis"]),
        ("euc-jp", Codec::Legacy(encoding_rs::EUC_JP), &[]),
        ("iso-2022-jp", Codec::Legacy(encoding_rs::ISO_2022_JP), &[]),
        ("euc-kr", Codec::Legacy(encoding_rs::EUC_KR), &["ks_c_5601-1987", "cp949", "windows-949"]),
        ("koi8-r", Codec::Legacy(encoding_rs::KOI8_R), &[]),
        ("windows-1251", Codec::Legacy(encoding_rs::WINDOWS_1251), &["cp1251"]),
        ("iso-8859-2", Codec::Legacy(encoding_rs::ISO_8859_2), &["latin2"]),
        ("iso-8859-15", Codec::Legacy(encoding_rs::ISO_8859_15), &["latin9"]),
    ];

    let mut registry = HashMap::new();
    for (name, codec, aliases) in table {
        let charset = Charset { name, codec };
        registry.insert(normalize(name), charset);
        for alias in aliases {
            registry.insert(normalize(alias), charset);
        }
    }
    registry
});

/// Lead/trail byte ranges of a double-byte charset.
struct DoubleByteRule {
    name: &'static str,
    lead: &'static [RangeInclusive<u8>],
    trail: &'static [RangeInclusive<u8>],
}

impl DoubleByteRule {
    /// Fraction of the buffer covered by lead/trail pairs.
    fn score(&self, bytes: &[u8]) -> f64 {
        if bytes.is_empty() {
            return 0.0;
        }

        let in_ranges = |ranges: &[RangeInclusive<u8>], b: u8| ranges.iter().any(|r| r.contains(&b));
        let mut pairs = 0_usize;
        let mut i = 0;
        while i + 1 < bytes.len() {
            if in_ranges(self.lead, bytes[i]) && in_ranges(self.trail, bytes[i + 1]) {
                pairs += 1;
                i += 2;
            } else {
                i += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let score = (2 * pairs) as f64 / bytes.len() as f64;
        score.min(1.0)
    }
}

const GBK_LEAD: RangeInclusive<u8> = 0x81..=0xFE;

/// Scanned in order; on equal scores the earlier rule wins.
static DOUBLE_BYTE_RULES: [DoubleByteRule; 4] = [
    DoubleByteRule {
        name: "gbk",
        lead: &[GBK_LEAD],
        trail: &[0x40..=0x7E, 0x80..=0xFE],
    },
    DoubleByteRule {
        name: "big5",
        lead: &[0xA1..=0xF9],
        trail: &[0x40..=0x7E, 0xA1..=0xFE],
    },
    DoubleByteRule {
        name: "shift_jis",
        lead: &[0x81..=0x9F, 0xE0..=0xEF],
        trail: &[0x40..=0x7E, 0x80..=0xFC],
    },
    DoubleByteRule {
        name: "euc-kr",
        lead: &[0xA1..=0xFE],
        trail: &[0xA1..=0xFE],
    },
];

/// Normalizes a charset label: lowercase, no `_` or `-`, no quotes.
fn normalize(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup(name: &str) -> Result<Charset> {
    if let Some(charset) = REGISTRY.get(&normalize(name)) {
        return Ok(*charset);
    }

    // Anything else the WHATWG label table knows.
    Encoding::for_label(name.trim().as_bytes())
        .map(|encoding| Charset {
            name: encoding.name(),
            codec: Codec::Legacy(encoding),
        })
        .ok_or_else(|| Error::UnsupportedCharset(name.to_string()))
}

/// Returns the canonical name for a charset label, if it is supported.
#[must_use]
pub fn canonical_name(name: &str) -> Option<&'static str> {
    lookup(name).ok().map(|charset| charset.name)
}

/// Returns true if the charset label is supported.
#[must_use]
pub fn is_supported(name: &str) -> bool {
    lookup(name).is_ok()
}

/// Guesses the charset of a byte buffer.
///
/// Heuristics run in order and the first confident one wins:
/// byte-order marks, UTF-8 validity, double-byte lead/trail coverage for
/// GBK, Big5, Shift-JIS and EUC-KR, then an ISO-8859-1 guess. When nothing
/// exceeds 0.8 the result comes from the high-byte statistics instead.
#[must_use]
pub fn detect(bytes: &[u8]) -> Detection {
    if bytes.starts_with(UTF8_BOM) {
        return Detection::new("utf-8", 1.0);
    }
    if bytes.starts_with(UTF16_LE_BOM) || bytes.starts_with(UTF16_BE_BOM) {
        return Detection::new("utf-16", 1.0);
    }
    if std::str::from_utf8(bytes).is_ok() {
        let confidence = if bytes.is_ascii() { 0.9 } else { 0.95 };
        return Detection::new("utf-8", confidence);
    }

    let high_bytes = bytes.iter().filter(|b| **b > 127).count();
    let mut best = Detection::new("iso-8859-1", if high_bytes > 0 { 0.3 } else { 0.1 });

    for rule in &DOUBLE_BYTE_RULES {
        let confidence = rule.score(bytes);
        if confidence > DOUBLE_BYTE_THRESHOLD && confidence > best.confidence {
            best = Detection::new(rule.name, confidence);
        }
    }

    tracing::trace!(encoding = best.encoding, confidence = best.confidence, "charset heuristics");
    if best.confidence > CONFIDENT {
        return best;
    }

    statistical_fallback(bytes, high_bytes)
}

fn statistical_fallback(bytes: &[u8], high_bytes: usize) -> Detection {
    if high_bytes == 0 {
        return Detection::new("ascii", 0.9);
    }

    let gbk_leads = bytes.iter().filter(|b| GBK_LEAD.contains(*b)).count();
    if gbk_leads * 2 > high_bytes {
        Detection::new("gbk", 0.6)
    } else {
        Detection::new("utf-8", 0.5)
    }
}

/// Converts bytes in the named charset to UTF-8.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for unknown labels and
/// [`Error::MalformedCharset`] when the bytes are not valid in that charset.
pub fn convert_to_utf8(bytes: &[u8], encoding: &str) -> Result<String> {
    let charset = lookup(encoding)?;
    let malformed = || Error::MalformedCharset {
        charset: charset.name.to_string(),
    };

    let text: Cow<'_, str> = match charset.codec {
        Codec::Utf8 => {
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            Cow::Borrowed(std::str::from_utf8(bytes).map_err(|_| malformed())?)
        }
        Codec::Utf16 => {
            let (encoding, body) = if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
                (encoding_rs::UTF_16LE, rest)
            } else if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
                (encoding_rs::UTF_16BE, rest)
            } else {
                (encoding_rs::UTF_16BE, bytes)
            };
            encoding
                .decode_without_bom_handling_and_without_replacement(body)
                .ok_or_else(malformed)?
        }
        Codec::Utf16Le => encoding_rs::UTF_16LE
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(malformed)?,
        Codec::Utf16Be => encoding_rs::UTF_16BE
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(malformed)?,
        Codec::Ascii => {
            if !bytes.is_ascii() {
                return Err(malformed());
            }
            Cow::Borrowed(std::str::from_utf8(bytes).map_err(|_| malformed())?)
        }
        Codec::Latin1 => encoding_rs::mem::decode_latin1(bytes),
        Codec::Legacy(encoding) => encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(malformed)?,
    };

    Ok(text.into_owned())
}

/// Converts UTF-8 text to bytes in the named charset.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for unknown labels and
/// [`Error::MalformedCharset`] when the text has characters the charset
/// cannot represent.
pub fn convert_from_utf8(text: &str, encoding: &str) -> Result<Vec<u8>> {
    let charset = lookup(encoding)?;
    let unmappable = || Error::MalformedCharset {
        charset: charset.name.to_string(),
    };

    match charset.codec {
        Codec::Utf8 => Ok(text.as_bytes().to_vec()),
        Codec::Utf16 => {
            let mut out = UTF16_BE_BOM.to_vec();
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            Ok(out)
        }
        Codec::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        Codec::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        Codec::Ascii => text
            .is_ascii()
            .then(|| text.as_bytes().to_vec())
            .ok_or_else(unmappable),
        Codec::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| unmappable()))
            .collect(),
        Codec::Legacy(encoding) => {
            let (bytes, _, had_errors) = encoding.encode(text);
            if had_errors {
                Err(unmappable())
            } else {
                Ok(bytes.into_owned())
            }
        }
    }
}

/// Converts bytes of unknown charset to UTF-8.
///
/// Valid UTF-8 is returned as is with confidence 1.0. Otherwise the
/// [`detect`] result is used, except that an unsure detection (below 0.6)
/// first probes GBK, GB2312, Big5 and GB18030 in that order.
///
/// # Errors
///
/// Returns an error if the detected charset cannot decode the bytes.
pub fn auto_convert_to_utf8(bytes: &[u8]) -> Result<Converted> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Converted {
            text: text.to_string(),
            encoding: "utf-8",
            confidence: 1.0,
        });
    }

    let detection = detect(bytes);
    tracing::debug!(
        encoding = detection.encoding,
        confidence = detection.confidence,
        "detected charset"
    );

    if detection.confidence < PROBE_THRESHOLD {
        for name in PROBE_ORDER {
            if let Ok(text) = convert_to_utf8(bytes, name) {
                tracing::debug!(encoding = name, "probe charset decoded cleanly");
                return Ok(Converted {
                    text,
                    encoding: name,
                    confidence: PROBE_CONFIDENCE,
                });
            }
        }
    }

    let text = convert_to_utf8(bytes, detection.encoding)?;
    Ok(Converted {
        text,
        encoding: detection.encoding,
        confidence: detection.confidence,
    })
}

/// Last-resort decoding of a body whose declarations cannot be trusted.
///
/// Tries the declared transfer encoding and charset first, then every
/// combination of [`TransferEncoding::FALLBACK_ORDER`] and
/// [`FALLBACK_CHARSETS`], returning the first that yields valid UTF-8.
/// Never fails: if nothing works the input comes back unchanged.
#[must_use]
pub fn decode_with_fallback_strategies(
    content: &[u8],
    transfer_encoding: Option<TransferEncoding>,
    charset: Option<&str>,
) -> Vec<u8> {
    let schemes = transfer_encoding
        .into_iter()
        .chain(TransferEncoding::FALLBACK_ORDER);

    for scheme in schemes {
        let Ok(decoded) = scheme.decode(content) else {
            continue;
        };
        let charsets = charset.into_iter().chain(FALLBACK_CHARSETS);
        for name in charsets {
            if let Ok(text) = convert_to_utf8(&decoded, name) {
                tracing::debug!(%scheme, charset = name, "fallback decoding succeeded");
                return text.into_bytes();
            }
        }
    }

    tracing::warn!(len = content.len(), "no fallback decoding succeeded, returning input unchanged");
    content.to_vec()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    /// "你好世界" in GBK.
    const GBK_HELLO_WORLD: &[u8] = &[0xC4, 0xE3, 0xBA, 0xC3, 0xCA, 0xC0, 0xBD, 0xE7];

    #[test]
    fn test_alias_normalization() {
        assert_eq!(canonical_name("SJIS"), Some("shift_jis"));
        assert_eq!(canonical_name("latin1"), Some("iso-8859-1"));
        assert_eq!(canonical_name("UTF_8"), Some("utf-8"));
        assert_eq!(canonical_name("\"GB2312\""), Some("gb2312"));
        assert_eq!(canonical_name("x-made-up"), None);
        assert!(is_supported("windows-1250"));
    }

    #[test]
    fn test_detect_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(&[0xFF, 0x00, 0xC4]);
        assert_eq!(detect(&bytes), Detection::new("utf-8", 1.0));
    }

    #[test]
    fn test_detect_utf16_bom() {
        assert_eq!(detect(&[0xFF, 0xFE, b'a', 0]).encoding, "utf-16");
        assert_eq!(detect(&[0xFE, 0xFF, 0, b'a']).confidence, 1.0);
    }

    #[test]
    fn test_detect_valid_utf8() {
        assert_eq!(detect(b"plain ascii"), Detection::new("utf-8", 0.9));
        assert_eq!(detect("naïve".as_bytes()), Detection::new("utf-8", 0.95));
    }

    #[test]
    fn test_detect_gbk() {
        let detection = detect(GBK_HELLO_WORLD);
        assert_eq!(detection.encoding, "gbk");
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_detect_statistical_fallback() {
        // Mostly ASCII with two isolated high bytes: no double-byte rule passes.
        let detection = detect(b"caf\xe9 cr\xe8me brulee and more plain text");
        assert_eq!(detection, Detection::new("gbk", 0.6));

        let detection = detect(b"x\x80y");
        assert_eq!(detection, Detection::new("utf-8", 0.5));
    }

    #[test]
    fn test_convert_to_utf8() {
        assert_eq!(convert_to_utf8(GBK_HELLO_WORLD, "gbk").unwrap(), "你好世界");
        assert_eq!(convert_to_utf8(b"caf\xe9", "latin1").unwrap(), "café");
        assert_eq!(convert_to_utf8(&[0x82, 0xA0], "sjis").unwrap(), "あ");
        assert_eq!(convert_to_utf8(&[0xFF, 0xFE, b'h', 0, b'i', 0], "utf-16").unwrap(), "hi");
    }

    #[test]
    fn test_convert_to_utf8_rejects_malformed() {
        assert!(matches!(
            convert_to_utf8(&[0xC3, 0x28], "utf-8"),
            Err(Error::MalformedCharset { .. })
        ));
        assert!(matches!(
            convert_to_utf8(b"abc", "klingon"),
            Err(Error::UnsupportedCharset(_))
        ));
        assert!(convert_to_utf8(&[0xE9], "us-ascii").is_err());
    }

    #[test]
    fn test_convert_from_utf8() {
        assert_eq!(convert_from_utf8("你好世界", "gbk").unwrap(), GBK_HELLO_WORLD);
        assert_eq!(convert_from_utf8("café", "iso-8859-1").unwrap(), b"caf\xe9");
        assert!(convert_from_utf8("你", "latin1").is_err());
        assert_eq!(convert_from_utf8("hi", "utf-16le").unwrap(), vec![b'h', 0, b'i', 0]);
    }

    #[test]
    fn test_auto_convert_valid_utf8() {
        let converted = auto_convert_to_utf8("héllo".as_bytes()).unwrap();
        assert_eq!(converted.text, "héllo");
        assert_eq!(converted.confidence, 1.0);
    }

    #[test]
    fn test_auto_convert_gbk_subject() {
        let mut subject = b"Re: ".to_vec();
        subject.extend_from_slice(GBK_HELLO_WORLD);
        let converted = auto_convert_to_utf8(&subject).unwrap();
        assert_eq!(converted.text, "Re: 你好世界");
        assert!(converted.confidence >= 0.3);
    }

    #[test]
    fn test_fallback_strategies_declared_first() {
        let decoded = decode_with_fallback_strategies(b"caf=E9", Some(TransferEncoding::QuotedPrintable), Some("iso-8859-1"));
        assert_eq!(String::from_utf8(decoded).unwrap(), "café");
    }

    #[test]
    fn test_fallback_strategies_recovers_wrong_declaration() {
        // Declared utf-8 but actually GBK.
        let decoded = decode_with_fallback_strategies(GBK_HELLO_WORLD, Some(TransferEncoding::EightBit), Some("utf-8"));
        assert_eq!(String::from_utf8(decoded).unwrap(), "你好世界");
    }
}
