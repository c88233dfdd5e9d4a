//! Property tests for the byte-level codecs and the lenient decoder.

#![allow(clippy::unwrap_used)]

use mailcodec_mime::charset::{decode_with_fallback_strategies, detect};
use mailcodec_mime::encoding::{
    MAX_LINE_LENGTH, decode_base64, decode_quoted_printable, encode_base64_wrapped, encode_quoted_printable,
};
use mailcodec_mime::{DecodeOptions, TransferEncoding, decode};
use proptest::prelude::*;

fn transfer_encoding() -> impl Strategy<Value = Option<TransferEncoding>> {
    prop::option::of(prop::sample::select(vec![
        TransferEncoding::SevenBit,
        TransferEncoding::EightBit,
        TransferEncoding::Base64,
        TransferEncoding::QuotedPrintable,
        TransferEncoding::Binary,
    ]))
}

fn charset_name() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop::sample::select(vec![
        "utf-8",
        "gbk",
        "big5",
        "shift_jis",
        "iso-8859-1",
        "x-not-a-charset",
    ]))
}

proptest! {
    #[test]
    fn base64_round_trip_and_line_width(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let encoded = encode_base64_wrapped(&data);
        prop_assert_eq!(decode_base64(encoded.as_bytes()).unwrap(), data.clone());

        let lines: Vec<&str> = encoded.split("\r\n").filter(|l| !l.is_empty()).collect();
        if let Some((_, full)) = lines.split_last() {
            for line in full {
                prop_assert_eq!(line.len(), MAX_LINE_LENGTH);
            }
        }
        if !data.is_empty() {
            prop_assert!(encoded.ends_with("\r\n"));
        }
    }

    #[test]
    fn quoted_printable_round_trip(text in "[ -~\t\n]{0,400}") {
        let encoded = encode_quoted_printable(&text);
        for line in encoded.split("\r\n") {
            prop_assert!(line.len() <= MAX_LINE_LENGTH);
        }
        let decoded = decode_quoted_printable(encoded.as_bytes()).unwrap();
        prop_assert_eq!(String::from_utf8(decoded).unwrap(), text.replace('\n', "\r\n"));
    }

    #[test]
    fn fallback_strategies_never_fail(
        content in prop::collection::vec(any::<u8>(), 0..512),
        scheme in transfer_encoding(),
        charset in charset_name(),
    ) {
        let result = decode_with_fallback_strategies(&content, scheme, charset);
        prop_assert!(result == content || std::str::from_utf8(&result).is_ok());
    }

    #[test]
    fn utf8_bom_always_detected(tail in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend(tail);
        let detection = detect(&bytes);
        prop_assert_eq!(detection.encoding, "utf-8");
        prop_assert!((detection.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lenient_decode_never_fails(body in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mut raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n--B\r\n".to_vec();
        raw.extend_from_slice(&body);
        prop_assert!(decode(&raw, &DecodeOptions::default()).is_ok());
        prop_assert!(decode(&body, &DecodeOptions::default()).is_ok());
    }
}
