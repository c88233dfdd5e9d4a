//! Integration tests for message decoding.
//!
//! Raw messages are written inline so each test shows the exact wire bytes
//! it feeds the decoder.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use mailcodec_mime::{DecodeOptions, DispositionKind, Error, ErrorKind, TransferEncoding, decode};

/// "你好世界" in GBK.
const GBK_HELLO_WORLD: &[u8] = &[0xC4, 0xE3, 0xBA, 0xC3, 0xCA, 0xC0, 0xBD, 0xE7];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn strict() -> DecodeOptions {
    DecodeOptions::new().strict(true)
}

#[test]
fn test_text_and_pdf_attachment() {
    init_tracing();
    let mut raw = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n\
--X\r\nContent-Type: text/plain\r\n\r\nhello\r\n\
--X\r\nContent-Type: application/pdf\r\nContent-Disposition: attachment; filename=a.pdf\r\n\r\n"
        .to_vec();
    raw.extend_from_slice(&[0x25, 0x50, 0x44, 0x46, 0x00, 0xFF, 0xFE]);
    raw.extend_from_slice(b"\r\n--X--");

    let message = decode(&raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "hello");
    assert_eq!(message.html_body, "");
    assert_eq!(message.attachments.len(), 1);

    let pdf = &message.attachments[0];
    assert_eq!(pdf.filename, "a.pdf");
    assert_eq!(pdf.part_id, "2");
    assert_eq!(pdf.content_type, "application/pdf");
    assert_eq!(pdf.disposition, DispositionKind::Attachment);
    assert_eq!(pdf.size, 7);
    assert!(pdf.content.is_none());
    assert!(message.root_part.is_none());
}

#[test]
fn test_nested_part_ids() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
        "\r\n",
        "This is a multi-part message in MIME format.\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "plain\r\n",
        "--inner\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>html</p>\r\n",
        "--inner--\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: application/pdf\r\n",
        "Content-Disposition: attachment; filename=\"a.pdf\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "JVBERg==\r\n",
        "--outer--\r\n",
        "epilogue\r\n",
    );

    let options = DecodeOptions::new().preserve_structure(true);
    let message = decode(raw.as_bytes(), &options).unwrap();
    assert_eq!(message.text_body, "plain");
    assert_eq!(message.html_body, "<p>html</p>");

    let root = message.root_part.as_ref().unwrap();
    assert_eq!(root.part_id, "");
    let ids: Vec<&str> = root.children.iter().map(|c| c.part_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);

    let alternative = root.find("1").unwrap();
    assert!(alternative.content_type.is_alternative());
    let ids: Vec<&str> = alternative.children.iter().map(|c| c.part_id.as_str()).collect();
    assert_eq!(ids, vec!["1.1", "1.2"]);
    assert!(root.find("1.2").unwrap().content_type.is_html());

    let pdf = message.attachment("2").unwrap();
    assert_eq!(pdf.filename, "a.pdf");
    assert_eq!(pdf.transfer_encoding, TransferEncoding::Base64);
    assert_eq!(pdf.size, 4);
}

#[test]
fn test_truncated_multipart_keeps_complete_parts() {
    init_tracing();
    let raw = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n\
--X\r\nContent-Type: text/plain\r\n\r\nfirst\r\n\
--X\r\nContent-Type: text/html\r\n\r\n<p>cut off";

    let message = decode(raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "first");
    assert_eq!(message.html_body, "");

    let err = decode(raw, &strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.part_id(), Some(""));
    assert!(matches!(err, Error::Part { ref source, .. } if matches!(**source, Error::Truncated)));
}

#[test]
fn test_missing_boundary_falls_back_to_simple_message() {
    let raw = b"Subject: no boundary\r\nContent-Type: multipart/mixed\r\n\r\nsome text";

    let message = decode(raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.subject.as_deref(), Some("no boundary"));
    assert_eq!(message.text_body, "some text");

    let err = decode(raw, &strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_missing_boundary_in_child_degrades_only_that_branch() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
        "--a\r\n",
        "Content-Type: multipart/alternative\r\n\r\n",
        "inner text\r\n",
        "--a\r\n",
        "Content-Type: image/gif\r\n\r\n",
        "GIF89a\r\n",
        "--a--\r\n",
    );
    let message = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "inner text");
    assert_eq!(message.attachments.len(), 1);
    assert_eq!(message.attachments[0].filename, "part-2");
}

#[test]
fn test_depth_limit_skips_branch() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=a\r\n\r\n",
        "--a\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "outer text\r\n",
        "--a\r\n",
        "Content-Type: multipart/mixed; boundary=b\r\n\r\n",
        "--b\r\n",
        "Content-Type: multipart/mixed; boundary=c\r\n\r\n",
        "--c\r\n",
        "Content-Type: text/html\r\n\r\n",
        "<p>too deep</p>\r\n",
        "--c--\r\n",
        "--b--\r\n",
        "--a--\r\n",
    );

    let options = DecodeOptions::new().max_depth(2).preserve_structure(true);
    let message = decode(raw.as_bytes(), &options).unwrap();
    assert_eq!(message.text_body, "outer text");
    assert_eq!(message.html_body, "");
    let root = message.root_part.unwrap();
    assert!(root.find("2").unwrap().children.is_empty());
    assert!(root.find("2.1").is_none());

    let unlimited = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();
    assert_eq!(unlimited.html_body, "<p>too deep</p>");

    let err = decode(raw.as_bytes(), &strict().max_depth(2)).unwrap_err();
    assert_eq!(err.part_id(), Some("2.1"));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_gbk_body_without_charset() {
    let mut raw = b"Content-Type: text/plain\r\n\r\n".to_vec();
    raw.extend_from_slice(GBK_HELLO_WORLD);
    let message = decode(&raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "你好世界");
}

#[test]
fn test_gbk_subject_without_charset() {
    let mut raw = b"Subject: ".to_vec();
    raw.extend_from_slice(GBK_HELLO_WORLD);
    raw.extend_from_slice(b"\r\n\r\nbody");
    let message = decode(&raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.subject.as_deref(), Some("你好世界"));
    assert_eq!(message.text_body, "body");
}

#[test]
fn test_wrong_charset_declaration_recovers() {
    let mut raw = b"Content-Type: text/plain; charset=utf-8\r\n\r\n".to_vec();
    raw.extend_from_slice(GBK_HELLO_WORLD);

    let message = decode(&raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "你好世界");

    let err = decode(&raw, &strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(err.part_id(), Some(""));
}

#[test]
fn test_wrong_transfer_encoding_recovers() {
    let raw = b"Content-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\nplain words here!";

    let message = decode(raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "plain words here!");

    let err = decode(raw, &strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
}

#[test]
fn test_quoted_printable_latin1_body() {
    let raw = b"Content-Type: text/plain; charset=ISO-8859-1\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\n\
Caf=E9 cr=E8me, long line that is soft=\r\n broken.";
    let message = decode(raw, &strict()).unwrap();
    assert_eq!(message.text_body, "Café crème, long line that is soft broken.");
}

#[test]
fn test_inline_image_by_content_id() {
    let raw = concat!(
        "Content-Type: multipart/related; boundary=rel\r\n\r\n",
        "--rel\r\n",
        "Content-Type: text/html; charset=utf-8\r\n\r\n",
        "<img src=\"cid:logo@example\">\r\n",
        "--rel\r\n",
        "Content-Type: image/png\r\n",
        "Content-Disposition: inline; filename=logo.png\r\n",
        "Content-ID: <logo@example>\r\n",
        "Content-Transfer-Encoding: base64\r\n\r\n",
        "iVBORw0KGgo=\r\n",
        "--rel--\r\n",
    );
    let options = DecodeOptions::new().decode_attachments(true);
    let message = decode(raw.as_bytes(), &options).unwrap();

    assert!(message.attachments.is_empty());
    assert_eq!(message.inline_attachments.len(), 1);
    let logo = message.inline_attachment("cid:logo@example").unwrap();
    assert_eq!(logo.part_id, "2");
    assert_eq!(logo.filename, "logo.png");
    assert_eq!(logo.disposition, DispositionKind::Inline);
    assert_eq!(logo.content.as_deref(), Some(&b"\x89PNG\r\n\x1a\n"[..]));
    assert_eq!(logo.size, 8);
    assert!(message.attachment("2").is_some());
}

#[test]
fn test_binary_attachment_is_preserved() {
    let payload: &[u8] = b"\x00\xff\r\n--\xfe\r\n\r\nend";
    let mut raw = b"Content-Type: multipart/mixed; boundary=zz\r\n\r\n--zz\r\n\
Content-Type: application/octet-stream\r\nContent-Transfer-Encoding: binary\r\n\
Content-Disposition: attachment; filename=blob.bin\r\n\r\n"
        .to_vec();
    raw.extend_from_slice(payload);
    raw.extend_from_slice(b"\r\n--zz--\r\n");

    let options = DecodeOptions::new().decode_attachments(true);
    let message = decode(&raw, &options).unwrap();
    let blob = &message.attachments[0];
    assert_eq!(blob.content.as_deref(), Some(payload));
    assert_eq!(blob.size, payload.len());
}

#[test]
fn test_lf_only_line_endings() {
    let raw = b"Subject: lf\nContent-Type: multipart/alternative; boundary=b\n\n\
--b\nContent-Type: text/plain\n\nhi\n--b\nContent-Type: text/html\n\n<b>hi</b>\n--b--\n";
    let message = decode(raw, &DecodeOptions::default()).unwrap();
    assert_eq!(message.subject.as_deref(), Some("lf"));
    assert_eq!(message.text_body, "hi");
    assert_eq!(message.html_body, "<b>hi</b>");
}

#[test]
fn test_envelope_fields() {
    let raw = concat!(
        "From: \"Alice\" <alice@example.com>\r\n",
        "To: bob@example.com, =?utf-8?B?Q2Fyb2zDqQ==?= <carol@example.com>\r\n",
        "Cc: Team: dave@example.com;\r\n",
        "Reply-To: replies@example.com\r\n",
        "Subject: =?utf-8?B?SMOpbGxv?=\r\n",
        "  =?utf-8?Q?_w=C3=B6rld?=\r\n",
        "Date: Tue, 1 Jul 2003 10:52:37 +0200 (CEST)\r\n",
        "Message-ID: <abc@example.com>\r\n",
        "\r\n",
        "body\r\n",
    );
    let message = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();

    assert_eq!(message.subject.as_deref(), Some("Héllo wörld"));
    assert_eq!(message.from[0].name.as_deref(), Some("Alice"));
    assert_eq!(message.from[0].address, "alice@example.com");
    assert_eq!(message.to.len(), 2);
    assert_eq!(message.to[1].name.as_deref(), Some("Carolé"));
    assert_eq!(message.cc[0].address, "dave@example.com");
    assert_eq!(message.reply_to[0].address, "replies@example.com");
    assert_eq!(
        message.date.unwrap().to_rfc3339(),
        "2003-07-01T10:52:37+02:00"
    );
    assert_eq!(message.message_id.as_deref(), Some("<abc@example.com>"));
    assert_eq!(message.text_body, "body\r\n");
    assert_eq!(message.headers.len(), 7);
}

#[test]
fn test_first_text_part_wins() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=m\r\n\r\n",
        "--m\r\nContent-Type: text/plain\r\n\r\nfirst\r\n",
        "--m\r\nContent-Type: text/plain\r\n\r\nsecond\r\n",
        "--m\r\nContent-Type: text/html\r\n\r\n<p>one</p>\r\n",
        "--m\r\nContent-Type: text/html\r\n\r\n<p>two</p>\r\n",
        "--m--\r\n",
    );
    let message = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "first");
    assert_eq!(message.html_body, "<p>one</p>");
    assert!(message.attachments.is_empty());
}

#[test]
fn test_attached_messages() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=m\r\n\r\n",
        "--m\r\nContent-Type: message/rfc822\r\n\r\nSubject: inner\r\n\r\ninner body\r\n",
        "--m\r\nContent-Type: multipart/digest; boundary=d\r\n\r\n",
        "--d\r\n\r\nSubject: digest entry\r\n\r\nentry body\r\n",
        "--d--\r\n",
        "--m--\r\n",
    );
    let message = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "");

    let names: Vec<(&str, &str, &str)> = message
        .attachments
        .iter()
        .map(|a| (a.part_id.as_str(), a.filename.as_str(), a.content_type.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("1", "message.eml", "message/rfc822"),
            ("2.1", "message.eml", "message/rfc822"),
        ]
    );
}

#[test]
fn test_rfc2231_attachment_name() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=m\r\n\r\n",
        "--m\r\n",
        "Content-Type: application/pdf\r\n",
        "Content-Disposition: attachment;\r\n",
        " filename*0*=utf-8''%E6%8A%A5;\r\n",
        " filename*1*=%E5%91%8A.pdf\r\n\r\n",
        "%PDF\r\n",
        "--m--\r\n",
    );
    let message = decode(raw.as_bytes(), &DecodeOptions::default()).unwrap();
    assert_eq!(message.attachments[0].filename, "报告.pdf");
}

#[test]
fn test_empty_input() {
    let message = decode(b"", &DecodeOptions::default()).unwrap();
    assert_eq!(message.text_body, "");
    assert!(message.headers.is_empty());
    assert!(message.attachments.is_empty());
}
