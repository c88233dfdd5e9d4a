//! Encode-then-decode tests for outgoing messages.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use mailcodec_mime::{
    ContentType, DecodeOptions, DispositionKind, Mailbox, OutgoingAttachment, OutgoingMessage, Priority, decode,
    encode,
};
use std::io::Cursor;

fn preserve() -> DecodeOptions {
    DecodeOptions::new().preserve_structure(true).decode_attachments(true)
}

#[test]
fn test_ascii_round_trip() {
    let text = "Hello Bob,\r\n\r\nThis line is long enough that quoted-printable has to insert a soft line break somewhere in the middle of it.\r\nTrailing space \r\n-- \r\nAlice\r\n";
    let html = "<html><body><p>Hello Bob,</p><p>An equals sign = and a tab\there.</p></body></html>";

    let message = OutgoingMessage::builder()
        .from(Mailbox::with_name("Alice", "alice@example.com"))
        .to(Mailbox::new("bob@example.com"))
        .subject("Quarterly numbers")
        .text_body(text)
        .html_body(html)
        .build();

    let bytes = encode(message).unwrap();
    let parsed = decode(&bytes, &DecodeOptions::default()).unwrap();

    assert_eq!(parsed.subject.as_deref(), Some("Quarterly numbers"));
    assert_eq!(parsed.text_body, text);
    assert_eq!(parsed.html_body, html);
    assert_eq!(parsed.from, vec![Mailbox::with_name("Alice", "alice@example.com")]);
    assert_eq!(parsed.to, vec![Mailbox::new("bob@example.com")]);
    assert!(parsed.attachments.is_empty());
}

#[test]
fn test_single_text_part_round_trip() {
    let message = OutgoingMessage::builder()
        .from(Mailbox::new("a@example.com"))
        .text_body("just text")
        .build();
    let bytes = encode(message).unwrap();
    let parsed = decode(&bytes, &preserve()).unwrap();

    assert_eq!(parsed.text_body, "just text");
    let root = parsed.root_part.unwrap();
    assert!(root.is_leaf());
    assert!(root.content_type.is_plain_text());
    assert_eq!(root.content_type.charset(), Some("utf-8"));
}

#[test]
fn test_non_ascii_headers_round_trip() {
    let subject = "Grüße aus Köln, with a subject long enough to need more than one encoded word to carry it";
    let message = OutgoingMessage::builder()
        .from(Mailbox::with_name("José Ñúñez", "jose@example.com"))
        .to(Mailbox::with_name("Zoë", "zoe@example.com"))
        .subject(subject)
        .text_body("Hallo, schöne Grüße!")
        .build();

    let bytes = encode(message).unwrap();
    assert!(bytes.is_ascii());

    let parsed = decode(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(parsed.subject.as_deref(), Some(subject));
    assert_eq!(parsed.from[0].name.as_deref(), Some("José Ñúñez"));
    assert_eq!(parsed.to[0].name.as_deref(), Some("Zoë"));
    assert_eq!(parsed.text_body, "Hallo, schöne Grüße!");
}

#[test]
fn test_mixed_with_alternative_part_ids_and_boundaries() {
    let pdf = b"%PDF-1.7\n\x00\x01\x02binary\xff".to_vec();
    let message = OutgoingMessage::builder()
        .from(Mailbox::new("a@example.com"))
        .text_body("plain")
        .html_body("<p>html</p>")
        .attach(OutgoingAttachment::from_bytes(
            "a.pdf",
            ContentType::new("application", "pdf"),
            pdf.clone(),
        ))
        .build();

    let bytes = encode(message).unwrap();
    let parsed = decode(&bytes, &preserve()).unwrap();
    let root = parsed.root_part.as_ref().unwrap();

    let mut ids = Vec::new();
    for child in &root.children {
        ids.push(child.part_id.clone());
        ids.extend(child.children.iter().map(|c| c.part_id.clone()));
    }
    assert_eq!(ids, vec!["1", "1.1", "1.2", "2"]);

    let outer = root.content_type.boundary().unwrap();
    let inner = root.find("1").unwrap().content_type.boundary().unwrap();
    assert_ne!(outer, inner);
    assert!(root.content_type.is_mixed());

    assert_eq!(parsed.text_body, "plain");
    assert_eq!(parsed.html_body, "<p>html</p>");
    let attachment = parsed.attachment("2").unwrap();
    assert_eq!(attachment.filename, "a.pdf");
    assert_eq!(attachment.content.as_deref(), Some(pdf.as_slice()));
}

#[test]
fn test_attachments_round_trip() {
    let logo = vec![0x89, b'P', b'N', b'G', 0, 0, 0, 13];
    let large: Vec<u8> = (0..20_000_u32).map(|i| u8::try_from(i % 256).unwrap()).collect();

    let message = OutgoingMessage::builder()
        .from(Mailbox::new("a@example.com"))
        .html_body("<img src=\"cid:logo\">")
        .attach(OutgoingAttachment::inline(
            "logo.png",
            ContentType::new("image", "png"),
            "logo",
            Cursor::new(logo.clone()),
        ))
        .attach(OutgoingAttachment::new(
            "résumé.pdf",
            ContentType::new("application", "pdf"),
            Cursor::new(large.clone()),
        ))
        .attach(OutgoingAttachment::from_bytes("empty.txt", ContentType::text_plain(), Vec::new()))
        .build();

    let bytes = encode(message).unwrap();
    let parsed = decode(&bytes, &preserve()).unwrap();

    let inline = parsed.inline_attachment("logo").unwrap();
    assert_eq!(inline.part_id, "2");
    assert_eq!(inline.disposition, DispositionKind::Inline);
    assert_eq!(inline.content.as_deref(), Some(logo.as_slice()));

    let names: Vec<&str> = parsed.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, vec!["résumé.pdf", "empty.txt"]);
    assert_eq!(parsed.attachments[0].content.as_deref(), Some(large.as_slice()));
    assert_eq!(parsed.attachments[0].size, large.len());
    assert_eq!(parsed.attachments[1].size, 0);
}

#[test]
fn test_attachment_without_body() {
    let message = OutgoingMessage::builder()
        .attach(OutgoingAttachment::from_bytes("a.bin", ContentType::octet_stream(), vec![1, 2, 3]))
        .build();
    let parsed = decode(&encode(message).unwrap(), &preserve()).unwrap();
    assert_eq!(parsed.text_body, "");
    assert_eq!(parsed.attachments[0].part_id, "1");
    assert_eq!(parsed.attachments[0].content.as_deref(), Some(&[1_u8, 2, 3][..]));
}

#[test]
fn test_line_lengths() {
    let message = OutgoingMessage::builder()
        .from(Mailbox::with_name("Sender", "sender@example.com"))
        .to(Mailbox::new("one@example.com"))
        .to(Mailbox::new("two@example.com"))
        .to(Mailbox::new("three@example.com"))
        .to(Mailbox::new("four@example.com"))
        .subject("A subject with quite a few words in it so that the header has to be folded")
        .text_body("x".repeat(500))
        .html_body(format!("<p>{}</p>", "y ".repeat(300)))
        .attach(OutgoingAttachment::from_bytes("data.bin", ContentType::octet_stream(), vec![7_u8; 5000]))
        .build();
    let bytes = encode(message).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    for line in text.split("\r\n") {
        assert!(line.len() <= 78, "line exceeds 78 columns: {line:?}");
        assert!(!line.contains('\n'), "bare line feed in {line:?}");
    }
}

#[test]
fn test_envelope_and_headers() {
    let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let message = OutgoingMessage::builder()
        .from(Mailbox::new("a@example.com"))
        .to(Mailbox::new("to@example.com"))
        .cc(Mailbox::new("cc@example.com"))
        .bcc(Mailbox::new("bcc@example.com"))
        .reply_to(Mailbox::new("reply@example.com"))
        .header("X-Campaign", "spring")
        .priority(Priority::Low)
        .date(date)
        .message_id("<id-1@example.com>")
        .text_body("hi")
        .build();

    let recipients: Vec<&str> = message
        .envelope_recipients()
        .into_iter()
        .map(|m| m.address.as_str())
        .collect();
    assert_eq!(recipients, vec!["to@example.com", "cc@example.com", "bcc@example.com"]);

    let bytes = encode(message).unwrap();
    let parsed = decode(&bytes, &DecodeOptions::default()).unwrap();

    assert_eq!(parsed.date.unwrap().with_timezone(&Utc), date);
    assert_eq!(parsed.message_id.as_deref(), Some("<id-1@example.com>"));
    assert_eq!(parsed.cc[0].address, "cc@example.com");
    assert_eq!(parsed.reply_to[0].address, "reply@example.com");
    assert_eq!(parsed.headers.get("x-campaign"), Some("spring"));
    assert_eq!(parsed.headers.get("X-Priority"), Some("4 (Low)"));
    assert_eq!(parsed.headers.get("Importance"), Some("low"));
    assert!(!parsed.headers.contains("bcc"));
    assert!(!String::from_utf8(bytes).unwrap().contains("bcc@example.com"));
}
