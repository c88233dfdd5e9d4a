//! Email address types.

use crate::content_type::unquote;
use crate::encoding::{decode_rfc2047, encode_rfc2047, needs_encoding};
use std::fmt;

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a new mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Returns the domain part of the address.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }

    /// Parses an address list header value.
    ///
    /// Accepts `"Name" <addr>`, `Name <addr>`, bare `addr`, `addr (Name)`
    /// and groups (`Team: a@x, b@y;`, flattened). Encoded words in display
    /// names are decoded. Entries without an address are dropped.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        split_addresses(value)
            .into_iter()
            .filter_map(|item| Self::parse_one(item))
            .collect()
    }

    fn parse_one(item: &str) -> Option<Self> {
        let item = item.trim().trim_end_matches(';').trim();
        let item = strip_group_name(item);
        if item.is_empty() {
            return None;
        }

        if let Some(open) = find_unquoted(item, '<') {
            let close = item[open..].find('>').map_or(item.len(), |c| open + c);
            let address = item[open + 1..close].trim().to_string();
            let name = display_name(&item[..open]);
            return (!address.is_empty()).then_some(Self { name, address });
        }

        // addr (Comment Name)
        if let Some(open) = find_unquoted(item, '(') {
            let comment = item[open + 1..].trim_end().trim_end_matches(')');
            let address = item[..open].trim().to_string();
            return (!address.is_empty()).then(|| Self {
                name: display_name(comment),
                address,
            });
        }

        Some(Self::new(item))
    }

    /// Formats a list of mailboxes for a header value.
    #[must_use]
    pub fn format_list(mailboxes: &[Self]) -> String {
        mailboxes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mailbox {
    /// Writes `"Name" <addr>`, an encoded-word name for non-ASCII names, or
    /// the bare address when there is no name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            None => f.write_str(&self.address),
            Some(name) if needs_encoding(name) => {
                write!(f, "{} <{}>", encode_rfc2047(name), self.address)
            }
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
        }
    }
}

fn display_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let name = decode_rfc2047(&unquote(raw));
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Splits on commas outside quotes, angle brackets and comments.
fn split_addresses(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth_angle = 0_usize;
    let mut depth_paren = 0_usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth_angle += 1,
            '>' if !in_quotes => depth_angle = depth_angle.saturating_sub(1),
            '(' if !in_quotes => depth_paren += 1,
            ')' if !in_quotes => depth_paren = depth_paren.saturating_sub(1),
            ',' if !in_quotes && depth_angle == 0 && depth_paren == 0 => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);
    items
}

fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// `Group: a@x` -> `a@x`
fn strip_group_name(item: &str) -> &str {
    match (find_unquoted(item, ':'), find_unquoted(item, '<')) {
        (Some(colon), Some(angle)) if colon < angle => item[colon + 1..].trim(),
        (Some(colon), None) if !item[..colon].contains('@') => item[colon + 1..].trim(),
        _ => item,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_new() {
        let mailbox = Mailbox::new("user@example.com");
        assert_eq!(mailbox.address, "user@example.com");
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.domain(), Some("example.com"));
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.to_string(), "\"John Doe\" <john@example.com>");
    }

    #[test]
    fn test_display_encodes_non_ascii_name() {
        let mailbox = Mailbox::with_name("José", "jose@example.com");
        let formatted = mailbox.to_string();
        assert!(formatted.starts_with("=?utf-8?B?"));
        assert!(formatted.ends_with(" <jose@example.com>"));

        let parsed = Mailbox::parse_list(&formatted);
        assert_eq!(parsed, vec![mailbox]);
    }

    #[test]
    fn test_parse_list_forms() {
        let list = Mailbox::parse_list(
            "\"Doe, John\" <john@example.com>, Jane <jane@example.com>, bob@example.com, carol@example.com (Carol C)",
        );
        assert_eq!(
            list,
            vec![
                Mailbox::with_name("Doe, John", "john@example.com"),
                Mailbox::with_name("Jane", "jane@example.com"),
                Mailbox::new("bob@example.com"),
                Mailbox::with_name("Carol C", "carol@example.com"),
            ]
        );
    }

    #[test]
    fn test_parse_list_group() {
        let list = Mailbox::parse_list("Team: a@example.com, B <b@example.com>;, c@example.com");
        let addresses: Vec<&str> = list.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addresses, vec!["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn test_parse_list_skips_empty() {
        assert!(Mailbox::parse_list("undisclosed-recipients:;").is_empty());
        assert!(Mailbox::parse_list("").is_empty());
    }

    #[test]
    fn test_format_list() {
        let list = vec![
            Mailbox::new("a@example.com"),
            Mailbox::with_name("B", "b@example.com"),
        ];
        assert_eq!(
            Mailbox::format_list(&list),
            "a@example.com, \"B\" <b@example.com>"
        );
    }
}
