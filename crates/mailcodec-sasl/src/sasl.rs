//! SASL credential encoders.
//!
//! Implements:
//! - PLAIN (RFC 4616) - Basic username/password authentication
//! - LOGIN - Legacy two-step username/password exchange
//! - OAUTHBEARER (RFC 7628) - Standard `OAuth2` authentication
//! - XOAUTH2 (Google/Microsoft proprietary) - Legacy `OAuth2` authentication
//!
//! Each `*_message` function returns the raw bytes; the matching
//! `*_response` function returns them Base64-encoded, ready for an
//! `AUTHENTICATE`/`AUTH` command line.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Raw PLAIN message: `\0<username>\0<password>`.
///
/// The authorization identity is left empty (same as the authentication
/// identity).
#[must_use]
pub fn plain_message(username: &str, password: &str) -> Vec<u8> {
    format!("\0{username}\0{password}").into_bytes()
}

/// Generates PLAIN initial response (RFC 4616).
///
/// # Example
///
/// ```
/// use mailcodec_sasl::plain_response;
///
/// let response = plain_response("test", "pass");
/// assert_eq!(response, "AHRlc3QAcGFzcw==");
/// ```
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    STANDARD.encode(plain_message(username, password))
}

/// Generates the two LOGIN responses: Base64 username, then Base64 password.
///
/// LOGIN has no initial response; the client sends these in answer to the
/// server's `Username:` and `Password:` prompts.
#[must_use]
pub fn login_responses(username: &str, password: &str) -> [String; 2] {
    [STANDARD.encode(username), STANDARD.encode(password)]
}

/// Raw OAUTHBEARER message: `n,a=<user>,\x01auth=Bearer <token>\x01\x01`.
#[must_use]
pub fn oauthbearer_message(user: &str, token: &str) -> Vec<u8> {
    format!("n,a={},\x01auth=Bearer {token}\x01\x01", escape_saslname(user)).into_bytes()
}

/// Generates OAUTHBEARER initial response (RFC 7628).
#[must_use]
pub fn oauthbearer_response(user: &str, token: &str) -> String {
    STANDARD.encode(oauthbearer_message(user, token))
}

/// Raw XOAUTH2 message: `user=<user>\x01auth=Bearer <token>\x01\x01`.
#[must_use]
pub fn xoauth2_message(user: &str, token: &str) -> Vec<u8> {
    format!("user={user}\x01auth=Bearer {token}\x01\x01").into_bytes()
}

/// Generates XOAUTH2 initial response (Google/Microsoft proprietary).
///
/// # Example
///
/// ```
/// use mailcodec_sasl::xoauth2_response;
///
/// let response = xoauth2_response("user@example.com", "ya29.a0...");
/// // Can be used with IMAP AUTHENTICATE XOAUTH2 or SMTP AUTH XOAUTH2
/// # assert!(!response.is_empty());
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    STANDARD.encode(xoauth2_message(user, token))
}

/// GS2 `saslname` escaping: `,` becomes `=2C` and `=` becomes `=3D`.
fn escape_saslname(name: &str) -> String {
    name.replace('=', "=3D").replace(',', "=2C")
}

/// `OAuth2` error response from server.
///
/// Sent as a Base64 JSON challenge when XOAUTH2 or OAUTHBEARER fails, e.g.
/// `{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OAuthError {
    /// HTTP-style status code.
    pub status: String,
    /// Authentication schemes supported.
    #[serde(default)]
    pub schemes: String,
    /// `OAuth2` scope required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Parses an `OAuth2` error response from its JSON text.
///
/// # Errors
///
/// Returns an error if the response is not the expected JSON object.
pub fn parse_oauth_error(response: &str) -> Result<OAuthError> {
    Ok(serde_json::from_str(response)?)
}

/// Decodes the Base64 JSON challenge a server sends on `OAuth2` failure.
///
/// # Errors
///
/// Returns an error if the challenge is not Base64, not UTF-8, or not the
/// expected JSON object.
pub fn decode_oauth_error_challenge(challenge: &str) -> Result<OAuthError> {
    let bytes = STANDARD.decode(challenge.trim())?;
    let json = String::from_utf8(bytes)?;
    parse_oauth_error(&json)
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
    use crate::error::Error;

    #[test]
    fn test_oauthbearer_format() {
        let response = oauthbearer_response("test@test.com", "abc");
        let decoded = STANDARD.decode(&response).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();

        // Exact format per RFC 7628
        assert_eq!(decoded_str, "n,a=test@test.com,\x01auth=Bearer abc\x01\x01");
    }

    #[test]
    fn test_oauthbearer_escapes_user() {
        let message = oauthbearer_message("a,b=c@example.com", "t");
        assert!(message.starts_with(b"n,a=a=2Cb=3Dc@example.com,\x01"));
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        let decoded = STANDARD.decode(&response).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();

        assert_eq!(decoded_str, "user=test@test.com\x01auth=Bearer abc\x01\x01");
    }

    #[test]
    fn test_responses_are_base64() {
        let response = oauthbearer_response("user@example.com", "token");
        assert!(!response.contains("user@example.com"));
        assert!(!response.contains("token"));
        assert!(STANDARD.decode(&response).is_ok());
    }

    #[test]
    fn test_plain_response_format() {
        let decoded = STANDARD.decode(plain_response("test", "pass")).unwrap();
        assert_eq!(decoded, b"\0test\0pass");
    }

    #[test]
    fn test_plain_response_special_chars() {
        let decoded = STANDARD.decode(plain_response("user", "pass@word!")).unwrap();
        assert_eq!(decoded, b"\0user\0pass@word!");
    }

    #[test]
    fn test_login_responses() {
        let [user, pass] = login_responses("user@example.com", "secret");
        assert_eq!(user, "dXNlckBleGFtcGxlLmNvbQ==");
        assert_eq!(pass, "c2VjcmV0");
    }

    #[test]
    fn test_parse_oauth_error() {
        let json = r#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        let error = parse_oauth_error(json).unwrap();

        assert_eq!(error.status, "401");
        assert_eq!(error.schemes, "bearer");
        assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
    }

    #[test]
    fn test_decode_oauth_error_challenge() {
        let json = r#"{"status":"400","schemes":"Bearer"}"#;
        let challenge = STANDARD.encode(json);
        let error = decode_oauth_error_challenge(&challenge).unwrap();
        assert_eq!(error.status, "400");
        assert!(error.scope.is_none());

        assert!(matches!(decode_oauth_error_challenge("***"), Err(Error::Base64(_))));
        let not_json = STANDARD.encode("nope");
        assert!(matches!(decode_oauth_error_challenge(&not_json), Err(Error::Json(_))));
        let not_utf8 = STANDARD.encode([0xFF, 0xFE]);
        assert!(matches!(decode_oauth_error_challenge(&not_utf8), Err(Error::Utf8(_))));
    }
}
