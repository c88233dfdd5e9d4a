//! Mechanism selection and credential dispatch.

use crate::error::{Error, Result};
use crate::sasl::{oauthbearer_response, plain_response, xoauth2_response};
use std::fmt;

/// SASL mechanisms this crate can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
    /// `OAUTHBEARER` - RFC 7628 `OAuth2`
    OAuthBearer,
}

impl Mechanism {
    /// Parses a mechanism name as advertised by a server.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "XOAUTH2" => Some(Self::XOAuth2),
            "OAUTHBEARER" => Some(Self::OAuthBearer),
            _ => None,
        }
    }

    /// Returns the IANA mechanism name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::XOAuth2 => "XOAUTH2",
            Self::OAuthBearer => "OAUTHBEARER",
        }
    }

    /// Returns true for token-based mechanisms.
    #[must_use]
    pub const fn is_oauth(self) -> bool {
        matches!(self, Self::XOAuth2 | Self::OAuthBearer)
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Account credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username and password.
    Password {
        /// Authentication identity.
        username: String,
        /// Password.
        password: String,
    },
    /// `OAuth2` access token.
    OAuth2 {
        /// Account address.
        user: String,
        /// Access token.
        access_token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::OAuth2 { user, .. } => f
                .debug_struct("OAuth2")
                .field("user", user)
                .field("access_token", &"<redacted>")
                .finish(),
        }
    }
}

impl Credentials {
    /// Creates password credentials.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates `OAuth2` credentials.
    #[must_use]
    pub fn oauth2(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::OAuth2 {
            user: user.into(),
            access_token: access_token.into(),
        }
    }

    /// Returns true if these credentials can drive `mechanism`.
    #[must_use]
    pub const fn supports(&self, mechanism: Mechanism) -> bool {
        match self {
            Self::Password { .. } => !mechanism.is_oauth(),
            Self::OAuth2 { .. } => mechanism.is_oauth(),
        }
    }

    /// Picks the best mechanism the server advertises for these credentials.
    ///
    /// Preference: OAUTHBEARER over XOAUTH2, PLAIN over LOGIN.
    #[must_use]
    pub fn select_mechanism<'a>(&self, advertised: impl IntoIterator<Item = &'a str>) -> Option<Mechanism> {
        const PREFERENCE: [Mechanism; 4] = [
            Mechanism::OAuthBearer,
            Mechanism::XOAuth2,
            Mechanism::Plain,
            Mechanism::Login,
        ];
        let offered: Vec<Mechanism> = advertised.into_iter().filter_map(Mechanism::parse).collect();
        PREFERENCE
            .into_iter()
            .find(|m| self.supports(*m) && offered.contains(m))
    }

    /// Base64 initial response for `mechanism`.
    ///
    /// Returns `None` for LOGIN, which has no initial response; use
    /// [`crate::login_responses`] for its two steps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialMismatch`] if the credentials cannot be used
    /// with the mechanism.
    pub fn initial_response(&self, mechanism: Mechanism) -> Result<Option<String>> {
        if !self.supports(mechanism) {
            return Err(Error::CredentialMismatch {
                mechanism: mechanism.name(),
            });
        }
        let response = match (self, mechanism) {
            (Self::Password { username, password }, Mechanism::Plain) => Some(plain_response(username, password)),
            (Self::OAuth2 { user, access_token }, Mechanism::XOAuth2) => Some(xoauth2_response(user, access_token)),
            (Self::OAuth2 { user, access_token }, Mechanism::OAuthBearer) => {
                Some(oauthbearer_response(user, access_token))
            }
            _ => None,
        };
        Ok(response)
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
    fn test_parse_and_name() {
        assert_eq!(Mechanism::parse("plain"), Some(Mechanism::Plain));
        assert_eq!(Mechanism::parse(" XOAUTH2 "), Some(Mechanism::XOAuth2));
        assert_eq!(Mechanism::parse("CRAM-MD5"), None);
        assert_eq!(Mechanism::OAuthBearer.name(), "OAUTHBEARER");
        assert_eq!(Mechanism::Login.to_string(), "LOGIN");
    }

    #[test]
    fn test_select_mechanism() {
        let password = Credentials::password("u", "p");
        let token = Credentials::oauth2("u@example.com", "t");
        let advertised = ["LOGIN", "PLAIN", "XOAUTH2"];

        assert_eq!(password.select_mechanism(advertised), Some(Mechanism::Plain));
        assert_eq!(token.select_mechanism(advertised), Some(Mechanism::XOAuth2));
        assert_eq!(password.select_mechanism(["LOGIN"]), Some(Mechanism::Login));
        assert_eq!(token.select_mechanism(["PLAIN"]), None);
    }

    #[test]
    fn test_initial_response() {
        let password = Credentials::password("test", "pass");
        assert_eq!(
            password.initial_response(Mechanism::Plain).unwrap().as_deref(),
            Some("AHRlc3QAcGFzcw==")
        );
        assert_eq!(password.initial_response(Mechanism::Login).unwrap(), None);
        assert!(matches!(
            password.initial_response(Mechanism::XOAuth2),
            Err(Error::CredentialMismatch { mechanism: "XOAUTH2" })
        ));

        let token = Credentials::oauth2("test@test.com", "abc");
        assert_eq!(
            token.initial_response(Mechanism::XOAuth2).unwrap(),
            Some(xoauth2_response("test@test.com", "abc"))
        );
        assert!(token.initial_response(Mechanism::Plain).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", Credentials::password("alice", "hunter2"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
