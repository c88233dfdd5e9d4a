//! # mailcodec-sasl
//!
//! Stateless SASL credential encoders for mail transports (IMAP/SMTP).
//!
//! ## Features
//!
//! - **PLAIN** (RFC 4616) and **LOGIN** for password accounts
//! - **XOAUTH2** and **OAUTHBEARER** (RFC 7628) for `OAuth2` accounts
//! - Mechanism selection from a server's advertised list
//! - Decoding of the JSON error challenge sent on `OAuth2` failure
//!
//! Nothing here touches the network; the session layer sends the returned
//! strings.
//!
//! ## Quick Start
//!
//! ```
//! use mailcodec_sasl::{Credentials, Mechanism};
//!
//! let credentials = Credentials::oauth2("user@example.com", "ya29.token");
//! let mechanism = credentials
//!     .select_mechanism(["PLAIN", "LOGIN", "XOAUTH2"])
//!     .unwrap_or(Mechanism::XOAuth2);
//! let response = credentials.initial_response(mechanism)?;
//! assert!(response.is_some());
//! # Ok::<(), mailcodec_sasl::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod mechanism;
pub mod sasl;

pub use error::{Error, Result};
pub use mechanism::{Credentials, Mechanism};
pub use sasl::{
    OAuthError, decode_oauth_error_challenge, login_responses, oauthbearer_message, oauthbearer_response,
    parse_oauth_error, plain_message, plain_response, xoauth2_message, xoauth2_response,
};
