//! Error types for SASL encoding.

use std::string::FromUtf8Error;

/// Result type alias for SASL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SASL error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Server challenge is not valid Base64.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded challenge is not valid UTF-8.
    #[error("Challenge is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Decoded challenge is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credentials cannot be used with the mechanism.
    #[error("{mechanism} cannot be used with these credentials")]
    CredentialMismatch {
        /// IANA mechanism name.
        mechanism: &'static str,
    },
}
