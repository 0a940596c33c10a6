//! Error types for the cipher primitives.

use thiserror::Error;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Refused to encrypt an empty plaintext.
    #[error("plaintext is empty")]
    EmptyPlaintext,

    /// The blob does not have the `iv:tag:ciphertext` shape.
    #[error("malformed blob: {reason}")]
    MalformedBlob {
        /// Why the blob was rejected.
        reason: String,
    },

    /// A blob field is not valid hex.
    #[error("invalid hex in {field}: {source}")]
    InvalidHex {
        /// Which field failed to decode.
        field: &'static str,
        /// The underlying decode error.
        source: hex::FromHexError,
    },

    /// Tag verification failed: wrong key, corrupted or tampered data.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Key material has the wrong shape.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// The cipher itself reported an error while encrypting.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// The underlying failure.
        reason: String,
    },
}

/// Result type alias for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        let err = CipherError::MalformedBlob {
            reason: "expected 3 fields, got 2".to_string(),
        };
        assert_eq!(err.to_string(), "malformed blob: expected 3 fields, got 2");

        assert_eq!(CipherError::EmptyPlaintext.to_string(), "plaintext is empty");
        assert_eq!(
            CipherError::AuthenticationFailed.to_string(),
            "authentication failed"
        );
    }

    #[test]
    fn invalid_hex_names_the_field() {
        let source = hex::decode("zz").expect_err("not hex");
        let err = CipherError::InvalidHex { field: "iv", source };
        assert!(err.to_string().starts_with("invalid hex in iv"));
    }
}
