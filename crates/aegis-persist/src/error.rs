//! Error types for on-disk persistence.

use std::path::PathBuf;

use aegis_cipher::CipherError;
use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file exists but could not be decrypted or parsed.
    #[error("corrupt state file {}: {reason}", .path.display())]
    Corrupt {
        /// The offending file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The value could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The serialized value could not be encrypted.
    #[error("encryption error: {0}")]
    Encryption(#[from] CipherError),
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error means the file content is unreadable.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result type alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
