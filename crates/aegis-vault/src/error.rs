//! Error types for the secure vault.

use std::path::PathBuf;

use aegis_persist::PersistError;
use thiserror::Error;

/// Errors that can occur in vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No entry with this id.
    #[error("vault entry not found: {id}")]
    NotFound {
        /// The requested id.
        id: String,
    },

    /// A caller supplied an unusable argument.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong.
        reason: String,
    },

    /// The vault file exists but cannot be read with this key.
    #[error(
        "vault file {} is corrupt: {reason}; restore a backup or open with the quarantine policy",
        .path.display()
    )]
    Corrupt {
        /// The vault file.
        path: PathBuf,
        /// Decrypt or parse failure.
        reason: String,
    },

    /// A backup offered to `restore` is not a readable vault.
    #[error("invalid backup {}: {reason}", .path.display())]
    InvalidBackup {
        /// The rejected file.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Reading or writing persisted state failed.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// An audit record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation is deliberately unsupported.
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// The missing capability.
        feature: &'static str,
    },
}

impl VaultError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for a missing entry.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
