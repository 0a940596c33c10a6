//! CLI error types.

use aegis_guard::GuardError;
use aegis_vault::VaultError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Vault operation failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Abuse-state operation failed.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
