//! Error types for the guard.

use aegis_persist::PersistError;
use thiserror::Error;

/// Errors that can occur in guard operations.
///
/// Admission checks never return these; they surface only from explicit
/// configuration validation and flushes.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Saving or loading abuse state failed.
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = GuardError::Config("burst threshold must be positive".into());
        assert!(err.to_string().contains("burst threshold"));
    }

    #[test]
    fn test_error_from_persist() {
        let err: GuardError = PersistError::Corrupt {
            path: "/tmp/abuse_state.enc".into(),
            reason: "authentication failed".into(),
        }
        .into();
        assert!(err.to_string().starts_with("Persistence error"));
    }
}
