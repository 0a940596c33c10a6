//! Services built from global CLI options.

use std::path::PathBuf;
use std::sync::Arc;

use aegis_cipher::CipherService;
use aegis_guard::{GuardConfig, RateLimiter};
use aegis_vault::{AuditLog, CorruptionPolicy, Requester, SecureVault, VaultConfig};
use tracing::debug;

use crate::cli::Cli;
use crate::error::CliError;

/// File name of the encrypted abuse state inside the data directory.
pub const ABUSE_STATE_FILE: &str = "abuse_state.enc";

/// Everything a command needs to open the core services.
#[derive(Debug, Clone)]
pub struct Context {
    dir: PathBuf,
    passphrase: Option<String>,
    requester: Requester,
    on_corruption: CorruptionPolicy,
}

impl Context {
    /// Build a context from parsed arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            dir: cli.dir.clone(),
            passphrase: cli.passphrase.clone(),
            requester: Requester::new(&cli.user),
            on_corruption: cli.on_corruption.into(),
        }
    }

    /// The acting user.
    #[must_use]
    pub const fn requester(&self) -> &Requester {
        &self.requester
    }

    fn cipher(&self) -> Result<Arc<CipherService>, CliError> {
        match self.passphrase.as_deref() {
            Some(p) if !p.is_empty() => Ok(Arc::new(CipherService::from_passphrase(p))),
            _ => Err(CliError::Config(
                "no master passphrase; set AEGIS_MASTER_KEY or pass --passphrase".into(),
            )),
        }
    }

    fn vault_config(&self) -> VaultConfig {
        VaultConfig::new(&self.dir).with_corruption_policy(self.on_corruption)
    }

    /// Open the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if no passphrase is configured.
    pub fn vault(&self) -> Result<SecureVault, CliError> {
        let cipher = self.cipher()?;
        debug!(
            dir = %self.dir.display(),
            on_corruption = ?self.on_corruption,
            user = %self.requester.user_id,
            "opening vault"
        );
        Ok(SecureVault::new(self.vault_config(), cipher))
    }

    /// The audit log. Needs no key.
    #[must_use]
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.vault_config().audit_path())
    }

    /// Open the rate limiter over the persisted abuse state.
    ///
    /// # Errors
    ///
    /// Returns an error if no passphrase is configured or the guard
    /// configuration is invalid.
    pub async fn limiter(&self) -> Result<RateLimiter, CliError> {
        let cipher = self.cipher()?;
        let state_path = self.dir.join(ABUSE_STATE_FILE);
        debug!(path = %state_path.display(), "opening abuse state");
        let config = GuardConfig::builder().state_path(state_path).build();
        Ok(RateLimiter::open(config, cipher).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_passphrase_is_a_config_error() {
        let cli = Cli::parse_from(["aegis", "--dir", "/tmp/x", "vault", "list"]);
        let mut ctx = Context::from_cli(&cli);
        ctx.passphrase = None;
        assert!(matches!(ctx.vault(), Err(CliError::Config(_))));
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        let cli = Cli::parse_from(["aegis", "--passphrase", "", "vault", "list"]);
        let ctx = Context::from_cli(&cli);
        assert!(ctx.vault().is_err());
    }

    #[tokio::test]
    async fn limiter_opens_with_default_guard_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["aegis", "--dir", dir_arg.as_str(), "--passphrase", "p", "guard", "status", "k"]);
        let limiter = Context::from_cli(&cli).limiter().await.expect("limiter");
        assert_eq!(limiter.tracker().tracked_keys(), 0);
    }

    #[test]
    fn audit_log_lives_in_data_dir() {
        let cli = Cli::parse_from(["aegis", "--dir", "/srv/aegis", "audit", "tail"]);
        let ctx = Context::from_cli(&cli);
        assert_eq!(ctx.audit_log().path(), std::path::Path::new("/srv/aegis/audit.log"));
        assert_eq!(ctx.requester().user_id, "cli");
    }
}
