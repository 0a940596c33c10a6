//! Vault configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default number of access records kept per entry.
pub const DEFAULT_MAX_ACCESS_LOG: usize = 100;

/// What to do when the vault file exists but cannot be decrypted or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Refuse to open. Every operation fails until an operator restores a
    /// backup or switches policy. The file is left untouched.
    #[default]
    Fail,
    /// Move the unreadable file aside as `<vault>.corrupt-<timestamp>`,
    /// record it in the audit log and start empty.
    Quarantine,
}

/// Secure vault settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Directory holding the vault and audit log. Created `0700`.
    pub dir: PathBuf,
    /// Vault file name inside `dir`.
    pub vault_file: String,
    /// Audit log file name inside `dir`.
    pub audit_file: String,
    /// Access records kept per entry; older ones are dropped.
    pub max_access_log: usize,
    /// Behaviour on an unreadable vault file.
    pub on_corruption: CorruptionPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".aegis"),
            vault_file: "vault.enc".to_string(),
            audit_file: "audit.log".to_string(),
            max_access_log: DEFAULT_MAX_ACCESS_LOG,
            on_corruption: CorruptionPolicy::default(),
        }
    }
}

impl VaultConfig {
    /// Default settings rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Set the corruption policy.
    #[must_use]
    pub const fn with_corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.on_corruption = policy;
        self
    }

    /// Set the per-entry access log bound.
    #[must_use]
    pub const fn with_max_access_log(mut self, max: usize) -> Self {
        self.max_access_log = max;
        self
    }

    /// The vault directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the encrypted vault file.
    #[must_use]
    pub fn vault_path(&self) -> PathBuf {
        self.dir.join(&self.vault_file)
    }

    /// Full path of the audit log.
    #[must_use]
    pub fn audit_path(&self) -> PathBuf {
        self.dir.join(&self.audit_file)
    }

    /// Where `restore` keeps the file it replaced.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bak", self.vault_file))
    }
}
