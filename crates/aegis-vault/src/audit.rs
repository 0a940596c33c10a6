//! Append-only audit trail of vault operations.
//!
//! Each event is one JSON line appended with a single write. A crash can
//! leave a partial final line; readers skip anything that does not parse.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use aegis_persist::fs::append_line;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{VaultError, VaultResult};

/// Kind of audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Entry stored.
    Store,
    /// Entry read.
    Retrieve,
    /// Read of a missing entry.
    RetrieveFail,
    /// Entry updated.
    Update,
    /// Update of a missing entry.
    UpdateFail,
    /// Entry deleted.
    Delete,
    /// Delete of a missing entry.
    DeleteFail,
    /// Entries listed.
    List,
    /// Entry metadata read.
    Metadata,
    /// Vault file copied out.
    Backup,
    /// Vault file replaced from a backup.
    Restore,
    /// Unreadable vault file moved aside.
    Quarantine,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Store => "store",
            Self::Retrieve => "retrieve",
            Self::RetrieveFail => "retrieve_fail",
            Self::Update => "update",
            Self::UpdateFail => "update_fail",
            Self::Delete => "delete",
            Self::DeleteFail => "delete_fail",
            Self::List => "list",
            Self::Metadata => "metadata",
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Quarantine => "quarantine",
        };
        f.write_str(s)
    }
}

/// One line of the audit log. Never carries secret payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Event specific fields such as `id` and `userId`.
    pub details: Value,
}

/// Handle to the audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// A log at `path`. Nothing is touched until the first record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be encoded or appended.
    pub async fn record(&self, action: AuditAction, details: Value) -> VaultResult<()> {
        let entry = AuditLogEntry {
            timestamp: Utc::now(),
            action,
            details,
        };
        let line = serde_json::to_string(&entry)?;
        append_line(&self.path, &line).await?;
        info!(target: "aegis_vault::audit", %action, details = %entry.details, "audit");
        Ok(())
    }

    /// Every readable event, oldest first.
    ///
    /// A missing file is an empty log. Lines that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn read_all(&self) -> VaultResult<Vec<AuditLogEntry>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io(&self.path, e)),
        };

        let mut skipped = 0usize;
        let entries: Vec<AuditLogEntry> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                serde_json::from_str(line)
                    .inspect_err(|_| skipped += 1)
                    .ok()
            })
            .collect();

        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "skipped unreadable audit lines");
        }
        Ok(entries)
    }

    /// The last `n` events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn tail(&self, n: usize) -> VaultResult<Vec<AuditLogEntry>> {
        let mut entries = self.read_all().await?;
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
        Ok(entries)
    }
}
