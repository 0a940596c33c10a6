//! The secure vault service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aegis_cipher::{CipherService, MasterKey};
use aegis_persist::fs::{ensure_private_dir, mode_of, write_atomic};
use aegis_persist::{EncryptedJsonFile, PRIVATE_DIR_MODE, PRIVATE_FILE_MODE, PersistError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::audit::{AuditAction, AuditLog};
use crate::config::{CorruptionPolicy, VaultConfig};
use crate::error::{VaultError, VaultResult};
use crate::types::{
    AccessAction, AccessRecord, DOCUMENT_VERSION, EntryDetails, EntrySummary, HealthReport,
    Requester, VaultDocument, VaultEntry,
};

type Entries = BTreeMap<String, VaultEntry>;

/// Borrowed form of [`VaultDocument`] used when saving.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    version: &'static str,
    last_updated: DateTime<Utc>,
    entries: &'a Entries,
}

/// Encrypted secret storage with per-entry access logs and an audit trail.
///
/// The entry map is loaded lazily on first use. Every mutation rewrites the
/// whole vault as one encrypted blob and is then audited; the map lock is
/// held throughout, so operations are applied one at a time.
pub struct SecureVault {
    config: VaultConfig,
    file: EncryptedJsonFile,
    audit: AuditLog,
    entries: Mutex<Option<Entries>>,
}

impl SecureVault {
    /// Create a vault handle. Nothing is read until first use.
    #[must_use]
    pub fn new(config: VaultConfig, cipher: Arc<CipherService>) -> Self {
        let file = EncryptedJsonFile::new(config.vault_path(), cipher);
        let audit = AuditLog::new(config.audit_path());
        Self {
            config,
            file,
            audit,
            entries: Mutex::new(None),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The audit log.
    #[must_use]
    pub const fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Load the vault now instead of on first use.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Corrupt`] if the vault file is unreadable and
    /// the policy is [`CorruptionPolicy::Fail`], or an I/O error.
    pub async fn init(&self) -> VaultResult<()> {
        self.loaded().await.map(drop)
    }

    async fn loaded(&self) -> VaultResult<MappedMutexGuard<'_, Entries>> {
        let mut slot = self.entries.lock().await;
        if slot.is_none() {
            *slot = Some(self.load().await?);
        }
        Ok(MutexGuard::map(slot, |slot| slot.get_or_insert_with(Entries::new)))
    }

    async fn load(&self) -> VaultResult<Entries> {
        ensure_private_dir(self.config.dir()).await?;

        match self.file.load::<VaultDocument>().await {
            Ok(Some(doc)) => {
                if doc.version != DOCUMENT_VERSION {
                    warn!(version = %doc.version, "unexpected vault document version");
                }
                info!(entries = doc.entries.len(), "vault loaded");
                Ok(doc.entries)
            }
            Ok(None) => {
                info!(path = %self.file.path().display(), "no vault file, starting empty");
                Ok(Entries::new())
            }
            Err(e) if e.is_corrupt() => self.handle_corruption(e).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_corruption(&self, err: PersistError) -> VaultResult<Entries> {
        let path = self.file.path().to_path_buf();
        match self.config.on_corruption {
            CorruptionPolicy::Fail => {
                error!(path = %path.display(), error = %err, "vault file is unreadable, refusing to open");
                Err(VaultError::Corrupt {
                    path,
                    reason: err.to_string(),
                })
            }
            CorruptionPolicy::Quarantine => {
                let target = quarantine_path(&path, Utc::now());
                tokio::fs::rename(&path, &target)
                    .await
                    .map_err(|e| VaultError::io(&path, e))?;
                warn!(
                    path = %path.display(),
                    moved_to = %target.display(),
                    error = %err,
                    "vault file is unreadable, quarantined and starting empty"
                );
                self.audit
                    .record(
                        AuditAction::Quarantine,
                        json!({ "movedTo": target.display().to_string(), "reason": err.to_string() }),
                    )
                    .await?;
                Ok(Entries::new())
            }
        }
    }

    async fn save(&self, entries: &Entries) -> VaultResult<()> {
        let doc = DocumentRef {
            version: DOCUMENT_VERSION,
            last_updated: Utc::now(),
            entries,
        };
        self.file.save(&doc).await?;
        Ok(())
    }

    /// Persist, putting `previous` back under `id` if the write fails so the
    /// in-memory map never runs ahead of disk.
    async fn commit(&self, entries: &mut Entries, id: &str, previous: Option<VaultEntry>) -> VaultResult<()> {
        if let Err(e) = self.save(entries).await {
            match previous {
                Some(entry) => entries.insert(id.to_string(), entry),
                None => entries.remove(id),
            };
            return Err(e);
        }
        Ok(())
    }

    // ==================== Entry Operations ====================

    /// Store `data` under `id`, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty id, or if persisting or auditing fails.
    pub async fn store(
        &self,
        id: &str,
        kind: &str,
        data: Value,
        requester: &Requester,
        metadata: Option<Map<String, Value>>,
    ) -> VaultResult<()> {
        if id.is_empty() {
            return Err(VaultError::InvalidInput {
                reason: "entry id must not be empty".into(),
            });
        }

        let mut entries = self.loaded().await?;
        let now = Utc::now();

        let mut entry = VaultEntry::new(id, kind, data, metadata, now);
        entry.log_access(
            AccessRecord::new(AccessAction::Create, requester, now),
            self.config.max_access_log,
        );
        let previous = entries.insert(id.to_string(), entry);
        let replaced = previous.is_some();
        self.commit(&mut entries, id, previous).await?;

        debug!(id, kind, replaced, "entry stored");
        self.audit
            .record(
                AuditAction::Store,
                json!({ "id": id, "type": kind, "userId": requester.user_id, "replaced": replaced }),
            )
            .await
    }

    /// Read the payload stored under `id`.
    ///
    /// A hit is recorded in the entry's access log and persisted. A miss is
    /// audited and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be loaded or persisting fails.
    pub async fn retrieve(&self, id: &str, requester: &Requester) -> VaultResult<Option<Value>> {
        let mut entries = self.loaded().await?;

        let Some(entry) = entries.get_mut(id) else {
            self.audit
                .record(AuditAction::RetrieveFail, json!({ "id": id, "userId": requester.user_id }))
                .await?;
            return Ok(None);
        };

        let previous = entry.clone();
        entry.log_access(
            AccessRecord::new(AccessAction::Retrieve, requester, Utc::now()),
            self.config.max_access_log,
        );
        let data = entry.data.clone();
        self.commit(&mut entries, id, Some(previous)).await?;

        self.audit
            .record(AuditAction::Retrieve, json!({ "id": id, "userId": requester.user_id }))
            .await?;
        Ok(Some(data))
    }

    /// Replace the payload of an existing entry. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if `id` is absent, or an error if
    /// persisting or auditing fails.
    pub async fn update(&self, id: &str, data: Value, requester: &Requester) -> VaultResult<u64> {
        let mut entries = self.loaded().await?;

        let Some(entry) = entries.get_mut(id) else {
            self.audit
                .record(AuditAction::UpdateFail, json!({ "id": id, "userId": requester.user_id }))
                .await?;
            return Err(VaultError::NotFound { id: id.to_string() });
        };

        let previous = entry.clone();
        let now = Utc::now();
        entry.replace_data(data, now);
        entry.log_access(
            AccessRecord::new(AccessAction::Update, requester, now),
            self.config.max_access_log,
        );
        let version = entry.metadata.version;
        self.commit(&mut entries, id, Some(previous)).await?;

        debug!(id, version, "entry updated");
        self.audit
            .record(
                AuditAction::Update,
                json!({ "id": id, "userId": requester.user_id, "version": version }),
            )
            .await?;
        Ok(version)
    }

    /// Remove `id`. Returns false if it was not present.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting or auditing fails.
    pub async fn delete(&self, id: &str, requester: &Requester) -> VaultResult<bool> {
        let mut entries = self.loaded().await?;

        let Some(removed) = entries.remove(id) else {
            self.audit
                .record(AuditAction::DeleteFail, json!({ "id": id, "userId": requester.user_id }))
                .await?;
            return Ok(false);
        };

        self.commit(&mut entries, id, Some(removed)).await?;
        debug!(id, "entry deleted");
        self.audit
            .record(AuditAction::Delete, json!({ "id": id, "userId": requester.user_id }))
            .await?;
        Ok(true)
    }

    /// Summaries of every entry, ordered by id. Payloads are never included.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be loaded or auditing fails.
    pub async fn list(&self, requester: &Requester) -> VaultResult<Vec<EntrySummary>> {
        let entries = self.loaded().await?;
        let summaries: Vec<_> = entries.values().map(VaultEntry::summary).collect();
        self.audit
            .record(
                AuditAction::List,
                json!({ "userId": requester.user_id, "count": summaries.len() }),
            )
            .await?;
        Ok(summaries)
    }

    /// Metadata and access log of `id`, without the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be loaded or auditing fails.
    pub async fn get_metadata(&self, id: &str, requester: &Requester) -> VaultResult<Option<EntryDetails>> {
        let entries = self.loaded().await?;
        let details = entries.get(id).map(VaultEntry::details);
        self.audit
            .record(
                AuditAction::Metadata,
                json!({ "id": id, "userId": requester.user_id, "found": details.is_some() }),
            )
            .await?;
        Ok(details)
    }

    // ==================== Maintenance ====================

    /// Copy the encrypted vault file to `dest`.
    ///
    /// The copy stays encrypted under the current master key.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be loaded or the copy fails.
    pub async fn backup(&self, dest: &Path) -> VaultResult<()> {
        let entries = self.loaded().await?;

        let vault_path = self.file.path();
        let exists = tokio::fs::try_exists(vault_path)
            .await
            .map_err(|e| VaultError::io(vault_path, e))?;
        if !exists {
            // an empty vault has never been written
            self.save(&entries).await?;
        }

        let bytes = tokio::fs::read(vault_path)
            .await
            .map_err(|e| VaultError::io(vault_path, e))?;
        write_atomic(dest, &bytes).await?;

        info!(dest = %dest.display(), entries = entries.len(), "vault backed up");
        self.audit
            .record(
                AuditAction::Backup,
                json!({ "dest": dest.display().to_string(), "entries": entries.len() }),
            )
            .await
    }

    /// Replace the vault with the backup at `src` and reload it.
    ///
    /// The backup must decrypt under the current key. The file it replaces
    /// is kept as `<vault>.bak`. Works on a vault that failed to open.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidBackup`] if `src` is missing or
    /// unreadable, or an I/O error.
    pub async fn restore(&self, src: &Path) -> VaultResult<()> {
        let doc = match self.file.at(src).load::<VaultDocument>().await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(invalid_backup(src, "file does not exist")),
            Err(e) => return Err(invalid_backup(src, e.to_string())),
        };

        let mut slot = self.entries.lock().await;
        ensure_private_dir(self.config.dir()).await?;

        let vault_path = self.file.path();
        let backup_path = self.config.backup_path();
        match tokio::fs::read(vault_path).await {
            Ok(current) => write_atomic(&backup_path, &current).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(VaultError::io(vault_path, e)),
        }

        let bytes = tokio::fs::read(src)
            .await
            .map_err(|e| VaultError::io(src, e))?;
        write_atomic(vault_path, &bytes).await?;

        let count = doc.entries.len();
        *slot = Some(doc.entries);
        drop(slot);

        info!(src = %src.display(), entries = count, "vault restored");
        self.audit
            .record(
                AuditAction::Restore,
                json!({
                    "src": src.display().to_string(),
                    "previous": backup_path.display().to_string(),
                    "entries": count,
                }),
            )
            .await
    }

    /// Check directory and file permissions and that the vault loads.
    ///
    /// Problems are reported, never fixed.
    pub async fn health_check(&self) -> HealthReport {
        let mut issues = Vec::new();

        check_mode(self.config.dir(), PRIVATE_DIR_MODE, "vault directory", &mut issues).await;
        check_mode(self.file.path(), PRIVATE_FILE_MODE, "vault file", &mut issues).await;
        check_mode(self.audit.path(), PRIVATE_FILE_MODE, "audit log", &mut issues).await;

        let entries = match self.loaded().await {
            Ok(entries) => Some(entries.len()),
            Err(e) => {
                issues.push(format!("vault cannot be loaded: {e}"));
                None
            }
        };

        let healthy = issues.is_empty();
        if !healthy {
            warn!(issues = issues.len(), "vault health check found problems");
        }
        HealthReport {
            healthy,
            issues,
            entries,
            checked_at: Utc::now(),
        }
    }

    /// Re-encrypt the vault under a new key. Not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`VaultError::NotImplemented`].
    pub async fn rotate_keys(&self, _new_key: MasterKey) -> VaultResult<()> {
        Err(VaultError::NotImplemented {
            feature: "key rotation",
        })
    }
}

impl std::fmt::Debug for SecureVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureVault")
            .field("dir", &self.config.dir)
            .field("on_corruption", &self.config.on_corruption)
            .finish_non_exhaustive()
    }
}

fn invalid_backup(path: &Path, reason: impl Into<String>) -> VaultError {
    VaultError::InvalidBackup {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn quarantine_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "vault".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.corrupt-{}", now.format("%Y%m%dT%H%M%S%.3fZ")))
}

async fn check_mode(path: &Path, expected: u32, what: &str, issues: &mut Vec<String>) {
    match mode_of(path).await {
        Ok(Some(mode)) if mode != expected => issues.push(format!(
            "{what} {} has mode {mode:o}, expected {expected:o}",
            path.display()
        )),
        Ok(_) => {}
        Err(e) => issues.push(format!("cannot stat {what} {}: {e}", path.display())),
    }
}
