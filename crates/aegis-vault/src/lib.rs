//! # aegis-vault
//!
//! Encrypted secret storage for the Aegis security core.
//!
//! ## Features
//!
//! - **Encrypted at rest**: the whole entry map is one AES-256-GCM blob,
//!   rewritten atomically on every change
//! - **Access logs**: each entry keeps its most recent accesses
//! - **Audit trail**: every operation is appended to a JSON-lines log
//! - **Private files**: directory `0700`, files `0600`, checked by
//!   [`SecureVault::health_check`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aegis_cipher::CipherService;
//! use aegis_vault::{Requester, SecureVault, VaultConfig};
//! use serde_json::json;
//!
//! # async fn example() -> aegis_vault::VaultResult<()> {
//! let cipher = Arc::new(CipherService::from_passphrase("master passphrase"));
//! let vault = SecureVault::new(VaultConfig::new("/var/lib/aegis"), cipher);
//! let alice = Requester::new("alice");
//!
//! vault.store("openai", "api_key", json!({ "key": "sk-..." }), &alice, None).await?;
//! let secret = vault.retrieve("openai", &alice).await?;
//! assert!(secret.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod error;
pub mod types;
pub mod vault;

pub use audit::{AuditAction, AuditLog, AuditLogEntry};
pub use config::{CorruptionPolicy, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use types::{
    AccessAction, AccessRecord, EntryDetails, EntryMetadata, EntrySummary, HealthReport,
    Requester, VaultDocument, VaultEntry,
};
pub use vault::SecureVault;
