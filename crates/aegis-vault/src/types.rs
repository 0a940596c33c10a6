//! Vault entries and the shapes returned to callers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version string written into every vault document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Metadata keys owned by the vault; caller-supplied values are ignored.
const RESERVED_METADATA: [&str; 3] = ["createdAt", "updatedAt", "version"];

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requester {
    /// User identifier recorded in access and audit logs.
    pub user_id: String,
    /// Client address, if known.
    pub ip: Option<String>,
}

impl Requester {
    /// A requester without an address.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ip: None,
        }
    }

    /// Attach a client address.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// The local process acting on its own behalf.
    #[must_use]
    pub fn system() -> Self {
        Self::new("system")
    }
}

/// Kind of per-entry access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    /// Entry written by `store`.
    Create,
    /// Data read by `retrieve`.
    Retrieve,
    /// Data replaced by `update`.
    Update,
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Retrieve => "retrieve",
            Self::Update => "update",
        })
    }
}

/// One access to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// When.
    pub timestamp: DateTime<Utc>,
    /// What.
    pub action: AccessAction,
    /// Who.
    pub user_id: String,
    /// From where.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl AccessRecord {
    /// Record `action` by `requester` at `at`.
    #[must_use]
    pub fn new(action: AccessAction, requester: &Requester, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            action,
            user_id: requester.user_id.clone(),
            ip: requester.ip.clone(),
        }
    }
}

/// Entry bookkeeping plus any caller-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// First `store`.
    pub created_at: DateTime<Utc>,
    /// Last `store` or `update`.
    pub updated_at: DateTime<Utc>,
    /// Starts at 1, +1 per `update`.
    pub version: u64,
    /// Caller-supplied fields, stored alongside the bookkeeping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntryMetadata {
    fn new(extra: Option<Map<String, Value>>, now: DateTime<Utc>) -> Self {
        let mut extra = extra.unwrap_or_default();
        for key in RESERVED_METADATA {
            extra.remove(key);
        }
        Self {
            created_at: now,
            updated_at: now,
            version: 1,
            extra,
        }
    }
}

/// A stored secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    /// Unique id within the vault.
    pub id: String,
    /// Free-form label such as `api_key` or `user`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The secret payload.
    pub data: Value,
    /// Bookkeeping.
    pub metadata: EntryMetadata,
    /// Most recent accesses, oldest first.
    #[serde(default)]
    pub access_log: Vec<AccessRecord>,
}

impl VaultEntry {
    /// A fresh entry at version 1 with an empty access log.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        data: Value,
        metadata: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
            metadata: EntryMetadata::new(metadata, now),
            access_log: Vec::new(),
        }
    }

    /// Append an access record, dropping the oldest beyond `max`.
    pub fn log_access(&mut self, record: AccessRecord, max: usize) {
        self.access_log.push(record);
        if self.access_log.len() > max {
            let excess = self.access_log.len() - max;
            self.access_log.drain(..excess);
        }
    }

    /// Replace the payload and bump the version.
    pub fn replace_data(&mut self, data: Value, now: DateTime<Utc>) {
        self.data = data;
        self.metadata.updated_at = now;
        self.metadata.version += 1;
    }

    /// Timestamp of the latest access.
    #[must_use]
    pub fn last_accessed(&self) -> Option<DateTime<Utc>> {
        self.access_log.last().map(|r| r.timestamp)
    }

    /// Listing view without the payload.
    #[must_use]
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
            version: self.metadata.version,
            last_accessed: self.last_accessed(),
        }
    }

    /// Metadata view without the payload.
    #[must_use]
    pub fn details(&self) -> EntryDetails {
        EntryDetails {
            id: self.id.clone(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            access_log: self.access_log.clone(),
        }
    }
}

/// One row of `list`. Never carries the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    /// Entry id.
    pub id: String,
    /// Entry label.
    #[serde(rename = "type")]
    pub kind: String,
    /// First `store`.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Current version.
    pub version: u64,
    /// Latest access, if any.
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Result of `get_metadata`. Never carries the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetails {
    /// Entry id.
    pub id: String,
    /// Entry label.
    #[serde(rename = "type")]
    pub kind: String,
    /// Bookkeeping and caller fields.
    pub metadata: EntryMetadata,
    /// Recent accesses, oldest first.
    pub access_log: Vec<AccessRecord>,
}

/// Decrypted content of the vault file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDocument {
    /// Format version, currently `"1.0"`.
    pub version: String,
    /// When the document was written.
    pub last_updated: DateTime<Utc>,
    /// Entries keyed by id.
    #[serde(default)]
    pub entries: BTreeMap<String, VaultEntry>,
}

/// Outcome of a permission audit of the vault's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// True when no issues were found.
    pub healthy: bool,
    /// Human readable problems.
    pub issues: Vec<String>,
    /// Entries in the loaded vault, if it could be loaded.
    pub entries: Option<usize>,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    #[test]
    fn entry_serializes_with_wire_names() {
        let mut meta = Map::new();
        meta.insert("owner".into(), json!("ops"));
        let mut entry = VaultEntry::new("k", "api_key", json!({ "x": 1 }), Some(meta), now());
        entry.log_access(
            AccessRecord::new(AccessAction::Create, &Requester::new("alice").with_ip("10.0.0.1"), now()),
            100,
        );

        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["type"], "api_key");
        assert_eq!(value["metadata"]["version"], 1);
        assert_eq!(value["metadata"]["owner"], "ops");
        assert!(value["metadata"]["createdAt"].is_string());
        assert_eq!(value["accessLog"][0]["action"], "create");
        assert_eq!(value["accessLog"][0]["userId"], "alice");
        assert_eq!(value["accessLog"][0]["ip"], "10.0.0.1");

        let parsed: VaultEntry = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, entry);
    }

    #[test]
    fn caller_metadata_cannot_override_bookkeeping() {
        let mut meta = Map::new();
        meta.insert("version".into(), json!(99));
        meta.insert("createdAt".into(), json!("1970-01-01T00:00:00Z"));
        meta.insert("note".into(), json!("kept"));

        let entry = VaultEntry::new("k", "t", json!(null), Some(meta), now());
        assert_eq!(entry.metadata.version, 1);
        assert_eq!(entry.metadata.created_at, now());
        assert_eq!(entry.metadata.extra.len(), 1);
    }

    #[test]
    fn access_log_keeps_most_recent() {
        let mut entry = VaultEntry::new("k", "t", json!(1), None, now());
        for i in 0..10 {
            entry.log_access(
                AccessRecord::new(AccessAction::Retrieve, &Requester::new(format!("u{i}")), now()),
                4,
            );
        }
        let users: Vec<_> = entry.access_log.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, ["u6", "u7", "u8", "u9"]);
    }

    #[test]
    fn summary_has_no_payload() {
        let entry = VaultEntry::new("k", "t", json!({ "password": "hunter2" }), None, now());
        let value = serde_json::to_value(entry.summary()).expect("serialize");
        assert!(value.get("data").is_none());
        assert!(!value.to_string().contains("hunter2"));
        assert!(value["lastAccessed"].is_null());
    }

    #[test]
    fn replace_data_bumps_version() {
        let mut entry = VaultEntry::new("k", "t", json!(1), None, now());
        let later = now() + chrono::TimeDelta::seconds(5);
        entry.replace_data(json!(2), later);
        assert_eq!(entry.metadata.version, 2);
        assert_eq!(entry.metadata.updated_at, later);
        assert_eq!(entry.metadata.created_at, now());
    }
}
