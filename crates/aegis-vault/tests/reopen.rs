//! Vault state and audit trail across process restarts.

use std::sync::Arc;

use aegis_cipher::CipherService;
use aegis_vault::{AuditAction, Requester, SecureVault, VaultConfig, VaultError};
use serde_json::json;

fn open(dir: &tempfile::TempDir, passphrase: &str) -> SecureVault {
    SecureVault::new(
        VaultConfig::new(dir.path()),
        Arc::new(CipherService::from_passphrase(passphrase)),
    )
}

#[tokio::test]
async fn history_and_audit_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bob = Requester::new("bob").with_ip("192.0.2.7");

    {
        let vault = open(&dir, "master");
        vault
            .store("db", "credentials", json!({ "user": "app", "pass": "pw" }), &bob, None)
            .await
            .expect("store");
        vault.update("db", json!({ "user": "app", "pass": "pw2" }), &bob).await.expect("update");
    }

    let vault = open(&dir, "master");
    assert_eq!(
        vault.retrieve("db", &bob).await.expect("retrieve"),
        Some(json!({ "user": "app", "pass": "pw2" }))
    );

    let details = vault
        .get_metadata("db", &bob)
        .await
        .expect("metadata")
        .expect("present");
    assert_eq!(details.metadata.version, 2);
    assert_eq!(details.access_log.len(), 3);
    assert_eq!(details.access_log[0].ip.as_deref(), Some("192.0.2.7"));

    let actions: Vec<_> = vault
        .audit()
        .read_all()
        .await
        .expect("audit")
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        [
            AuditAction::Store,
            AuditAction::Update,
            AuditAction::Retrieve,
            AuditAction::Metadata,
        ]
    );

    let log = std::fs::read_to_string(vault.audit().path()).expect("audit file");
    assert!(!log.contains("pw2"));
}

#[tokio::test]
async fn wrong_passphrase_does_not_wipe_vault() {
    let dir = tempfile::tempdir().expect("tempdir");
    let alice = Requester::new("alice");
    open(&dir, "right")
        .store("k", "t", json!(1), &alice, None)
        .await
        .expect("store");

    let intruder = open(&dir, "wrong");
    let err = intruder.list(&alice).await.expect_err("cannot open");
    assert!(matches!(err, VaultError::Corrupt { .. }));
    assert!(
        intruder
            .store("k", "t", json!(2), &alice, None)
            .await
            .is_err()
    );

    let vault = open(&dir, "right");
    assert_eq!(vault.retrieve("k", &alice).await.expect("retrieve"), Some(json!(1)));
}
