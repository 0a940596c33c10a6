//! Encrypted whole-value JSON snapshots.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aegis_cipher::CipherService;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PersistError, PersistResult};
use crate::fs::write_atomic;

/// A file holding one value as a single encrypted JSON blob.
///
/// Every save re-serializes and re-encrypts the whole value; there is no
/// partial update.
#[derive(Debug, Clone)]
pub struct EncryptedJsonFile {
    path: PathBuf,
    cipher: Arc<CipherService>,
}

impl EncryptedJsonFile {
    /// Creates a handle for `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<CipherService>) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    /// The file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a handle for another path sharing the same cipher.
    #[must_use]
    pub fn at(&self, path: impl Into<PathBuf>) -> Self {
        Self::new(path, Arc::clone(&self.cipher))
    }

    /// Loads and decrypts the value.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Corrupt`] if the blob fails to decrypt or the
    /// JSON does not match `T`, and [`PersistError::Io`] for read failures.
    pub async fn load<T: DeserializeOwned>(&self) -> PersistResult<Option<T>> {
        let blob = match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistError::io(&self.path, e)),
        };

        let plaintext = self
            .cipher
            .try_decrypt(&blob)
            .map_err(|e| self.corrupt(e.to_string()))?;

        let value = serde_json::from_slice(&plaintext).map_err(|e| self.corrupt(e.to_string()))?;
        debug!(path = %self.path.display(), "loaded encrypted snapshot");
        Ok(Some(value))
    }

    /// Serializes, encrypts and atomically writes `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, encryption or the write fails.
    pub async fn save<T: Serialize>(&self, value: &T) -> PersistResult<()> {
        let json = serde_json::to_vec(value)?;
        let blob = self.cipher.encrypt(&json)?;
        write_atomic(&self.path, blob.to_string().as_bytes()).await?;
        debug!(path = %self.path.display(), bytes = json.len(), "saved encrypted snapshot");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> PersistError {
        PersistError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct State {
        counts: BTreeMap<String, u32>,
    }

    fn cipher(passphrase: &str) -> Arc<CipherService> {
        Arc::new(CipherService::from_passphrase(passphrase))
    }

    fn sample() -> State {
        let mut counts = BTreeMap::new();
        counts.insert("alpha".to_string(), 3);
        State { counts }
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = EncryptedJsonFile::new(dir.path().join("state.enc"), cipher("k"));

        let loaded: Option<State> = file.load().await.expect("load");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = EncryptedJsonFile::new(dir.path().join("state.enc"), cipher("k"));

        file.save(&sample()).await.expect("save");
        let loaded: Option<State> = file.load().await.expect("load");
        assert_eq!(loaded, Some(sample()));
    }

    #[tokio::test]
    async fn file_on_disk_is_not_plaintext() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = EncryptedJsonFile::new(dir.path().join("state.enc"), cipher("k"));

        file.save(&sample()).await.expect("save");
        let raw = tokio::fs::read_to_string(file.path()).await.expect("read");
        assert!(!raw.contains("alpha"));
        assert_eq!(raw.split(':').count(), 3);
    }

    #[tokio::test]
    async fn wrong_key_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.enc");
        EncryptedJsonFile::new(&path, cipher("right"))
            .save(&sample())
            .await
            .expect("save");

        let err = EncryptedJsonFile::new(&path, cipher("wrong"))
            .load::<State>()
            .await
            .expect_err("wrong key");
        assert!(err.is_corrupt());
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.enc");
        tokio::fs::write(&path, "definitely not a blob").await.expect("write");

        let err = EncryptedJsonFile::new(&path, cipher("k"))
            .load::<State>()
            .await
            .expect_err("garbage");
        assert!(err.is_corrupt());
    }
}
