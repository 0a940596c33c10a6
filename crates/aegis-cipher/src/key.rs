//! Master key handling.

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::KEY_SIZE;
use crate::error::{CipherError, Result};

/// The single master key used by a [`CipherService`](crate::CipherService).
///
/// The key is securely zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Derives a key from a passphrase by hashing it with SHA-256.
    ///
    /// Any passphrase length yields exactly 32 bytes. There is no salt, so a
    /// given passphrase always maps to the same key.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self { bytes }
    }

    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CipherError::InvalidKey {
                reason: format!("key must be exactly {KEY_SIZE} bytes, got {}", bytes.len()),
            });
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passphrase_derivation_is_deterministic() {
        let a = MasterKey::from_passphrase("hunter2");
        let b = MasterKey::from_passphrase("hunter2");
        let c = MasterKey::from_passphrase("hunter3");

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn passphrase_of_any_length_gives_full_key() {
        assert_eq!(MasterKey::from_passphrase("").as_bytes().len(), KEY_SIZE);
        let long = "x".repeat(4096);
        assert_eq!(MasterKey::from_passphrase(&long).as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn passphrase_key_is_sha256_of_input() {
        let key = MasterKey::from_passphrase("abc");
        assert_eq!(
            hex::encode(key.as_bytes()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn generated_keys_differ() {
        let key1 = MasterKey::generate();
        let key2 = MasterKey::generate();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(MasterKey::from_bytes(&[0u8; 16]).is_err());
        assert!(MasterKey::from_bytes(&[0u8; 64]).is_err());
        assert!(MasterKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn debug_redacts() {
        let key = MasterKey::generate();
        let debug_str = format!("{key:?}");
        assert!(debug_str.contains("[REDACTED]"));
    }
}
