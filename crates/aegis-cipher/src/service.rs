//! The cipher service: encrypt, decrypt, hash and token generation.
//!
//! All authenticated encryption uses AES-256-GCM with a 16-byte IV and a
//! 16-byte tag. Decryption fails closed: any parse or verification failure
//! yields `None` and a warning, never a panic.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::blob::EncryptedBlob;
use crate::error::{CipherError, Result};
use crate::key::MasterKey;
use crate::{IV_SIZE, TAG_SIZE};

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Symmetric encryption and hashing bound to one master key.
pub struct CipherService {
    key: MasterKey,
}

impl CipherService {
    /// Creates a service from an existing key.
    #[must_use]
    pub const fn new(key: MasterKey) -> Self {
        Self { key }
    }

    /// Creates a service whose key is SHA-256 of `passphrase`.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::new(MasterKey::from_passphrase(passphrase))
    }

    fn cipher(&self) -> Result<Aes256Gcm16> {
        Aes256Gcm16::new_from_slice(self.key.as_bytes()).map_err(|e| CipherError::InvalidKey {
            reason: e.to_string(),
        })
    }

    /// Encrypts `plaintext` under a fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EmptyPlaintext`] for empty input.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<EncryptedBlob> {
        let plaintext = plaintext.as_ref();
        if plaintext.is_empty() {
            return Err(CipherError::EmptyPlaintext);
        }

        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut sealed = self
            .cipher()?
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
            .map_err(|e| CipherError::Encryption {
                reason: e.to_string(),
            })?;

        // aes-gcm appends the tag to the ciphertext
        let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&tag_bytes);

        Ok(EncryptedBlob::new(iv, tag, sealed))
    }

    /// Decrypts a textual blob, returning the typed failure reason.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is malformed or fails tag verification.
    pub fn try_decrypt(&self, blob: &str) -> Result<Vec<u8>> {
        let blob: EncryptedBlob = blob.parse()?;
        self.decrypt_blob(&blob)
    }

    /// Decrypts an already-parsed blob.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AuthenticationFailed`] if the tag does not verify.
    pub fn decrypt_blob(&self, blob: &EncryptedBlob) -> Result<Vec<u8>> {
        let mut sealed = Vec::with_capacity(blob.ciphertext().len() + TAG_SIZE);
        sealed.extend_from_slice(blob.ciphertext());
        sealed.extend_from_slice(blob.tag());

        self.cipher()?
            .decrypt(Nonce::<U16>::from_slice(blob.iv()), sealed.as_slice())
            .map_err(|_| CipherError::AuthenticationFailed)
    }

    /// Decrypts a textual blob, failing closed.
    ///
    /// Returns `None` (and logs a warning) on a wrong field count, bad hex,
    /// or tag verification failure.
    #[must_use]
    pub fn decrypt(&self, blob: &str) -> Option<Vec<u8>> {
        match self.try_decrypt(blob) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                warn!(error = %e, "decryption failed");
                None
            }
        }
    }

    /// Like [`decrypt`](Self::decrypt) but also requires valid UTF-8.
    #[must_use]
    pub fn decrypt_to_string(&self, blob: &str) -> Option<String> {
        let bytes = self.decrypt(blob)?;
        match String::from_utf8(bytes) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "decrypted payload is not utf-8");
                None
            }
        }
    }

    /// SHA-256 of `text` as lowercase hex.
    #[must_use]
    pub fn hash(&self, text: &str) -> String {
        hash(text)
    }

    /// Returns `byte_len` random bytes as lowercase hex.
    #[must_use]
    pub fn generate_secure_token(&self, byte_len: usize) -> String {
        generate_secure_token(byte_len)
    }
}

impl std::fmt::Debug for CipherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherService")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// SHA-256 of `text` as lowercase hex.
#[must_use]
pub fn hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Returns `byte_len` bytes from the thread-local CSPRNG as lowercase hex.
#[must_use]
pub fn generate_secure_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
