//! # aegis-cipher
//!
//! Cryptographic primitives shared by the Aegis security core:
//!
//! - **Authenticated encryption**: AES-256-GCM with a fresh 16-byte IV per call
//! - **Blob format**: `ivHex:authTagHex:cipherHex`, see [`EncryptedBlob`]
//! - **Hashing**: SHA-256 hex digests for identifiers and key derivation
//! - **Tokens**: cryptographically random hex tokens for opaque IDs
//! - **Fingerprints**: a fast, non-cryptographic content fingerprint
//!
//! ## Example
//!
//! ```rust
//! use aegis_cipher::CipherService;
//!
//! let cipher = CipherService::from_passphrase("correct horse battery staple");
//!
//! let blob = cipher.encrypt("hello").expect("non-empty plaintext");
//! let plaintext = cipher.decrypt_to_string(&blob.to_string());
//! assert_eq!(plaintext.as_deref(), Some("hello"));
//!
//! // Garbage never panics, it just fails closed.
//! assert!(cipher.decrypt("a:b").is_none());
//! ```
//!
//! ## Security Considerations
//!
//! - Key material is zeroized on drop and redacted from `Debug` output
//! - Tampered or truncated blobs are rejected by tag verification
//! - The passphrase is hashed without a salt: the same passphrase always
//!   yields the same key

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blob;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod service;

pub use blob::EncryptedBlob;
pub use error::{CipherError, Result};
pub use fingerprint::fingerprint;
pub use key::MasterKey;
pub use service::CipherService;

/// Size of the encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the initialization vector in bytes (128 bits).
pub const IV_SIZE: usize = 16;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;
