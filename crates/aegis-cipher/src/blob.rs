//! The `ivHex:authTagHex:cipherHex` wire format.

use std::fmt;
use std::str::FromStr;

use crate::error::{CipherError, Result};
use crate::{IV_SIZE, TAG_SIZE};

/// Field separator of the textual blob form.
pub const SEPARATOR: char = ':';

/// An authenticated ciphertext with its IV and tag.
///
/// The textual form is three lowercase hex fields joined by `:`. Only
/// [`CipherService::encrypt`](crate::CipherService::encrypt) produces valid
/// blobs; anything else is rejected on decrypt.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    iv: [u8; IV_SIZE],
    tag: [u8; TAG_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    pub(crate) const fn new(iv: [u8; IV_SIZE], tag: [u8; TAG_SIZE], ciphertext: Vec<u8>) -> Self {
        Self {
            iv,
            tag,
            ciphertext,
        }
    }

    /// The initialization vector.
    #[must_use]
    pub const fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// The authentication tag.
    #[must_use]
    pub const fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    /// The raw ciphertext (without tag).
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("iv", &hex::encode(self.iv))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

impl FromStr for EncryptedBlob {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim().split(SEPARATOR).collect();
        let [iv_hex, tag_hex, cipher_hex] = fields.as_slice() else {
            return Err(CipherError::MalformedBlob {
                reason: format!("expected 3 fields, got {}", fields.len()),
            });
        };

        let iv = decode_fixed::<IV_SIZE>(iv_hex, "iv")?;
        let tag = decode_fixed::<TAG_SIZE>(tag_hex, "tag")?;
        let ciphertext = hex::decode(cipher_hex).map_err(|source| CipherError::InvalidHex {
            field: "ciphertext",
            source,
        })?;

        Ok(Self::new(iv, tag, ciphertext))
    }
}

fn decode_fixed<const N: usize>(field_hex: &str, field: &'static str) -> Result<[u8; N]> {
    let bytes = hex::decode(field_hex).map_err(|source| CipherError::InvalidHex { field, source })?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CipherError::MalformedBlob {
        reason: format!("{field} must be {N} bytes, got {}", bytes.len()),
    })
}
