//! AES-256-GCM cipher unit.
//!
//! Pure byte-to-byte transforms against a single [`MasterKey`]; file I/O is
//! the rotation orchestrator's job. Decryption authenticates before
//! returning anything: a wrong key or a single corrupted byte yields
//! [`CryptoError::DecryptionFailed`], never partial plaintext.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::core::CryptoError;
use crate::crypto::keys::MasterKey;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// File framing magic for encrypted artifacts.
const BLOB_MAGIC: [u8; 4] = *b"QSEC";

/// Current blob format revision.
pub const BLOB_VERSION: u8 = 1;

/// Minimum size of an encoded blob: magic + version + nonce + tag.
const MIN_ENCODED_LEN: usize = 4 + 1 + NONCE_LEN + TAG_LEN;

/// Authenticated ciphertext produced by [`encrypt`].
///
/// Self-describing enough for [`decrypt`] to detect corruption or a
/// wrong-key attempt: the GCM tag covers nonce and ciphertext, and the
/// framing carries a version byte for future format migrations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Format revision that produced this blob
    pub version: u8,

    /// Per-encryption random nonce
    pub nonce: [u8; NONCE_LEN],

    /// GCM authentication tag
    pub tag: [u8; TAG_LEN],

    /// Ciphertext without the tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encode for file persistence: magic, version, nonce, tag, ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_ENCODED_LEN + self.ciphertext.len());
        out.extend_from_slice(&BLOB_MAGIC);
        out.push(self.version);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the file framing back into a blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_ENCODED_LEN {
            return Err(CryptoError::MalformedBlob {
                reason: format!(
                    "{} bytes is shorter than the {MIN_ENCODED_LEN}-byte header",
                    bytes.len()
                ),
            });
        }
        if bytes[..4] != BLOB_MAGIC {
            return Err(CryptoError::MalformedBlob {
                reason: "missing magic header".to_string(),
            });
        }
        let version = bytes[4];
        if version != BLOB_VERSION {
            return Err(CryptoError::UnsupportedVersion(version));
        }

        let nonce_end = 5 + NONCE_LEN;
        let tag_end = nonce_end + TAG_LEN;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[5..nonce_end]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[nonce_end..tag_end]);

        Ok(Self {
            version,
            nonce,
            tag,
            ciphertext: bytes[tag_end..].to_vec(),
        })
    }
}

/// Encrypt plaintext under the given key with a fresh random nonce.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<EncryptedBlob, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut combined = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed("AEAD failure".to_string()))?;

    // aes-gcm appends the 16-byte tag to the ciphertext; store it separately.
    let tag_vec = combined.split_off(combined.len() - TAG_LEN);
    let tag: [u8; TAG_LEN] = tag_vec
        .try_into()
        .map_err(|_| CryptoError::EncryptionFailed("tag length".to_string()))?;

    Ok(EncryptedBlob {
        version: BLOB_VERSION,
        nonce: nonce.into(),
        tag,
        ciphertext: combined,
    })
}

/// Decrypt and authenticate a blob under the given key.
pub fn decrypt(key: &MasterKey, blob: &EncryptedBlob) -> Result<Vec<u8>, CryptoError> {
    if blob.version != BLOB_VERSION {
        return Err(CryptoError::UnsupportedVersion(blob.version));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut combined = Vec::with_capacity(blob.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&blob.ciphertext);
    combined.extend_from_slice(&blob.tag);

    cipher
        .decrypt(Nonce::from_slice(&blob.nonce), combined.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)
}
