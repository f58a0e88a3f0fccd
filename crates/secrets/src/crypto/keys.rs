//! Master key handling: format validation, generation, environment supply.
//!
//! A [`MasterKey`] is the single symmetric key currently authoritative for
//! the configuration artifact. It is never persisted; the process reads it
//! from [`MASTER_KEY_ENV`] at start, and every copy zeroes its memory on
//! drop.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use rand::Rng;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::CryptoError;
use crate::crypto::fingerprint::KeyFingerprint;

/// Environment variable that supplies the active master key (base64-encoded
/// raw bytes). There is no fallback secret: if the variable is unset, any
/// operation needing a key fails with [`CryptoError::KeyMissing`] before
/// touching the filesystem.
pub const MASTER_KEY_ENV: &str = "QUASAR_MASTER_KEY";

/// Raw key length required by AES-256-GCM.
pub const KEY_LEN: usize = 32;

/// Opaque fixed-length symmetric master key.
///
/// Construct one per operation; nothing in this crate caches keys across
/// unrelated calls. Memory is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Wrap raw key bytes of exactly the right length.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Validate arbitrary bytes as a key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyFormat {
                    reason: format!("expected {KEY_LEN} raw bytes, got {}", bytes.len()),
                })?;
        Ok(Self { bytes })
    }

    /// Parse a base64-encoded key, the wire format used by
    /// [`MASTER_KEY_ENV`] and by the CLI when printing a generated key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded =
            B64.decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidKeyFormat {
                    reason: format!("invalid base64: {e}"),
                })?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Generate a fresh key from OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Read the active key from [`MASTER_KEY_ENV`].
    pub fn from_env() -> Result<Self, CryptoError> {
        Self::from_env_var(MASTER_KEY_ENV)
    }

    /// Read a key from a named environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, CryptoError> {
        let encoded = std::env::var(var).map_err(|_| CryptoError::KeyMissing {
            var: var.to_string(),
        })?;
        Self::from_base64(&encoded)
    }

    /// Base64 rendering for operator display. The caller is handing the key
    /// to a human; treat the returned string accordingly.
    pub fn to_base64(&self) -> String {
        B64.encode(self.bytes)
    }

    /// One-way fingerprint of the key bytes for audit identification.
    pub fn fingerprint(&self) -> KeyFingerprint {
        KeyFingerprint::of(&self.bytes)
    }

    /// Constant-time equality check.
    pub fn eq_ct(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey[REDACTED]")
    }
}
