//! Key fingerprints: one-way identification of key material.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters shown by [`KeyFingerprint::short`].
const SHORT_LEN: usize = 12;

/// SHA-256 digest of a key's raw bytes, rendered as lowercase hex.
///
/// Used for equality comparison and human display in rotation records;
/// never reversible to the key. Two independently generated keys collide
/// with negligible probability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Fingerprint arbitrary key bytes. Deterministic: the same bytes always
    /// produce the same fingerprint.
    pub fn of(key_bytes: &[u8]) -> Self {
        let digest = Sha256::digest(key_bytes);
        Self(hex::encode(digest))
    }

    /// Full 64-character hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Truncated form for display next to other rotation output.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl std::fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
