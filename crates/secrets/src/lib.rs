//! Quasar Secrets - encrypted configuration store with master-key rotation
//!
//! Keeps a deployment's `KEY=VALUE` configuration bundle encrypted at rest
//! under a single master key, and replaces that key on a quarterly cadence
//! without ever leaving the bundle unreadable.
//!
//! # Features
//!
//! - **Authenticated encryption** - AES-256-GCM; corruption and wrong-key
//!   decryption are detected, never returned as garbage plaintext
//! - **Safe rotation** - backup, re-encrypt, verify, commit-or-rollback,
//!   with an auditable record per attempt
//! - **Key hygiene** - keys live in process memory only, zeroized on drop,
//!   identified in records by one-way fingerprints
//! - **Redaction** - sensitive values are masked before they reach a log
//!   line or a terminal
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

/// Encrypted-artifact file handling: suffix conventions, atomic writes,
/// locking, retrying reads
pub mod artifact;
/// Plaintext `KEY=VALUE` bundle parsing and rendering
pub mod bundle;
/// Core types and errors
pub mod core;
/// Cipher unit, master keys, fingerprints
pub mod crypto;
/// Sensitive-value masking and the telemetry scrubber
pub mod masking;
/// Rotation protocol, records, and audit persistence
pub mod rotation;

// ── Root re-exports ─────────────────────────────────────────────────────────
// Commonly-used types available directly as `quasar_secrets::TypeName`.

pub use crate::core::{
    BundleError, CryptoError, Result, RotationError, SecretsError, StorageError,
};

pub use crate::bundle::ConfigBundle;
pub use crate::crypto::{
    EncryptedBlob, KeyFingerprint, MASTER_KEY_ENV, MasterKey, decrypt, encrypt,
};
pub use crate::rotation::{
    AuditStore, FileAuditStore, MemoryAuditStore, RotationOrchestrator, RotationOutcome,
    RotationRecord, RotationStatus,
};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::bundle::ConfigBundle;
    pub use crate::core::{CryptoError, Result, RotationError, SecretsError, StorageError};
    pub use crate::crypto::{
        EncryptedBlob, KeyFingerprint, MASTER_KEY_ENV, MasterKey, decrypt, encrypt,
    };
    pub use crate::masking::{is_sensitive, mask_structure, mask_value};
    pub use crate::rotation::{
        AuditStore, FileAuditStore, MemoryAuditStore, RotationOrchestrator, RotationOutcome,
        RotationRecord, RotationStatus,
    };
}
