//! Error types for secrets-store operations
//!
//! This module defines a tiered error hierarchy:
//! - [`SecretsError`]: Top-level error wrapping the tiers below
//! - [`CryptoError`]: Key validation, encryption, decryption
//! - [`StorageError`]: Artifact and audit-store file I/O
//! - [`RotationError`]: Rotation protocol failures (verification, rollback)
//! - [`BundleError`]: Plaintext `KEY=VALUE` bundle parsing
//!
//! Errors convert upward automatically via `From`, so `?` works at every
//! layer without manual wrapping:
//!
//! ```
//! use quasar_secrets::core::{Result, CryptoError};
//!
//! fn require_key(var: &str) -> Result<()> {
//!     Err(CryptoError::KeyMissing { var: var.to_string() })?
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level secrets-store error
///
/// Wraps the specific error tiers with enough context for the caller to
/// report a useful message and pick an exit status. Nothing in any variant's
/// message contains key bytes or plaintext configuration values.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Cryptographic error
    #[error("Cryptographic error: {source}")]
    Crypto {
        /// Underlying crypto error
        #[source]
        source: CryptoError,
    },

    /// Artifact or audit-store I/O error
    #[error("Storage error: {source}")]
    Storage {
        /// Underlying storage error
        #[source]
        source: StorageError,
    },

    /// Rotation protocol error
    #[error("Key rotation failed: {source}")]
    Rotation {
        /// Underlying rotation error
        #[source]
        source: RotationError,
    },

    /// Plaintext bundle parse error
    #[error("Configuration bundle error: {source}")]
    Bundle {
        /// Underlying bundle error
        #[source]
        source: BundleError,
    },
}

/// Cryptographic operation errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Supplied key bytes do not match the cipher's requirements
    #[error("Invalid key format: {reason}")]
    InvalidKeyFormat {
        /// Why the key was rejected (length, encoding)
        reason: String,
    },

    /// No key available in the environment
    #[error("No master key available: environment variable '{var}' is not set")]
    KeyMissing {
        /// Name of the environment variable that was consulted
        var: String,
    },

    /// Authentication check failed - wrong key or corrupted data.
    /// The message deliberately reveals nothing about key or plaintext.
    #[error("Decryption failed - wrong key or corrupted data")]
    DecryptionFailed,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Encrypted blob does not parse as our framing
    #[error("Malformed encrypted blob: {reason}")]
    MalformedBlob {
        /// What was wrong with the framing
        reason: String,
    },

    /// Blob was written by a newer format revision
    #[error("Unsupported blob version: {0}")]
    UnsupportedVersion(u8),
}

/// Artifact and audit-store I/O errors
///
/// Raw `std::io::Error`s are always wrapped with the operation and path so
/// a failure report names what was being touched.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Expected file does not exist
    #[error("Artifact not found: {path}")]
    NotFound {
        /// Missing path
        path: PathBuf,
    },

    /// Failed to read a file
    #[error("Failed to read {path}: {source}")]
    ReadFailure {
        /// Path being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write, rename, or set permissions on a file
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output path already occupied and overwrite was not confirmed
    #[error("Refusing to overwrite existing file: {path}")]
    AlreadyExists {
        /// Occupied path
        path: PathBuf,
    },

    /// Failed to acquire the artifact's exclusive lock
    #[error("Failed to lock {path}: {source}")]
    LockFailure {
        /// Lock file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Rotation protocol errors
///
/// Every variant is accompanied by a rollback attempt and a `Failed`
/// rotation record before it reaches the caller.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Post-encryption decrypt-and-compare gate failed
    #[error("Rotation verification failed: {reason}")]
    VerificationFailed {
        /// What the verification observed
        reason: String,
    },

    /// Record status transition is not allowed
    #[error("Invalid rotation state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Restoring the backup after a failure itself failed.
    /// The backup file is left in place for operator recovery.
    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed {
        /// Artifact path that could not be restored
        path: PathBuf,
        /// Why the restore failed
        reason: String,
    },

    /// Freshly generated key is identical to the old key
    #[error("Generated key is identical to the current key; rotation aborted")]
    KeysIdentical,

    /// Cryptographic failure inside a rotation step
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// I/O failure inside a rotation step
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Plaintext bundle parse errors
#[derive(Debug, Error)]
pub enum BundleError {
    /// A non-comment line had no `=` separator
    #[error("Malformed line {line}: '{content}'")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Offending line content (configuration names only; values on a
        /// malformed line never made it past the parser)
        content: String,
    },
}

/// Result type alias for secrets-store operations
pub type Result<T> = std::result::Result<T, SecretsError>;

impl From<CryptoError> for SecretsError {
    fn from(source: CryptoError) -> Self {
        Self::Crypto { source }
    }
}

impl From<StorageError> for SecretsError {
    fn from(source: StorageError) -> Self {
        Self::Storage { source }
    }
}

impl From<RotationError> for SecretsError {
    fn from(source: RotationError) -> Self {
        Self::Rotation { source }
    }
}

impl From<BundleError> for SecretsError {
    fn from(source: BundleError) -> Self {
        Self::Bundle { source }
    }
}
