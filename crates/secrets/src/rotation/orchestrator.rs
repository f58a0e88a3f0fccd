//! Rotation orchestrator: the end-to-end master-key rotation protocol.
//!
//! Composes the cipher unit and fingerprint function into
//! backup → decrypt-old → encrypt-new → verify → commit-or-rollback,
//! producing a [`RotationRecord`] through an [`AuditStore`]. Synchronous,
//! single-threaded, blocking I/O: every step depends on the previous one.
//!
//! A rotation is never resumed. A failed attempt leaves a `Failed` record
//! behind; the next invocation starts a brand-new record.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use zeroize::Zeroize;

use crate::artifact::{self, ArtifactLock};
use crate::core::{Result, RotationError, StorageError};
use crate::crypto::{EncryptedBlob, MasterKey, decrypt, encrypt};
use crate::rotation::audit::AuditStore;
use crate::rotation::record::RotationRecord;

/// What a successful rotation hands back to the caller.
///
/// The caller is responsible for propagating `new_key` to the environment;
/// the orchestrator never writes key material anywhere.
#[derive(Debug)]
pub struct RotationOutcome {
    /// The attempt's audit record, in `Completed` status
    pub record: RotationRecord,

    /// Freshly generated master key, now authoritative for the artifact
    pub new_key: MasterKey,

    /// Path of the re-encrypted artifact
    pub encrypted_path: PathBuf,

    /// Where the pre-rotation artifact was moved, if a backup was made
    pub backup_path: Option<PathBuf>,
}

/// Orchestrates a single rotation invocation against one artifact.
///
/// Constructed per operation; holds no key state of its own.
pub struct RotationOrchestrator<'a, S: AuditStore> {
    audit: &'a S,
    backup: bool,
    #[cfg(feature = "test-util")]
    pre_verify_hook: Option<Box<dyn Fn(&Path)>>,
}

impl<'a, S: AuditStore> RotationOrchestrator<'a, S> {
    /// Orchestrator writing its records to the given audit store. Backups
    /// are on by default.
    pub fn new(audit: &'a S) -> Self {
        Self {
            audit,
            backup: true,
            #[cfg(feature = "test-util")]
            pre_verify_hook: None,
        }
    }

    /// Suppress the backup step. Without a backup there is nothing to roll
    /// back to if verification fails; operators opt into that explicitly.
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Install a hook that runs after the new artifact is written but
    /// before verification. Fault injection for tests; see the
    /// `test-util` feature notes in the crate manifest.
    #[cfg(feature = "test-util")]
    pub fn with_pre_verify_hook(mut self, hook: impl Fn(&Path) + 'static) -> Self {
        self.pre_verify_hook = Some(Box::new(hook));
        self
    }

    /// Run the full rotation protocol.
    ///
    /// `artifact` may name either the plaintext bundle or its `.encrypted`
    /// counterpart; the pair is resolved by suffix convention. The old key
    /// comes from the caller (normally the environment); the new key is
    /// generated here and returned in the outcome.
    pub fn rotate(
        &self,
        old_key: &MasterKey,
        artifact: &Path,
        reason: &str,
    ) -> Result<RotationOutcome> {
        let (plain_path, enc_path) = target_paths(artifact);

        // The record exists, persisted, before any cryptographic work: a
        // crash from here on still leaves an auditable attempt.
        let mut record = RotationRecord::new(reason);
        record.old_key_fingerprint = Some(old_key.fingerprint());
        self.audit.record(&record)?;
        tracing::info!(
            rotation_id = %record.id,
            artifact = %enc_path.display(),
            "rotation initiated"
        );

        match self.run(old_key, plain_path.as_deref(), &enc_path, &mut record) {
            Ok((new_key, backup_path)) => {
                record.complete()?;
                self.audit.record(&record)?;
                tracing::info!(
                    rotation_id = %record.id,
                    next_due = ?record.next_rotation_due,
                    "rotation completed"
                );
                Ok(RotationOutcome {
                    record,
                    new_key,
                    encrypted_path: enc_path,
                    backup_path,
                })
            }
            Err(err) => {
                record.fail(err.to_string())?;
                if let Err(audit_err) = self.audit.record(&record) {
                    tracing::error!(
                        rotation_id = %record.id,
                        error = %audit_err,
                        "failed to persist the failure record"
                    );
                }
                tracing::error!(
                    rotation_id = %record.id,
                    error = %err,
                    "rotation failed; old key remains authoritative"
                );
                Err(err.into())
            }
        }
    }

    /// Steps 2-8. Returns the new key and the backup path on success; on
    /// error the backup (if any) has been restored to the target path.
    fn run(
        &self,
        old_key: &MasterKey,
        plain_path: Option<&Path>,
        enc_path: &Path,
        record: &mut RotationRecord,
    ) -> std::result::Result<(MasterKey, Option<PathBuf>), RotationError> {
        let new_key = MasterKey::generate();
        if new_key.eq_ct(old_key) {
            return Err(RotationError::KeysIdentical);
        }
        record.new_key_fingerprint = Some(new_key.fingerprint());
        record.mark_in_progress()?;
        self.audit.record(record)?;

        // Exclusive over the artifact from before the backup rename until
        // commit or rollback; concurrent rotations fail fast here.
        let _lock = ArtifactLock::acquire(enc_path)?;

        let had_encrypted = enc_path.exists();

        // Move, not copy: the rename is atomic, so a crash mid-step leaves
        // exactly one of {original, backup} present.
        let mut backup_path = None;
        if self.backup && had_encrypted {
            let backup = artifact::backup_path_for(enc_path, Utc::now());
            fs::rename(enc_path, &backup).map_err(|e| StorageError::WriteFailure {
                path: backup.clone(),
                source: e,
            })?;
            tracing::info!(backup = %backup.display(), "existing artifact moved to backup");
            record.backup_path = Some(backup.clone());
            backup_path = Some(backup);
        }

        match self.reencrypt_and_verify(
            old_key,
            &new_key,
            plain_path,
            enc_path,
            backup_path.as_deref(),
            had_encrypted,
            record,
        ) {
            Ok(()) => Ok((new_key, backup_path)),
            Err(err) => {
                if let Some(backup) = &backup_path {
                    if let Err(restore_err) = fs::rename(backup, enc_path) {
                        // The backup file stays where it is; report both
                        // failures so the operator can recover by hand.
                        return Err(RotationError::RollbackFailed {
                            path: enc_path.to_path_buf(),
                            reason: format!("{err}; backup restore also failed: {restore_err}"),
                        });
                    }
                    tracing::warn!(
                        backup = %backup.display(),
                        "backup restored to target path after failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Steps 4-6: recover plaintext under the old key, re-encrypt under the
    /// new key, write, and run the mandatory decrypt-and-compare gate.
    #[allow(clippy::too_many_arguments)]
    fn reencrypt_and_verify(
        &self,
        old_key: &MasterKey,
        new_key: &MasterKey,
        plain_path: Option<&Path>,
        enc_path: &Path,
        backup_path: Option<&Path>,
        had_encrypted: bool,
        record: &mut RotationRecord,
    ) -> std::result::Result<(), RotationError> {
        // After the backup rename the encrypted source lives at the backup
        // path; without a backup it is still at the target.
        let mut plaintext = if had_encrypted {
            let source = backup_path.unwrap_or(enc_path);
            let blob = EncryptedBlob::from_bytes(&artifact::read_bytes(source)?)?;
            decrypt(old_key, &blob)?
        } else {
            // First-ever rotation: no encrypted artifact yet, read the
            // plaintext bundle directly.
            let plain = plain_path.ok_or_else(|| StorageError::NotFound {
                path: enc_path.to_path_buf(),
            })?;
            artifact::read_bytes(plain)?
        };

        let blob = encrypt(new_key, &plaintext)?;
        artifact::write_encrypted(enc_path, &blob)?;
        record.reencrypted_paths.push(enc_path.to_path_buf());

        #[cfg(feature = "test-util")]
        if let Some(hook) = &self.pre_verify_hook {
            hook(enc_path);
        }

        // The correctness gate. Skipping it is not permitted.
        let reread = EncryptedBlob::from_bytes(&artifact::read_bytes(enc_path)?)?;
        let mut verified = decrypt(new_key, &reread).map_err(|_| {
            record
                .verification_detail
                .insert("decrypt".to_string(), "failed under new key".to_string());
            RotationError::VerificationFailed {
                reason: "re-read artifact failed to decrypt under the new key".to_string(),
            }
        })?;

        let passed = verified == plaintext;
        record
            .verification_detail
            .insert("artifact".to_string(), enc_path.display().to_string());
        record
            .verification_detail
            .insert("bytes_compared".to_string(), plaintext.len().to_string());
        record.verification_passed = passed;

        plaintext.zeroize();
        verified.zeroize();

        if !passed {
            return Err(RotationError::VerificationFailed {
                reason: "decrypted artifact does not match the recovered plaintext".to_string(),
            });
        }
        Ok(())
    }
}

/// Resolve the plaintext/encrypted pair from whichever path was given.
fn target_paths(artifact: &Path) -> (Option<PathBuf>, PathBuf) {
    match artifact::plaintext_path_for(artifact) {
        Some(plain) => (Some(plain), artifact.to_path_buf()),
        None => (
            Some(artifact.to_path_buf()),
            artifact::encrypted_path_for(artifact),
        ),
    }
}
