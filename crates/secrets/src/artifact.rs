//! Encrypted-artifact file handling.
//!
//! Owns every filesystem concern the cipher unit stays out of: the
//! `.encrypted` suffix conventions, atomic temp-file-and-rename writes with
//! owner-only permissions, timestamped backup names, the artifact's
//! exclusive advisory lock, and the retry loop that lets readers ride out
//! the instant during a rotation where the artifact is being renamed.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use uuid::Uuid;

use crate::core::{CryptoError, Result, SecretsError, StorageError};
use crate::crypto::{EncryptedBlob, MasterKey, decrypt, encrypt};

/// Suffix appended to a plaintext artifact's name when encrypting.
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// Default attempts for [`read_encrypted_with_retry`].
pub const DEFAULT_READ_ATTEMPTS: u32 = 5;

/// Default initial backoff for [`read_encrypted_with_retry`]; doubles per
/// attempt. Tuned for the near-instantaneous rename window, nothing else.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_millis(10);

/// `config.env` → `config.env.encrypted`.
pub fn encrypted_path_for(plaintext: &Path) -> PathBuf {
    let mut name = plaintext
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(ENCRYPTED_SUFFIX);
    plaintext.with_file_name(name)
}

/// `config.env.encrypted` → `config.env`, when the suffix is present.
pub fn plaintext_path_for(encrypted: &Path) -> Option<PathBuf> {
    let name = encrypted.file_name()?.to_str()?;
    let stripped = name.strip_suffix(ENCRYPTED_SUFFIX)?;
    if stripped.is_empty() {
        return None;
    }
    Some(encrypted.with_file_name(stripped))
}

/// Timestamped sibling name used when a rotation moves the current artifact
/// aside.
pub fn backup_path_for(artifact: &Path, at: DateTime<Utc>) -> PathBuf {
    let name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    artifact.with_file_name(format!("{name}.backup-{}", at.format("%Y%m%dT%H%M%SZ")))
}

/// Read a whole file, wrapping I/O errors with the path.
pub fn read_bytes(path: &Path) -> std::result::Result<Vec<u8>, StorageError> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StorageError::ReadFailure {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Atomically write data with owner-only permissions.
///
/// Writes to a temp file in the same directory, then renames into place, so
/// a crash leaves either the old content or the new, never a torn file.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> std::result::Result<(), StorageError> {
    let temp_path = path.with_file_name(format!(
        "{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact"),
        Uuid::new_v4()
    ));

    let wrap = |source: std::io::Error| StorageError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    fs::write(&temp_path, data).map_err(wrap)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&temp_path, perms).map_err(wrap)?;
    }

    fs::rename(&temp_path, path).map_err(wrap)?;
    Ok(())
}

/// Read and parse an encrypted artifact.
pub fn read_encrypted(path: &Path) -> Result<EncryptedBlob> {
    let bytes = read_bytes(path)?;
    Ok(EncryptedBlob::from_bytes(&bytes)?)
}

/// Write an encrypted artifact atomically.
pub fn write_encrypted(path: &Path, blob: &EncryptedBlob) -> std::result::Result<(), StorageError> {
    write_bytes_atomic(path, &blob.to_bytes())
}

/// Read an encrypted artifact, retrying briefly if it is missing.
///
/// A rotation replaces the artifact with an atomic rename; a reader racing
/// that rename can observe a missing file for an instant. Retrying with a
/// doubling backoff rides that out. Any other failure surfaces immediately,
/// and the final miss surfaces as [`StorageError::NotFound`].
pub fn read_encrypted_with_retry(
    path: &Path,
    attempts: u32,
    initial_backoff: Duration,
) -> Result<EncryptedBlob> {
    let mut backoff = initial_backoff;
    let mut remaining = attempts.max(1);

    loop {
        match read_bytes(path) {
            Ok(bytes) => return Ok(EncryptedBlob::from_bytes(&bytes)?),
            Err(StorageError::NotFound { .. }) if remaining > 1 => {
                remaining -= 1;
                std::thread::sleep(backoff);
                backoff *= 2;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Exclusive advisory lock scoped to an artifact path.
///
/// Taken before a rotation's backup step and held through commit or
/// rollback, so two rotations (or a rotation and another writer honoring
/// the lock) cannot interleave their rename and write operations. The lock
/// lives on a sibling `.lock` file and is released on drop.
#[derive(Debug)]
pub struct ArtifactLock {
    file: File,
    path: PathBuf,
}

impl ArtifactLock {
    /// Acquire the lock, failing fast if another holder has it.
    pub fn acquire(artifact: &Path) -> std::result::Result<Self, StorageError> {
        let path = lock_path_for(artifact);
        let wrap = |source: std::io::Error| StorageError::LockFailure {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(wrap)?;
        file.try_lock_exclusive().map_err(wrap)?;

        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path_for(artifact: &Path) -> PathBuf {
    let name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    artifact.with_file_name(format!("{name}.lock"))
}

/// Encrypt a plaintext artifact to `output` (default: source + `.encrypted`).
///
/// The plaintext is parsed as a `KEY=VALUE` bundle first so a malformed
/// file is rejected before anything is written. An existing output path is
/// refused unless `overwrite` is set.
pub fn encrypt_file(
    key: &MasterKey,
    source: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> Result<PathBuf> {
    let target = output.map_or_else(|| encrypted_path_for(source), Path::to_path_buf);
    ensure_writable(&target, overwrite)?;

    let plaintext = read_bytes(source)?;
    crate::bundle::ConfigBundle::parse(&String::from_utf8_lossy(&plaintext))?;

    let blob = encrypt(key, &plaintext)?;
    write_encrypted(&target, &blob)?;

    tracing::info!(source = %source.display(), target = %target.display(), "encrypted artifact written");
    Ok(target)
}

/// Decrypt an encrypted artifact to `output` (default: suffix-stripped name).
pub fn decrypt_file(
    key: &MasterKey,
    source: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> Result<PathBuf> {
    let target = match output {
        Some(path) => path.to_path_buf(),
        None => plaintext_path_for(source).ok_or_else(|| {
            SecretsError::from(CryptoError::MalformedBlob {
                reason: format!(
                    "cannot infer output name: '{}' does not end in {ENCRYPTED_SUFFIX}",
                    source.display()
                ),
            })
        })?,
    };
    ensure_writable(&target, overwrite)?;

    let blob = read_encrypted(source)?;
    let plaintext = decrypt(key, &blob)?;
    write_bytes_atomic(&target, &plaintext)?;

    tracing::info!(source = %source.display(), target = %target.display(), "artifact decrypted");
    Ok(target)
}

/// Decrypt and parse the configuration bundle, as consumers do at process
/// start.
///
/// Uses the retrying read so a startup racing a rotation's rename does not
/// fail hard on the transient missing-file window. The decrypted bytes are
/// zeroized once the bundle is parsed.
pub fn load_bundle(key: &MasterKey, encrypted_path: &Path) -> Result<crate::bundle::ConfigBundle> {
    use zeroize::Zeroize;

    let blob = read_encrypted_with_retry(encrypted_path, DEFAULT_READ_ATTEMPTS, DEFAULT_READ_BACKOFF)?;
    let mut plaintext = decrypt(key, &blob)?;
    let parsed = crate::bundle::ConfigBundle::parse(&String::from_utf8_lossy(&plaintext));
    plaintext.zeroize();
    Ok(parsed?)
}

fn ensure_writable(target: &Path, overwrite: bool) -> std::result::Result<(), StorageError> {
    if target.exists() && !overwrite {
        return Err(StorageError::AlreadyExists {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn suffix_conventions_are_inverse() {
        let plain = Path::new("/etc/app/config.env");
        let enc = encrypted_path_for(plain);
        assert_eq!(enc, Path::new("/etc/app/config.env.encrypted"));
        assert_eq!(plaintext_path_for(&enc), Some(plain.to_path_buf()));

        assert_eq!(plaintext_path_for(Path::new("/etc/app/config.env")), None);
        assert_eq!(plaintext_path_for(Path::new("/etc/app/.encrypted")), None);
    }

    #[test]
    fn backup_name_carries_timestamp() {
        let at = DateTime::parse_from_rfc3339("2026-02-07T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let backup = backup_path_for(Path::new("/srv/config.env.encrypted"), at);
        assert_eq!(
            backup,
            Path::new("/srv/config.env.encrypted.backup-20260207T083000Z")
        );
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");

        write_bytes_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // No temp droppings left behind.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        write_bytes_atomic(&path, b"data").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("config.env.encrypted");

        let held = ArtifactLock::acquire(&artifact).unwrap();
        let second = ArtifactLock::acquire(&artifact);
        assert!(matches!(second, Err(StorageError::LockFailure { .. })));

        drop(held);
        assert!(ArtifactLock::acquire(&artifact).is_ok());
    }

    #[test]
    fn encrypt_decrypt_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.env");
        fs::write(&source, "A=1\nB=2\n").unwrap();

        let key = MasterKey::generate();
        let encrypted = encrypt_file(&key, &source, None, false).unwrap();
        assert_eq!(encrypted, dir.path().join("config.env.encrypted"));

        let restored = dir.path().join("restored.env");
        decrypt_file(&key, &encrypted, Some(&restored), false).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"A=1\nB=2\n");
    }

    #[test]
    fn existing_output_requires_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.env");
        fs::write(&source, "A=1\n").unwrap();
        let target = dir.path().join("config.env.encrypted");
        fs::write(&target, "occupied").unwrap();

        let key = MasterKey::generate();
        let err = encrypt_file(&key, &source, None, false).unwrap_err();
        assert!(matches!(
            err,
            SecretsError::Storage {
                source: StorageError::AlreadyExists { .. }
            }
        ));

        assert!(encrypt_file(&key, &source, None, true).is_ok());
    }

    #[test]
    fn encrypt_file_rejects_malformed_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.env");
        fs::write(&source, "this is not key=value\nbroken line\n").unwrap();

        // First line parses (split at the first `=`), second does not.
        let key = MasterKey::generate();
        let err = encrypt_file(&key, &source, None, false).unwrap_err();
        assert!(matches!(err, SecretsError::Bundle { .. }));
    }

    #[test]
    fn retry_read_returns_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.env.encrypted");

        let key = MasterKey::generate();
        let blob = encrypt(&key, b"X=1\n").unwrap();
        write_encrypted(&path, &blob).unwrap();

        let read = read_encrypted_with_retry(&path, DEFAULT_READ_ATTEMPTS, DEFAULT_READ_BACKOFF)
            .unwrap();
        assert_eq!(read, blob);
    }

    #[test]
    fn load_bundle_decrypts_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("config.env");
        fs::write(&source, "DB_HOST=localhost\nDB_PASSWORD='hunter2'\n").unwrap();

        let key = MasterKey::generate();
        let encrypted = encrypt_file(&key, &source, None, false).unwrap();

        let bundle = load_bundle(&key, &encrypted).unwrap();
        assert_eq!(bundle.get("DB_HOST"), Some("localhost"));
        assert_eq!(bundle.get("DB_PASSWORD"), Some("hunter2"));

        // Wrong key never yields a bundle.
        let other = MasterKey::generate();
        assert!(matches!(
            load_bundle(&other, &encrypted),
            Err(SecretsError::Crypto {
                source: CryptoError::DecryptionFailed
            })
        ));
    }

    #[test]
    fn retry_read_gives_up_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-written.encrypted");

        let err =
            read_encrypted_with_retry(&path, 2, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(
            err,
            SecretsError::Storage {
                source: StorageError::NotFound { .. }
            }
        ));
    }
}
