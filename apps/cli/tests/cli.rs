//! End-to-end tests for the `quasar` binary.

use assert_cmd::Command;
use predicates::prelude::*;

const KEY_ENV: &str = "QUASAR_MASTER_KEY";

fn quasar() -> Command {
    let mut cmd = Command::cargo_bin("quasar").expect("binary builds");
    cmd.env_remove(KEY_ENV);
    cmd
}

/// Run `generate-key` and return the base64 key from stdout.
fn generate_key() -> String {
    let output = quasar().arg("generate-key").output().expect("runs");
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .expect("utf8")
        .lines()
        .next()
        .expect("key line")
        .to_string()
}

#[test]
fn generate_key_prints_key_and_fingerprint() {
    quasar()
        .arg("generate-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("fingerprint:"));

    // 32 raw bytes render as 44 base64 characters.
    let key = generate_key();
    assert_eq!(key.len(), 44);
}

#[test]
fn missing_key_fails_before_touching_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config.env");
    std::fs::write(&source, "A=1\n").unwrap();

    quasar()
        .arg("encrypt")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains(KEY_ENV));

    // Nothing was written.
    assert!(!dir.path().join("config.env.encrypted").exists());
}

#[test]
fn malformed_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config.env");
    std::fs::write(&source, "A=1\n").unwrap();

    quasar()
        .arg("encrypt")
        .arg(&source)
        .env(KEY_ENV, "definitely-not-base64!")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid key format"));
}

#[test]
fn encrypt_then_decrypt_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config.env");
    std::fs::write(&source, "DB_HOST=localhost\nDB_PASSWORD=hunter2\n").unwrap();

    let key = generate_key();

    quasar()
        .arg("encrypt")
        .arg(&source)
        .env(KEY_ENV, &key)
        .assert()
        .success()
        .stdout(predicate::str::contains("config.env.encrypted"));

    let encrypted = dir.path().join("config.env.encrypted");
    assert!(encrypted.exists());

    let restored = dir.path().join("restored.env");
    quasar()
        .arg("decrypt")
        .arg(&encrypted)
        .arg("--output")
        .arg(&restored)
        .env(KEY_ENV, &key)
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(&restored).unwrap(),
        "DB_HOST=localhost\nDB_PASSWORD=hunter2\n"
    );
}

#[test]
fn existing_output_needs_force() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config.env");
    std::fs::write(&source, "A=1\n").unwrap();
    std::fs::write(dir.path().join("config.env.encrypted"), "occupied").unwrap();

    let key = generate_key();

    quasar()
        .arg("encrypt")
        .arg(&source)
        .env(KEY_ENV, &key)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to overwrite"));

    quasar()
        .arg("encrypt")
        .arg(&source)
        .arg("--force")
        .env(KEY_ENV, &key)
        .assert()
        .success();
}

#[test]
fn rotate_reencrypts_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config.env");
    std::fs::write(&source, "A=1\nB=2\n").unwrap();

    let old_key = generate_key();

    quasar()
        .arg("encrypt")
        .arg(&source)
        .env(KEY_ENV, &old_key)
        .assert()
        .success();

    let encrypted = dir.path().join("config.env.encrypted");
    let output = quasar()
        .arg("rotate")
        .arg(&encrypted)
        .arg("--reason")
        .arg("test rotation")
        .env(KEY_ENV, &old_key)
        .output()
        .expect("runs");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("rotation completed"));
    assert!(stdout.contains("next rotation due"));

    // The printed new key can decrypt the rotated artifact; the old no
    // longer can.
    let new_key = stdout.lines().rev().find(|l| !l.is_empty()).unwrap();
    let restored = dir.path().join("after-rotation.env");

    quasar()
        .arg("decrypt")
        .arg(&encrypted)
        .arg("--output")
        .arg(&restored)
        .env(KEY_ENV, &old_key)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));

    quasar()
        .arg("decrypt")
        .arg(&encrypted)
        .arg("--output")
        .arg(&restored)
        .env(KEY_ENV, new_key)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&restored).unwrap(), "A=1\nB=2\n");

    // A timestamped backup still opens under the old key.
    let backup = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().contains(".backup-"))
        .expect("backup exists");
    let backup_plain = dir.path().join("backup.env");
    quasar()
        .arg("decrypt")
        .arg(backup.path())
        .arg("--output")
        .arg(&backup_plain)
        .env(KEY_ENV, &old_key)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&backup_plain).unwrap(), "A=1\nB=2\n");

    // Status over the history file written next to the artifact.
    quasar()
        .arg("status")
        .arg("--history")
        .arg(dir.path().join("rotation_history.jsonl"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 completed"))
        .stdout(predicate::str::contains("not overdue"));
}
