//! `quasar rotate` — replace the active master key.
//!
//! Runs the full rotation protocol against one artifact and reports the
//! outcome. The new key is printed for the operator to install; this
//! process never writes key material anywhere itself.

use std::path::{Path, PathBuf};

use clap::Args;
use quasar_secrets::{
    AuditStore, FileAuditStore, MASTER_KEY_ENV, MasterKey, RotationOrchestrator,
};

/// Default history file name, resolved next to the artifact.
const DEFAULT_HISTORY_FILE: &str = "rotation_history.jsonl";

#[derive(Args)]
pub struct RotateArgs {
    /// Artifact to rotate (plaintext or `.encrypted` path)
    pub artifact: PathBuf,

    /// Why this rotation is happening (recorded in the audit trail)
    #[arg(long, default_value = "scheduled quarterly rotation")]
    pub reason: String,

    /// Skip the backup step. Without a backup a failed rotation cannot
    /// roll back automatically.
    #[arg(long)]
    pub no_backup: bool,

    /// Rotation history file (default: rotation_history.jsonl beside the
    /// artifact)
    #[arg(long)]
    pub history: Option<PathBuf>,
}

/// Execute the `rotate` command.
pub fn execute(args: &RotateArgs) -> anyhow::Result<()> {
    let old_key = MasterKey::from_env()?;
    let store = FileAuditStore::new(history_path(args));
    tracing::debug!(history = %store.path().display(), "recording rotation history");
    let orchestrator = RotationOrchestrator::new(&store).with_backup(!args.no_backup);

    match orchestrator.rotate(&old_key, &args.artifact, &args.reason) {
        Ok(outcome) => {
            let record = &outcome.record;
            println!("rotation completed: {}", record.id);
            println!("artifact:        {}", outcome.encrypted_path.display());
            if let Some(backup) = &outcome.backup_path {
                println!("backup:          {}", backup.display());
            }
            if let (Some(old_fp), Some(new_fp)) =
                (&record.old_key_fingerprint, &record.new_key_fingerprint)
            {
                println!("old key:         {}", old_fp.short());
                println!("new key:         {}", new_fp.short());
            }
            if let Some(due) = record.next_rotation_due {
                println!("next rotation due: {}", due.format("%Y-%m-%d"));
            }
            println!();
            println!("new master key (install as {MASTER_KEY_ENV}):");
            println!("{}", outcome.new_key.to_base64());
            Ok(())
        }
        Err(err) => {
            eprintln!("rotation failed; the old master key remains usable");
            if let Some(backup) = last_backup_path(&store) {
                eprintln!("backup left at: {}", backup.display());
            }
            Err(err.into())
        }
    }
}

fn history_path(args: &RotateArgs) -> PathBuf {
    args.history.clone().unwrap_or_else(|| {
        args.artifact
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_HISTORY_FILE)
    })
}

/// Backup location of the most recent attempt, if it made one.
fn last_backup_path(store: &FileAuditStore) -> Option<PathBuf> {
    store
        .load()
        .ok()?
        .last()
        .and_then(|record| record.backup_path.clone())
}
