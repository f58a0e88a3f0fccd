//! `quasar status` — rotation history summary.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use quasar_secrets::{AuditStore, FileAuditStore, RotationStatus};

#[derive(Args)]
pub struct StatusArgs {
    /// Rotation history file
    #[arg(long, default_value = "rotation_history.jsonl")]
    pub history: PathBuf,
}

/// Execute the `status` command.
pub fn execute(args: &StatusArgs) -> anyhow::Result<()> {
    let store = FileAuditStore::new(&args.history);
    let records = store.load()?;

    if records.is_empty() {
        println!("no rotations recorded");
        return Ok(());
    }

    let completed = records
        .iter()
        .filter(|r| r.status == RotationStatus::Completed)
        .count();
    let failed = records
        .iter()
        .filter(|r| r.status == RotationStatus::Failed)
        .count();
    println!("rotations: {} total, {completed} completed, {failed} failed", records.len());

    match store.latest_completed()? {
        Some(record) => {
            if let Some(at) = record.completed_at {
                println!("last completed: {} ({})", at.format("%Y-%m-%d"), record.id);
            }
            if let Some(due) = record.next_rotation_due {
                println!("next rotation due: {}", due.format("%Y-%m-%d"));
            }
            if store.is_overdue(Utc::now())? {
                println!("rotation is OVERDUE");
            } else {
                println!("rotation is not overdue");
            }
        }
        None => println!("no completed rotation yet"),
    }

    Ok(())
}
