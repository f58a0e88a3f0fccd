//! `quasar encrypt` — encrypt a plaintext configuration bundle.

use std::path::PathBuf;

use clap::Args;
use quasar_secrets::{MasterKey, artifact};

#[derive(Args)]
pub struct EncryptArgs {
    /// Plaintext bundle to encrypt
    pub source: PathBuf,

    /// Explicit output path (default: source + `.encrypted`)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overwrite the output path if it already exists
    #[arg(long)]
    pub force: bool,
}

/// Execute the `encrypt` command.
pub fn execute(args: &EncryptArgs) -> anyhow::Result<()> {
    let key = MasterKey::from_env()?;
    let written = artifact::encrypt_file(&key, &args.source, args.output.as_deref(), args.force)?;

    println!("encrypted: {}", written.display());
    Ok(())
}
