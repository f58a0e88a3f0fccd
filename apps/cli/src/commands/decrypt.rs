//! `quasar decrypt` — decrypt an encrypted artifact.

use std::path::PathBuf;

use clap::Args;
use quasar_secrets::{MasterKey, artifact};

#[derive(Args)]
pub struct DecryptArgs {
    /// Encrypted artifact to decrypt
    pub source: PathBuf,

    /// Explicit output path (default: source with `.encrypted` stripped)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overwrite the output path if it already exists
    #[arg(long)]
    pub force: bool,
}

/// Execute the `decrypt` command.
pub fn execute(args: &DecryptArgs) -> anyhow::Result<()> {
    let key = MasterKey::from_env()?;
    let written = artifact::decrypt_file(&key, &args.source, args.output.as_deref(), args.force)?;

    println!("decrypted: {}", written.display());
    Ok(())
}
