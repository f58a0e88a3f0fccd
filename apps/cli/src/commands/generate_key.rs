//! `quasar generate-key` — mint a fresh master key.

use quasar_secrets::{MASTER_KEY_ENV, MasterKey};

/// Execute the `generate-key` command.
///
/// The raw key goes to stdout on its own line so it can be piped; the
/// fingerprint and usage hint follow.
pub fn execute() -> anyhow::Result<()> {
    let key = MasterKey::generate();

    println!("{}", key.to_base64());
    println!("fingerprint: {}", key.fingerprint().short());
    println!("export it as {MASTER_KEY_ENV} to make it the active key");
    Ok(())
}
