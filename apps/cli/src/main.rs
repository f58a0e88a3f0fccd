//! `quasar` — administrative surface for the encrypted secrets store.
//!
//! Thin dispatcher: every subcommand parses its flags and calls into
//! `quasar-secrets`; no behavior lives in this layer.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quasar",
    version,
    about = "Encrypted configuration secrets store with master-key rotation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh master key and print it with its fingerprint
    GenerateKey,

    /// Encrypt a plaintext configuration bundle
    Encrypt(commands::encrypt::EncryptArgs),

    /// Decrypt an encrypted artifact
    Decrypt(commands::decrypt::DecryptArgs),

    /// Rotate the active master key, re-encrypting the artifact
    Rotate(commands::rotate::RotateArgs),

    /// Report the last completed rotation and whether one is overdue
    Status(commands::status::StatusArgs),
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::GenerateKey => commands::generate_key::execute(),
        Command::Encrypt(args) => commands::encrypt::execute(&args),
        Command::Decrypt(args) => commands::decrypt::execute(&args),
        Command::Rotate(args) => commands::rotate::execute(&args),
        Command::Status(args) => commands::status::execute(&args),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
