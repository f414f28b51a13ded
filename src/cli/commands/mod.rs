use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::output::Output;

pub mod config;
pub mod encrypt;

#[derive(Parser)]
#[command(
    name = "batchcryptor",
    version = env!("CARGO_PKG_VERSION"),
    about = "Resumable bulk file encryption with per-file checksums",
    long_about = "Encrypts every file under the given paths, writing F.md5, F.gpg and F.gpg.md5 \
                  for each input. Artifacts that already exist are never rewritten, so an \
                  interrupted batch can simply be run again."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt files and write their checksums
    Encrypt(encrypt::EncryptArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.verbose > 0, self.quiet);

        match self.command {
            Commands::Encrypt(args) => encrypt::execute(args, self.config.as_deref(), &output).await,
            Commands::Config(args) => config::execute(args, self.config.as_deref()).await,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            // Per-file failures are still reported when quiet
            _ if quiet => tracing_subscriber::EnvFilter::new("error"),
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // stderr keeps stdout clean for `config show`
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
