use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use crate::config::AppConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration as TOML
    Show,
}

pub async fn execute(args: ConfigArgs, custom_config: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = AppConfig::load(custom_config, None)?;
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
