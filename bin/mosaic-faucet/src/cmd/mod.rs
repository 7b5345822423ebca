mod new_account;
mod run;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mosaic_faucet::password::{PasswordFile, PasswordSource, PromptPassword};
pub use new_account::NewAccountArgs;
pub use run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "mosaic-faucet", version, about, long_about = None)]
pub struct MosaicFaucet {
    #[command(subcommand)]
    pub cmd: MosaicFaucetSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum MosaicFaucetSubcommand {
    /// Serve faucets for the given chains over HTTP
    Run(RunArgs),
    /// Create an encrypted account at a chain's configured keystore path
    NewAccount(NewAccountArgs),
}

impl MosaicFaucetSubcommand {
    pub async fn run(self) -> eyre::Result<()> {
        match self {
            Self::Run(args) => args.run().await,
            Self::NewAccount(args) => args.run(),
        }
    }
}

/// Reads passwords from `file` if given, otherwise prompts on the terminal.
fn password_source<'a>(
    file: Option<&Path>,
    chains: impl IntoIterator<Item = &'a str>,
) -> eyre::Result<Box<dyn PasswordSource>> {
    Ok(match file {
        Some(path) => Box::new(PasswordFile::load(path, chains)?),
        None => Box::new(PromptPassword),
    })
}

fn default_config_path() -> PathBuf {
    PathBuf::from(mosaic_faucet::config::DEFAULT_CONFIG_PATH)
}
