use std::path::PathBuf;

use clap::Parser;
use mosaic_faucet::{Config, keystore};

#[derive(Parser, Debug)]
pub struct NewAccountArgs {
    /// Chain whose keystore to create
    chain: String,

    /// Path to the config file
    #[arg(short, long, default_value_os_t = super::default_config_path())]
    config: PathBuf,

    /// TOML file mapping chain names to keystore passwords. Prompts when
    /// omitted.
    #[arg(short = 'n', long)]
    password_file: Option<PathBuf>,
}

impl NewAccountArgs {
    pub fn run(self) -> eyre::Result<()> {
        let config = Config::load(&self.config)?;
        let path = config.keystore_path(&self.chain)?;

        let passwords =
            super::password_source(self.password_file.as_deref(), [self.chain.as_str()])?;
        let password = passwords.new_password_for(&self.chain)?;

        let signer = keystore::create(&self.chain, &path, &password)?;
        println!("{}", signer.address());

        Ok(())
    }
}
