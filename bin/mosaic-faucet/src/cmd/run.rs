use std::{net::IpAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use eyre::WrapErr as _;
use mosaic_faucet::{Config, FaucetRegistry, server};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Chains to serve, as named in the config file
    #[arg(required = true)]
    chains: Vec<String>,

    /// Path to the config file
    #[arg(short, long, default_value_os_t = super::default_config_path())]
    config: PathBuf,

    #[arg(short, long, default_value_t = 80)]
    port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// TOML file mapping chain names to keystore passwords. Prompts when
    /// omitted.
    #[arg(short = 'n', long)]
    password_file: Option<PathBuf>,
}

impl RunArgs {
    pub async fn run(self) -> eyre::Result<()> {
        let config = Config::load(&self.config)?;
        let passwords = super::password_source(
            self.password_file.as_deref(),
            self.chains.iter().map(String::as_str),
        )?;

        let registry = FaucetRegistry::connect(&config, &self.chains, passwords.as_ref()).await?;
        for chain in registry.chains() {
            if let Some(faucet) = registry.get(chain) {
                tracing::info!(%chain, address = %faucet.address(), "funding from account");
            }
        }

        let listener = TcpListener::bind((self.host, self.port))
            .await
            .wrap_err_with(|| format!("failed to bind {}:{}", self.host, self.port))?;
        server::serve(listener, Arc::new(registry)).await?;

        Ok(())
    }
}
