//! mosaic-faucet: hands out base coins and EIP20 tokens on the chains it is
//! started with.

mod cmd;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mosaic_faucet=info"));
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .init();

    let args = cmd::MosaicFaucet::parse();
    args.cmd.run().await
}
