use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{json_rpc_session, load_settings},
    deploy::{deploy_token, ContractArtifact},
};
use tracing_subscriber::EnvFilter;

/// Publishes the token contract, bound to an already deployed collectible.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compiled token contract (JSON with a `bytecode` field).
    #[arg(long, default_value = "artifacts/CryptoDevsToken.json")]
    artifact: PathBuf,
    /// Collectible address; defaults to the `nft` entry configured for the
    /// active chain, which may be set without a `token` entry.
    #[arg(long)]
    nft_address: Option<Address>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    let artifact = ContractArtifact::load(&args.artifact)?;
    let session = json_rpc_session(&settings)?;
    let signer = session
        .signer()
        .await
        .context("deployment needs an unlocked account on the node")?;

    let collectible = match args.nft_address {
        Some(address) => address,
        None => settings
            .collectible_for(signer.chain_id())
            .context("no collectible configured for this chain; pass --nft-address")?,
    };

    let address = deploy_token(
        &signer,
        &artifact,
        collectible,
        settings.receipt_poll_interval(),
    )
    .await?;
    println!("CryptoDevToken deployed to: {address}");

    Ok(())
}
