use std::{path::PathBuf, sync::Arc};

use alloy_primitives::utils::format_ether;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{json_rpc_session, load_settings},
    mint_price,
    notify::ConsoleNotifier,
    TokenService,
};
use shared::{
    domain::ChainId,
    error::{DappError, ErrorCode, WalletError},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wallet::WalletSession;

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; `dapp.toml` in the working directory when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Account, network, balances and eligibility in one view.
    Status,
    /// Already-authorized account, without prompting.
    Account,
    /// Ask the wallet for account access.
    Connect,
    Network,
    /// Switch by chain id (`4`, `0x4`) or network name (`rinkeby`).
    SwitchNetwork {
        target: String,
    },
    IsOwner,
    Claimable,
    Balance,
    TotalMinted,
    Mint {
        quantity: u64,
    },
    Claim,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(err) = &result {
        if let Some(code) = error_code(err) {
            error!("dapp: command failed ({code:?})");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref()).context("failed to load settings")?;
    let session = json_rpc_session(&settings).context("failed to open wallet session")?;
    let service = TokenService::from_settings(&settings, Arc::new(ConsoleNotifier));
    info!(
        "dapp: chain {} with contracts on {} network(s)",
        settings.chain_id,
        settings.contracts.len()
    );

    match cli.command {
        Command::Status => print_status(&session, &service).await,
        Command::Account => {
            let account = session.current_account().await?;
            println!("account: {account}");
        }
        Command::Connect => {
            let account = session.request_connection().await?;
            println!("connected: {account}");
        }
        Command::Network => {
            let network = session.current_network().await?;
            println!("network: {} (chain id {})", network.name, network.chain_id);
        }
        Command::SwitchNetwork { target } => {
            let chain_id = resolve_chain(&session, &target)?;
            session.switch_network(chain_id).await?;
            println!("switched to chain {chain_id}");
        }
        Command::IsOwner => {
            println!("owner: {}", service.try_is_owner(&session).await?);
        }
        Command::Claimable => {
            println!("claimable: {}", service.try_claimable_count(&session).await?);
        }
        Command::Balance => {
            let balance = service.try_token_balance(&session).await?;
            println!("balance: {} CD", format_ether(balance));
        }
        Command::TotalMinted => {
            let total = service.try_total_minted(&session).await?;
            println!("total minted: {} CD", format_ether(total));
        }
        Command::Mint { quantity } => {
            println!(
                "minting {quantity} CD for {} ETH",
                format_ether(mint_price(quantity))
            );
            let receipt = service.mint(&session, quantity).await?;
            println!("transaction: {}", receipt.transaction_hash);
        }
        Command::Claim => {
            let receipt = service.claim(&session).await?;
            println!("transaction: {}", receipt.transaction_hash);
        }
    }

    Ok(())
}

/// Taxonomy code of the first wallet or dapp failure in the error chain.
fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<DappError>()
            .map(DappError::code)
            .or_else(|| cause.downcast_ref::<WalletError>().map(WalletError::code))
    })
}

fn resolve_chain(session: &WalletSession, target: &str) -> Result<ChainId> {
    if let Ok(chain_id) = target.parse::<ChainId>() {
        return Ok(chain_id);
    }
    session
        .networks()
        .chain_id(target)
        .with_context(|| format!("unknown network '{target}'"))
}

async fn print_status(session: &WalletSession, service: &TokenService) {
    match session.current_account().await {
        Ok(account) => println!("account:      {account}"),
        Err(err) => println!("account:      not connected ({err})"),
    }
    match session.current_network().await {
        Ok(network) => println!("network:      {} ({})", network.name, network.chain_id),
        Err(err) => println!("network:      {err}"),
    }
    println!(
        "balance:      {} CD",
        format_ether(service.token_balance(session).await)
    );
    println!("claimable:    {}", service.claimable_count(session).await);
    println!(
        "total minted: {} CD",
        format_ether(service.total_minted(session).await)
    );
    println!("owner:        {}", service.is_owner(session).await);
}
