use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{Address, ChainId},
    error::WalletError,
    networks::NetworkTable,
    protocol::{methods, SwitchChainParams},
};
use tracing::{info, warn};

pub mod json_rpc;
pub mod signer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use json_rpc::JsonRpcWallet;
pub use signer::{PendingTransaction, Signer};

/// EIP-1193 request surface of a wallet: one method name plus JSON params in,
/// one JSON result out.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
}

/// Resolves accounts, networks and signers against a possibly-absent wallet
/// provider. Nothing is cached: every call asks the provider again, so account
/// or network switches made in the wallet are picked up on the next call.
#[derive(Clone, Default)]
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    networks: NetworkTable,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider: Some(provider),
            networks: NetworkTable::default(),
        }
    }

    /// A session with no wallet installed.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_networks(mut self, networks: NetworkTable) -> Self {
        self.networks = networks;
        self
    }

    pub fn networks(&self) -> &NetworkTable {
        &self.networks
    }

    pub fn detect_wallet(&self) -> Result<Arc<dyn WalletProvider>, WalletError> {
        match &self.provider {
            Some(provider) => Ok(provider.clone()),
            None => {
                warn!("wallet: no provider detected, install a wallet to continue");
                Err(WalletError::ProviderAbsent)
            }
        }
    }

    /// First account the wallet has already authorized. Never prompts.
    pub async fn current_account(&self) -> Result<Address, WalletError> {
        let provider = self.detect_wallet()?;
        let account = first_account(provider.as_ref(), methods::ETH_ACCOUNTS).await?;
        info!("wallet: found an authorized account {account}");
        Ok(account)
    }

    /// Prompts the user for account access and returns the first granted account.
    pub async fn request_connection(&self) -> Result<Address, WalletError> {
        let provider = self.detect_wallet()?;
        let account = first_account(provider.as_ref(), methods::ETH_REQUEST_ACCOUNTS).await?;
        info!("wallet: connected account {account}");
        Ok(account)
    }

    pub async fn current_chain_id(&self) -> Result<ChainId, WalletError> {
        let provider = self.detect_wallet()?;
        chain_id(provider.as_ref()).await
    }

    pub async fn current_network(&self) -> Result<Network, WalletError> {
        let chain_id = self.current_chain_id().await?;
        match self.networks.name(chain_id) {
            Some(name) => Ok(Network {
                chain_id,
                name: name.to_string(),
            }),
            None => {
                warn!("wallet: chain id {chain_id} is not in the network table");
                Err(WalletError::UnknownNetwork(chain_id))
            }
        }
    }

    pub async fn switch_network(&self, target: ChainId) -> Result<(), WalletError> {
        let provider = self.detect_wallet()?;
        let params = serde_json::to_value([SwitchChainParams { chain_id: target }])
            .map_err(|err| {
                WalletError::invalid_response(methods::WALLET_SWITCH_ETHEREUM_CHAIN, err.to_string())
            })?;
        provider
            .request(methods::WALLET_SWITCH_ETHEREUM_CHAIN, params)
            .await?;
        info!("wallet: switched to chain {target}");
        Ok(())
    }

    /// A signer bound to the account and chain active right now. Callers must
    /// resolve a new one for every operation instead of holding on to it.
    pub async fn signer(&self) -> Result<Signer, WalletError> {
        let provider = self.detect_wallet()?;
        let address = first_account(provider.as_ref(), methods::ETH_ACCOUNTS).await?;
        let chain_id = chain_id(provider.as_ref()).await?;
        Ok(Signer::new(provider, address, chain_id))
    }
}

async fn first_account(provider: &dyn WalletProvider, method: &str) -> Result<Address, WalletError> {
    let accounts = provider.request(method, json!([])).await?;
    let accounts: Vec<String> = serde_json::from_value(accounts)
        .map_err(|err| WalletError::invalid_response(method, err.to_string()))?;
    let Some(first) = accounts.first() else {
        info!("wallet: no authorized account found");
        return Err(WalletError::NoAccount);
    };
    first
        .parse::<Address>()
        .map_err(|err| WalletError::invalid_response(method, format!("{first}: {err}")))
}

async fn chain_id(provider: &dyn WalletProvider) -> Result<ChainId, WalletError> {
    let raw = provider.request(methods::ETH_CHAIN_ID, json!([])).await?;
    serde_json::from_value(raw)
        .map_err(|err| WalletError::invalid_response(methods::ETH_CHAIN_ID, err.to_string()))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
