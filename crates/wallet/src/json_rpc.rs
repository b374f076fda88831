use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::ChainId,
    error::{WalletError, UNRECOGNIZED_CHAIN},
    protocol::{methods, JsonRpcRequest, JsonRpcResponse, SwitchChainParams},
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::WalletProvider;

/// Wallet provider backed by JSON-RPC nodes whose accounts are unlocked on the
/// node itself, one endpoint per chain. Those accounts count as already
/// authorized, so `eth_requestAccounts` is answered with `eth_accounts`.
/// Switching networks selects another configured endpoint.
pub struct JsonRpcWallet {
    http: Client,
    endpoints: BTreeMap<ChainId, Url>,
    active: RwLock<ChainId>,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(endpoints: BTreeMap<ChainId, Url>, active: ChainId) -> Result<Self, WalletError> {
        if !endpoints.contains_key(&active) {
            return Err(WalletError::UnknownNetwork(active));
        }
        Ok(Self {
            http: Client::new(),
            endpoints,
            active: RwLock::new(active),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn active_chain(&self) -> ChainId {
        *self.active.read().await
    }

    async fn active_endpoint(&self) -> Result<Url, WalletError> {
        let active = self.active_chain().await;
        self.endpoints
            .get(&active)
            .cloned()
            .ok_or(WalletError::UnknownNetwork(active))
    }

    async fn forward(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let endpoint = self.active_endpoint().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("json-rpc: -> {method} id={id} endpoint={endpoint}");

        let response: JsonRpcResponse = self
            .http
            .post(endpoint)
            .json(&JsonRpcRequest::new(id, method, params))
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|err| WalletError::Transport(err.to_string()))?
            .json()
            .await
            .map_err(|err| WalletError::invalid_response(method, err.to_string()))?;

        if let Some(error) = response.error {
            debug!("json-rpc: <- {method} id={id} error {}", error.code);
            return Err(WalletError::from_rpc(error.code, error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn switch_chain(&self, params: Value) -> Result<Value, WalletError> {
        let [SwitchChainParams { chain_id }]: [SwitchChainParams; 1] =
            serde_json::from_value(params).map_err(|err| WalletError::Rpc {
                code: -32602,
                message: format!("invalid params: {err}"),
            })?;
        if !self.endpoints.contains_key(&chain_id) {
            return Err(WalletError::from_rpc(
                UNRECOGNIZED_CHAIN,
                format!("Unrecognized chain ID \"{}\"", chain_id.to_hex()),
            ));
        }
        *self.active.write().await = chain_id;
        info!("json-rpc: active chain is now {chain_id}");
        Ok(Value::Null)
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        match method {
            methods::ETH_REQUEST_ACCOUNTS => self.forward(methods::ETH_ACCOUNTS, params).await,
            methods::WALLET_SWITCH_ETHEREUM_CHAIN => self.switch_chain(params).await,
            _ => self.forward(method, params).await,
        }
    }
}

#[cfg(test)]
#[path = "tests/json_rpc_tests.rs"]
mod tests;
