use std::{fmt, sync::Arc, time::Duration};

use serde_json::json;
use shared::{
    domain::{Address, Bytes, ChainId, TxKind, B256},
    error::WalletError,
    protocol::{methods, TransactionInput, TransactionReceipt, TransactionRequest},
};
use tracing::{debug, info};

use crate::WalletProvider;

/// Capability to read from and send transactions as one wallet account on one
/// chain. Valid until the wallet switches account or network.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    address: Address,
    chain_id: ChainId,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address, chain_id: ChainId) -> Self {
        Self {
            provider,
            address,
            chain_id,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Read-only `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
        let request = TransactionRequest {
            from: Some(self.address),
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(data),
            ..Default::default()
        };
        let raw = self
            .provider
            .request(methods::ETH_CALL, json!([request, "latest"]))
            .await?;
        serde_json::from_value(raw)
            .map_err(|err| WalletError::invalid_response(methods::ETH_CALL, err.to_string()))
    }

    /// Submits a transaction from this account. The `from` field of `tx` is
    /// always overwritten with the signer address.
    pub async fn send_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<PendingTransaction, WalletError> {
        tx.from = Some(self.address);
        let raw = self
            .provider
            .request(methods::ETH_SEND_TRANSACTION, json!([tx]))
            .await?;
        let tx_hash: B256 = serde_json::from_value(raw).map_err(|err| {
            WalletError::invalid_response(methods::ETH_SEND_TRANSACTION, err.to_string())
        })?;
        info!("wallet: submitted transaction {tx_hash} on chain {}", self.chain_id);
        Ok(PendingTransaction {
            provider: self.provider.clone(),
            tx_hash,
        })
    }
}

/// A submitted transaction that has not been observed in a block yet.
pub struct PendingTransaction {
    provider: Arc<dyn WalletProvider>,
    tx_hash: B256,
}

impl PendingTransaction {
    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub async fn receipt(&self) -> Result<Option<TransactionReceipt>, WalletError> {
        let raw = self
            .provider
            .request(methods::ETH_GET_TRANSACTION_RECEIPT, json!([self.tx_hash]))
            .await?;
        serde_json::from_value(raw).map_err(|err| {
            WalletError::invalid_response(methods::ETH_GET_TRANSACTION_RECEIPT, err.to_string())
        })
    }

    /// Polls until the transaction is mined. There is no deadline; a
    /// transaction that never gets mined keeps the caller waiting.
    pub async fn wait(self, poll_interval: Duration) -> Result<TransactionReceipt, WalletError> {
        loop {
            if let Some(receipt) = self.receipt().await? {
                debug!(
                    "wallet: transaction {} mined, success={}",
                    self.tx_hash,
                    receipt.status()
                );
                return Ok(receipt);
            }
            debug!("wallet: transaction {} pending", self.tx_hash);
            tokio::time::sleep(poll_interval).await;
        }
    }
}
