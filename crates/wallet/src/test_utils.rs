//! In-memory wallet provider for tests.
//!
//! `MockWallet` answers the EIP-1193 methods the session and signer use,
//! records every request it sees, and delegates `eth_call` to a pluggable
//! handler so tests can simulate contract state.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{Address, Bytes, ChainId, TxKind, B256, U256},
    error::{WalletError, USER_REJECTED_REQUEST},
    protocol::{methods, SwitchChainParams, TransactionRequest},
};

use crate::WalletProvider;

pub type CallHandler = Arc<dyn Fn(Address, &Bytes) -> Result<Bytes, WalletError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub params: Value,
}

struct PendingReceipt {
    polls_left: usize,
    from: Address,
    to: Option<Address>,
    success: bool,
    contract_address: Option<Address>,
}

struct MockState {
    authorized: Vec<String>,
    grantable: Vec<String>,
    reject_connection: bool,
    reject_switch: bool,
    chain_id: ChainId,
    call_handler: Option<CallHandler>,
    reject_transactions: bool,
    revert_transactions: bool,
    polls_before_mined: usize,
    deployed_address: Option<Address>,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<B256, PendingReceipt>,
    requests: Vec<RecordedRequest>,
}

pub struct MockWallet {
    state: Mutex<MockState>,
}

impl MockWallet {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            state: Mutex::new(MockState {
                authorized: Vec::new(),
                grantable: Vec::new(),
                reject_connection: false,
                reject_switch: false,
                chain_id,
                call_handler: None,
                reject_transactions: false,
                revert_transactions: false,
                polls_before_mined: 0,
                deployed_address: None,
                sent: Vec::new(),
                receipts: HashMap::new(),
                requests: Vec::new(),
            }),
        }
    }

    /// Accounts returned by `eth_accounts` without prompting.
    pub fn with_accounts<I, S>(self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().authorized = accounts.into_iter().map(Into::into).collect();
        self
    }

    /// Accounts the user grants when prompted by `eth_requestAccounts`.
    pub fn with_grantable_accounts<I, S>(self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().grantable = accounts.into_iter().map(Into::into).collect();
        self
    }

    pub fn rejecting_connection(self) -> Self {
        self.lock().reject_connection = true;
        self
    }

    pub fn rejecting_switch(self) -> Self {
        self.lock().reject_switch = true;
        self
    }

    pub fn with_call_handler<F>(self, handler: F) -> Self
    where
        F: Fn(Address, &Bytes) -> Result<Bytes, WalletError> + Send + Sync + 'static,
    {
        self.lock().call_handler = Some(Arc::new(handler));
        self
    }

    /// Number of `null` receipts served before a transaction shows up mined.
    pub fn with_receipt_delay(self, polls: usize) -> Self {
        self.lock().polls_before_mined = polls;
        self
    }

    pub fn rejecting_transactions(self) -> Self {
        self.lock().reject_transactions = true;
        self
    }

    pub fn reverting_transactions(self) -> Self {
        self.lock().revert_transactions = true;
        self
    }

    /// Address reported in receipts of contract creation transactions.
    pub fn with_deployed_address(self, address: Address) -> Self {
        self.lock().deployed_address = Some(address);
        self
    }

    pub fn set_accounts<I, S>(&self, accounts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().authorized = accounts.into_iter().map(Into::into).collect();
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.lock().chain_id = chain_id;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method)
            .cloned()
            .collect()
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `eth_getTransactionReceipt` result for a transaction mined in block 1, in
/// the shape a node returns it.
pub fn receipt_json(
    tx_hash: B256,
    from: Address,
    to: Option<Address>,
    success: bool,
    contract_address: Option<Address>,
) -> Value {
    let status = if success { "0x1" } else { "0x0" };
    json!({
        "type": "0x2",
        "status": status,
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0x01),
        "blockNumber": "0x1",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "from": from,
        "to": to,
        "contractAddress": contract_address,
    })
}

fn rejected() -> WalletError {
    WalletError::from_rpc(USER_REJECTED_REQUEST, "User rejected the request.")
}

fn invalid_params(method: &str, message: impl Into<String>) -> WalletError {
    WalletError::invalid_response(method, message)
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: method.to_string(),
            params: params.clone(),
        });

        match method {
            methods::ETH_ACCOUNTS => Ok(json!(state.authorized)),
            methods::ETH_REQUEST_ACCOUNTS => {
                if state.reject_connection {
                    return Err(rejected());
                }
                if state.authorized.is_empty() {
                    state.authorized = state.grantable.clone();
                }
                Ok(json!(state.authorized))
            }
            methods::ETH_CHAIN_ID => Ok(json!(state.chain_id.to_hex())),
            methods::WALLET_SWITCH_ETHEREUM_CHAIN => {
                if state.reject_switch {
                    return Err(rejected());
                }
                let [SwitchChainParams { chain_id }]: [SwitchChainParams; 1] =
                    serde_json::from_value(params)
                        .map_err(|err| invalid_params(method, err.to_string()))?;
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            methods::ETH_CALL => {
                let request: TransactionRequest = params
                    .get(0)
                    .cloned()
                    .ok_or_else(|| invalid_params(method, "missing call object"))
                    .and_then(|value| {
                        serde_json::from_value(value)
                            .map_err(|err| invalid_params(method, err.to_string()))
                    })?;
                let to = request
                    .to
                    .as_ref()
                    .and_then(TxKind::to)
                    .copied()
                    .ok_or_else(|| invalid_params(method, "missing call target"))?;
                let data = request.input.input().cloned().unwrap_or_default();
                let handler = state
                    .call_handler
                    .clone()
                    .ok_or_else(|| WalletError::from_rpc(-32000, "execution reverted"))?;
                drop(state);
                let output = handler(to, &data)?;
                Ok(json!(output))
            }
            methods::ETH_SEND_TRANSACTION => {
                if state.reject_transactions {
                    return Err(rejected());
                }
                let request: TransactionRequest = params
                    .get(0)
                    .cloned()
                    .ok_or_else(|| invalid_params(method, "missing transaction object"))
                    .and_then(|value| {
                        serde_json::from_value(value)
                            .map_err(|err| invalid_params(method, err.to_string()))
                    })?;
                let from = request.from.unwrap_or_default();
                let to = request.to.as_ref().and_then(TxKind::to).copied();
                state.sent.push(request);
                let tx_hash = B256::from(U256::from(state.sent.len()));
                let pending = PendingReceipt {
                    polls_left: state.polls_before_mined,
                    from,
                    to,
                    success: !state.revert_transactions,
                    contract_address: match to {
                        Some(_) => None,
                        None => state.deployed_address,
                    },
                };
                state.receipts.insert(tx_hash, pending);
                Ok(json!(tx_hash))
            }
            methods::ETH_GET_TRANSACTION_RECEIPT => {
                let tx_hash: B256 = params
                    .get(0)
                    .cloned()
                    .ok_or_else(|| invalid_params(method, "missing transaction hash"))
                    .and_then(|value| {
                        serde_json::from_value(value)
                            .map_err(|err| invalid_params(method, err.to_string()))
                    })?;
                let Some(pending) = state.receipts.get_mut(&tx_hash) else {
                    return Ok(Value::Null);
                };
                if pending.polls_left > 0 {
                    pending.polls_left -= 1;
                    return Ok(Value::Null);
                }
                Ok(receipt_json(
                    tx_hash,
                    pending.from,
                    pending.to,
                    pending.success,
                    pending.contract_address,
                ))
            }
            _ => Err(WalletError::Rpc {
                code: -32601,
                message: format!("method {method} not supported"),
            }),
        }
    }
}
