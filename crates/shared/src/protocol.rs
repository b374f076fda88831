//! JSON shapes exchanged with a wallet provider or a JSON-RPC node.

pub use alloy_rpc_types_eth::{TransactionInput, TransactionReceipt, TransactionRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ChainId;

pub mod methods {
    pub const ETH_ACCOUNTS: &str = "eth_accounts";
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ETH_CHAIN_ID: &str = "eth_chainId";
    pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ETH_CALL: &str = "eth_call";
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

/// Single element of the `wallet_switchEthereumChain` params array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: ChainId,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Address, Bytes, TxKind, B256, U256};

    #[test]
    fn transaction_request_omits_unset_fields() {
        let request = TransactionRequest {
            from: Some(Address::repeat_byte(0x11)),
            to: Some(TxKind::Call(Address::repeat_byte(0x22))),
            value: Some(U256::from(3_000_000_000_000_000u64)),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["value"], json!("0xaa87bee538000"));
        assert!(value.get("input").is_none());
        assert!(value.get("gas").is_none());
        assert_eq!(
            value["to"].as_str().expect("to").to_ascii_lowercase(),
            format!("0x{}", "22".repeat(20))
        );
    }

    #[test]
    fn call_data_accepted_under_either_key() {
        let legacy: TransactionRequest = serde_json::from_value(json!({
            "to": format!("0x{}", "22".repeat(20)),
            "data": "0x18160ddd",
        }))
        .expect("data key");
        assert_eq!(
            legacy.input.input(),
            Some(&Bytes::from_static(&[0x18, 0x16, 0x0d, 0xdd]))
        );
    }

    fn node_receipt(status: &str) -> serde_json::Value {
        json!({
            "type": "0x2",
            "status": status,
            "cumulativeGasUsed": "0x5208",
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "transactionIndex": "0x0",
            "blockHash": format!("0x{}", "cd".repeat(32)),
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": format!("0x{}", "11".repeat(20)),
            "to": format!("0x{}", "22".repeat(20)),
            "contractAddress": null,
        })
    }

    #[test]
    fn receipt_status_decides_success() {
        let mined: TransactionReceipt =
            serde_json::from_value(node_receipt("0x1")).expect("mined receipt");
        assert!(mined.status());
        assert_eq!(mined.transaction_hash, B256::repeat_byte(0xab));
        assert_eq!(mined.contract_address, None);

        let reverted: TransactionReceipt =
            serde_json::from_value(node_receipt("0x0")).expect("reverted receipt");
        assert!(!reverted.status());
    }

    #[test]
    fn switch_params_use_hex_chain_id() {
        let params = SwitchChainParams {
            chain_id: ChainId(4),
        };
        assert_eq!(
            serde_json::to_value([params]).expect("serialize"),
            json!([{ "chainId": "0x4" }])
        );
    }
}
