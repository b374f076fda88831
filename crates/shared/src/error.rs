use thiserror::Error;

use crate::domain::{ChainId, B256};

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193 "unauthorized": the account or method has not been authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// `wallet_switchEthereumChain`: the wallet does not know the chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ProviderAbsent,
    AuthorizationDenied,
    NetworkUnresolvable,
    ContractCall,
    Deployment,
    Configuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet provider detected")]
    ProviderAbsent,
    #[error("wallet has no authorized account")]
    NoAccount,
    #[error("wallet request denied: {0}")]
    AuthorizationDenied(String),
    #[error("unknown network with chain id {0}")]
    UnknownNetwork(ChainId),
    #[error("wallet rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("wallet transport failure: {0}")]
    Transport(String),
    #[error("invalid wallet response to {method}: {message}")]
    InvalidResponse { method: String, message: String },
}

impl WalletError {
    /// Maps a provider error object onto the taxonomy; rejection codes
    /// become `AuthorizationDenied`.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            USER_REJECTED_REQUEST | UNAUTHORIZED => Self::AuthorizationDenied(message),
            _ => Self::Rpc { code, message },
        }
    }

    pub fn invalid_response(method: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method: method.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProviderAbsent => ErrorCode::ProviderAbsent,
            Self::NoAccount | Self::AuthorizationDenied(_) => ErrorCode::AuthorizationDenied,
            Self::UnknownNetwork(_) => ErrorCode::NetworkUnresolvable,
            Self::Rpc { code, .. } if *code == UNRECOGNIZED_CHAIN => {
                ErrorCode::NetworkUnresolvable
            }
            Self::Rpc { .. } | Self::Transport(_) | Self::InvalidResponse { .. } => {
                ErrorCode::ContractCall
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum DappError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("contract call {method} failed: {message}")]
    ContractCall { method: String, message: String },
    #[error("could not decode {method} result: {message}")]
    Decode { method: String, message: String },
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
    #[error("no contract addresses configured for chain {0}")]
    UnsupportedNetwork(ChainId),
    #[error("deployment failed: {0}")]
    Deployment(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DappError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Wallet(err) => err.code(),
            Self::ContractCall { .. } | Self::Decode { .. } | Self::Reverted { .. } => {
                ErrorCode::ContractCall
            }
            Self::UnsupportedNetwork(_) => ErrorCode::NetworkUnresolvable,
            Self::Deployment(_) => ErrorCode::Deployment,
            Self::Configuration(_) => ErrorCode::Configuration,
        }
    }
}
