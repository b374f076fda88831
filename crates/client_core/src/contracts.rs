use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use shared::{
    domain::TxKind,
    error::{DappError, WalletError},
    protocol::{TransactionInput, TransactionRequest},
};
use tracing::debug;
use wallet::{PendingTransaction, Signer};

sol! {
    /// Collectible (ERC-721 enumerable) surface read by this client.
    interface ICryptoDevs {
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
    }

    /// Token (ERC-20) surface read and written by this client.
    interface ICryptoDevsToken {
        function owner() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
        function erc721_tokenIds_claimed(uint256 tokenId) external view returns (bool);
        function totalSupply() external view returns (uint256);
        function mint(uint256 amount) external payable;
        function claim() external;
    }
}

/// Contract address plus the signer it talks through. Built for one operation
/// and dropped afterwards.
pub struct ContractHandle<'a> {
    signer: &'a Signer,
    address: Address,
}

impl<'a> ContractHandle<'a> {
    pub fn new(signer: &'a Signer, address: Address) -> Self {
        Self { signer, address }
    }

    pub async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, DappError> {
        debug!("contract: read {} at {}", C::SIGNATURE, self.address);
        let output = self
            .signer
            .call(self.address, Bytes::from(call.abi_encode()))
            .await
            .map_err(|err| call_error(C::SIGNATURE, err))?;
        C::abi_decode_returns(&output[..]).map_err(|err| DappError::Decode {
            method: C::SIGNATURE.to_string(),
            message: err.to_string(),
        })
    }

    pub async fn send<C: SolCall>(
        &self,
        call: C,
        value: Option<U256>,
    ) -> Result<PendingTransaction, DappError> {
        debug!("contract: send {} to {}", C::SIGNATURE, self.address);
        let tx = TransactionRequest {
            from: Some(self.signer.address()),
            to: Some(TxKind::Call(self.address)),
            value,
            input: TransactionInput::new(Bytes::from(call.abi_encode())),
            ..Default::default()
        };
        self.signer
            .send_transaction(tx)
            .await
            .map_err(|err| call_error(C::SIGNATURE, err))
    }
}

/// Node and contract failures become `ContractCall`; wallet-level outcomes
/// such as a rejected prompt keep their own classification.
fn call_error(method: &str, err: WalletError) -> DappError {
    match err {
        WalletError::Rpc { .. } | WalletError::InvalidResponse { .. } => DappError::ContractCall {
            method: method.to_string(),
            message: err.to_string(),
        },
        other => DappError::Wallet(other),
    }
}
