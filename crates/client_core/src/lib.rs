use std::{collections::BTreeMap, sync::Arc, time::Duration};

use alloy_primitives::U256;
use shared::{
    domain::{ChainId, ContractAddresses},
    error::DappError,
    protocol::TransactionReceipt,
};
use tracing::{error, info};
use wallet::{PendingTransaction, Signer, WalletSession};

pub mod config;
pub mod contracts;
pub mod deploy;
pub mod notify;

use crate::{
    config::Settings,
    contracts::{ContractHandle, ICryptoDevs, ICryptoDevsToken},
    notify::{Notification, Notifier},
};

/// Price of one token unit in wei (0.001 ether). Fixed on the client and not
/// read from the contract: if the deployed contract charges a different price,
/// `mint` transactions revert.
pub const UNIT_PRICE_WEI: u64 = 1_000_000_000_000_000;

pub fn mint_price(quantity: u64) -> U256 {
    U256::from(quantity) * U256::from(UNIT_PRICE_WEI)
}

/// Front-end operations over the collectible and token contracts.
///
/// Every operation takes the wallet session explicitly and resolves a fresh
/// signer from it, so an account or network switch in the wallet is seen by
/// the next call. Queries come in two forms: `try_*` returns the failure, the
/// plain form logs it and returns a sentinel for display.
pub struct TokenService {
    contracts: BTreeMap<ChainId, ContractAddresses>,
    receipt_poll_interval: Duration,
    notifier: Arc<dyn Notifier>,
}

impl TokenService {
    pub fn new(
        contracts: BTreeMap<ChainId, ContractAddresses>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            contracts,
            receipt_poll_interval: Duration::from_secs(1),
            notifier,
        }
    }

    pub fn from_settings(settings: &Settings, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(settings.contracts.clone(), notifier)
            .with_receipt_poll_interval(settings.receipt_poll_interval())
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    async fn resolve(
        &self,
        session: &WalletSession,
    ) -> Result<(Signer, ContractAddresses), DappError> {
        let signer = session.signer().await?;
        let addresses = self
            .contracts
            .get(&signer.chain_id())
            .copied()
            .ok_or(DappError::UnsupportedNetwork(signer.chain_id()))?;
        Ok((signer, addresses))
    }

    pub async fn try_is_owner(&self, session: &WalletSession) -> Result<bool, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        let token = ContractHandle::new(&signer, addresses.token);
        let owner = token.read(ICryptoDevsToken::ownerCall {}).await?;
        Ok(owner == signer.address())
    }

    pub async fn is_owner(&self, session: &WalletSession) -> bool {
        or_sentinel("is_owner", self.try_is_owner(session).await, false)
    }

    /// Collectibles held by the active account whose token allocation has not
    /// been claimed yet. One round trip per held collectible, in order.
    pub async fn try_claimable_count(&self, session: &WalletSession) -> Result<u64, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        let account = signer.address();
        let nft = ContractHandle::new(&signer, addresses.nft);
        let token = ContractHandle::new(&signer, addresses.token);

        let held = nft
            .read(ICryptoDevs::balanceOfCall { owner: account })
            .await?;
        if held.is_zero() {
            return Ok(0);
        }

        let mut claimable = 0u64;
        let mut index = U256::ZERO;
        while index < held {
            let token_id = nft
                .read(ICryptoDevs::tokenOfOwnerByIndexCall {
                    owner: account,
                    index,
                })
                .await?;
            let claimed = token
                .read(ICryptoDevsToken::erc721_tokenIds_claimedCall { tokenId: token_id })
                .await?;
            if !claimed {
                claimable += 1;
            }
            index += U256::from(1);
        }
        Ok(claimable)
    }

    pub async fn claimable_count(&self, session: &WalletSession) -> u64 {
        or_sentinel("claimable_count", self.try_claimable_count(session).await, 0)
    }

    pub async fn try_token_balance(&self, session: &WalletSession) -> Result<U256, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        ContractHandle::new(&signer, addresses.token)
            .read(ICryptoDevsToken::balanceOfCall {
                account: signer.address(),
            })
            .await
    }

    pub async fn token_balance(&self, session: &WalletSession) -> U256 {
        or_sentinel(
            "token_balance",
            self.try_token_balance(session).await,
            U256::ZERO,
        )
    }

    pub async fn try_total_minted(&self, session: &WalletSession) -> Result<U256, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        ContractHandle::new(&signer, addresses.token)
            .read(ICryptoDevsToken::totalSupplyCall {})
            .await
    }

    pub async fn total_minted(&self, session: &WalletSession) -> U256 {
        or_sentinel(
            "total_minted",
            self.try_total_minted(session).await,
            U256::ZERO,
        )
    }

    /// Buys `quantity` token units, paying `quantity * UNIT_PRICE_WEI`, and
    /// returns once the transaction is mined.
    pub async fn mint(
        &self,
        session: &WalletSession,
        quantity: u64,
    ) -> Result<TransactionReceipt, DappError> {
        let result = self.submit_mint(session, quantity).await;
        self.report("mint", "Successfully minted Crypto Dev Tokens", result)
    }

    async fn submit_mint(
        &self,
        session: &WalletSession,
        quantity: u64,
    ) -> Result<TransactionReceipt, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        let value = mint_price(quantity);
        info!("token: minting {quantity} units for {value} wei");
        let pending = ContractHandle::new(&signer, addresses.token)
            .send(
                ICryptoDevsToken::mintCall {
                    amount: U256::from(quantity),
                },
                Some(value),
            )
            .await?;
        self.mined(pending).await
    }

    /// Claims the allocation of every unclaimed collectible held by the active
    /// account and returns once the transaction is mined.
    pub async fn claim(&self, session: &WalletSession) -> Result<TransactionReceipt, DappError> {
        let result = self.submit_claim(session).await;
        self.report("claim", "Successfully claimed Crypto Dev Tokens", result)
    }

    async fn submit_claim(&self, session: &WalletSession) -> Result<TransactionReceipt, DappError> {
        let (signer, addresses) = self.resolve(session).await?;
        info!("token: claiming for {}", signer.address());
        let pending = ContractHandle::new(&signer, addresses.token)
            .send(ICryptoDevsToken::claimCall {}, None)
            .await?;
        self.mined(pending).await
    }

    async fn mined(&self, pending: PendingTransaction) -> Result<TransactionReceipt, DappError> {
        let tx_hash = pending.tx_hash();
        let receipt = pending.wait(self.receipt_poll_interval).await?;
        if !receipt.status() {
            return Err(DappError::Reverted { tx_hash });
        }
        Ok(receipt)
    }

    fn report(
        &self,
        action: &str,
        success_message: &str,
        result: Result<TransactionReceipt, DappError>,
    ) -> Result<TransactionReceipt, DappError> {
        match &result {
            Ok(receipt) => {
                info!("token: {action} mined in {}", receipt.transaction_hash);
                self.notifier.notify(&Notification::success(success_message));
            }
            Err(err) => {
                error!("token: {action} failed: {err}");
                self.notifier.notify(&Notification::failure(format!(
                    "Failed to {action} Crypto Dev Tokens: {err}"
                )));
            }
        }
        result
    }
}

fn or_sentinel<T>(operation: &str, result: Result<T, DappError>, sentinel: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!("token: {operation} failed: {err}");
            sentinel
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
