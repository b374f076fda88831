use super::*;
use crate::notify::{MemoryNotifier, NotificationLevel};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use shared::{domain::TxKind, error::WalletError, protocol::methods};
use std::sync::Mutex;
use wallet::test_utils::MockWallet;

const HOLDER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const HOLDER_CHECKSUMMED: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const CHAIN: ChainId = ChainId(31337);

fn nft_address() -> Address {
    Address::repeat_byte(0xaa)
}

fn token_address() -> Address {
    Address::repeat_byte(0xbb)
}

fn contracts() -> BTreeMap<ChainId, ContractAddresses> {
    BTreeMap::from([(
        CHAIN,
        ContractAddresses {
            nft: nft_address(),
            token: token_address(),
        },
    )])
}

/// Contract state served through `eth_call`.
#[derive(Clone)]
struct FakeChain {
    owner: Address,
    held: Vec<U256>,
    claimed: Vec<U256>,
    balance: U256,
    total_supply: U256,
    /// Index at which `tokenOfOwnerByIndex` loses the connection.
    broken_index: Option<usize>,
    lookups: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeChain {
    fn new() -> Self {
        Self {
            owner: Address::repeat_byte(0x01),
            held: Vec::new(),
            claimed: Vec::new(),
            balance: U256::ZERO,
            total_supply: U256::ZERO,
            broken_index: None,
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, name: &'static str) {
        self.lookups.lock().expect("lookups").push(name);
    }

    fn lookups(&self) -> Vec<&'static str> {
        self.lookups.lock().expect("lookups").clone()
    }

    fn handle(&self, to: Address, data: &Bytes) -> Result<Bytes, WalletError> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| WalletError::from_rpc(-32000, "execution reverted"))?;
        let reverted = || WalletError::from_rpc(-32000, "execution reverted");
        let encoded = if to == nft_address() {
            if selector == ICryptoDevs::balanceOfCall::SELECTOR {
                self.record("nft.balanceOf");
                U256::from(self.held.len()).abi_encode()
            } else if selector == ICryptoDevs::tokenOfOwnerByIndexCall::SELECTOR {
                self.record("nft.tokenOfOwnerByIndex");
                let call = ICryptoDevs::tokenOfOwnerByIndexCall::abi_decode(data)
                    .map_err(|err| WalletError::from_rpc(-32602, err.to_string()))?;
                let index = usize::try_from(call.index)
                    .map_err(|err| WalletError::from_rpc(-32602, err.to_string()))?;
                if self.broken_index == Some(index) {
                    return Err(WalletError::Transport("connection reset by peer".into()));
                }
                self.held.get(index).copied().ok_or_else(reverted)?.abi_encode()
            } else {
                return Err(reverted());
            }
        } else if to == token_address() {
            if selector == ICryptoDevsToken::ownerCall::SELECTOR {
                self.record("token.owner");
                self.owner.abi_encode()
            } else if selector == ICryptoDevsToken::balanceOfCall::SELECTOR {
                self.record("token.balanceOf");
                self.balance.abi_encode()
            } else if selector == ICryptoDevsToken::erc721_tokenIds_claimedCall::SELECTOR {
                self.record("token.erc721_tokenIds_claimed");
                let call = ICryptoDevsToken::erc721_tokenIds_claimedCall::abi_decode(data)
                    .map_err(|err| WalletError::from_rpc(-32602, err.to_string()))?;
                self.claimed.contains(&call.tokenId).abi_encode()
            } else if selector == ICryptoDevsToken::totalSupplyCall::SELECTOR {
                self.record("token.totalSupply");
                self.total_supply.abi_encode()
            } else {
                return Err(reverted());
            }
        } else {
            Vec::new()
        };
        Ok(Bytes::from(encoded))
    }
}

fn wallet_for(chain: &FakeChain) -> MockWallet {
    let chain = chain.clone();
    MockWallet::new(CHAIN)
        .with_accounts([HOLDER])
        .with_call_handler(move |to, data| chain.handle(to, data))
}

fn service() -> (TokenService, Arc<MemoryNotifier>) {
    let notifier = Arc::new(MemoryNotifier::default());
    let service = TokenService::new(contracts(), notifier.clone())
        .with_receipt_poll_interval(Duration::from_millis(1));
    (service, notifier)
}

#[tokio::test]
async fn owner_match_ignores_address_case() {
    let mut chain = FakeChain::new();
    chain.owner = HOLDER_CHECKSUMMED.parse().expect("owner");
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    assert!(service.is_owner(&session).await);
    assert_eq!(service.try_is_owner(&session).await.ok(), Some(true));
}

#[tokio::test]
async fn different_owner_is_not_owner() {
    let chain = FakeChain::new();
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    assert_eq!(service.try_is_owner(&session).await.ok(), Some(false));
}

#[tokio::test]
async fn owner_lookup_failure_reads_as_not_owner() {
    let session = WalletSession::new(Arc::new(MockWallet::new(CHAIN).with_accounts([HOLDER])));
    let (service, _notifier) = service();

    let err = service.try_is_owner(&session).await.expect_err("no contract");
    assert!(matches!(err, DappError::ContractCall { .. }));
    assert!(!service.is_owner(&session).await);
}

#[tokio::test]
async fn counts_unclaimed_collectibles() {
    let mut chain = FakeChain::new();
    chain.held = vec![U256::from(3), U256::from(8), U256::from(13)];
    chain.claimed = vec![U256::from(8)];
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    assert_eq!(service.claimable_count(&session).await, 2);
    assert_eq!(
        chain.lookups(),
        vec![
            "nft.balanceOf",
            "nft.tokenOfOwnerByIndex",
            "token.erc721_tokenIds_claimed",
            "nft.tokenOfOwnerByIndex",
            "token.erc721_tokenIds_claimed",
            "nft.tokenOfOwnerByIndex",
            "token.erc721_tokenIds_claimed",
        ]
    );
}

#[tokio::test]
async fn failure_midway_through_count_discards_partial_result() {
    let mut chain = FakeChain::new();
    chain.held = vec![U256::from(3), U256::from(8), U256::from(13)];
    chain.broken_index = Some(1);
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    let err = service
        .try_claimable_count(&session)
        .await
        .expect_err("second lookup fails");
    assert!(matches!(
        err,
        DappError::Wallet(WalletError::Transport(_))
    ));
    assert_eq!(service.claimable_count(&session).await, 0);
    assert_eq!(
        chain.lookups()[..4],
        [
            "nft.balanceOf",
            "nft.tokenOfOwnerByIndex",
            "token.erc721_tokenIds_claimed",
            "nft.tokenOfOwnerByIndex",
        ]
    );
}

#[tokio::test]
async fn zero_holdings_skip_per_id_lookups() {
    let chain = FakeChain::new();
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    assert_eq!(service.try_claimable_count(&session).await.ok(), Some(0));
    assert_eq!(chain.lookups(), vec!["nft.balanceOf"]);
}

#[tokio::test]
async fn reads_balance_and_total_supply() {
    let mut chain = FakeChain::new();
    chain.balance = U256::from(20_000u64);
    chain.total_supply = U256::from(1_250_000u64);
    let session = WalletSession::new(Arc::new(wallet_for(&chain)));
    let (service, _notifier) = service();

    assert_eq!(service.token_balance(&session).await, U256::from(20_000u64));
    assert_eq!(
        service.total_minted(&session).await,
        U256::from(1_250_000u64)
    );
}

#[tokio::test]
async fn unconfigured_chain_is_unsupported() {
    let chain = FakeChain::new();
    let wallet = Arc::new(wallet_for(&chain));
    wallet.set_chain_id(ChainId(1));
    let session = WalletSession::new(wallet);
    let (service, _notifier) = service();

    assert!(matches!(
        service.try_total_minted(&session).await,
        Err(DappError::UnsupportedNetwork(ChainId(1)))
    ));
    assert!(chain.lookups().is_empty());
}

#[tokio::test]
async fn mint_pays_unit_price_and_waits_for_mining() {
    let chain = FakeChain::new();
    let wallet = Arc::new(wallet_for(&chain).with_receipt_delay(2));
    let session = WalletSession::new(wallet.clone());
    let (service, notifier) = service();

    let receipt = service.mint(&session, 7).await.expect("mint");

    assert!(receipt.status());
    let sent = wallet.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, Some(TxKind::Call(token_address())));
    assert_eq!(sent[0].value, Some(U256::from(7_000_000_000_000_000u64)));
    let call = ICryptoDevsToken::mintCall::abi_decode(sent[0].input.input().expect("input"))
        .expect("mint call");
    assert_eq!(call.amount, U256::from(7));
    assert_eq!(
        wallet
            .requests_for(methods::ETH_GET_TRANSACTION_RECEIPT)
            .len(),
        3
    );
    assert_eq!(
        notifier.drain(),
        vec![Notification::success(
            "Successfully minted Crypto Dev Tokens"
        )]
    );
}

#[test]
fn mint_price_is_one_thousandth_ether_per_unit() {
    assert_eq!(mint_price(0), U256::ZERO);
    assert_eq!(mint_price(1), U256::from(10u64.pow(15)));
    assert_eq!(mint_price(10_000), U256::from(10u64.pow(19)));
}

#[tokio::test]
async fn claim_sends_no_value() {
    let chain = FakeChain::new();
    let wallet = Arc::new(wallet_for(&chain));
    let session = WalletSession::new(wallet.clone());
    let (service, notifier) = service();

    service.claim(&session).await.expect("claim");

    let sent = wallet.sent_transactions();
    assert_eq!(sent[0].value, None);
    assert_eq!(
        sent[0].input.input().map(|d| d.to_vec()),
        Some(ICryptoDevsToken::claimCall {}.abi_encode())
    );
    assert_eq!(notifier.drain()[0].level, NotificationLevel::Success);
}

#[tokio::test]
async fn reverted_claim_is_reported_to_the_user() {
    let chain = FakeChain::new();
    let wallet = Arc::new(wallet_for(&chain).reverting_transactions());
    let session = WalletSession::new(wallet);
    let (service, notifier) = service();

    let err = service.claim(&session).await.expect_err("reverted");

    assert!(matches!(err, DappError::Reverted { .. }));
    let notifications = notifier.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Failure);
    assert!(notifications[0].message.starts_with("Failed to claim"));
}

#[tokio::test]
async fn rejected_mint_is_terminal() {
    let chain = FakeChain::new();
    let wallet = Arc::new(wallet_for(&chain).rejecting_transactions());
    let session = WalletSession::new(wallet.clone());
    let (service, notifier) = service();

    let err = service.mint(&session, 1).await.expect_err("rejected");

    assert!(matches!(
        err,
        DappError::Wallet(WalletError::AuthorizationDenied(_))
    ));
    assert_eq!(wallet.requests_for(methods::ETH_SEND_TRANSACTION).len(), 1);
    assert!(wallet
        .requests_for(methods::ETH_GET_TRANSACTION_RECEIPT)
        .is_empty());
    assert_eq!(notifier.drain()[0].level, NotificationLevel::Failure);
}

#[tokio::test]
async fn absent_wallet_yields_sentinels_everywhere() {
    let session = WalletSession::absent();
    let (service, notifier) = service();

    assert!(!service.is_owner(&session).await);
    assert_eq!(service.claimable_count(&session).await, 0);
    assert_eq!(service.token_balance(&session).await, U256::ZERO);
    assert_eq!(service.total_minted(&session).await, U256::ZERO);
    assert!(service.mint(&session, 1).await.is_err());
    assert!(service.claim(&session).await.is_err());

    let notifications = notifier.drain();
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .all(|n| n.level == NotificationLevel::Failure));
    assert!(matches!(
        service.try_token_balance(&session).await,
        Err(DappError::Wallet(WalletError::ProviderAbsent))
    ));
}

#[tokio::test]
async fn signer_is_resolved_again_on_every_call() {
    let mut chain = FakeChain::new();
    chain.owner = HOLDER.parse().expect("owner");
    let wallet = Arc::new(wallet_for(&chain));
    let session = WalletSession::new(wallet.clone());
    let (service, _notifier) = service();

    assert!(service.is_owner(&session).await);
    wallet.set_accounts(["0x0000000000000000000000000000000000000b0b"]);
    assert!(!service.is_owner(&session).await);
    assert_eq!(wallet.requests_for(methods::ETH_ACCOUNTS).len(), 2);
}
