use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::Path,
    sync::Arc,
    time::Duration,
};

use alloy_primitives::Address;
use serde::Deserialize;
use shared::{
    domain::{ChainId, ContractAddresses},
    error::DappError,
    networks::NetworkTable,
};
use url::Url;
use wallet::{JsonRpcWallet, WalletSession};

pub const DEFAULT_SETTINGS_FILE: &str = "dapp.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Chain the JSON-RPC wallet starts on.
    pub chain_id: ChainId,
    pub rpc_endpoints: BTreeMap<ChainId, String>,
    pub contracts: BTreeMap<ChainId, ContractAddresses>,
    /// Collectibles of chains whose token is not deployed yet.
    pub collectibles: BTreeMap<ChainId, Address>,
    pub network_names: BTreeMap<ChainId, String>,
    pub receipt_poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chain_id: ChainId(31337),
            rpc_endpoints: BTreeMap::from([(ChainId(31337), "http://127.0.0.1:8545".into())]),
            contracts: BTreeMap::new(),
            collectibles: BTreeMap::new(),
            network_names: BTreeMap::new(),
            receipt_poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileSettings {
    chain_id: Option<ChainId>,
    receipt_poll_interval_ms: Option<u64>,
    #[serde(default)]
    rpc_endpoints: HashMap<String, String>,
    #[serde(default)]
    contracts: HashMap<String, FileContracts>,
    #[serde(default)]
    network_names: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FileContracts {
    nft: String,
    token: Option<String>,
}

impl Settings {
    /// Defaults overlaid with the tables of a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, DappError> {
        let file: FileSettings =
            toml::from_str(raw).map_err(|err| DappError::Configuration(err.to_string()))?;
        let mut settings = Self::default();

        if let Some(v) = file.chain_id {
            settings.chain_id = v;
        }
        if let Some(v) = file.receipt_poll_interval_ms {
            settings.receipt_poll_interval_ms = v;
        }
        for (chain, url) in file.rpc_endpoints {
            settings.rpc_endpoints.insert(parse_chain_id(&chain)?, url);
        }
        for (chain, contracts) in file.contracts {
            let chain = parse_chain_id(&chain)?;
            let nft = parse_address("nft", &contracts.nft)?;
            match contracts.token {
                Some(token) => {
                    let token = parse_address("token", &token)?;
                    settings.contracts.insert(chain, ContractAddresses { nft, token });
                }
                None => {
                    settings.collectibles.insert(chain, nft);
                }
            }
        }
        for (chain, name) in file.network_names {
            settings.network_names.insert(parse_chain_id(&chain)?, name);
        }

        Ok(settings)
    }

    /// Applies `APP__*` overrides. Contract overrides target `chain_id` after
    /// its own override has been applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), DappError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP__CHAIN_ID") {
            self.chain_id = parse_chain_id(&v)?;
        }
        if let Some(v) = lookup("APP__RPC_URL") {
            self.rpc_endpoints.insert(self.chain_id, v);
        }
        if let Some(v) = lookup("APP__RECEIPT_POLL_INTERVAL_MS") {
            self.receipt_poll_interval_ms = v.parse().map_err(|_| {
                DappError::Configuration(format!("invalid APP__RECEIPT_POLL_INTERVAL_MS '{v}'"))
            })?;
        }

        let nft = lookup("APP__NFT_CONTRACT_ADDRESS")
            .map(|v| parse_address("APP__NFT_CONTRACT_ADDRESS", &v))
            .transpose()?;
        let token = lookup("APP__TOKEN_CONTRACT_ADDRESS")
            .map(|v| parse_address("APP__TOKEN_CONTRACT_ADDRESS", &v))
            .transpose()?;
        let chain_id = self.chain_id;
        match (nft, token) {
            (None, None) => {}
            (Some(nft), Some(token)) => {
                self.collectibles.remove(&chain_id);
                self.contracts
                    .insert(chain_id, ContractAddresses { nft, token });
            }
            (nft, token) => {
                if let Some(existing) = self.contracts.get_mut(&chain_id) {
                    if let Some(nft) = nft {
                        existing.nft = nft;
                    }
                    if let Some(token) = token {
                        existing.token = token;
                    }
                } else if let Some(nft) = nft {
                    self.collectibles.insert(chain_id, nft);
                } else if let (Some(token), Some(nft)) = (token, self.collectibles.remove(&chain_id)) {
                    self.contracts
                        .insert(chain_id, ContractAddresses { nft, token });
                } else {
                    return Err(DappError::Configuration(format!(
                        "chain {chain_id} has no collectible; set APP__NFT_CONTRACT_ADDRESS too"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn rpc_urls(&self) -> Result<BTreeMap<ChainId, Url>, DappError> {
        self.rpc_endpoints
            .iter()
            .map(|(chain, raw)| {
                Url::parse(raw)
                    .map(|url| (*chain, url))
                    .map_err(|err| {
                        DappError::Configuration(format!("invalid rpc url '{raw}' for chain {chain}: {err}"))
                    })
            })
            .collect()
    }

    pub fn network_table(&self) -> NetworkTable {
        NetworkTable::with_extra(self.network_names.clone())
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn contracts_for(&self, chain_id: ChainId) -> Result<ContractAddresses, DappError> {
        self.contracts
            .get(&chain_id)
            .copied()
            .ok_or(DappError::UnsupportedNetwork(chain_id))
    }

    /// Collectible on `chain_id`, whether or not its token is configured.
    pub fn collectible_for(&self, chain_id: ChainId) -> Result<Address, DappError> {
        self.contracts
            .get(&chain_id)
            .map(|contracts| contracts.nft)
            .or_else(|| self.collectibles.get(&chain_id).copied())
            .ok_or(DappError::UnsupportedNetwork(chain_id))
    }
}

/// Wallet session backed by the configured JSON-RPC endpoints, starting on
/// `settings.chain_id`.
pub fn json_rpc_session(settings: &Settings) -> Result<WalletSession, DappError> {
    let wallet = JsonRpcWallet::new(settings.rpc_urls()?, settings.chain_id)?;
    Ok(WalletSession::new(Arc::new(wallet)).with_networks(settings.network_table()))
}

/// Reads `path` (or `dapp.toml` in the working directory when `None`), then
/// applies environment overrides. A missing default file means defaults; a
/// missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, DappError> {
    let raw = match path {
        Some(path) => Some(read_settings_file(path)?),
        None => read_optional_settings_file(Path::new(DEFAULT_SETTINGS_FILE))?,
    };
    let mut settings = match raw {
        Some(raw) => Settings::from_toml_str(&raw)?,
        None => Settings::default(),
    };
    settings.apply_env_overrides(|key| std::env::var(key).ok())?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<String, DappError> {
    fs::read_to_string(path).map_err(|err| {
        DappError::Configuration(format!("failed to read '{}': {err}", path.display()))
    })
}

/// `None` only when the file does not exist; any other read failure is
/// reported.
fn read_optional_settings_file(path: &Path) -> Result<Option<String>, DappError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(DappError::Configuration(format!(
            "failed to read '{}': {err}",
            path.display()
        ))),
    }
}

fn parse_chain_id(raw: &str) -> Result<ChainId, DappError> {
    raw.parse()
        .map_err(|err: shared::domain::ParseChainIdError| DappError::Configuration(err.to_string()))
}

fn parse_address(field: &str, raw: &str) -> Result<Address, DappError> {
    raw.trim()
        .parse()
        .map_err(|err| DappError::Configuration(format!("invalid {field} address '{raw}': {err}")))
}
