use std::{fs, path::Path, time::Duration};

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use serde::Deserialize;
use shared::{
    error::DappError,
    protocol::{TransactionInput, TransactionRequest},
};
use tracing::{debug, info};
use wallet::Signer;

/// Compiled contract as emitted by the build toolchain. Both the flat
/// `"bytecode": "0x.."` layout and the nested `"bytecode": {"object": ".."}`
/// layout are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    #[serde(deserialize_with = "deserialize_bytecode")]
    pub bytecode: Bytes,
}

fn deserialize_bytecode<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flat(Bytes),
        Nested { object: Bytes },
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flat(bytes) | Raw::Nested { object: bytes } => bytes,
    })
}

impl ContractArtifact {
    pub fn from_json(raw: &str) -> Result<Self, DappError> {
        serde_json::from_str(raw)
            .map_err(|err| DappError::Deployment(format!("invalid contract artifact: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self, DappError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            DappError::Deployment(format!("failed to read artifact '{}': {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn name(&self) -> &str {
        self.contract_name.as_deref().unwrap_or("contract")
    }

    /// Creation code followed by the ABI-encoded constructor argument.
    pub fn creation_code(&self, collectible: Address) -> Result<Bytes, DappError> {
        if self.bytecode.is_empty() {
            return Err(DappError::Deployment(format!(
                "{} has no bytecode (abstract contract or interface?)",
                self.name()
            )));
        }
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&(collectible,).abi_encode_params());
        Ok(Bytes::from(code))
    }
}

/// Publishes the token contract bound to `collectible` and waits for the
/// creation receipt.
pub async fn deploy_token(
    signer: &Signer,
    artifact: &ContractArtifact,
    collectible: Address,
    poll_interval: Duration,
) -> Result<Address, DappError> {
    let code = artifact.creation_code(collectible)?;
    info!(
        "deploy: publishing {} from {} on chain {}, collectible {collectible}",
        artifact.name(),
        signer.address(),
        signer.chain_id()
    );
    debug!("deploy: creation code is {} bytes", code.len());

    let pending = signer
        .send_transaction(TransactionRequest {
            from: Some(signer.address()),
            input: TransactionInput::new(code),
            ..Default::default()
        })
        .await
        .map_err(|err| DappError::Deployment(format!("creation transaction not accepted: {err}")))?;
    let tx_hash = pending.tx_hash();
    let receipt = pending.wait(poll_interval).await.map_err(|err| {
        DappError::Deployment(format!("no receipt for creation transaction {tx_hash}: {err}"))
    })?;
    if !receipt.status() {
        return Err(DappError::Deployment(format!(
            "creation transaction {tx_hash} reverted"
        )));
    }
    receipt.contract_address.ok_or_else(|| {
        DappError::Deployment(format!(
            "receipt for {tx_hash} carries no contract address"
        ))
    })
}
