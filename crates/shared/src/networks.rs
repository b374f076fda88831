use std::collections::BTreeMap;

use crate::domain::ChainId;

/// Networks every wallet session can name without extra configuration.
pub const KNOWN_NETWORKS: &[(u64, &str)] = &[
    (1, "mainnet"),
    (3, "ropsten"),
    (4, "rinkeby"),
    (5, "goerli"),
    (42, "kovan"),
    (137, "polygon"),
    (1337, "localhost"),
    (31337, "hardhat"),
    (80001, "mumbai"),
    (11155111, "sepolia"),
];

/// Static chain id to human name lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct NetworkTable {
    names: BTreeMap<ChainId, String>,
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self {
            names: KNOWN_NETWORKS
                .iter()
                .map(|(id, name)| (ChainId(*id), (*name).to_string()))
                .collect(),
        }
    }
}

impl NetworkTable {
    /// Built-in table extended (or overridden) by `extra` entries.
    pub fn with_extra<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (ChainId, String)>,
    {
        let mut table = Self::default();
        table.names.extend(extra);
        table
    }

    pub fn name(&self, chain_id: ChainId) -> Option<&str> {
        self.names.get(&chain_id).map(String::as_str)
    }

    pub fn chain_id(&self, name: &str) -> Option<ChainId> {
        self.names
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_names_both_ways() {
        let table = NetworkTable::default();
        assert_eq!(table.name(ChainId(4)), Some("rinkeby"));
        assert_eq!(table.chain_id("Sepolia"), Some(ChainId(11155111)));
        assert_eq!(table.name(ChainId(999_999)), None);
    }

    #[test]
    fn extra_entries_override_builtin_names() {
        let table = NetworkTable::with_extra([
            (ChainId(31337), "anvil".to_string()),
            (ChainId(424242), "devnet".to_string()),
        ]);
        assert_eq!(table.name(ChainId(31337)), Some("anvil"));
        assert_eq!(table.name(ChainId(424242)), Some("devnet"));
        assert_eq!(table.name(ChainId(1)), Some("mainnet"));
    }
}
