//! Built-in address books for the public ledgers

use std::collections::HashMap;

use meridian_primitives::{AccountId, LedgerId};

use crate::error::{NetworkError, NetworkResult};

const MAINNET_NODES: &[(&str, u64)] = &[
    ("0.mainnet.meridian.network:50211", 3),
    ("1.mainnet.meridian.network:50211", 4),
    ("2.mainnet.meridian.network:50211", 5),
    ("3.mainnet.meridian.network:50211", 6),
    ("4.mainnet.meridian.network:50211", 7),
    ("5.mainnet.meridian.network:50211", 8),
    ("6.mainnet.meridian.network:50211", 9),
    ("7.mainnet.meridian.network:50211", 10),
    ("8.mainnet.meridian.network:50211", 11),
    ("9.mainnet.meridian.network:50211", 12),
    ("10.mainnet.meridian.network:50211", 13),
    ("11.mainnet.meridian.network:50211", 14),
];

const TESTNET_NODES: &[(&str, u64)] = &[
    ("0.testnet.meridian.network:50211", 3),
    ("1.testnet.meridian.network:50211", 4),
    ("2.testnet.meridian.network:50211", 5),
    ("3.testnet.meridian.network:50211", 6),
    ("4.testnet.meridian.network:50211", 7),
];

const PREVIEWNET_NODES: &[(&str, u64)] = &[
    ("0.previewnet.meridian.network:50211", 3),
    ("1.previewnet.meridian.network:50211", 4),
    ("2.previewnet.meridian.network:50211", 5),
    ("3.previewnet.meridian.network:50211", 6),
    ("4.previewnet.meridian.network:50211", 7),
];

fn to_map(entries: &[(&str, u64)]) -> HashMap<String, AccountId> {
    entries
        .iter()
        .map(|(addr, num)| (addr.to_string(), AccountId::from_num(*num)))
        .collect()
}

/// Consensus nodes of a named ledger
pub fn network_for(ledger: &LedgerId) -> NetworkResult<HashMap<String, AccountId>> {
    match ledger {
        LedgerId::Mainnet => Ok(to_map(MAINNET_NODES)),
        LedgerId::Testnet => Ok(to_map(TESTNET_NODES)),
        LedgerId::Previewnet => Ok(to_map(PREVIEWNET_NODES)),
        LedgerId::Other(_) => Err(NetworkError::UnknownNetwork(ledger.to_string())),
    }
}

/// Mirror nodes of a named ledger
pub fn mirror_network_for(ledger: &LedgerId) -> NetworkResult<Vec<String>> {
    let address = match ledger {
        LedgerId::Mainnet => "mainnet-public.mirror.meridian.network:443",
        LedgerId::Testnet => "testnet.mirror.meridian.network:443",
        LedgerId::Previewnet => "previewnet.mirror.meridian.network:443",
        LedgerId::Other(_) => return Err(NetworkError::UnknownNetwork(ledger.to_string())),
    };
    Ok(vec![address.to_string()])
}

/// Resolve a network name (`mainnet`, `testnet`, `previewnet`)
pub fn ledger_for_name(name: &str) -> NetworkResult<LedgerId> {
    match name {
        "mainnet" => Ok(LedgerId::Mainnet),
        "testnet" => Ok(LedgerId::Testnet),
        "previewnet" => Ok(LedgerId::Previewnet),
        other => Err(NetworkError::UnknownNetwork(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_networks() {
        for ledger in [LedgerId::Mainnet, LedgerId::Testnet, LedgerId::Previewnet] {
            let nodes = network_for(&ledger).unwrap();
            assert!(nodes.values().any(|id| *id == AccountId::from_num(3)));
            assert_eq!(mirror_network_for(&ledger).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_unknown_network() {
        assert!(network_for(&LedgerId::Other(vec![7])).is_err());
        assert!(ledger_for_name("devnet").is_err());
        assert_eq!(ledger_for_name("testnet").unwrap(), LedgerId::Testnet);
    }
}
