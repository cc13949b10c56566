//! # Network Parameters
//!
//! Immutable per-network constants: message magic, default peer port and
//! DNS seed hostnames.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The network the node participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(format!("unknown network `{}`", other)),
        }
    }
}

const MAINNET_SEEDS: &[&str] = &[
    "seed.bitcoin.sipa.be",
    "dnsseed.bluematt.me",
    "dnsseed.bitcoin.dashjr.org",
    "seed.bitcoinstats.com",
    "seed.bitcoin.jonasschnelli.ch",
    "seed.btc.petertodd.net",
];

const TESTNET_SEEDS: &[&str] = &[
    "testnet-seed.bitcoin.jonasschnelli.ch",
    "seed.tbtc.petertodd.net",
    "testnet-seed.bluematt.me",
];

/// Constants for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub network: Network,
    /// Message start bytes, little-endian.
    pub magic: u32,
    pub default_port: u16,
    pub dns_seeds: Vec<String>,
}

impl NetworkParams {
    pub fn for_network(network: Network) -> Self {
        let (magic, default_port, seeds) = match network {
            Network::Mainnet => (0xd9b4_bef9, 8333, MAINNET_SEEDS),
            Network::Testnet => (0x0709_110b, 18333, TESTNET_SEEDS),
            Network::Regtest => (0xdab5_bffa, 18444, &[][..]),
        };
        Self {
            network,
            magic,
            default_port,
            dns_seeds: seeds.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the compiled-in seed list.
    pub fn with_dns_seeds(mut self, seeds: Vec<String>) -> Self {
        self.dns_seeds = seeds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(NetworkParams::for_network(Network::Mainnet).default_port, 8333);
        assert_eq!(NetworkParams::for_network(Network::Testnet).default_port, 18333);
        assert_eq!(NetworkParams::for_network(Network::Regtest).default_port, 18444);
    }

    #[test]
    fn test_regtest_has_no_seeds() {
        assert!(NetworkParams::for_network(Network::Regtest).dns_seeds.is_empty());
        assert!(!NetworkParams::for_network(Network::Mainnet).dns_seeds.is_empty());
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("main".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("simnet".parse::<Network>().is_err());
    }
}
