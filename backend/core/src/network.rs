//! Stellar networks a contract can be deployed to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Futurenet,
    /// A standalone quickstart node on the developer's machine.
    Local,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Futurenet => "futurenet",
            Self::Local => "local",
        }
    }

    /// Public Soroban RPC endpoint for this network.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://soroban-testnet.stellar.org",
            Self::Futurenet => "https://rpc-futurenet.stellar.org",
            Self::Local => "http://localhost:8000/soroban/rpc",
        }
    }

    pub fn passphrase(&self) -> &'static str {
        match self {
            Self::Testnet => "Test SDF Network ; September 2015",
            Self::Futurenet => "Test SDF Future Network ; October 2022",
            Self::Local => "Standalone Network ; February 2017",
        }
    }

    /// stellar.expert page for a deployed contract, when the network is public.
    pub fn explorer_url(&self, contract_id: &str) -> Option<String> {
        match self {
            Self::Testnet | Self::Futurenet => Some(format!(
                "https://stellar.expert/explorer/{}/contract/{contract_id}",
                self.as_str()
            )),
            Self::Local => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "futurenet" => Ok(Self::Futurenet),
            "local" | "standalone" => Ok(Self::Local),
            other => Err(format!("unsupported network: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_network_names() {
        assert_eq!("testnet".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!(" Futurenet ".parse::<Network>(), Ok(Network::Futurenet));
        assert_eq!("standalone".parse::<Network>(), Ok(Network::Local));
        assert!("mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn explorer_url_only_for_public_networks() {
        assert_eq!(
            Network::Testnet.explorer_url("CABC").as_deref(),
            Some("https://stellar.expert/explorer/testnet/contract/CABC")
        );
        assert_eq!(Network::Local.explorer_url("CABC"), None);
    }

    #[test]
    fn network_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Network::Testnet).unwrap(), r#""testnet""#);
        assert!(serde_json::from_str::<Network>(r#""mainnet""#).is_err());
    }
}
