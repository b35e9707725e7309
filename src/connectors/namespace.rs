//! Namespace Registry
//!
//! The fixed set of blockchain ecosystems connectors know how to address.
//! Anything else is rejected at parse time with `UnsupportedNamespace`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::ConnectorError;
use super::types::Encoding;

/// Blockchain ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Cosmos,
    Ethereum,
    Aptos,
    Sui,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Cosmos,
        Namespace::Ethereum,
        Namespace::Aptos,
        Namespace::Sui,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Cosmos => "cosmos",
            Namespace::Ethereum => "ethereum",
            Namespace::Aptos => "aptos",
            Namespace::Sui => "sui",
        }
    }

    /// Wire encoding of account addresses
    pub fn address_encoding(&self) -> Encoding {
        match self {
            Namespace::Cosmos => Encoding::Bech32,
            Namespace::Ethereum | Namespace::Aptos | Namespace::Sui => Encoding::Hex,
        }
    }

    /// Wire encoding of account public keys
    pub fn public_key_encoding(&self) -> Encoding {
        Encoding::Hex
    }

    /// Whether the namespace has a single active chain per wallet
    pub fn has_active_chain(&self) -> bool {
        matches!(self, Namespace::Ethereum)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosmos" => Ok(Namespace::Cosmos),
            "ethereum" => Ok(Namespace::Ethereum),
            "aptos" => Ok(Namespace::Aptos),
            "sui" => Ok(Namespace::Sui),
            other => Err(ConnectorError::UnsupportedNamespace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        for ns in Namespace::ALL {
            assert_eq!(ns.as_str().parse::<Namespace>().unwrap(), ns);
        }
    }

    #[test]
    fn test_parse_unknown() {
        let err = "solana".parse::<Namespace>().unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedNamespace(ns) if ns == "solana"));
        // Case sensitive, like the native provider keys
        assert!("Cosmos".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_encodings() {
        assert_eq!(Namespace::Cosmos.address_encoding(), Encoding::Bech32);
        assert_eq!(Namespace::Sui.address_encoding(), Encoding::Hex);
        assert_eq!(Namespace::Cosmos.public_key_encoding(), Encoding::Hex);
    }
}
