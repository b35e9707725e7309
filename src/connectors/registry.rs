//! Wallet registry
//!
//! Static metadata about every wallet compiled in, plus a factory that builds
//! a connector by name.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::error::ConnectorError;
use super::namespace::Namespace;
use super::WalletClient;
use crate::transport::WalletTransport;

/// Static description of a supported wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub name: &'static str,
    pub pretty_name: &'static str,
    pub namespaces: &'static [Namespace],
    /// Native event fired when the active key changes
    pub account_event: &'static str,
    pub download: &'static str,
}

#[cfg(feature = "cosmostation")]
const COSMOSTATION: WalletInfo = WalletInfo {
    name: super::cosmostation::NAME,
    pretty_name: "Cosmostation",
    namespaces: &[Namespace::Cosmos, Namespace::Ethereum, Namespace::Aptos, Namespace::Sui],
    account_event: super::cosmostation::ACCOUNT_CHANGED,
    download: "https://cosmostation.io/wallet",
};

#[cfg(feature = "keplr")]
const KEPLR: WalletInfo = WalletInfo {
    name: super::keplr::NAME,
    pretty_name: "Keplr",
    namespaces: &[Namespace::Cosmos, Namespace::Ethereum],
    account_event: super::keplr::KEYSTORE_CHANGE,
    download: "https://www.keplr.app/download",
};

#[cfg(feature = "leap")]
const LEAP: WalletInfo = WalletInfo {
    name: super::leap::NAME,
    pretty_name: "Leap",
    namespaces: &[Namespace::Cosmos],
    account_event: super::leap::KEYSTORE_CHANGE,
    download: "https://www.leapwallet.io/download",
};

/// Every wallet compiled into this build
pub fn supported_wallets() -> Vec<WalletInfo> {
    let mut wallets = Vec::new();
    #[cfg(feature = "cosmostation")]
    wallets.push(COSMOSTATION);
    #[cfg(feature = "keplr")]
    wallets.push(KEPLR);
    #[cfg(feature = "leap")]
    wallets.push(LEAP);
    wallets
}

/// Build the connector registered under `name`
pub fn connect_wallet(name: &str, transport: Arc<dyn WalletTransport>) -> Result<WalletClient, ConnectorError> {
    let client = match name.to_lowercase().as_str() {
        #[cfg(feature = "cosmostation")]
        super::cosmostation::NAME => super::cosmostation::cosmostation(transport),
        #[cfg(feature = "keplr")]
        super::keplr::NAME => super::keplr::keplr(transport),
        #[cfg(feature = "leap")]
        super::leap::NAME => super::leap::leap(transport),
        _ => return Err(ConnectorError::UnknownWallet(name.to_string())),
    };
    info!("Created {} connector", name);
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::WalletConnector;
    use crate::transport::{Listener, MemoryTransport};

    #[test]
    fn test_registry_matches_clients() {
        let transport: Arc<dyn WalletTransport> = Arc::new(MemoryTransport::new());

        for info in supported_wallets() {
            let client = connect_wallet(info.name, transport.clone()).unwrap();
            assert_eq!(client.name(), info.name);
            assert_eq!(client.namespaces(), info.namespaces.to_vec());
        }
    }

    #[test]
    fn test_unknown_wallet() {
        let err = connect_wallet("metamask", Arc::new(MemoryTransport::new())).unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownWallet(name) if name == "metamask"));
    }

    #[cfg(feature = "keplr")]
    #[test]
    fn test_names_are_case_insensitive() {
        let client = connect_wallet("Keplr", Arc::new(MemoryTransport::new())).unwrap();
        assert_eq!(client.name(), "keplr");
    }

    #[cfg(feature = "leap")]
    #[test]
    fn test_client_usable_from_sync_code() {
        let transport = MemoryTransport::new();
        let client = connect_wallet("leap", Arc::new(transport.clone())).unwrap();

        tokio_test::assert_err!(tokio_test::block_on(client.switch_chain("cosmos", "cosmoshub-4")));
        let listener: Listener = Arc::new(|_: &serde_json::Value| {});
        tokio_test::assert_ok!(tokio_test::block_on(client.off("accountChanged", &listener)));
        assert!(transport.calls().is_empty());
    }

    #[cfg(feature = "cosmostation")]
    #[test]
    fn test_info_serializes_camel_case() {
        let value = serde_json::to_value(supported_wallets()[0].clone()).unwrap();
        assert!(value.get("prettyName").is_some());
        assert!(value["namespaces"].is_array());
    }
}
