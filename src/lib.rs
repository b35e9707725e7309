//! wallet-connectors - one contract over browser and mobile crypto wallets
//!
//! Cosmostation, Keplr and Leap behind a single [`connectors::WalletConnector`]
//! trait, across the cosmos, ethereum, aptos and sui namespaces.

pub mod connectors;
pub mod transport;

pub use connectors::{
    connect_wallet, supported_wallets, AuthRange, ConnectorError, Namespace, SignDoc, Signature,
    WalletAccount, WalletClient, WalletConnector,
};
pub use transport::{HttpTransport, MemoryTransport, WalletError, WalletTransport, WsConfig, WsTransport};
