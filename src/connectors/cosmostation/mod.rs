//! Cosmostation Connector
//!
//! Cosmostation injects one request provider per namespace (`cosmos`,
//! `ethereum`, `aptos`, `sui`), each taking `{method, params}` payloads with
//! namespace-prefixed method names.

pub mod aptos;
pub mod cosmos;
pub mod sui;

use std::sync::Arc;

pub use aptos::CosmostationAptos;
pub use cosmos::CosmostationCosmos;
pub use sui::CosmostationSui;

use crate::connectors::bindings::NativeProvider;
use crate::connectors::eip1193::Eip1193;
use crate::connectors::events::EventBridge;
use crate::connectors::WalletClient;
use crate::transport::WalletTransport;

pub const NAME: &str = "cosmostation";

/// Native provider names
pub mod providers {
    pub const COSMOS: &str = "cosmos";
    pub const ETHEREUM: &str = "ethereum";
    pub const APTOS: &str = "aptos";
    pub const SUI: &str = "sui";
}

/// Native account event on the cosmos provider
pub const ACCOUNT_CHANGED: &str = "accountChanged";

/// Build a Cosmostation client over `transport`
pub fn cosmostation(transport: Arc<dyn WalletTransport>) -> WalletClient {
    let provider = |name: &str| NativeProvider::new(transport.clone(), name);

    let events = EventBridge::new(transport.clone(), providers::COSMOS);

    WalletClient::new(NAME, events)
        .with_cosmos(CosmostationCosmos::new(provider(providers::COSMOS)))
        .with_ethereum(Eip1193::new(provider(providers::ETHEREUM)))
        .with_aptos(CosmostationAptos::new(provider(providers::APTOS)))
        .with_sui(CosmostationSui::new(provider(providers::SUI)))
}
