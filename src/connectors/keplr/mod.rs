//! Keplr Connector
//!
//! Keplr injects one object (`window.keplr`) whose methods are addressed by
//! name on the `keplr` provider. Its EVM side is a standard EIP-1193 provider
//! mounted at `keplr.ethereum`. Account changes arrive as the window event
//! `keplr_keystorechange`.

pub mod cosmos;

use std::sync::Arc;

pub use cosmos::KeplrCosmos;

use crate::connectors::bindings::NativeProvider;
use crate::connectors::eip1193::Eip1193;
use crate::connectors::events::EventBridge;
use crate::connectors::WalletClient;
use crate::transport::WalletTransport;

pub const NAME: &str = "keplr";

pub mod providers {
    pub const COSMOS: &str = "keplr";
    pub const ETHEREUM: &str = "keplr.ethereum";
    /// Window-level events
    pub const WINDOW: &str = "window";
}

/// Abstract event name
pub const ACCOUNT_CHANGED: &str = "accountChanged";
pub const KEYSTORE_CHANGE: &str = "keplr_keystorechange";

/// Build a Keplr client over `transport`
pub fn keplr(transport: Arc<dyn WalletTransport>) -> WalletClient {
    let events = EventBridge::new(transport.clone(), providers::WINDOW)
        .with_native_name(ACCOUNT_CHANGED, KEYSTORE_CHANGE);

    WalletClient::new(NAME, events)
        .with_cosmos(KeplrCosmos::new(NativeProvider::new(transport.clone(), providers::COSMOS)))
        .with_ethereum(Eip1193::new(NativeProvider::new(transport, providers::ETHEREUM)))
}
