//! Leap Connector
//!
//! Leap mirrors Keplr's injected object (`window.leap`) for cosmos chains and
//! has no other namespaces.

use std::sync::Arc;

use crate::connectors::bindings::NativeProvider;
use crate::connectors::events::EventBridge;
use crate::connectors::keplr::KeplrCosmos;
use crate::connectors::WalletClient;
use crate::transport::WalletTransport;

pub const NAME: &str = "leap";
pub const PROVIDER: &str = "leap";
pub const WINDOW: &str = "window";

pub const ACCOUNT_CHANGED: &str = "accountChanged";
pub const KEYSTORE_CHANGE: &str = "leap_keystorechange";

/// Build a Leap client over `transport`
pub fn leap(transport: Arc<dyn WalletTransport>) -> WalletClient {
    let events = EventBridge::new(transport.clone(), WINDOW).with_native_name(ACCOUNT_CHANGED, KEYSTORE_CHANGE);

    WalletClient::new(NAME, events).with_cosmos(KeplrCosmos::new(NativeProvider::new(transport, PROVIDER)))
}
