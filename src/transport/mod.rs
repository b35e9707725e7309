//! Wallet Transports
//!
//! A transport is the single native entry point a wallet exposes: a
//! `request(payload)` call per provider (cosmos, ethereum, aptos, sui, keplr, ...)
//! plus native event subscription. Connectors never talk to a wallet any other way.

pub mod http;
pub mod memory;
pub mod ws;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, RecordedCall};
pub use ws::{WsConfig, WsTransport};

/// Callback invoked with the native event payload.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice is the
/// same listener, two separately built closures are two listeners.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Native subscription handle returned by the wallet at subscribe time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Failures raised by the wallet or by the channel to it.
///
/// These pass through connectors unmodified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet rejected request: {message}")]
    Rejected {
        code: Option<i64>,
        message: String,
        data: Option<Value>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unsupported by transport: {0}")]
    Unsupported(String),
}

impl WalletError {
    /// Build a rejection from a bridge `{"code","message","data"}` error object
    pub fn from_error_object(error: &Value) -> Self {
        WalletError::Rejected {
            code: error.get("code").and_then(Value::as_i64),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown wallet error")
                .to_string(),
            data: error.get("data").cloned(),
        }
    }

    /// EIP-1193 style user rejection (code 4001)
    pub fn user_rejected() -> Self {
        WalletError::Rejected {
            code: Some(4001),
            message: "User rejected the request".to_string(),
            data: None,
        }
    }
}

/// Native wallet entry point
#[async_trait]
pub trait WalletTransport: Send + Sync {
    /// Issue one native request against `provider`
    async fn request(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Register `listener` for the native `event`, returning the native handle
    async fn subscribe(
        &self,
        provider: &str,
        event: &str,
        listener: Listener,
    ) -> Result<SubscriptionId, WalletError>;

    /// Release a handle previously returned by [`WalletTransport::subscribe`]
    async fn unsubscribe(
        &self,
        provider: &str,
        event: &str,
        subscription: SubscriptionId,
    ) -> Result<(), WalletError>;
}

/// Bridge request envelope shared by the HTTP and WebSocket transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: u64,
    pub provider: String,
    pub method: String,
    pub params: Value,
}

/// Split a bridge reply into result or wallet error
pub(crate) fn bridge_reply(reply: &Value) -> Result<Value, WalletError> {
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        return Err(WalletError::from_error_object(error));
    }
    Ok(reply.get("result").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bridge_reply_result() {
        let reply = json!({"id": 1, "result": {"address": "cosmos1abc"}});
        assert_eq!(bridge_reply(&reply).unwrap(), json!({"address": "cosmos1abc"}));
    }

    #[test]
    fn test_bridge_reply_error() {
        let reply = json!({"id": 1, "error": {"code": 4001, "message": "rejected"}});
        match bridge_reply(&reply) {
            Err(WalletError::Rejected { code, message, .. }) => {
                assert_eq!(code, Some(4001));
                assert_eq!(message, "rejected");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_null_error_is_success() {
        let reply = json!({"id": 2, "error": null, "result": true});
        assert_eq!(bridge_reply(&reply).unwrap(), json!(true));
    }
}
