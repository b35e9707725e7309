//! HTTP Wallet Bridge
//!
//! Posts each native request to a wallet bridge (companion app, signing
//! daemon) and reads back one reply. Request/response only: events need
//! [`super::WsTransport`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{bridge_reply, BridgeRequest, Listener, SubscriptionId, WalletError, WalletTransport};

/// Request/response bridge over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Use a preconfigured client (proxies, TLS roots, ...)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            WalletError::Transport(format!("Connection failed: {}", err))
        } else {
            WalletError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl WalletTransport for HttpTransport {
    async fn request(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        let envelope = BridgeRequest {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            provider: provider.to_string(),
            method: method.to_string(),
            params,
        };
        debug!("POST {} {}.{} (id {})", self.url, provider, method, envelope.id);

        let resp = self.client.post(&self.url).json(&envelope).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WalletError::Transport(format!("Bridge returned {}: {}", status, body)));
        }

        let reply: Value = resp.json().await?;
        bridge_reply(&reply)
    }

    async fn subscribe(
        &self,
        _provider: &str,
        event: &str,
        _listener: Listener,
    ) -> Result<SubscriptionId, WalletError> {
        Err(WalletError::Unsupported(format!(
            "HTTP bridge cannot deliver '{}' events",
            event
        )))
    }

    async fn unsubscribe(
        &self,
        _provider: &str,
        event: &str,
        _subscription: SubscriptionId,
    ) -> Result<(), WalletError> {
        Err(WalletError::Unsupported(format!(
            "HTTP bridge cannot deliver '{}' events",
            event
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_events_are_unsupported() {
        let transport = HttpTransport::new("http://127.0.0.1:9");
        let listener: Listener = Arc::new(|_| {});
        let result = transport.subscribe("cosmos", "accountChanged", listener).await;
        assert!(matches!(result, Err(WalletError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_unreachable_bridge_is_transport_error() {
        // Port 9 (discard) is not expected to run an HTTP server
        let transport = HttpTransport::new("http://127.0.0.1:9/bridge");
        let result = transport.request("cosmos", "cos_requestAccount", Value::Null).await;
        assert!(matches!(result, Err(WalletError::Transport(_))));
    }
}
