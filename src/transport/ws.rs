//! WebSocket Wallet Bridge
//!
//! One socket carries both requests and native event notifications.
//! Replies are routed back to callers by request id; notifications carry the
//! subscription id handed out by the bridge at subscribe time.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::{bridge_reply, BridgeRequest, Listener, SubscriptionId, WalletError, WalletTransport};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, WalletError>>>>>;
type Listeners = Arc<Mutex<HashMap<SubscriptionId, Listener>>>;

/// Configuration for the WebSocket bridge
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Bridge URL (ws:// or wss://)
    pub url: String,
    /// Ping interval
    pub ping_interval: Duration,
    /// Outgoing queue depth
    pub channel_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            ping_interval: Duration::from_secs(30),
            channel_capacity: 100,
        }
    }
}

impl WsConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}

/// Bridge connection shared by all connectors built on it
pub struct WsTransport {
    outgoing: mpsc::Sender<String>,
    pending: Pending,
    listeners: Listeners,
    next_id: AtomicU64,
}

impl From<tokio_tungstenite::tungstenite::Error> for WalletError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WalletError::Transport(err.to_string())
    }
}

impl WsTransport {
    /// Open the socket and spawn the reader/writer task.
    ///
    /// The session is not re-established if the socket drops: wallet
    /// permissions are bound to it, so callers must reconnect explicitly.
    pub async fn connect(config: WsConfig) -> Result<Self, WalletError> {
        let (ws_stream, _response) = connect_async(&config.url).await?;
        info!("Wallet bridge connected to {}", config.url);

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(config.channel_capacity);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listeners: Listeners = Arc::new(Mutex::new(HashMap::new()));

        let task_pending = pending.clone();
        let task_listeners = listeners.clone();
        let ping_interval = config.ping_interval;

        tokio::spawn(async move {
            let (mut write, mut read) = ws_stream.split();
            let mut ping = tokio::time::interval(ping_interval);
            ping.tick().await;

            loop {
                tokio::select! {
                    outgoing = outgoing_rx.recv() => {
                        // Transport dropped
                        let Some(msg) = outgoing else { break };
                        debug!("Sending bridge message: {}", truncate(&msg, 100));
                        if write.send(Message::Text(msg)).await.is_err() {
                            error!("Failed to send bridge message");
                            break;
                        }
                    }

                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                route_incoming(&text, &task_pending, &task_listeners);
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if write.send(Message::Pong(data)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Wallet bridge closed");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("Wallet bridge error: {}", e);
                                break;
                            }
                        }
                    }

                    _ = ping.tick() => {
                        if write.send(Message::Ping(vec![])).await.is_err() {
                            break;
                        }
                    }
                }
            }

            fail_pending(&task_pending, "wallet bridge connection closed");
        });

        Ok(Self {
            outgoing: outgoing_tx,
            pending,
            listeners,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = BridgeRequest {
            id,
            provider: provider.to_string(),
            method: method.to_string(),
            params,
        };
        let text = serde_json::to_string(&envelope)
            .map_err(|e| WalletError::Transport(format!("Cannot encode request: {}", e)))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id, reply_tx);

        if self.outgoing.send(text).await.is_err() {
            lock(&self.pending).remove(&id);
            return Err(WalletError::Transport("wallet bridge connection closed".to_string()));
        }

        reply_rx
            .await
            .map_err(|_| WalletError::Transport("wallet bridge dropped the request".to_string()))?
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Dispatch one bridge frame to its waiting caller or to a listener
fn route_incoming(text: &str, pending: &Pending, listeners: &Listeners) {
    let frame: Value = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Ignoring malformed bridge frame: {}", e);
            return;
        }
    };

    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        match lock(pending).remove(&id) {
            Some(reply_tx) => {
                let _ = reply_tx.send(bridge_reply(&frame));
            }
            None => warn!("Reply for unknown request id {}", id),
        }
        return;
    }

    if let Some(sub) = frame.get("subscription").and_then(Value::as_u64) {
        let listener = lock(listeners).get(&SubscriptionId(sub)).cloned();
        match listener {
            Some(listener) => listener(frame.get("data").unwrap_or(&Value::Null)),
            None => debug!("Notification for released subscription {}", sub),
        }
    }
}

fn fail_pending(pending: &Pending, reason: &str) {
    for (_, reply_tx) in lock(pending).drain() {
        let _ = reply_tx.send(Err(WalletError::Transport(reason.to_string())));
    }
}

#[async_trait]
impl WalletTransport for WsTransport {
    async fn request(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        self.call(provider, method, params).await
    }

    async fn subscribe(
        &self,
        provider: &str,
        event: &str,
        listener: Listener,
    ) -> Result<SubscriptionId, WalletError> {
        let reply = self
            .call(provider, "subscribe", json!({ "provider": provider, "event": event }))
            .await?;
        let subscription = reply
            .as_u64()
            .map(SubscriptionId)
            .ok_or_else(|| WalletError::Transport(format!("Bridge returned non-numeric subscription: {}", reply)))?;

        lock(&self.listeners).insert(subscription, listener);
        Ok(subscription)
    }

    async fn unsubscribe(
        &self,
        provider: &str,
        event: &str,
        subscription: SubscriptionId,
    ) -> Result<(), WalletError> {
        lock(&self.listeners).remove(&subscription);
        self.call(
            provider,
            "unsubscribe",
            json!({ "provider": provider, "event": event, "subscription": subscription }),
        )
        .await?;
        Ok(())
    }
}
