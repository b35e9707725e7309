//! Event Bridge
//!
//! Native unsubscribe APIs want the handle returned at subscribe time, not the
//! listener. The bridge keeps `(event type, listener) -> handle` so `off` can
//! release exactly what `on` registered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::error::ConnectorError;
use crate::transport::{Listener, SubscriptionId, WalletTransport};

/// Identity of a listener: its `Arc` allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerKey(usize);

impl ListenerKey {
    fn of(listener: &Listener) -> Self {
        ListenerKey(Arc::as_ptr(listener) as *const () as usize)
    }
}

struct Registration {
    // Held so the allocation (and with it the key) stays unique while registered
    _listener: Listener,
    handle: SubscriptionId,
}

/// Listener registry for one wallet
pub struct EventBridge {
    transport: Arc<dyn WalletTransport>,
    provider: String,
    native_names: HashMap<String, String>,
    registry: Mutex<HashMap<String, HashMap<ListenerKey, Registration>>>,
}

impl EventBridge {
    /// Bridge events through `provider` on `transport`
    pub fn new(transport: Arc<dyn WalletTransport>, provider: &str) -> Self {
        Self {
            transport,
            provider: provider.to_string(),
            native_names: HashMap::new(),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Map an abstract event type onto the wallet's own event name
    pub fn with_native_name(mut self, event: &str, native: &str) -> Self {
        self.native_names.insert(event.to_string(), native.to_string());
        self
    }

    /// Native name for `event`; unmapped types pass through verbatim
    pub fn native_name<'a>(&'a self, event: &'a str) -> &'a str {
        self.native_names.get(event).map(String::as_str).unwrap_or(event)
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, HashMap<ListenerKey, Registration>>> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `listener` for `event`. Registering the same pair twice keeps
    /// the first native subscription.
    pub async fn on(&self, event: &str, listener: Listener) -> Result<(), ConnectorError> {
        let key = ListenerKey::of(&listener);
        if self.handle_of(event, key).is_some() {
            debug!("Listener already registered for {}", event);
            return Ok(());
        }

        let native = self.native_name(event);
        let handle = self
            .transport
            .subscribe(&self.provider, native, listener.clone())
            .await?;

        // A concurrent `on` for the same pair may have won while we awaited
        let duplicate = {
            let mut registry = self.registry();
            let listeners = registry.entry(event.to_string()).or_default();
            if listeners.contains_key(&key) {
                true
            } else {
                listeners.insert(key, Registration { _listener: listener, handle });
                false
            }
        };

        if duplicate {
            debug!("Listener registered concurrently for {}, releasing {}", event, handle);
            self.transport.unsubscribe(&self.provider, native, handle).await?;
            return Ok(());
        }
        info!("Subscribed {} -> {}.{} ({})", event, self.provider, native, handle);
        Ok(())
    }

    /// Remove `listener` from `event`. Unknown pairs are a no-op.
    pub async fn off(&self, event: &str, listener: &Listener) -> Result<(), ConnectorError> {
        let key = ListenerKey::of(listener);
        let removed = {
            let mut registry = self.registry();
            let removed = registry.get_mut(event).and_then(|listeners| listeners.remove(&key));
            if registry.get(event).is_some_and(|listeners| listeners.is_empty()) {
                registry.remove(event);
            }
            removed
        };

        let Some(registration) = removed else {
            debug!("No listener registered for {}, nothing to remove", event);
            return Ok(());
        };

        let native = self.native_name(event);
        self.transport
            .unsubscribe(&self.provider, native, registration.handle)
            .await?;
        info!("Unsubscribed {} ({})", event, registration.handle);
        Ok(())
    }

    /// Native handle held for `(event, listener)`
    pub fn handle_for(&self, event: &str, listener: &Listener) -> Option<SubscriptionId> {
        self.handle_of(event, ListenerKey::of(listener))
    }

    fn handle_of(&self, event: &str, key: ListenerKey) -> Option<SubscriptionId> {
        self.registry()
            .get(event)
            .and_then(|listeners| listeners.get(&key))
            .map(|registration| registration.handle)
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.registry().get(event).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, RecordedCall, WalletError};
    use serde_json::{json, Value};

    /// Memory wallet whose subscribe suspends once before answering
    struct YieldingTransport(MemoryTransport);

    #[async_trait::async_trait]
    impl WalletTransport for YieldingTransport {
        async fn request(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError> {
            self.0.request(provider, method, params).await
        }

        async fn subscribe(
            &self,
            provider: &str,
            event: &str,
            listener: Listener,
        ) -> Result<SubscriptionId, WalletError> {
            tokio::task::yield_now().await;
            self.0.subscribe(provider, event, listener).await
        }

        async fn unsubscribe(
            &self,
            provider: &str,
            event: &str,
            subscription: SubscriptionId,
        ) -> Result<(), WalletError> {
            self.0.unsubscribe(provider, event, subscription).await
        }
    }

    fn bridge(transport: &MemoryTransport) -> EventBridge {
        EventBridge::new(Arc::new(transport.clone()), "keplr")
            .with_native_name("accountChanged", "keplr_keystorechange")
    }

    #[tokio::test]
    async fn test_on_off_releases_registered_handle_once() {
        let transport = MemoryTransport::new();
        let bridge = bridge(&transport);
        let listener: Listener = Arc::new(|_| {});

        bridge.on("accountChanged", listener.clone()).await.unwrap();
        let handle = bridge.handle_for("accountChanged", &listener).unwrap();

        bridge.off("accountChanged", &listener).await.unwrap();
        bridge.off("accountChanged", &listener).await.unwrap();

        assert_eq!(transport.unsubscribe_count(handle), 1);
        assert_eq!(bridge.listener_count("accountChanged"), 0);
        assert_eq!(
            transport.calls().last(),
            Some(&RecordedCall::Unsubscribe {
                provider: "keplr".into(),
                event: "keplr_keystorechange".into(),
                subscription: handle,
            })
        );
    }

    #[tokio::test]
    async fn test_distinct_listeners_are_distinct_entries() {
        let transport = MemoryTransport::new();
        let bridge = bridge(&transport);
        let first: Listener = Arc::new(|_| {});
        let second: Listener = Arc::new(|_| {});

        bridge.on("accountChanged", first.clone()).await.unwrap();
        bridge.on("accountChanged", second.clone()).await.unwrap();
        bridge.on("accountChanged", first.clone()).await.unwrap();

        assert_eq!(bridge.listener_count("accountChanged"), 2);
        assert_eq!(transport.active_subscriptions(), 2);

        bridge.off("accountChanged", &first).await.unwrap();
        assert_eq!(transport.emit("keplr", "keplr_keystorechange", &json!({})), 1);
        assert!(bridge.handle_for("accountChanged", &second).is_some());
    }

    #[tokio::test]
    async fn test_off_is_scoped_by_event_type() {
        let transport = MemoryTransport::new();
        let bridge = bridge(&transport);
        let listener: Listener = Arc::new(|_| {});

        bridge.on("chainChanged", listener.clone()).await.unwrap();
        bridge.off("accountChanged", &listener).await.unwrap();

        assert_eq!(bridge.listener_count("chainChanged"), 1);
        assert_eq!(bridge.native_name("chainChanged"), "chainChanged");
    }

    #[tokio::test]
    async fn test_concurrent_on_for_same_pair_keeps_one_subscription() {
        let transport = MemoryTransport::new();
        let bridge = EventBridge::new(Arc::new(YieldingTransport(transport.clone())), "keplr");
        let listener: Listener = Arc::new(|_| {});

        let (first, second) = tokio::join!(
            bridge.on("accountChanged", listener.clone()),
            bridge.on("accountChanged", listener.clone()),
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(bridge.listener_count("accountChanged"), 1);
        assert_eq!(transport.active_subscriptions(), 1);

        bridge.off("accountChanged", &listener).await.unwrap();
        assert_eq!(bridge.listener_count("accountChanged"), 0);
        assert_eq!(transport.active_subscriptions(), 0);
    }
}
