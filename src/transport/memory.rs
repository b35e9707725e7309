//! In-Process Scripted Transport
//!
//! Stands in for a browser or mobile wallet. Replies are scripted per
//! `(provider, method)`, every call is recorded in order, and events can be
//! pushed to whatever listeners are currently subscribed.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Listener, SubscriptionId, WalletError, WalletTransport};

type Handler = Arc<dyn Fn(&Value) -> Result<Value, WalletError> + Send + Sync>;

/// One native call seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Request {
        provider: String,
        method: String,
        params: Value,
    },
    Subscribe {
        provider: String,
        event: String,
        subscription: SubscriptionId,
    },
    Unsubscribe {
        provider: String,
        event: String,
        subscription: SubscriptionId,
    },
}

#[derive(Default)]
struct State {
    handlers: HashMap<(String, String), Handler>,
    calls: Vec<RecordedCall>,
    listeners: HashMap<SubscriptionId, (String, String, Listener)>,
}

/// Scripted wallet
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
    next_subscription: Arc<AtomicU64>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking handler only poisons test state; keep serving
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer every `method` on `provider` with a fixed value
    pub fn respond(self, provider: &str, method: &str, result: Value) -> Self {
        self.respond_with(provider, method, move |_| Ok(result.clone()))
    }

    /// Fail every `method` on `provider` with `error`
    pub fn reject(self, provider: &str, method: &str, error: WalletError) -> Self {
        self.respond_with(provider, method, move |_| Err(error.clone()))
    }

    /// Answer `method` on `provider` by computing a reply from the params
    pub fn respond_with<F>(self, provider: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, WalletError> + Send + Sync + 'static,
    {
        self.state()
            .handlers
            .insert((provider.to_string(), method.to_string()), Arc::new(handler));
        self
    }

    /// Every call seen so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Methods of the requests seen so far, in order
    pub fn requested_methods(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Request { method, .. } => Some(method.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of unsubscribe calls carrying `subscription`
    pub fn unsubscribe_count(&self, subscription: SubscriptionId) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Unsubscribe { subscription: s, .. } if *s == subscription))
            .count()
    }

    /// Number of live native subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.state().listeners.len()
    }

    /// Deliver `payload` to every listener subscribed to `event` on `provider`.
    /// Returns how many listeners ran.
    pub fn emit(&self, provider: &str, event: &str, payload: &Value) -> usize {
        let targets: Vec<Listener> = self
            .state()
            .listeners
            .values()
            .filter(|(p, e, _)| p == provider && e == event)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in &targets {
            listener(payload);
        }
        targets.len()
    }
}

#[async_trait]
impl WalletTransport for MemoryTransport {
    async fn request(&self, provider: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        let handler = {
            let mut state = self.state();
            state.calls.push(RecordedCall::Request {
                provider: provider.to_string(),
                method: method.to_string(),
                params: params.clone(),
            });
            state
                .handlers
                .get(&(provider.to_string(), method.to_string()))
                .cloned()
        };

        match handler {
            Some(handler) => handler(&params),
            None => Err(WalletError::Rejected {
                code: Some(-32601),
                message: format!("{}.{} is not scripted", provider, method),
                data: None,
            }),
        }
    }

    async fn subscribe(
        &self,
        provider: &str,
        event: &str,
        listener: Listener,
    ) -> Result<SubscriptionId, WalletError> {
        let subscription = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst) + 1);
        let mut state = self.state();
        state.calls.push(RecordedCall::Subscribe {
            provider: provider.to_string(),
            event: event.to_string(),
            subscription,
        });
        state
            .listeners
            .insert(subscription, (provider.to_string(), event.to_string(), listener));
        Ok(subscription)
    }

    async fn unsubscribe(
        &self,
        provider: &str,
        event: &str,
        subscription: SubscriptionId,
    ) -> Result<(), WalletError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Unsubscribe {
            provider: provider.to_string(),
            event: event.to_string(),
            subscription,
        });
        state.listeners.remove(&subscription);
        Ok(())
    }
}
