//! Wallet Connectors
//!
//! This module provides a unified interface for interacting with browser and
//! mobile crypto wallets. Every wallet is exposed through the `WalletConnector`
//! trait, providing a consistent API for:
//! - Permission management (connect, disconnect, add/switch chain)
//! - Account listing across namespaces
//! - Signing, verification and sign-and-broadcast
//! - Native event subscription
//!
//! [`WalletClient`] is the one implementation of the dispatch skeleton. Wallet
//! adapters only differ in the per-namespace bindings they plug into it.

pub mod bindings;
pub mod eip1193;
pub mod encoding;
pub mod error;
pub mod events;
pub mod namespace;
pub mod registry;
pub mod sign_doc;
pub mod signer;
pub mod types;

#[cfg(feature = "cosmostation")]
pub mod cosmostation;
#[cfg(feature = "keplr")]
pub mod keplr;
#[cfg(feature = "leap")]
pub mod leap;

// Re-export commonly used items
pub use bindings::{AptosApi, CosmosApi, EthereumApi, NativeProvider, SuiApi};
pub use error::ConnectorError;
pub use events::EventBridge;
pub use namespace::Namespace;
pub use registry::{connect_wallet, supported_wallets, WalletInfo};
pub use sign_doc::{AminoMsg, Coin, DirectSignDoc, SignDoc, StdFee, StdSignDoc};
pub use signer::{AminoSigner, DirectSigner, OfflineSigner};
pub use types::*;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::transport::Listener;

/// Capability contract every wallet adapter implements
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Get the wallet name
    fn name(&self) -> &str;

    /// Namespaces this wallet has bindings for
    fn namespaces(&self) -> Vec<Namespace>;

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Ask the wallet for permission on every namespace in `range`
    async fn connect(&self, range: &AuthRange) -> Result<(), ConnectorError>;

    /// Forward a namespace-specific chain descriptor to the wallet
    async fn add_chain(&self, namespace: &str, chain_info: Value) -> Result<(), ConnectorError>;

    /// Change the wallet's active chain
    async fn switch_chain(&self, namespace: &str, chain_id: &str) -> Result<(), ConnectorError>;

    /// Revoke permissions for every namespace in `range`
    async fn disconnect(&self, range: &AuthRange) -> Result<(), ConnectorError>;

    // =========================================================================
    // Accounts & Signing
    // =========================================================================

    /// Accounts for every namespace in `range`, flattened in range order
    async fn get_accounts(&self, range: &AuthRange) -> Result<Vec<WalletAccount>, ConnectorError>;

    /// Sign `doc` with `signer`
    async fn sign(
        &self,
        namespace: &str,
        doc: SignDoc,
        signer: &str,
        chain_id: Option<&str>,
        options: Option<SignOptions>,
    ) -> Result<Signature, ConnectorError>;

    /// Check a signature produced by [`WalletConnector::sign`]
    async fn verify(
        &self,
        namespace: &str,
        doc: &SignDoc,
        signature: &Signature,
        signer: &str,
        chain_id: Option<&str>,
    ) -> Result<bool, ConnectorError>;

    /// Sign and submit in one wallet call
    async fn sign_and_broadcast(
        &self,
        namespace: &str,
        doc: SignDoc,
        signer: Option<&str>,
        chain_id: Option<&str>,
        options: Option<SignOptions>,
    ) -> Result<Block, ConnectorError>;

    /// Sign a raw JSON document, classifying it at the boundary
    async fn sign_json(
        &self,
        namespace: &str,
        doc: Value,
        signer: &str,
        chain_id: Option<&str>,
        options: Option<SignOptions>,
    ) -> Result<Signature, ConnectorError> {
        let ns: Namespace = namespace.parse()?;
        let doc = SignDoc::from_json(ns, doc)?;
        self.sign(namespace, doc, signer, chain_id, options).await
    }

    // =========================================================================
    // Cosmos transaction plumbing
    // =========================================================================

    /// Signer bound to `chain_id`; "direct" selects direct signing, anything
    /// else amino
    fn get_offline_signer(
        &self,
        chain_id: &str,
        preferred_sign_type: Option<&str>,
    ) -> Result<OfflineSigner, ConnectorError>;

    /// Relay a serialized transaction, returning its hash
    async fn send_tx(&self, chain_id: &str, tx: &[u8], mode: BroadcastMode) -> Result<Vec<u8>, ConnectorError>;

    // =========================================================================
    // Events
    // =========================================================================

    async fn on(&self, event: &str, listener: Listener) -> Result<(), ConnectorError>;

    async fn off(&self, event: &str, listener: &Listener) -> Result<(), ConnectorError>;
}

/// Namespace dispatch over a wallet's bindings
pub struct WalletClient {
    name: String,
    cosmos: Option<Arc<dyn CosmosApi>>,
    ethereum: Option<Arc<dyn EthereumApi>>,
    aptos: Option<Arc<dyn AptosApi>>,
    sui: Option<Arc<dyn SuiApi>>,
    events: EventBridge,
    default_sign_options: SignOptions,
}

/// Binding selected for one namespace
enum Binding<'a> {
    Cosmos(&'a Arc<dyn CosmosApi>),
    Ethereum(&'a Arc<dyn EthereumApi>),
    Aptos(&'a Arc<dyn AptosApi>),
    Sui(&'a Arc<dyn SuiApi>),
}

impl WalletClient {
    pub fn new(name: &str, events: EventBridge) -> Self {
        Self {
            name: name.to_string(),
            cosmos: None,
            ethereum: None,
            aptos: None,
            sui: None,
            events,
            default_sign_options: SignOptions::default(),
        }
    }

    pub fn with_cosmos(mut self, api: impl CosmosApi + 'static) -> Self {
        self.cosmos = Some(Arc::new(api));
        self
    }

    pub fn with_ethereum(mut self, api: impl EthereumApi + 'static) -> Self {
        self.ethereum = Some(Arc::new(api));
        self
    }

    pub fn with_aptos(mut self, api: impl AptosApi + 'static) -> Self {
        self.aptos = Some(Arc::new(api));
        self
    }

    pub fn with_sui(mut self, api: impl SuiApi + 'static) -> Self {
        self.sui = Some(Arc::new(api));
        self
    }

    /// Sign options used when a call passes `None`
    pub fn with_default_sign_options(mut self, options: SignOptions) -> Self {
        self.default_sign_options = options;
        self
    }

    pub fn events(&self) -> &EventBridge {
        &self.events
    }

    /// Resolve a namespace name to this wallet's binding for it
    fn binding(&self, namespace: &str) -> Result<(Namespace, Binding<'_>), ConnectorError> {
        let ns: Namespace = namespace.parse()?;
        let binding = match ns {
            Namespace::Cosmos => self.cosmos.as_ref().map(Binding::Cosmos),
            Namespace::Ethereum => self.ethereum.as_ref().map(Binding::Ethereum),
            Namespace::Aptos => self.aptos.as_ref().map(Binding::Aptos),
            Namespace::Sui => self.sui.as_ref().map(Binding::Sui),
        };
        match binding {
            Some(binding) => Ok((ns, binding)),
            None => {
                warn!("{} has no binding for {}", self.name, ns);
                Err(ConnectorError::UnsupportedNamespace(ns.to_string()))
            }
        }
    }

    fn cosmos(&self) -> Result<&Arc<dyn CosmosApi>, ConnectorError> {
        self.cosmos
            .as_ref()
            .ok_or_else(|| ConnectorError::UnsupportedNamespace(Namespace::Cosmos.to_string()))
    }

    async fn connect_namespace(&self, namespace: &str, data: &NamespaceData) -> Result<(), ConnectorError> {
        match self.binding(namespace)? {
            (ns, Binding::Cosmos(cosmos)) => {
                let chain_ids = required_chain_ids(ns, data)?;
                cosmos.enable(chain_ids).await
            }
            (_, Binding::Ethereum(ethereum)) => ethereum.connect().await,
            (_, Binding::Aptos(aptos)) => aptos.connect().await,
            (_, Binding::Sui(sui)) => sui.connect().await,
        }
    }

    async fn accounts_for_namespace(
        &self,
        namespace: &str,
        data: &NamespaceData,
    ) -> Result<Vec<WalletAccount>, ConnectorError> {
        match self.binding(namespace)? {
            (ns, Binding::Cosmos(cosmos)) => {
                let chain_ids = required_chain_ids(ns, data)?;
                let results = join_all(chain_ids.iter().map(|id| cosmos.get_account(id))).await;
                results.into_iter().collect()
            }
            (_, Binding::Ethereum(ethereum)) => ethereum.accounts().await,
            (_, Binding::Aptos(aptos)) => Ok(vec![aptos.account().await?]),
            (_, Binding::Sui(sui)) => Ok(vec![sui.account().await?]),
        }
    }

    async fn disconnect_namespace(&self, namespace: &str, data: &NamespaceData) -> Result<(), ConnectorError> {
        match self.binding(namespace)? {
            (_, Binding::Cosmos(cosmos)) => cosmos.disconnect(data.chain_ids.as_deref()).await,
            (ns, Binding::Ethereum(_)) => Err(ConnectorError::unsupported_operation(ns, "disconnect")),
            (_, Binding::Aptos(aptos)) => aptos.disconnect().await,
            (_, Binding::Sui(sui)) => sui.disconnect().await,
        }
    }
}

fn required_chain_ids(ns: Namespace, data: &NamespaceData) -> Result<&[String], ConnectorError> {
    match data.chain_ids.as_deref() {
        Some(ids) if !ids.is_empty() => Ok(ids),
        _ => Err(ConnectorError::MissingChainIds(ns.to_string())),
    }
}

fn required_chain_id(ns: Namespace, chain_id: Option<&str>) -> Result<&str, ConnectorError> {
    chain_id.ok_or_else(|| ConnectorError::MissingChainId(ns.to_string()))
}

/// Settle every branch, then fail with the first error in range order
fn all_or_nothing<T>(results: Vec<Result<T, ConnectorError>>) -> Result<Vec<T>, ConnectorError> {
    results.into_iter().collect()
}

#[async_trait]
impl WalletConnector for WalletClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespaces(&self) -> Vec<Namespace> {
        let mut namespaces = Vec::new();
        if self.cosmos.is_some() {
            namespaces.push(Namespace::Cosmos);
        }
        if self.ethereum.is_some() {
            namespaces.push(Namespace::Ethereum);
        }
        if self.aptos.is_some() {
            namespaces.push(Namespace::Aptos);
        }
        if self.sui.is_some() {
            namespaces.push(Namespace::Sui);
        }
        namespaces
    }

    async fn connect(&self, range: &AuthRange) -> Result<(), ConnectorError> {
        info!("Connecting {} for {} namespace(s)", self.name, range.len());
        let results = join_all(range.iter().map(|(ns, data)| self.connect_namespace(ns, data))).await;
        all_or_nothing(results)?;
        Ok(())
    }

    async fn add_chain(&self, namespace: &str, chain_info: Value) -> Result<(), ConnectorError> {
        match self.binding(namespace)? {
            (_, Binding::Cosmos(cosmos)) => cosmos.add_chain(chain_info).await,
            (_, Binding::Ethereum(ethereum)) => ethereum.add_chain(chain_info).await,
            (ns, _) => Err(ConnectorError::unsupported_operation(ns, "addChain")),
        }
    }

    async fn switch_chain(&self, namespace: &str, chain_id: &str) -> Result<(), ConnectorError> {
        match self.binding(namespace)? {
            (_, Binding::Ethereum(ethereum)) => ethereum.switch_chain(chain_id).await,
            (ns, _) => Err(ConnectorError::unsupported_operation(ns, "switchChain")),
        }
    }

    async fn disconnect(&self, range: &AuthRange) -> Result<(), ConnectorError> {
        info!("Disconnecting {} for {} namespace(s)", self.name, range.len());
        let results = join_all(range.iter().map(|(ns, data)| self.disconnect_namespace(ns, data))).await;
        all_or_nothing(results)?;
        Ok(())
    }

    async fn get_accounts(&self, range: &AuthRange) -> Result<Vec<WalletAccount>, ConnectorError> {
        let results = join_all(range.iter().map(|(ns, data)| self.accounts_for_namespace(ns, data))).await;
        Ok(all_or_nothing(results)?.into_iter().flatten().collect())
    }

    async fn sign(
        &self,
        namespace: &str,
        doc: SignDoc,
        signer: &str,
        chain_id: Option<&str>,
        options: Option<SignOptions>,
    ) -> Result<Signature, ConnectorError> {
        let (ns, binding) = self.binding(namespace)?;
        if !doc.belongs_to(ns) {
            return Err(doc.mismatch(ns));
        }
        debug!("{} signing {} document on {}", self.name, doc.kind(), ns);
        let options = options.unwrap_or(self.default_sign_options);

        match (binding, &doc) {
            (Binding::Cosmos(cosmos), doc) => {
                let chain_id = required_chain_id(ns, chain_id)?;
                match doc {
                    SignDoc::Message(message) => cosmos.sign_message(chain_id, signer, message).await,
                    SignDoc::Amino(amino) => cosmos.sign_amino(chain_id, signer, amino, &options).await,
                    SignDoc::Direct(direct) => cosmos.sign_direct(chain_id, signer, direct, &options).await,
                    other => Err(other.mismatch(ns)),
                }
            }
            (Binding::Ethereum(ethereum), SignDoc::Message(message)) => ethereum.sign_message(signer, message).await,
            (Binding::Ethereum(ethereum), SignDoc::EthTransaction(tx)) => ethereum.sign_transaction(signer, tx).await,
            (Binding::Ethereum(ethereum), SignDoc::EthTypedData(data)) => ethereum.sign_typed_data(signer, data).await,
            (Binding::Aptos(aptos), SignDoc::Message(message)) => aptos.sign_message(message).await,
            (Binding::Aptos(aptos), SignDoc::AptosTransaction(payload)) => aptos.sign_transaction(payload).await,
            (Binding::Sui(sui), SignDoc::Message(message)) => sui.sign_message(signer, message).await,
            (Binding::Sui(sui), SignDoc::SuiTransaction(tx)) => sui.sign_transaction(signer, tx).await,
            (_, other) => Err(other.mismatch(ns)),
        }
    }

    async fn verify(
        &self,
        namespace: &str,
        doc: &SignDoc,
        signature: &Signature,
        signer: &str,
        chain_id: Option<&str>,
    ) -> Result<bool, ConnectorError> {
        match (self.binding(namespace)?, doc) {
            ((ns, Binding::Cosmos(cosmos)), SignDoc::Message(message)) => {
                let chain_id = required_chain_id(ns, chain_id)?;
                cosmos.verify_message(chain_id, signer, message, signature).await
            }
            ((ns, _), _) => Err(ConnectorError::unsupported_operation(ns, "verify")),
        }
    }

    async fn sign_and_broadcast(
        &self,
        namespace: &str,
        doc: SignDoc,
        signer: Option<&str>,
        _chain_id: Option<&str>,
        _options: Option<SignOptions>,
    ) -> Result<Block, ConnectorError> {
        let (ns, binding) = self.binding(namespace)?;
        if !doc.belongs_to(ns) {
            return Err(doc.mismatch(ns));
        }

        match (binding, &doc) {
            (Binding::Ethereum(ethereum), SignDoc::EthTransaction(tx)) => ethereum.send_transaction(signer, tx).await,
            (Binding::Aptos(aptos), SignDoc::AptosTransaction(payload)) => aptos.sign_and_submit(payload).await,
            (Binding::Sui(sui), SignDoc::SuiTransaction(tx)) => sui.sign_and_execute(signer, tx).await,
            _ => Err(ConnectorError::unsupported_operation(ns, "signAndBroadcast")),
        }
    }

    fn get_offline_signer(
        &self,
        chain_id: &str,
        preferred_sign_type: Option<&str>,
    ) -> Result<OfflineSigner, ConnectorError> {
        let cosmos = self.cosmos()?;
        Ok(OfflineSigner::new(
            cosmos.clone(),
            chain_id,
            SignType::from_preference(preferred_sign_type),
            self.default_sign_options,
        ))
    }

    async fn send_tx(&self, chain_id: &str, tx: &[u8], mode: BroadcastMode) -> Result<Vec<u8>, ConnectorError> {
        debug!("{} relaying {} byte tx to {} ({})", self.name, tx.len(), chain_id, mode.as_str());
        self.cosmos()?.send_tx(chain_id, tx, mode).await
    }

    async fn on(&self, event: &str, listener: Listener) -> Result<(), ConnectorError> {
        self.events.on(event, listener).await
    }

    async fn off(&self, event: &str, listener: &Listener) -> Result<(), ConnectorError> {
        self.events.off(event, listener).await
    }
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("name", &self.name)
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
