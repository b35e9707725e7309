//! Per-namespace bindings
//!
//! One trait per namespace. A wallet adapter is a set of these: each impl
//! owns the wallet's native method names and response field names for that
//! namespace and returns normalized types. Optional operations default to
//! `UnsupportedOperation`.

use async_trait::async_trait;
use ethers_core::types::transaction::eip712::TypedData;
use ethers_core::types::TransactionRequest;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::error::ConnectorError;
use super::namespace::Namespace;
use super::sign_doc::{DirectSignDoc, StdSignDoc};
use super::types::{Block, BroadcastMode, SignOptions, Signature, WalletAccount};
use crate::transport::WalletTransport;

/// Named entry point on a transport (`"cosmos"`, `"keplr"`, ...)
#[derive(Clone)]
pub struct NativeProvider {
    transport: Arc<dyn WalletTransport>,
    name: String,
}

impl NativeProvider {
    pub fn new(transport: Arc<dyn WalletTransport>, name: &str) -> Self {
        Self {
            transport,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issue one native request; wallet failures pass through as-is
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ConnectorError> {
        debug!("{}.{} request", self.name, method);
        let reply = self.transport.request(&self.name, method, params).await?;
        Ok(reply)
    }
}

impl std::fmt::Debug for NativeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeProvider").field("name", &self.name).finish()
    }
}

/// Cosmos-SDK chains
#[async_trait]
pub trait CosmosApi: Send + Sync {
    /// Grant permission for the given chains
    async fn enable(&self, chain_ids: &[String]) -> Result<(), ConnectorError>;

    /// Account for one chain
    async fn get_account(&self, chain_id: &str) -> Result<WalletAccount, ConnectorError>;

    /// ADR-36 arbitrary message signing
    async fn sign_message(
        &self,
        chain_id: &str,
        signer: &str,
        message: &str,
    ) -> Result<Signature, ConnectorError>;

    async fn sign_amino(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &StdSignDoc,
        options: &SignOptions,
    ) -> Result<Signature, ConnectorError>;

    async fn sign_direct(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &DirectSignDoc,
        options: &SignOptions,
    ) -> Result<Signature, ConnectorError>;

    async fn add_chain(&self, _chain_info: Value) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Cosmos, "addChain"))
    }

    async fn verify_message(
        &self,
        _chain_id: &str,
        _signer: &str,
        _message: &str,
        _signature: &Signature,
    ) -> Result<bool, ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Cosmos, "verify"))
    }

    /// Relay a serialized transaction, returning its hash
    async fn send_tx(
        &self,
        _chain_id: &str,
        _tx: &[u8],
        _mode: BroadcastMode,
    ) -> Result<Vec<u8>, ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Cosmos, "sendTx"))
    }

    async fn disconnect(&self, _chain_ids: Option<&[String]>) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Cosmos, "disconnect"))
    }
}

/// Ethereum-style wallets (single active chain)
#[async_trait]
pub trait EthereumApi: Send + Sync {
    async fn connect(&self) -> Result<(), ConnectorError>;

    /// All accounts the wallet currently exposes
    async fn accounts(&self) -> Result<Vec<WalletAccount>, ConnectorError>;

    async fn sign_message(&self, signer: &str, message: &str) -> Result<Signature, ConnectorError>;

    async fn sign_transaction(
        &self,
        signer: &str,
        tx: &TransactionRequest,
    ) -> Result<Signature, ConnectorError>;

    async fn sign_typed_data(&self, signer: &str, data: &TypedData) -> Result<Signature, ConnectorError>;

    async fn add_chain(&self, _chain_info: Value) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Ethereum, "addChain"))
    }

    async fn switch_chain(&self, _chain_id: &str) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Ethereum, "switchChain"))
    }

    /// Sign and submit in one wallet call
    async fn send_transaction(
        &self,
        _signer: Option<&str>,
        _tx: &TransactionRequest,
    ) -> Result<Block, ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Ethereum, "signAndBroadcast"))
    }
}

/// Aptos
#[async_trait]
pub trait AptosApi: Send + Sync {
    async fn connect(&self) -> Result<(), ConnectorError>;

    async fn account(&self) -> Result<WalletAccount, ConnectorError>;

    async fn sign_message(&self, message: &str) -> Result<Signature, ConnectorError>;

    async fn sign_transaction(&self, payload: &Value) -> Result<Signature, ConnectorError>;

    async fn sign_and_submit(&self, _payload: &Value) -> Result<Block, ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Aptos, "signAndBroadcast"))
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Aptos, "disconnect"))
    }
}

/// Sui
#[async_trait]
pub trait SuiApi: Send + Sync {
    async fn connect(&self) -> Result<(), ConnectorError>;

    async fn account(&self) -> Result<WalletAccount, ConnectorError>;

    async fn sign_message(&self, signer: &str, message: &str) -> Result<Signature, ConnectorError>;

    async fn sign_transaction(&self, signer: &str, tx: &Value) -> Result<Signature, ConnectorError>;

    async fn sign_and_execute(&self, _signer: Option<&str>, _tx: &Value) -> Result<Block, ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Sui, "signAndBroadcast"))
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        Err(ConnectorError::unsupported_operation(Namespace::Sui, "disconnect"))
    }
}
