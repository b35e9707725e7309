//! EIP-1193 Ethereum binding
//!
//! Every supported wallet exposes the standard Ethereum provider request
//! vocabulary, so this binding is shared; wallets differ only in which
//! provider name it is mounted on.

use async_trait::async_trait;
use ethers_core::types::transaction::eip712::TypedData;
use ethers_core::types::{Address, TransactionRequest};
use serde_json::{json, Value};
use tracing::info;

use super::bindings::{EthereumApi, NativeProvider};
use super::error::ConnectorError;
use super::namespace::Namespace;
use super::sign_doc::SignDoc;
use super::types::{Block, Encoded, Signature, WalletAccount};

pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const PERSONAL_SIGN: &str = "personal_sign";
    pub const SIGN_TRANSACTION: &str = "eth_signTransaction";
    pub const SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
}

/// EIP-1193 provider
#[derive(Debug, Clone)]
pub struct Eip1193 {
    provider: NativeProvider,
}

impl Eip1193 {
    pub fn new(provider: NativeProvider) -> Self {
        Self { provider }
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ConnectorError> {
        let reply = self.provider.call(methods::REQUEST_ACCOUNTS, json!([])).await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Fill `from` with the signer when the caller left it out
    fn with_sender(signer: &str, tx: &TransactionRequest) -> Result<TransactionRequest, ConnectorError> {
        let mut tx = tx.clone();
        if tx.from.is_none() {
            let from: Address = signer
                .parse()
                .map_err(|e| ConnectorError::InvalidDocument(format!("Invalid signer address {}: {}", signer, e)))?;
            tx.from = Some(from);
        }
        Ok(tx)
    }
}

/// Wallets want hex chain ids; accept decimal too
pub fn to_hex_chain_id(chain_id: &str) -> String {
    match chain_id.parse::<u64>() {
        Ok(n) => format!("0x{:x}", n),
        Err(_) => chain_id.to_string(),
    }
}

fn hex_signature(reply: Value) -> Result<Encoded, ConnectorError> {
    match reply {
        Value::String(sig) => Ok(Encoded::hex(sig)),
        other => Err(ConnectorError::InvalidResponse(format!(
            "Expected hex signature, got {}",
            other
        ))),
    }
}

#[async_trait]
impl EthereumApi for Eip1193 {
    async fn connect(&self) -> Result<(), ConnectorError> {
        let accounts = self.request_accounts().await?;
        info!("{} connected with {} ethereum account(s)", self.provider.name(), accounts.len());
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<WalletAccount>, ConnectorError> {
        let (addresses, chain_id) = futures_util::try_join!(
            self.request_accounts(),
            self.provider.call(methods::CHAIN_ID, json!([])),
        )?;
        let chain_id = chain_id.as_str().map(str::to_string);

        Ok(addresses
            .into_iter()
            .map(|address| WalletAccount {
                namespace: Namespace::Ethereum,
                chain_id: chain_id.clone(),
                address: Encoded::new(address, Namespace::Ethereum.address_encoding()),
                public_key: None,
                username: None,
                algo: None,
            })
            .collect())
    }

    async fn sign_message(&self, signer: &str, message: &str) -> Result<Signature, ConnectorError> {
        let data = format!("0x{}", hex::encode(message.as_bytes()));
        let reply = self
            .provider
            .call(methods::PERSONAL_SIGN, json!([data, signer]))
            .await?;

        Ok(Signature {
            public_key: None,
            signature: hex_signature(reply)?,
            signed_doc: SignDoc::Message(message.to_string()),
        })
    }

    async fn sign_transaction(
        &self,
        signer: &str,
        tx: &TransactionRequest,
    ) -> Result<Signature, ConnectorError> {
        let tx = Self::with_sender(signer, tx)?;
        let reply = self
            .provider
            .call(methods::SIGN_TRANSACTION, json!([tx]))
            .await?;

        Ok(Signature {
            public_key: None,
            signature: hex_signature(reply)?,
            signed_doc: SignDoc::EthTransaction(tx),
        })
    }

    async fn sign_typed_data(&self, signer: &str, data: &TypedData) -> Result<Signature, ConnectorError> {
        let encoded = serde_json::to_string(data)
            .map_err(|e| ConnectorError::InvalidDocument(format!("typed data: {}", e)))?;
        let reply = self
            .provider
            .call(methods::SIGN_TYPED_DATA_V4, json!([signer, encoded]))
            .await?;

        Ok(Signature {
            public_key: None,
            signature: hex_signature(reply)?,
            signed_doc: SignDoc::EthTypedData(data.clone()),
        })
    }

    async fn add_chain(&self, chain_info: Value) -> Result<(), ConnectorError> {
        self.provider.call(methods::ADD_CHAIN, json!([chain_info])).await?;
        Ok(())
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), ConnectorError> {
        self.provider
            .call(methods::SWITCH_CHAIN, json!([{ "chainId": to_hex_chain_id(chain_id) }]))
            .await?;
        Ok(())
    }

    async fn send_transaction(
        &self,
        signer: Option<&str>,
        tx: &TransactionRequest,
    ) -> Result<Block, ConnectorError> {
        let tx = match signer {
            Some(signer) => Self::with_sender(signer, tx)?,
            None => tx.clone(),
        };
        let reply = self
            .provider
            .call(methods::SEND_TRANSACTION, json!([tx]))
            .await?;

        Ok(Block {
            hash: hex_signature(reply)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, RecordedCall};
    use std::sync::Arc;

    const SIGNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn binding(transport: &MemoryTransport) -> Eip1193 {
        Eip1193::new(NativeProvider::new(Arc::new(transport.clone()), "ethereum"))
    }

    #[test]
    fn test_to_hex_chain_id() {
        assert_eq!(to_hex_chain_id("1"), "0x1");
        assert_eq!(to_hex_chain_id("42161"), "0xa4b1");
        assert_eq!(to_hex_chain_id("0x89"), "0x89");
    }

    #[tokio::test]
    async fn test_accounts_carry_active_chain() {
        let transport = MemoryTransport::new()
            .respond("ethereum", methods::REQUEST_ACCOUNTS, json!([SIGNER]))
            .respond("ethereum", methods::CHAIN_ID, json!("0x1"));

        let accounts = binding(&transport).accounts().await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, Encoded::hex(SIGNER));
        assert_eq!(accounts[0].chain_id.as_deref(), Some("0x1"));
    }

    #[tokio::test]
    async fn test_personal_sign_hex_encodes_message() {
        let transport = MemoryTransport::new().respond("ethereum", methods::PERSONAL_SIGN, json!("0xdead"));

        let sig = binding(&transport).sign_message(SIGNER, "hi").await.unwrap();

        assert_eq!(sig.signature, Encoded::hex("0xdead"));
        assert_eq!(sig.signed_doc.as_message(), Some("hi"));
        assert_eq!(
            transport.calls()[0],
            RecordedCall::Request {
                provider: "ethereum".into(),
                method: methods::PERSONAL_SIGN.into(),
                params: json!(["0x6869", SIGNER]),
            }
        );
    }

    #[tokio::test]
    async fn test_sign_transaction_fills_sender() {
        let transport = MemoryTransport::new().respond_with("ethereum", methods::SIGN_TRANSACTION, |params| {
            assert_eq!(params[0]["from"], SIGNER);
            Ok(json!("0xf86b"))
        });
        let tx = TransactionRequest::new().to(SIGNER.parse::<Address>().unwrap()).value(1u64);

        let sig = binding(&transport).sign_transaction(SIGNER, &tx).await.unwrap();

        assert_eq!(sig.signature.value, "0xf86b");
        assert_eq!(sig.signed_doc.kind(), "transaction");
    }

    #[tokio::test]
    async fn test_switch_chain_sends_hex() {
        let transport = MemoryTransport::new().respond("ethereum", methods::SWITCH_CHAIN, Value::Null);

        binding(&transport).switch_chain("137").await.unwrap();

        match &transport.calls()[0] {
            RecordedCall::Request { params, .. } => assert_eq!(params, &json!([{"chainId": "0x89"}])),
            other => panic!("unexpected call {:?}", other),
        }
    }
}
