//! Cosmostation aptos binding (`aptos_*` requests)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::connectors::bindings::{AptosApi, NativeProvider};
use crate::connectors::encoding::{hex_from_native, prefixed_hex_from_native, require, require_str};
use crate::connectors::error::ConnectorError;
use crate::connectors::namespace::Namespace;
use crate::connectors::sign_doc::SignDoc;
use crate::connectors::types::{Block, Encoded, Signature, WalletAccount};

pub mod methods {
    pub const CONNECT: &str = "aptos_connect";
    pub const ACCOUNT: &str = "aptos_account";
    pub const SIGN_MESSAGE: &str = "aptos_signMessage";
    pub const SIGN_TRANSACTION: &str = "aptos_signTransaction";
    pub const SIGN_AND_SUBMIT: &str = "aptos_signAndSubmitTransaction";
}

/// Aptos through Cosmostation's `aptos` provider
#[derive(Debug, Clone)]
pub struct CosmostationAptos {
    provider: NativeProvider,
}

impl CosmostationAptos {
    pub fn new(provider: NativeProvider) -> Self {
        Self { provider }
    }
}

/// Fresh nonce for an off-chain message. It ends up inside the signed text,
/// so it must not repeat across clients or restarts.
fn message_nonce() -> String {
    rand::random::<u64>().to_string()
}

fn account_from_reply(reply: &Value) -> Result<WalletAccount, ConnectorError> {
    let address = require_str(reply, "address")?;
    let public_key = match reply.get("publicKey").filter(|v| !v.is_null()) {
        Some(key) => Some(Encoded::new(
            prefixed_hex_from_native(key)?,
            Namespace::Aptos.public_key_encoding(),
        )),
        None => None,
    };

    Ok(WalletAccount {
        namespace: Namespace::Aptos,
        chain_id: None,
        address: Encoded::new(address, Namespace::Aptos.address_encoding()),
        public_key,
        username: None,
        algo: None,
    })
}

fn hex_reply(reply: &Value) -> Result<Encoded, ConnectorError> {
    match reply {
        Value::String(s) => Ok(Encoded::hex(s.as_str())),
        other => Ok(Encoded::hex(hex_from_native(other)?)),
    }
}

#[async_trait]
impl AptosApi for CosmostationAptos {
    async fn connect(&self) -> Result<(), ConnectorError> {
        self.provider.call(methods::CONNECT, Value::Null).await?;
        Ok(())
    }

    async fn account(&self) -> Result<WalletAccount, ConnectorError> {
        let reply = self.provider.call(methods::ACCOUNT, Value::Null).await?;
        account_from_reply(&reply)
    }

    async fn sign_message(&self, message: &str) -> Result<Signature, ConnectorError> {
        let nonce = message_nonce();
        let reply = self
            .provider
            .call(methods::SIGN_MESSAGE, json!({ "message": message, "nonce": nonce }))
            .await?;

        // The wallet signs the prefixed full message, not the bare text
        let signed = reply
            .get("fullMessage")
            .and_then(Value::as_str)
            .unwrap_or(message);

        Ok(Signature {
            public_key: None,
            signature: hex_reply(require(&reply, "signature")?)?,
            signed_doc: SignDoc::Message(signed.to_string()),
        })
    }

    async fn sign_transaction(&self, payload: &Value) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(methods::SIGN_TRANSACTION, json!([payload]))
            .await?;

        Ok(Signature {
            public_key: None,
            signature: hex_reply(&reply)?,
            signed_doc: SignDoc::AptosTransaction(payload.clone()),
        })
    }

    async fn sign_and_submit(&self, payload: &Value) -> Result<Block, ConnectorError> {
        let reply = self
            .provider
            .call(methods::SIGN_AND_SUBMIT, json!([payload]))
            .await?;

        Ok(Block {
            hash: Encoded::hex(require_str(&reply, "hash")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, RecordedCall};
    use std::sync::Arc;

    fn binding(transport: &MemoryTransport) -> CosmostationAptos {
        CosmostationAptos::new(NativeProvider::new(Arc::new(transport.clone()), "aptos"))
    }

    #[tokio::test]
    async fn test_account() {
        let transport = MemoryTransport::new().respond(
            "aptos",
            methods::ACCOUNT,
            json!({"address": "0x1a2b", "publicKey": "0xABCD"}),
        );

        let account = binding(&transport).account().await.unwrap();

        assert_eq!(account.address, Encoded::hex("0x1a2b"));
        assert_eq!(account.public_key, Some(Encoded::hex("0xabcd")));
        assert!(account.chain_id.is_none());
    }

    #[tokio::test]
    async fn test_sign_message_reports_full_message() {
        let transport = MemoryTransport::new().respond_with("aptos", methods::SIGN_MESSAGE, |params| {
            Ok(json!({
                "signature": "0xbeef",
                "fullMessage": format!("APTOS\nmessage: {}\nnonce: {}", params["message"].as_str().unwrap(), params["nonce"].as_str().unwrap()),
            }))
        });

        let signature = binding(&transport).sign_message("hi").await.unwrap();

        let RecordedCall::Request { params, .. } = &transport.calls()[0] else {
            panic!("expected a request");
        };
        let nonce = params["nonce"].as_str().unwrap();
        assert_eq!(signature.signature, Encoded::hex("0xbeef"));
        assert_eq!(
            signature.signed_doc.as_message(),
            Some(format!("APTOS\nmessage: hi\nnonce: {}", nonce).as_str())
        );
    }

    #[tokio::test]
    async fn test_nonce_differs_across_clients() {
        let transport = MemoryTransport::new().respond("aptos", methods::SIGN_MESSAGE, json!({"signature": "0xbeef"}));

        // Two clients built the same way must not reuse a nonce
        binding(&transport).sign_message("hi").await.unwrap();
        binding(&transport).sign_message("hi").await.unwrap();

        let nonces: Vec<Value> = transport
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Request { params, .. } => Some(params["nonce"].clone()),
                _ => None,
            })
            .collect();
        assert_eq!(nonces.len(), 2);
        assert!(nonces[0].as_str().unwrap().parse::<u64>().is_ok());
        assert_ne!(nonces[0], nonces[1]);
    }

    #[tokio::test]
    async fn test_sign_and_submit_returns_hash() {
        let transport = MemoryTransport::new().respond("aptos", methods::SIGN_AND_SUBMIT, json!({"hash": "0x99"}));
        let payload = json!({"function": "0x1::coin::transfer", "arguments": ["0x2", "1"]});

        let block = binding(&transport).sign_and_submit(&payload).await.unwrap();

        assert_eq!(block.hash, Encoded::hex("0x99"));
    }

    #[tokio::test]
    async fn test_disconnect_is_unsupported() {
        let transport = MemoryTransport::new();
        let err = binding(&transport).disconnect().await.unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedOperation { operation: "disconnect", .. }));
        assert!(transport.calls().is_empty());
    }
}
