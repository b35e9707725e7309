//! Cosmostation sui binding (`sui_*` requests)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::connectors::bindings::{NativeProvider, SuiApi};
use crate::connectors::encoding::{prefixed_hex_from_native, require_str};
use crate::connectors::error::ConnectorError;
use crate::connectors::namespace::Namespace;
use crate::connectors::sign_doc::SignDoc;
use crate::connectors::types::{Block, Encoded, Encoding, Signature, WalletAccount};

pub mod methods {
    pub const CONNECT: &str = "sui_connect";
    pub const GET_ACCOUNT: &str = "sui_getAccount";
    pub const GET_PUBLIC_KEY: &str = "sui_getPublicKey";
    pub const SIGN_MESSAGE: &str = "sui_signMessage";
    pub const SIGN_TRANSACTION_BLOCK: &str = "sui_signTransactionBlock";
    pub const SIGN_AND_EXECUTE: &str = "sui_signAndExecuteTransactionBlock";
    pub const DISCONNECT: &str = "sui_disconnect";
}

/// Permissions requested on connect
pub const PERMISSIONS: [&str; 2] = ["viewAccount", "suggestTransactions"];

/// Sui through Cosmostation's `sui` provider
#[derive(Debug, Clone)]
pub struct CosmostationSui {
    provider: NativeProvider,
}

impl CosmostationSui {
    pub fn new(provider: NativeProvider) -> Self {
        Self { provider }
    }
}

/// Sui signatures come back as serialized base64 (flag || sig || pubkey)
fn sui_signature(reply: &Value) -> Result<Encoded, ConnectorError> {
    Ok(Encoded::base64(require_str(reply, "signature")?))
}

#[async_trait]
impl SuiApi for CosmostationSui {
    async fn connect(&self) -> Result<(), ConnectorError> {
        self.provider.call(methods::CONNECT, json!(PERMISSIONS)).await?;
        Ok(())
    }

    async fn account(&self) -> Result<WalletAccount, ConnectorError> {
        let (account, public_key) = futures_util::try_join!(
            self.provider.call(methods::GET_ACCOUNT, Value::Null),
            self.provider.call(methods::GET_PUBLIC_KEY, Value::Null),
        )?;

        Ok(WalletAccount {
            namespace: Namespace::Sui,
            chain_id: None,
            address: Encoded::new(require_str(&account, "address")?, Namespace::Sui.address_encoding()),
            public_key: Some(Encoded::new(
                prefixed_hex_from_native(&public_key)?,
                Namespace::Sui.public_key_encoding(),
            )),
            username: None,
            algo: None,
        })
    }

    async fn sign_message(&self, signer: &str, message: &str) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SIGN_MESSAGE,
                json!({ "message": hex::encode(message.as_bytes()), "account": signer }),
            )
            .await?;

        Ok(Signature {
            public_key: None,
            signature: sui_signature(&reply)?,
            signed_doc: SignDoc::Message(message.to_string()),
        })
    }

    async fn sign_transaction(&self, signer: &str, tx: &Value) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SIGN_TRANSACTION_BLOCK,
                json!({ "transactionBlock": tx, "account": signer }),
            )
            .await?;
        // The wallet may rebuild the block (gas, budget), so report its bytes
        let bytes = require_str(&reply, "transactionBlockBytes")?;

        Ok(Signature {
            public_key: None,
            signature: sui_signature(&reply)?,
            signed_doc: SignDoc::SuiTransaction(json!({ "transactionBlockBytes": bytes })),
        })
    }

    async fn sign_and_execute(&self, signer: Option<&str>, tx: &Value) -> Result<Block, ConnectorError> {
        let mut params = json!({ "transactionBlock": tx });
        if let Some(signer) = signer {
            params["account"] = json!(signer);
        }
        let reply = self.provider.call(methods::SIGN_AND_EXECUTE, params).await?;

        Ok(Block {
            hash: Encoded::new(require_str(&reply, "digest")?, Encoding::Base58),
        })
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.provider.call(methods::DISCONNECT, Value::Null).await?;
        Ok(())
    }
}
