//! Cosmostation cosmos binding (`cos_*` requests)

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::connectors::bindings::{CosmosApi, NativeProvider};
use crate::connectors::encoding::{bytes_from_native, ensure_bech32, hex_from_native, require, require_str, to_base64};
use crate::connectors::error::ConnectorError;
use crate::connectors::namespace::Namespace;
use crate::connectors::sign_doc::{DirectSignDoc, SignDoc, StdSignDoc};
use crate::connectors::types::{BroadcastMode, Encoded, SignOptions, Signature, WalletAccount};

pub mod methods {
    pub const REQUEST_ACCOUNT: &str = "cos_requestAccount";
    pub const ADD_CHAIN: &str = "cos_addChain";
    pub const SIGN_MESSAGE: &str = "cos_signMessage";
    pub const VERIFY_MESSAGE: &str = "cos_verifyMessage";
    pub const SIGN_AMINO: &str = "cos_signAmino";
    pub const SIGN_DIRECT: &str = "cos_signDirect";
    pub const SEND_TRANSACTION: &str = "cos_sendTransaction";
    pub const DISCONNECT: &str = "cos_disconnect";
}

/// Cosmos chains through Cosmostation's `cosmos` provider
#[derive(Debug, Clone)]
pub struct CosmostationCosmos {
    provider: NativeProvider,
}

impl CosmostationCosmos {
    pub fn new(provider: NativeProvider) -> Self {
        Self { provider }
    }

    async fn request_account(&self, chain_id: &str) -> Result<Value, ConnectorError> {
        self.provider
            .call(methods::REQUEST_ACCOUNT, json!({ "chainName": chain_id }))
            .await
    }

    fn sign_params(chain_id: &str, signer: &str, doc: Value, options: &SignOptions) -> Value {
        json!({
            "chainName": chain_id,
            "signer": signer,
            "doc": doc,
            "isEditMemo": options.memo_editable(),
            "isEditFee": options.fee_editable(),
        })
    }
}

/// `pub_key.value` is base64; normalize to hex
fn reply_public_key(reply: &Value) -> Result<Option<Encoded>, ConnectorError> {
    match reply.get("pub_key").and_then(|k| k.get("value")) {
        Some(value) => Ok(Some(Encoded::new(
            hex::encode(bytes_from_native(value)?),
            Namespace::Cosmos.public_key_encoding(),
        ))),
        None => Ok(None),
    }
}

fn reply_signature(reply: &Value) -> Result<Encoded, ConnectorError> {
    Ok(Encoded::base64(require_str(reply, "signature")?))
}

#[async_trait]
impl CosmosApi for CosmostationCosmos {
    /// Cosmostation grants per chain on the first account request
    async fn enable(&self, chain_ids: &[String]) -> Result<(), ConnectorError> {
        join_all(chain_ids.iter().map(|chain_id| self.request_account(chain_id)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        info!("Cosmostation enabled {} cosmos chain(s)", chain_ids.len());
        Ok(())
    }

    async fn get_account(&self, chain_id: &str) -> Result<WalletAccount, ConnectorError> {
        let reply = self.request_account(chain_id).await?;
        let address = require_str(&reply, "address")?;
        ensure_bech32(address)?;

        let public_key = match reply.get("publicKey").filter(|v| !v.is_null()) {
            Some(key) => Some(Encoded::new(hex_from_native(key)?, Namespace::Cosmos.public_key_encoding())),
            None => None,
        };

        Ok(WalletAccount {
            namespace: Namespace::Cosmos,
            chain_id: Some(chain_id.to_string()),
            address: Encoded::new(address, Namespace::Cosmos.address_encoding()),
            public_key,
            username: reply.get("name").and_then(Value::as_str).map(str::to_string),
            algo: None,
        })
    }

    async fn sign_message(&self, chain_id: &str, signer: &str, message: &str) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SIGN_MESSAGE,
                json!({ "chainName": chain_id, "signer": signer, "message": message }),
            )
            .await?;

        Ok(Signature {
            public_key: reply_public_key(&reply)?,
            signature: reply_signature(&reply)?,
            signed_doc: SignDoc::Message(message.to_string()),
        })
    }

    async fn sign_amino(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &StdSignDoc,
        options: &SignOptions,
    ) -> Result<Signature, ConnectorError> {
        let params = Self::sign_params(chain_id, signer, serde_json::to_value(doc)?, options);
        let reply = self.provider.call(methods::SIGN_AMINO, params).await?;

        // The user may have edited memo or fee
        let signed: StdSignDoc = match reply.get("signed_doc").filter(|v| !v.is_null()) {
            Some(signed) => serde_json::from_value(signed.clone())?,
            None => doc.clone(),
        };
        if signed != *doc {
            debug!("Cosmostation returned an edited amino document");
        }

        Ok(Signature {
            public_key: reply_public_key(&reply)?,
            signature: reply_signature(&reply)?,
            signed_doc: SignDoc::Amino(signed),
        })
    }

    async fn sign_direct(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &DirectSignDoc,
        options: &SignOptions,
    ) -> Result<Signature, ConnectorError> {
        let params = Self::sign_params(chain_id, signer, serde_json::to_value(doc)?, options);
        let reply = self.provider.call(methods::SIGN_DIRECT, params).await?;

        let signed: DirectSignDoc = match reply.get("signed_doc").filter(|v| !v.is_null()) {
            Some(signed) => serde_json::from_value(signed.clone())?,
            None => doc.clone(),
        };

        Ok(Signature {
            public_key: reply_public_key(&reply)?,
            signature: reply_signature(&reply)?,
            signed_doc: SignDoc::Direct(signed),
        })
    }

    async fn add_chain(&self, chain_info: Value) -> Result<(), ConnectorError> {
        self.provider.call(methods::ADD_CHAIN, chain_info).await?;
        Ok(())
    }

    async fn verify_message(
        &self,
        chain_id: &str,
        signer: &str,
        message: &str,
        signature: &Signature,
    ) -> Result<bool, ConnectorError> {
        // Cosmostation wants the base64 key back
        let public_key = match &signature.public_key {
            Some(key) => to_base64(&hex::decode(&key.value).map_err(|e| {
                ConnectorError::InvalidDocument(format!("Public key is not hex: {}", e))
            })?),
            None => {
                return Err(ConnectorError::InvalidDocument(
                    "Signature carries no public key".to_string(),
                ))
            }
        };

        let reply = self
            .provider
            .call(
                methods::VERIFY_MESSAGE,
                json!({
                    "chainName": chain_id,
                    "signer": signer,
                    "message": message,
                    "publicKey": public_key,
                    "signature": signature.signature.value,
                }),
            )
            .await?;

        reply
            .as_bool()
            .ok_or_else(|| ConnectorError::InvalidResponse(format!("Expected bool, got {}", reply)))
    }

    async fn send_tx(&self, chain_id: &str, tx: &[u8], mode: BroadcastMode) -> Result<Vec<u8>, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SEND_TRANSACTION,
                json!({ "chainName": chain_id, "txBytes": to_base64(tx), "mode": mode.proto_code() }),
            )
            .await?;

        let txhash = require_str(require(&reply, "tx_response")?, "txhash")?;
        hex::decode(txhash).map_err(|e| ConnectorError::InvalidResponse(format!("Invalid txhash {}: {}", txhash, e)))
    }

    async fn disconnect(&self, _chain_ids: Option<&[String]>) -> Result<(), ConnectorError> {
        self.provider.call(methods::DISCONNECT, json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::encoding::bech32_address;
    use crate::connectors::sign_doc::{sample_amino_doc, sample_direct_doc};
    use crate::transport::{MemoryTransport, RecordedCall, WalletError};
    use std::sync::Arc;

    fn binding(transport: &MemoryTransport) -> CosmostationCosmos {
        CosmostationCosmos::new(NativeProvider::new(Arc::new(transport.clone()), "cosmos"))
    }

    fn params_of(transport: &MemoryTransport, index: usize) -> Value {
        match &transport.calls()[index] {
            RecordedCall::Request { params, .. } => params.clone(),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_account_normalizes_public_key() {
        let address = bech32_address("cosmos", 7);
        let transport = MemoryTransport::new().respond(
            "cosmos",
            methods::REQUEST_ACCOUNT,
            json!({"name": "main", "address": address, "publicKey": {"0": 2, "1": 171}, "isLedger": false}),
        );

        let account = binding(&transport).get_account("cosmoshub-4").await.unwrap();

        assert_eq!(account.address, Encoded::new(address, crate::connectors::Encoding::Bech32));
        assert_eq!(account.public_key, Some(Encoded::hex("02ab")));
        assert_eq!(account.username.as_deref(), Some("main"));
        assert_eq!(params_of(&transport, 0), json!({"chainName": "cosmoshub-4"}));
    }

    #[tokio::test]
    async fn test_enable_requests_every_chain_and_fails_as_a_whole() {
        let transport = MemoryTransport::new().respond_with("cosmos", methods::REQUEST_ACCOUNT, |params| {
            if params["chainName"] == "broken-1" {
                let error = json!({"code": -32602, "message": "Unknown chain"});
                return Err(WalletError::from_error_object(&error));
            }
            Ok(json!({"address": bech32_address("cosmos", 1)}))
        });
        let chains = ["cosmoshub-4", "broken-1", "osmosis-1"].map(String::from);

        let err = binding(&transport).enable(&chains).await.unwrap_err();

        assert!(matches!(err, ConnectorError::Wallet(_)));
        let requested: Vec<Value> = (0..3).map(|i| params_of(&transport, i)["chainName"].clone()).collect();
        assert_eq!(requested, vec![json!("cosmoshub-4"), json!("broken-1"), json!("osmosis-1")]);

        let transport = MemoryTransport::new().respond(
            "cosmos",
            methods::REQUEST_ACCOUNT,
            json!({"address": bech32_address("cosmos", 1)}),
        );
        binding(&transport).enable(&chains[..1]).await.unwrap();
        assert_eq!(transport.requested_methods(), vec![methods::REQUEST_ACCOUNT]);
    }

    #[tokio::test]
    async fn test_get_account_rejects_non_bech32() {
        let transport = MemoryTransport::new().respond(
            "cosmos",
            methods::REQUEST_ACCOUNT,
            json!({"address": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"}),
        );

        let err = binding(&transport).get_account("cosmoshub-4").await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_sign_amino_passes_edit_flags_and_keeps_edited_doc() {
        let edited = sample_amino_doc("edited by user");
        let edited_json = serde_json::to_value(&edited).unwrap();
        let transport = MemoryTransport::new().respond_with("cosmos", methods::SIGN_AMINO, move |params| {
            assert_eq!(params["isEditMemo"], true);
            assert_eq!(params["isEditFee"], false);
            Ok(json!({
                "signature": "c2ln",
                "pub_key": {"type": "tendermint/PubKeySecp256k1", "value": "Av8="},
                "signed_doc": edited_json,
            }))
        });
        let options = SignOptions {
            prefer_no_set_fee: true,
            prefer_no_set_memo: false,
            ..SignOptions::default()
        };

        let sig = binding(&transport)
            .sign_amino("cosmoshub-4", "addr", &sample_amino_doc(""), &options)
            .await
            .unwrap();

        assert_eq!(sig.signature, Encoded::base64("c2ln"));
        assert_eq!(sig.public_key, Some(Encoded::hex("02ff")));
        assert_eq!(sig.signed_doc.as_amino().unwrap().memo, "edited by user");
    }

    #[tokio::test]
    async fn test_sign_direct_reads_byte_arrays() {
        let transport = MemoryTransport::new().respond(
            "cosmos",
            methods::SIGN_DIRECT,
            json!({
                "signature": "c2ln",
                "pub_key": {"type": "tendermint/PubKeySecp256k1", "value": "Av8="},
                "signed_doc": {
                    "chain_id": "cosmoshub-4",
                    "account_number": 42,
                    "body_bytes": [10, 1, 2],
                    "auth_info_bytes": {"0": 18, "1": 4},
                },
            }),
        );

        let sig = binding(&transport)
            .sign_direct("cosmoshub-4", "addr", &sample_direct_doc(), &SignOptions::default())
            .await
            .unwrap();

        let signed = sig.signed_doc.as_direct().unwrap();
        assert_eq!(signed.auth_info_bytes, vec![18, 4]);
        assert_eq!(signed.account_number, "42");
        assert_eq!(params_of(&transport, 0)["doc"]["body_bytes"], "CgEC");
    }

    #[tokio::test]
    async fn test_send_tx_decodes_hash() {
        let transport = MemoryTransport::new().respond(
            "cosmos",
            methods::SEND_TRANSACTION,
            json!({"tx_response": {"txhash": "ABCD", "code": 0}}),
        );

        let hash = binding(&transport)
            .send_tx("cosmoshub-4", &[1, 2, 3], BroadcastMode::Sync)
            .await
            .unwrap();

        assert_eq!(hash, vec![0xab, 0xcd]);
        assert_eq!(
            params_of(&transport, 0),
            json!({"chainName": "cosmoshub-4", "txBytes": "AQID", "mode": 2})
        );
    }

    #[tokio::test]
    async fn test_verify_message_sends_base64_key() {
        let transport = MemoryTransport::new().respond("cosmos", methods::VERIFY_MESSAGE, json!(true));
        let signature = Signature {
            public_key: Some(Encoded::hex("02ff")),
            signature: Encoded::base64("c2ln"),
            signed_doc: SignDoc::Message("hi".into()),
        };

        let ok = binding(&transport)
            .verify_message("cosmoshub-4", "addr", "hi", &signature)
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(params_of(&transport, 0)["publicKey"], "Av8=");
    }

    #[tokio::test]
    async fn test_user_rejection_passes_through() {
        let transport = MemoryTransport::new().reject("cosmos", methods::SIGN_MESSAGE, WalletError::user_rejected());

        let err = binding(&transport)
            .sign_message("cosmoshub-4", "addr", "hi")
            .await
            .unwrap_err();

        assert!(err.is_user_rejection());
    }
}
