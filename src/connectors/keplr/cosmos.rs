//! Keplr-style cosmos binding
//!
//! Keplr and Leap expose the same injected object (`enable`, `getKey`,
//! `signAmino`, ...). Requests carry the method name of that object and its
//! arguments as named fields.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::connectors::bindings::{CosmosApi, NativeProvider};
use crate::connectors::encoding::{bytes_from_native, ensure_bech32, hex_from_native, require, require_str, to_base64};
use crate::connectors::error::ConnectorError;
use crate::connectors::namespace::Namespace;
use crate::connectors::sign_doc::{DirectSignDoc, SignDoc, StdSignDoc};
use crate::connectors::types::{BroadcastMode, Encoded, SignOptions, Signature, WalletAccount};

pub mod methods {
    pub const ENABLE: &str = "enable";
    pub const SUGGEST_CHAIN: &str = "experimentalSuggestChain";
    pub const GET_KEY: &str = "getKey";
    pub const SIGN_ARBITRARY: &str = "signArbitrary";
    pub const VERIFY_ARBITRARY: &str = "verifyArbitrary";
    pub const SIGN_AMINO: &str = "signAmino";
    pub const SIGN_DIRECT: &str = "signDirect";
    pub const SEND_TX: &str = "sendTx";
    pub const DISCONNECT: &str = "disconnect";
}

/// Cosmos binding for Keplr-compatible wallets
#[derive(Debug, Clone)]
pub struct KeplrCosmos {
    provider: NativeProvider,
}

impl KeplrCosmos {
    pub fn new(provider: NativeProvider) -> Self {
        Self { provider }
    }

    fn sign_options(options: &SignOptions) -> Value {
        json!({
            "preferNoSetFee": options.prefer_no_set_fee,
            "preferNoSetMemo": options.prefer_no_set_memo,
            "disableBalanceCheck": options.disable_balance_check,
        })
    }

    /// `{signed, signature: {pub_key, signature}}` from signAmino/signDirect
    fn split_sign_response(reply: &Value) -> Result<(&Value, Option<Encoded>, Encoded), ConnectorError> {
        let signed = require(reply, "signed")?;
        let std_signature = require(reply, "signature")?;
        Ok((signed, std_public_key(std_signature)?, std_signature_value(std_signature)?))
    }
}

/// Public key of a `StdSignature`, normalized from base64 to hex
fn std_public_key(std_signature: &Value) -> Result<Option<Encoded>, ConnectorError> {
    match std_signature.get("pub_key").and_then(|k| k.get("value")) {
        Some(value) => Ok(Some(Encoded::new(
            hex::encode(bytes_from_native(value)?),
            Namespace::Cosmos.public_key_encoding(),
        ))),
        None => Ok(None),
    }
}

fn std_signature_value(std_signature: &Value) -> Result<Encoded, ConnectorError> {
    Ok(Encoded::base64(require_str(std_signature, "signature")?))
}

/// Direct documents go over the bridge with the injected object's field names
fn direct_doc_json(doc: &DirectSignDoc) -> Value {
    json!({
        "bodyBytes": to_base64(&doc.body_bytes),
        "authInfoBytes": to_base64(&doc.auth_info_bytes),
        "chainId": doc.chain_id,
        "accountNumber": doc.account_number,
    })
}

#[async_trait]
impl CosmosApi for KeplrCosmos {
    async fn enable(&self, chain_ids: &[String]) -> Result<(), ConnectorError> {
        self.provider
            .call(methods::ENABLE, json!({ "chainIds": chain_ids }))
            .await?;
        info!("{} enabled {} cosmos chain(s)", self.provider.name(), chain_ids.len());
        Ok(())
    }

    async fn get_account(&self, chain_id: &str) -> Result<WalletAccount, ConnectorError> {
        let key = self
            .provider
            .call(methods::GET_KEY, json!({ "chainId": chain_id }))
            .await?;

        let address = require_str(&key, "bech32Address")?;
        ensure_bech32(address)?;

        Ok(WalletAccount {
            namespace: Namespace::Cosmos,
            chain_id: Some(chain_id.to_string()),
            address: Encoded::new(address, Namespace::Cosmos.address_encoding()),
            public_key: Some(Encoded::new(
                hex_from_native(require(&key, "pubKey")?)?,
                Namespace::Cosmos.public_key_encoding(),
            )),
            username: key.get("name").and_then(Value::as_str).map(str::to_string),
            algo: key.get("algo").and_then(Value::as_str).map(str::to_string),
        })
    }

    async fn sign_message(&self, chain_id: &str, signer: &str, message: &str) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SIGN_ARBITRARY,
                json!({ "chainId": chain_id, "signer": signer, "data": message }),
            )
            .await?;

        Ok(Signature {
            public_key: std_public_key(&reply)?,
            signature: std_signature_value(&reply)?,
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
        let reply = self
            .provider
            .call(
                methods::SIGN_AMINO,
                json!({
                    "chainId": chain_id,
                    "signer": signer,
                    "signDoc": doc,
                    "signOptions": Self::sign_options(options),
                }),
            )
            .await?;

        let (signed, public_key, signature) = Self::split_sign_response(&reply)?;
        Ok(Signature {
            public_key,
            signature,
            signed_doc: SignDoc::Amino(serde_json::from_value(signed.clone())?),
        })
    }

    async fn sign_direct(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &DirectSignDoc,
        options: &SignOptions,
    ) -> Result<Signature, ConnectorError> {
        let reply = self
            .provider
            .call(
                methods::SIGN_DIRECT,
                json!({
                    "chainId": chain_id,
                    "signer": signer,
                    "signDoc": direct_doc_json(doc),
                    "signOptions": Self::sign_options(options),
                }),
            )
            .await?;

        let (signed, public_key, signature) = Self::split_sign_response(&reply)?;
        Ok(Signature {
            public_key,
            signature,
            signed_doc: SignDoc::Direct(serde_json::from_value(signed.clone())?),
        })
    }

    async fn add_chain(&self, chain_info: Value) -> Result<(), ConnectorError> {
        self.provider
            .call(methods::SUGGEST_CHAIN, json!({ "chainInfo": chain_info }))
            .await?;
        Ok(())
    }

    async fn verify_message(
        &self,
        chain_id: &str,
        signer: &str,
        message: &str,
        signature: &Signature,
    ) -> Result<bool, ConnectorError> {
        let public_key = signature
            .public_key
            .as_ref()
            .ok_or_else(|| ConnectorError::InvalidDocument("Signature carries no public key".to_string()))?;
        let public_key = hex::decode(&public_key.value)
            .map_err(|e| ConnectorError::InvalidDocument(format!("Public key is not hex: {}", e)))?;

        let reply = self
            .provider
            .call(
                methods::VERIFY_ARBITRARY,
                json!({
                    "chainId": chain_id,
                    "signer": signer,
                    "data": message,
                    "signature": {
                        "pub_key": { "type": "tendermint/PubKeySecp256k1", "value": to_base64(&public_key) },
                        "signature": signature.signature.value,
                    },
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
                methods::SEND_TX,
                json!({ "chainId": chain_id, "tx": to_base64(tx), "mode": mode.as_str() }),
            )
            .await?;
        bytes_from_native(&reply)
    }

    async fn disconnect(&self, chain_ids: Option<&[String]>) -> Result<(), ConnectorError> {
        let params = match chain_ids {
            Some(ids) => json!({ "chainIds": ids }),
            None => json!({}),
        };
        self.provider.call(methods::DISCONNECT, params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::encoding::bech32_address;
    use crate::connectors::sign_doc::{sample_amino_doc, sample_direct_doc};
    use crate::connectors::types::Encoding;
    use crate::transport::{MemoryTransport, RecordedCall};
    use std::sync::Arc;

    fn binding(transport: &MemoryTransport) -> KeplrCosmos {
        KeplrCosmos::new(NativeProvider::new(Arc::new(transport.clone()), "keplr"))
    }

    fn params_of(transport: &MemoryTransport, index: usize) -> Value {
        match &transport.calls()[index] {
            RecordedCall::Request { params, .. } => params.clone(),
            other => panic!("unexpected call {:?}", other),
        }
    }

    fn std_signature() -> Value {
        json!({"pub_key": {"type": "tendermint/PubKeySecp256k1", "value": "Av8="}, "signature": "c2ln"})
    }

    #[tokio::test]
    async fn test_enable_sends_all_chain_ids_at_once() {
        let transport = MemoryTransport::new().respond("keplr", methods::ENABLE, Value::Null);

        binding(&transport)
            .enable(&["cosmoshub-4".to_string(), "osmosis-1".to_string()])
            .await
            .unwrap();

        assert_eq!(params_of(&transport, 0), json!({"chainIds": ["cosmoshub-4", "osmosis-1"]}));
    }

    #[tokio::test]
    async fn test_get_key_normalizes_byte_public_key() {
        let address = bech32_address("cosmos", 3);
        let transport = MemoryTransport::new().respond(
            "keplr",
            methods::GET_KEY,
            json!({
                "name": "ledger",
                "algo": "secp256k1",
                "pubKey": {"0": 3, "1": 16},
                "address": {"0": 1},
                "bech32Address": address,
                "isNanoLedger": true,
            }),
        );

        let account = binding(&transport).get_account("cosmoshub-4").await.unwrap();

        assert_eq!(account.address.encoding, Encoding::Bech32);
        assert_eq!(account.public_key, Some(Encoded::hex("0310")));
        assert_eq!(account.algo.as_deref(), Some("secp256k1"));
    }

    #[tokio::test]
    async fn test_sign_amino_reports_signed_doc() {
        let edited = serde_json::to_value(sample_amino_doc("wallet memo")).unwrap();
        let transport = MemoryTransport::new().respond_with("keplr", methods::SIGN_AMINO, move |params| {
            assert_eq!(params["signOptions"]["preferNoSetMemo"], true);
            Ok(json!({"signed": edited, "signature": std_signature()}))
        });

        let sig = binding(&transport)
            .sign_amino("cosmoshub-4", "addr", &sample_amino_doc(""), &SignOptions::default())
            .await
            .unwrap();

        assert_eq!(sig.signed_doc.as_amino().unwrap().memo, "wallet memo");
        assert_eq!(sig.public_key, Some(Encoded::hex("02ff")));
        assert_eq!(sig.signature.value, "c2ln");
    }

    #[tokio::test]
    async fn test_sign_direct_sends_camel_case_doc() {
        let transport = MemoryTransport::new().respond_with("keplr", methods::SIGN_DIRECT, |params| {
            Ok(json!({"signed": params["signDoc"].clone(), "signature": std_signature()}))
        });

        let sig = binding(&transport)
            .sign_direct("cosmoshub-4", "addr", &sample_direct_doc(), &SignOptions::default())
            .await
            .unwrap();

        let sent = &params_of(&transport, 0)["signDoc"];
        assert_eq!(sent["bodyBytes"], "CgEC");
        assert_eq!(sent["accountNumber"], "42");
        assert_eq!(sig.signed_doc.as_direct(), Some(&sample_direct_doc()));
    }

    #[tokio::test]
    async fn test_send_tx_returns_hash_bytes() {
        let transport = MemoryTransport::new().respond("keplr", methods::SEND_TX, json!({"0": 171, "1": 205}));

        let hash = binding(&transport)
            .send_tx("cosmoshub-4", &[1, 2, 3], BroadcastMode::Block)
            .await
            .unwrap();

        assert_eq!(hash, vec![171, 205]);
        assert_eq!(params_of(&transport, 0)["mode"], "block");
    }

    #[tokio::test]
    async fn test_verify_arbitrary_round_trips_public_key() {
        let transport = MemoryTransport::new().respond_with("keplr", methods::VERIFY_ARBITRARY, |params| {
            Ok(json!(params["signature"]["pub_key"]["value"] == "Av8="))
        });
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
    }
}
