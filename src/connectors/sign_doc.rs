//! Signing documents
//!
//! Every document shape a connector can sign, as one tagged union. Raw JSON
//! from callers is classified once by [`SignDoc::from_json`]; malformed
//! documents are rejected there, before any wallet is contacted.

use ethers_core::types::transaction::eip712::TypedData;
use ethers_core::types::TransactionRequest;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::encoding::base64_bytes;
use super::error::ConnectorError;
use super::namespace::Namespace;

/// Amount of one denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Fee section of an amino document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
}

/// Amino JSON message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub value: Value,
}

/// Legacy amino JSON sign document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub chain_id: String,
    pub account_number: String,
    pub sequence: String,
    pub fee: StdFee,
    pub msgs: Vec<AminoMsg>,
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_height: Option<String>,
}

/// Protobuf (SIGN_MODE_DIRECT) sign document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectSignDoc {
    #[serde(alias = "bodyBytes", with = "base64_bytes")]
    pub body_bytes: Vec<u8>,
    #[serde(alias = "authInfoBytes", with = "base64_bytes")]
    pub auth_info_bytes: Vec<u8>,
    #[serde(alias = "chainId")]
    pub chain_id: String,
    #[serde(alias = "accountNumber", deserialize_with = "string_or_number")]
    pub account_number: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Document handed to a wallet for signing
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SignDoc {
    /// Arbitrary text (cosmos ADR-36, personal_sign, aptos/sui message)
    Message(String),
    Amino(StdSignDoc),
    Direct(DirectSignDoc),
    EthTransaction(TransactionRequest),
    EthTypedData(TypedData),
    /// Aptos entry function payload
    AptosTransaction(Value),
    /// Sui transaction block
    SuiTransaction(Value),
}

const ETH_TX_FIELDS: [&str; 8] = [
    "to",
    "from",
    "data",
    "value",
    "gas",
    "gasPrice",
    "nonce",
    "maxFeePerGas",
];

impl SignDoc {
    /// Classify and validate a raw document for `namespace`
    pub fn from_json(namespace: Namespace, value: Value) -> Result<Self, ConnectorError> {
        if let Value::String(message) = value {
            return Ok(SignDoc::Message(message));
        }

        let Value::Object(ref obj) = value else {
            return Err(ConnectorError::InvalidDocument(format!(
                "{} document must be a string or an object",
                namespace
            )));
        };

        let has = |key: &str| obj.contains_key(key);

        match namespace {
            Namespace::Cosmos => {
                if (has("body_bytes") || has("bodyBytes")) && (has("auth_info_bytes") || has("authInfoBytes")) {
                    let doc = serde_json::from_value(value)
                        .map_err(|e| ConnectorError::InvalidDocument(format!("direct sign doc: {}", e)))?;
                    Ok(SignDoc::Direct(doc))
                } else if has("msgs") && has("fee") {
                    let doc = serde_json::from_value(value)
                        .map_err(|e| ConnectorError::InvalidDocument(format!("amino sign doc: {}", e)))?;
                    Ok(SignDoc::Amino(doc))
                } else {
                    Err(ConnectorError::InvalidDocument(
                        "cosmos document is neither amino nor direct".to_string(),
                    ))
                }
            }
            Namespace::Ethereum => {
                if has("types") && has("primaryType") {
                    let doc = serde_json::from_value(value)
                        .map_err(|e| ConnectorError::InvalidDocument(format!("typed data: {}", e)))?;
                    Ok(SignDoc::EthTypedData(doc))
                } else if ETH_TX_FIELDS.iter().any(|k| has(k)) {
                    let doc = serde_json::from_value(value)
                        .map_err(|e| ConnectorError::InvalidDocument(format!("transaction: {}", e)))?;
                    Ok(SignDoc::EthTransaction(doc))
                } else {
                    Err(ConnectorError::InvalidDocument(
                        "ethereum document is neither a transaction nor typed data".to_string(),
                    ))
                }
            }
            Namespace::Aptos => {
                if has("function") {
                    Ok(SignDoc::AptosTransaction(value))
                } else {
                    Err(ConnectorError::InvalidDocument(
                        "aptos payload must name an entry function".to_string(),
                    ))
                }
            }
            Namespace::Sui => Ok(SignDoc::SuiTransaction(value)),
        }
    }

    /// Short name of the document shape
    pub fn kind(&self) -> &'static str {
        match self {
            SignDoc::Message(_) => "message",
            SignDoc::Amino(_) => "amino",
            SignDoc::Direct(_) => "direct",
            SignDoc::EthTransaction(_) => "transaction",
            SignDoc::EthTypedData(_) => "typed-data",
            SignDoc::AptosTransaction(_) => "aptos-transaction",
            SignDoc::SuiTransaction(_) => "sui-transaction",
        }
    }

    /// Whether this shape can be signed under `namespace`
    pub fn belongs_to(&self, namespace: Namespace) -> bool {
        match self {
            SignDoc::Message(_) => true,
            SignDoc::Amino(_) | SignDoc::Direct(_) => namespace == Namespace::Cosmos,
            SignDoc::EthTransaction(_) | SignDoc::EthTypedData(_) => namespace == Namespace::Ethereum,
            SignDoc::AptosTransaction(_) => namespace == Namespace::Aptos,
            SignDoc::SuiTransaction(_) => namespace == Namespace::Sui,
        }
    }

    pub fn as_message(&self) -> Option<&str> {
        match self {
            SignDoc::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_amino(&self) -> Option<&StdSignDoc> {
        match self {
            SignDoc::Amino(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_direct(&self) -> Option<&DirectSignDoc> {
        match self {
            SignDoc::Direct(doc) => Some(doc),
            _ => None,
        }
    }

    pub(crate) fn mismatch(&self, namespace: Namespace) -> ConnectorError {
        ConnectorError::InvalidDocument(format!(
            "{} document cannot be signed under {}",
            self.kind(),
            namespace
        ))
    }
}

impl From<&str> for SignDoc {
    fn from(message: &str) -> Self {
        SignDoc::Message(message.to_string())
    }
}

impl From<StdSignDoc> for SignDoc {
    fn from(doc: StdSignDoc) -> Self {
        SignDoc::Amino(doc)
    }
}

impl From<DirectSignDoc> for SignDoc {
    fn from(doc: DirectSignDoc) -> Self {
        SignDoc::Direct(doc)
    }
}

#[cfg(test)]
pub(crate) fn sample_amino_doc(memo: &str) -> StdSignDoc {
    StdSignDoc {
        chain_id: "cosmoshub-4".to_string(),
        account_number: "42".to_string(),
        sequence: "7".to_string(),
        fee: StdFee {
            amount: vec![Coin {
                denom: "uatom".to_string(),
                amount: "5000".to_string(),
            }],
            gas: "200000".to_string(),
            payer: None,
            granter: None,
        },
        msgs: vec![AminoMsg {
            msg_type: "cosmos-sdk/MsgSend".to_string(),
            value: serde_json::json!({"amount": [{"denom": "uatom", "amount": "1"}]}),
        }],
        memo: memo.to_string(),
        timeout_height: None,
    }
}

#[cfg(test)]
pub(crate) fn sample_direct_doc() -> DirectSignDoc {
    DirectSignDoc {
        body_bytes: vec![10, 1, 2],
        auth_info_bytes: vec![18, 3],
        chain_id: "cosmoshub-4".to_string(),
        account_number: "42".to_string(),
    }
}
