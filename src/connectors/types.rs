//! Common types for wallet connectors
//!
//! These types provide a unified representation for accounts, signatures and
//! receipts across different wallets and namespaces.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::namespace::Namespace;
use super::sign_doc::SignDoc;

/// Text encoding of a value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Bech32,
    Hex,
    Base64,
    Base58,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Bech32 => write!(f, "bech32"),
            Encoding::Hex => write!(f, "hex"),
            Encoding::Base64 => write!(f, "base64"),
            Encoding::Base58 => write!(f, "base58"),
        }
    }
}

/// A value together with the encoding it is written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoded {
    pub value: String,
    pub encoding: Encoding,
}

impl Encoded {
    pub fn new(value: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            value: value.into(),
            encoding,
        }
    }

    pub fn hex(value: impl Into<String>) -> Self {
        Self::new(value, Encoding::Hex)
    }

    pub fn base64(value: impl Into<String>) -> Self {
        Self::new(value, Encoding::Base64)
    }
}

/// One key-pair derived identity the wallet exposes for one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub namespace: Namespace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    pub address: Encoded,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Encoded>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
}

/// Result of a `sign` call.
///
/// `signed_doc` is what the wallet actually signed, which may differ from the
/// request when the user edited memo or fee.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Encoded>,
    pub signature: Encoded,
    pub signed_doc: SignDoc,
}

/// Minimal confirmation receipt from sign-and-broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Encoded,
}

/// Chain scoping for one namespace inside an [`AuthRange`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceData {
    #[serde(rename = "chainIds", default, skip_serializing_if = "Option::is_none")]
    pub chain_ids: Option<Vec<String>>,
}

impl NamespaceData {
    /// Scope to the given chains
    pub fn chains<I, S>(chain_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chain_ids: Some(chain_ids.into_iter().map(Into::into).collect()),
        }
    }

    /// No chain scoping (whatever the wallet has active)
    pub fn any() -> Self {
        Self::default()
    }
}

/// Namespace name to chain scoping. Drives the fan-out of connect,
/// getAccounts and disconnect, in the order namespaces were given. Keys are
/// raw names so unknown namespaces reach dispatch and fail there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRange(Vec<(String, NamespaceData)>);

impl AuthRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `namespace`. A repeated name replaces the earlier entry in place.
    pub fn with(mut self, namespace: impl Into<String>, data: NamespaceData) -> Self {
        self.insert(namespace.into(), data);
        self
    }

    fn insert(&mut self, namespace: String, data: NamespaceData) {
        match self.0.iter_mut().find(|(name, _)| *name == namespace) {
            Some(entry) => entry.1 = data,
            None => self.0.push((namespace, data)),
        }
    }

    /// Range covering one namespace on the given chains
    pub fn single<I, S>(namespace: impl Into<String>, chain_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with(namespace, NamespaceData::chains(chain_ids))
    }

    pub fn get(&self, namespace: &str) -> Option<&NamespaceData> {
        self.0.iter().find(|(name, _)| name == namespace).map(|(_, data)| data)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamespaceData)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for AuthRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (namespace, data) in &self.0 {
            map.serialize_entry(namespace, data)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AuthRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RangeVisitor;

        impl<'de> Visitor<'de> for RangeVisitor {
            type Value = AuthRange;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of namespace to chain scoping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AuthRange, A::Error> {
                let mut range = AuthRange::new();
                while let Some((namespace, data)) = access.next_entry::<String, NamespaceData>()? {
                    range.insert(namespace, data);
                }
                Ok(range)
            }
        }

        deserializer.deserialize_map(RangeVisitor)
    }
}

/// Wallet UI preferences for cosmos signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    /// Keep the fee from the document instead of letting the user edit it
    pub prefer_no_set_fee: bool,
    /// Keep the memo from the document instead of letting the user edit it
    pub prefer_no_set_memo: bool,
    pub disable_balance_check: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            prefer_no_set_fee: false,
            prefer_no_set_memo: true,
            disable_balance_check: true,
        }
    }
}

impl SignOptions {
    /// Wallet may let the user edit the fee
    pub fn fee_editable(&self) -> bool {
        !self.prefer_no_set_fee
    }

    /// Wallet may let the user edit the memo
    pub fn memo_editable(&self) -> bool {
        !self.prefer_no_set_memo
    }
}

/// Submission semantics for a pre-signed cosmos transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Wait for inclusion in a block
    Block,
    /// Wait for CheckTx
    Sync,
    /// Fire and forget
    Async,
}

impl BroadcastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastMode::Block => "block",
            BroadcastMode::Sync => "sync",
            BroadcastMode::Async => "async",
        }
    }

    /// `cosmos.tx.v1beta1.BroadcastMode` enum value
    pub fn proto_code(&self) -> u8 {
        match self {
            BroadcastMode::Block => 1,
            BroadcastMode::Sync => 2,
            BroadcastMode::Async => 3,
        }
    }
}

impl std::str::FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(BroadcastMode::Block),
            "sync" => Ok(BroadcastMode::Sync),
            "async" => Ok(BroadcastMode::Async),
            _ => Err(format!("Unknown broadcast mode: {}", s)),
        }
    }
}

/// Cosmos document convention an offline signer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignType {
    Amino,
    Direct,
}

impl SignType {
    /// Anything other than "direct" falls back to amino
    pub fn from_preference(preferred: Option<&str>) -> Self {
        match preferred {
            Some("direct") => SignType::Direct,
            _ => SignType::Amino,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_range_serde() {
        let range: AuthRange = serde_json::from_str(
            r#"{"cosmos":{"chainIds":["cosmoshub-4","osmosis-1"]},"sui":{}}"#,
        )
        .unwrap();

        assert_eq!(range.len(), 2);
        assert_eq!(
            range.get("cosmos"),
            Some(&NamespaceData::chains(["cosmoshub-4", "osmosis-1"]))
        );
        assert_eq!(range.get("sui"), Some(&NamespaceData::any()));
    }

    #[test]
    fn test_auth_range_keeps_caller_order() {
        let range: AuthRange =
            serde_json::from_str(r#"{"sui":{},"cosmos":{"chainIds":["cosmoshub-4"]},"aptos":{}}"#).unwrap();
        let names: Vec<&str> = range.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sui", "cosmos", "aptos"]);

        let range = range.with("cosmos", NamespaceData::chains(["osmosis-1"]));
        assert_eq!(range.len(), 3);
        assert_eq!(range.iter().nth(1).map(|(name, _)| name), Some("cosmos"));
        assert_eq!(
            serde_json::to_string(&range).unwrap(),
            r#"{"sui":{},"cosmos":{"chainIds":["osmosis-1"]},"aptos":{}}"#
        );
    }

    #[test]
    fn test_sign_options_defaults() {
        let options = SignOptions::default();
        assert!(options.fee_editable());
        assert!(!options.memo_editable());
    }

    #[test]
    fn test_sign_type_preference() {
        assert_eq!(SignType::from_preference(Some("direct")), SignType::Direct);
        assert_eq!(SignType::from_preference(Some("amino")), SignType::Amino);
        assert_eq!(SignType::from_preference(Some("textual")), SignType::Amino);
        assert_eq!(SignType::from_preference(None), SignType::Amino);
    }

    #[test]
    fn test_broadcast_mode() {
        assert_eq!("SYNC".parse::<BroadcastMode>().unwrap(), BroadcastMode::Sync);
        assert_eq!(BroadcastMode::Block.proto_code(), 1);
        assert!("later".parse::<BroadcastMode>().is_err());
    }

    #[test]
    fn test_account_serializes_camel_case() {
        let account = WalletAccount {
            namespace: Namespace::Cosmos,
            chain_id: Some("cosmoshub-4".into()),
            address: Encoded::new("cosmos1abc", Encoding::Bech32),
            public_key: None,
            username: None,
            algo: Some("secp256k1".into()),
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["chainId"], "cosmoshub-4");
        assert_eq!(value["address"]["encoding"], "bech32");
        assert!(value.get("publicKey").is_none());
    }
}
