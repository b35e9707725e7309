//! Normalization of native payload encodings
//!
//! Browser wallets hand back byte fields in whatever shape `Uint8Array`
//! took on its way through the bridge: a JSON array, an index-keyed object
//! (`JSON.stringify` of a typed array), a base64 string or a hex string.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use super::error::ConnectorError;

/// Decode a native byte field
pub fn bytes_from_native(value: &Value) -> Result<Vec<u8>, ConnectorError> {
    match value {
        Value::Array(items) => items.iter().map(byte_from_json).collect(),
        Value::Object(map) => {
            let mut indexed = map
                .iter()
                .map(|(k, v)| {
                    let idx: usize = k
                        .parse()
                        .map_err(|_| ConnectorError::InvalidResponse(format!("Non-index key in byte object: {}", k)))?;
                    Ok((idx, byte_from_json(v)?))
                })
                .collect::<Result<Vec<_>, ConnectorError>>()?;
            indexed.sort_by_key(|(idx, _)| *idx);
            Ok(indexed.into_iter().map(|(_, b)| b).collect())
        }
        Value::String(s) => STANDARD
            .decode(s)
            .map_err(|e| ConnectorError::InvalidResponse(format!("Invalid base64 bytes: {}", e))),
        other => Err(ConnectorError::InvalidResponse(format!(
            "Expected bytes, got {}",
            other
        ))),
    }
}

fn byte_from_json(value: &Value) -> Result<u8, ConnectorError> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ConnectorError::InvalidResponse(format!("Not a byte: {}", value)))
}

/// Normalize a native public key (or any byte field) to lowercase hex
/// without a `0x` prefix. Strings that already are hex are kept.
pub fn hex_from_native(value: &Value) -> Result<String, ConnectorError> {
    if let Value::String(s) = value {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if is_hex(stripped) {
            return Ok(stripped.to_lowercase());
        }
    }
    Ok(hex::encode(bytes_from_native(value)?))
}

/// Like [`hex_from_native`] but `0x`-prefixed, the way move-chain addresses
/// are written
pub fn prefixed_hex_from_native(value: &Value) -> Result<String, ConnectorError> {
    Ok(format!("0x{}", hex_from_native(value)?))
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Base64 text of raw bytes
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Fetch a required string field from a native reply
pub fn require_str<'a>(reply: &'a Value, field: &str) -> Result<&'a str, ConnectorError> {
    reply
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::InvalidResponse(format!("Missing string field '{}' in {}", field, reply)))
}

/// Fetch a required field of any shape from a native reply
pub fn require<'a>(reply: &'a Value, field: &str) -> Result<&'a Value, ConnectorError> {
    reply
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ConnectorError::InvalidResponse(format!("Missing field '{}' in {}", field, reply)))
}

/// Reject cosmos addresses that are not bech32
pub fn ensure_bech32(address: &str) -> Result<(), ConnectorError> {
    bech32::decode(address)
        .map(|_| ())
        .map_err(|e| ConnectorError::InvalidResponse(format!("Address '{}' is not bech32: {}", address, e)))
}

/// Serde adapter for byte fields: reads any native shape, writes base64
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::bytes_from_native(&value).map_err(serde::de::Error::custom)
    }
}

/// Deterministic bech32 address for tests
#[cfg(test)]
pub(crate) fn bech32_address(prefix: &str, seed: u8) -> String {
    use bech32::ToBase32;
    bech32::encode(prefix, [seed; 20].to_base32(), bech32::Variant::Bech32)
        .expect("valid hrp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bytes_from_array_object_and_base64() {
        assert_eq!(bytes_from_native(&json!([1, 2, 255])).unwrap(), vec![1, 2, 255]);
        assert_eq!(
            bytes_from_native(&json!({"1": 2, "0": 1, "2": 255})).unwrap(),
            vec![1, 2, 255]
        );
        assert_eq!(bytes_from_native(&json!("AQL/")).unwrap(), vec![1, 2, 255]);
    }

    #[test]
    fn test_bytes_rejects_out_of_range() {
        assert!(bytes_from_native(&json!([256])).is_err());
        assert!(bytes_from_native(&json!(12)).is_err());
    }

    #[test]
    fn test_hex_from_native() {
        assert_eq!(hex_from_native(&json!("0xABCD")).unwrap(), "abcd");
        assert_eq!(hex_from_native(&json!([171, 205])).unwrap(), "abcd");
        // base64 of [0x02, 0xff]
        assert_eq!(hex_from_native(&json!("Av8=")).unwrap(), "02ff");
    }

    #[test]
    fn test_prefixed_hex_from_native() {
        assert_eq!(prefixed_hex_from_native(&json!("0xABCD")).unwrap(), "0xabcd");
        assert_eq!(prefixed_hex_from_native(&json!("abcd")).unwrap(), "0xabcd");
        assert_eq!(prefixed_hex_from_native(&json!([0, 170])).unwrap(), "0x00aa");
    }

    #[test]
    fn test_ensure_bech32() {
        assert!(ensure_bech32(&bech32_address("cosmos", 1)).is_ok());
        assert!(ensure_bech32(&bech32_address("osmo", 2)).is_ok());
        assert!(ensure_bech32("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
    }

    #[test]
    fn test_require_str() {
        let reply = json!({"address": "cosmos1x", "n": 3});
        assert_eq!(require_str(&reply, "address").unwrap(), "cosmos1x");
        assert!(require_str(&reply, "n").is_err());
        assert!(require(&reply, "missing").is_err());
    }
}
