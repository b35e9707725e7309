//! Connector Error Types
//!
//! Unified error handling for all wallet connectors. Native wallet failures
//! are carried through untouched in [`ConnectorError::Wallet`].

use crate::transport::WalletError;

/// Errors that can occur when driving a wallet through a connector
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectorError {
    /// No binding exists for this namespace in this wallet
    #[error("Unsupported namespace: {0}")]
    UnsupportedNamespace(String),

    /// Namespace is known but the operation is not defined for it
    #[error("Unsupported operation: {operation} is not available for {namespace}")]
    UnsupportedOperation {
        namespace: String,
        operation: &'static str,
    },

    /// A chain id is required for this call
    #[error("Missing chain id for {0}")]
    MissingChainId(String),

    /// Chain ids are required in the auth range entry
    #[error("Missing chain ids for {0}")]
    MissingChainIds(String),

    /// Signing document is malformed or does not belong to the namespace
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// No connector is registered under this wallet name
    #[error("Unknown wallet: {0}")]
    UnknownWallet(String),

    /// Wallet answered with a payload we could not normalize
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Native wallet failure (user rejection, bridge down, ...)
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ConnectorError {
    pub fn unsupported_operation(namespace: impl std::fmt::Display, operation: &'static str) -> Self {
        ConnectorError::UnsupportedOperation {
            namespace: namespace.to_string(),
            operation,
        }
    }

    /// True when the wallet user declined the request
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            ConnectorError::Wallet(WalletError::Rejected { code: Some(4001), .. })
        )
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_error_passes_through() {
        let err: ConnectorError = WalletError::user_rejected().into();
        assert!(err.is_user_rejection());
        assert_eq!(err.to_string(), "Wallet rejected request: User rejected the request");
    }

    #[test]
    fn test_display() {
        let err = ConnectorError::unsupported_operation("aptos", "disconnect");
        assert_eq!(err.to_string(), "Unsupported operation: disconnect is not available for aptos");
        assert_eq!(
            ConnectorError::MissingChainIds("cosmos".into()).to_string(),
            "Missing chain ids for cosmos"
        );
    }
}
