//! Offline signers
//!
//! A signer bound to one cosmos chain, handed to transaction-construction
//! code that wants to sign without broadcasting.

use std::sync::Arc;

use super::bindings::CosmosApi;
use super::error::ConnectorError;
use super::sign_doc::{DirectSignDoc, StdSignDoc};
use super::types::{SignOptions, SignType, Signature, WalletAccount};

/// Signer for amino JSON documents
#[derive(Clone)]
pub struct AminoSigner {
    cosmos: Arc<dyn CosmosApi>,
    chain_id: String,
    options: SignOptions,
}

/// Signer for protobuf direct documents
#[derive(Clone)]
pub struct DirectSigner {
    cosmos: Arc<dyn CosmosApi>,
    chain_id: String,
    options: SignOptions,
}

/// Offline signer in the requested flavour
#[derive(Clone)]
pub enum OfflineSigner {
    Amino(AminoSigner),
    Direct(DirectSigner),
}

fn check_chain(expected: &str, got: &str) -> Result<(), ConnectorError> {
    if expected != got {
        return Err(ConnectorError::InvalidDocument(format!(
            "Sign doc is for {} but the signer is bound to {}",
            got, expected
        )));
    }
    Ok(())
}

impl AminoSigner {
    pub async fn get_accounts(&self) -> Result<Vec<WalletAccount>, ConnectorError> {
        Ok(vec![self.cosmos.get_account(&self.chain_id).await?])
    }

    pub async fn sign_amino(&self, signer: &str, doc: &StdSignDoc) -> Result<Signature, ConnectorError> {
        check_chain(&self.chain_id, &doc.chain_id)?;
        self.cosmos
            .sign_amino(&self.chain_id, signer, doc, &self.options)
            .await
    }
}

impl DirectSigner {
    pub async fn get_accounts(&self) -> Result<Vec<WalletAccount>, ConnectorError> {
        Ok(vec![self.cosmos.get_account(&self.chain_id).await?])
    }

    pub async fn sign_direct(&self, signer: &str, doc: &DirectSignDoc) -> Result<Signature, ConnectorError> {
        check_chain(&self.chain_id, &doc.chain_id)?;
        self.cosmos
            .sign_direct(&self.chain_id, signer, doc, &self.options)
            .await
    }
}

impl OfflineSigner {
    pub(crate) fn new(
        cosmos: Arc<dyn CosmosApi>,
        chain_id: &str,
        sign_type: SignType,
        options: SignOptions,
    ) -> Self {
        let chain_id = chain_id.to_string();
        match sign_type {
            SignType::Amino => OfflineSigner::Amino(AminoSigner {
                cosmos,
                chain_id,
                options,
            }),
            SignType::Direct => OfflineSigner::Direct(DirectSigner {
                cosmos,
                chain_id,
                options,
            }),
        }
    }

    pub fn sign_type(&self) -> SignType {
        match self {
            OfflineSigner::Amino(_) => SignType::Amino,
            OfflineSigner::Direct(_) => SignType::Direct,
        }
    }

    pub fn chain_id(&self) -> &str {
        match self {
            OfflineSigner::Amino(s) => &s.chain_id,
            OfflineSigner::Direct(s) => &s.chain_id,
        }
    }

    pub async fn get_accounts(&self) -> Result<Vec<WalletAccount>, ConnectorError> {
        match self {
            OfflineSigner::Amino(s) => s.get_accounts().await,
            OfflineSigner::Direct(s) => s.get_accounts().await,
        }
    }

    pub fn as_amino(&self) -> Option<&AminoSigner> {
        match self {
            OfflineSigner::Amino(s) => Some(s),
            OfflineSigner::Direct(_) => None,
        }
    }

    pub fn as_direct(&self) -> Option<&DirectSigner> {
        match self {
            OfflineSigner::Direct(s) => Some(s),
            OfflineSigner::Amino(_) => None,
        }
    }
}

impl std::fmt::Debug for OfflineSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineSigner")
            .field("sign_type", &self.sign_type())
            .field("chain_id", &self.chain_id())
            .finish()
    }
}
