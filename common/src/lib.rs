pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod nonce;
pub mod schema;
pub mod signing;
pub mod storage;
pub mod typed_data;
pub mod values;

use alloy_primitives::{Address, Bytes, Signature, B256};
use alloy_signer::{Signer, SignerSync};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

pub use config::{
    MarketConfig, DEFAULT_DEADLINE, DEFAULT_MAX_SCAN_WORDS, DOMAIN_NAME, DOMAIN_VERSION,
    VANITY_MARKET,
};
pub use domain::Domain;
pub use error::{AuthError, StorageError};
pub use nonce::{read_chain_id, NonceAllocator, StorageReader};
pub use schema::{FieldType, StructKind, StructSchema};
pub use signing::SignatureFormat;
pub use values::{FieldValue, Values};

/// A validated, not yet signed authorization for one of the market's structs.
#[derive(Debug, Clone)]
pub struct Authorization {
    kind: StructKind,
    domain: Domain,
    values: Values,
}

impl Authorization {
    /// Rejects missing, undeclared and unencodable fields up front.
    pub fn new(kind: StructKind, domain: Domain, values: Values) -> Result<Self, AuthError> {
        values.validate(kind.schema())?;
        Ok(Self {
            kind,
            domain,
            values,
        })
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn digest(&self) -> Result<B256, AuthError> {
        codec::hash(&self.domain, self.kind.schema(), &self.values)
    }

    /// Field values as the contract call expects them.
    pub fn message(&self) -> Result<Map<String, Value>, AuthError> {
        let schema = self.kind.schema();
        let tokens = self.values.tokens(schema)?;
        Ok(schema
            .resolve()?
            .into_iter()
            .zip(tokens)
            .map(|((name, ty), token)| (name.to_string(), token.to_json(ty)))
            .collect())
    }

    /// Sign, check that the signature recovers to the signer, and encode it.
    pub fn sign<S>(&self, signer: &S, format: SignatureFormat) -> Result<SignedAuthorization, AuthError>
    where
        S: SignerSync + Signer + ?Sized,
    {
        let digest = self.digest()?;
        let signature = signing::sign_digest(&digest, signer)?;
        signing::verify_signer(&digest, &signature, signer.address())?;
        info!(kind = %self.kind, %digest, signer = %signer.address(), %format, "signed authorization");

        Ok(SignedAuthorization {
            kind: self.kind,
            digest,
            signer: signer.address(),
            message: self.message()?,
            signature: signing::encode_signature(&signature, format)?,
            raw_signature: signature,
        })
    }
}

/// The payload submitted to the market: every struct field plus the signature.
#[derive(Debug, Clone, Serialize)]
pub struct SignedAuthorization {
    #[serde(skip)]
    pub kind: StructKind,
    #[serde(skip)]
    pub digest: B256,
    #[serde(skip)]
    pub signer: Address,
    #[serde(flatten)]
    pub message: Map<String, Value>,
    pub signature: Bytes,
    #[serde(skip)]
    pub raw_signature: Signature,
}
