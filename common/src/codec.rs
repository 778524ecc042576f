//! EIP-712 hashing of the market's structs.
//!
//! digest = keccak256(0x1901 || domainSeparator || hashStruct(values))
//! hashStruct = keccak256(typeHash || word(field_0) || ... || word(field_n))
//!
//! All market structs are flat and made of static types, so every field
//! encodes to exactly one 32-byte word.

use alloy_primitives::{keccak256, Address, B256, U256};
use tracing::trace;

use crate::{domain::Domain, schema::StructSchema, values::Values, AuthError};

/// Concatenates 32-byte ABI words.
#[derive(Debug, Default)]
pub struct WordEncoder {
    buf: Vec<u8>,
}

impl WordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_word(&mut self, word: &[u8; 32]) {
        self.buf.extend_from_slice(word);
    }

    pub fn push_b256(&mut self, v: &B256) {
        self.buf.extend_from_slice(v.as_slice());
    }

    pub fn push_address(&mut self, addr: &Address) {
        self.push_b256(&addr.into_word());
    }

    pub fn push_u256(&mut self, v: U256) {
        self.push_word(&v.to_be_bytes::<32>());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encodes `values` in the order `schema` declares, prefixed by its type hash.
pub fn encode_data(schema: &StructSchema, values: &Values) -> Result<Vec<u8>, AuthError> {
    let tokens = values.tokens(schema)?;
    let mut enc = WordEncoder::new();
    enc.push_b256(&schema.type_hash());
    for token in &tokens {
        enc.push_word(&token.word());
    }
    Ok(enc.finish())
}

pub fn hash_struct(schema: &StructSchema, values: &Values) -> Result<B256, AuthError> {
    let struct_hash = keccak256(encode_data(schema, values)?);
    trace!(schema = schema.name, %struct_hash, "hashed struct");
    Ok(struct_hash)
}

/// keccak256(0x1901 || domain_separator || struct_hash)
pub fn signing_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
    let mut out = Vec::with_capacity(2 + 32 + 32);
    out.push(0x19);
    out.push(0x01);
    out.extend_from_slice(domain_separator.as_slice());
    out.extend_from_slice(struct_hash.as_slice());
    keccak256(out)
}

/// The digest the market contract recomputes before recovering the signer.
pub fn hash(domain: &Domain, schema: &StructSchema, values: &Values) -> Result<B256, AuthError> {
    let struct_hash = hash_struct(schema, values)?;
    Ok(signing_digest(&domain.separator(), &struct_hash))
}
