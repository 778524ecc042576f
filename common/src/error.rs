use alloy_primitives::Address;
use thiserror::Error;

/// Errors raised while building, hashing or signing an authorization, or
/// while discovering a free nonce.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown or malformed struct name, field name or type tag.
    #[error("schema error in {schema}: {reason}")]
    Schema { schema: String, reason: String },

    /// A field is missing from, or not declared by, the value record.
    #[error("value error for {schema}.{field}: {reason}")]
    Value {
        schema: String,
        field: String,
        reason: String,
    },

    /// A value does not fit its declared type.
    #[error("cannot encode {field} as {ty}: {reason}")]
    Encoding {
        field: String,
        ty: String,
        reason: String,
    },

    /// The storage collaborator failed; the caller may retry.
    #[error("storage read failed while {context}: {source}")]
    Transient {
        context: String,
        #[source]
        source: StorageError,
    },

    /// Every bit of every scanned bitmap word is set.
    #[error("no free nonce for {owner:#x} within the first {words} bitmap words")]
    Exhausted { owner: Address, words: u64 },

    /// The signer failed, or a signature could not be represented or verified.
    #[error("signature error: {0}")]
    Signature(String),
}

impl AuthError {
    pub(crate) fn schema(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn value(
        schema: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Value {
            schema: schema.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(
        field: impl Into<String>,
        ty: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Encoding {
            field: field.into(),
            ty: ty.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Errors reported by a [`StorageReader`](crate::nonce::StorageReader).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The node or provider could not be reached or answered with an error.
    #[error("provider error: {0}")]
    Provider(String),
    /// The backend has no chain id to report.
    #[error("chain id unavailable")]
    ChainIdUnavailable,
}
