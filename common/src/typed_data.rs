use alloy_dyn_abi::TypedData;
use alloy_primitives::B256;
use serde_json::{json, Map, Value};

use crate::{domain::Domain, schema::StructSchema, values::Values, AuthError};

/// Render an authorization as a standard EIP-712 typed-data document
/// (`types`, `primaryType`, `domain`, `message`), the shape wallets sign with
/// `eth_signTypedData_v4`.
pub fn typed_data_json(
    domain: &Domain,
    schema: &StructSchema,
    values: &Values,
) -> Result<Value, AuthError> {
    let resolved = schema.resolve()?;
    let tokens = values.tokens(schema)?;

    let domain_types: Vec<Value> = domain
        .members()
        .into_iter()
        .map(|(name, ty)| json!({ "name": name, "type": ty }))
        .collect();

    let message: Map<String, Value> = resolved
        .iter()
        .zip(&tokens)
        .map(|((name, ty), token)| (name.to_string(), token.to_json(*ty)))
        .collect();

    let mut types = Map::new();
    types.insert("EIP712Domain".to_string(), Value::Array(domain_types));
    types.insert(schema.name.to_string(), json!(schema.fields));

    Ok(json!({
        "types": types,
        "primaryType": schema.name,
        "domain": domain,
        "message": message,
    }))
}

/// Compute the EIP-712 digest of any compliant typed-data JSON document.
/// Returns keccak256("\x19\x01" || domainSeparator || hashStruct(message)).
pub fn digest_from_json(typed_data_json: &str) -> Result<B256, AuthError> {
    let typed: TypedData = serde_json::from_str(typed_data_json).map_err(|e| {
        AuthError::schema("typed data", format!("invalid EIP-712 typed data JSON: {e}"))
    })?;
    typed.eip712_signing_hash().map_err(|e| {
        AuthError::schema(&typed.primary_type, format!("failed computing EIP-712 digest: {e}"))
    })
}
