//! Value records and their coercion into ABI tokens.

use std::fmt;

use alloy_primitives::{hex, utils::parse_ether, Address, Bytes, U256};
use serde_json::Value as JsonValue;

use crate::{
    schema::{FieldType, StructSchema},
    AuthError,
};

/// A field value as supplied by a caller, before it is checked against its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uint(U256),
    Int(i128),
    Address(Address),
    /// Raw bytes for an address field; must be exactly 20 long.
    Bytes(Bytes),
    /// Decimal or `0x` hex integer, or `0x` hex address.
    Text(String),
}

impl From<U256> for FieldValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<i128> for FieldValue {
    fn from(value: i128) -> Self {
        Self::Int(value)
    }
}

impl From<Address> for FieldValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A value that passed its type check and is ready to be ABI encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(Address),
}

impl Token {
    /// The 32-byte ABI word: big-endian integer, or address left-padded with zeros.
    pub fn word(&self) -> [u8; 32] {
        match self {
            Self::Uint(v) => v.to_be_bytes::<32>(),
            Self::Address(addr) => addr.into_word().0,
        }
    }

    /// JSON form as wallets expect it: uint8 as a number, uint256 as a decimal
    /// string, addresses checksummed.
    pub fn to_json(&self, ty: FieldType) -> JsonValue {
        match (self, ty) {
            (Self::Uint(v), FieldType::Uint8) => JsonValue::from(v.to::<u8>()),
            (Self::Uint(v), _) => JsonValue::String(v.to_string()),
            (Self::Address(addr), _) => JsonValue::String(addr.to_checksum(None)),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::Address(addr) => write!(f, "{addr}"),
        }
    }
}

impl FieldValue {
    /// Checks the value against `ty` without clamping or truncating anything.
    pub fn coerce(&self, field: &str, ty: FieldType) -> Result<Token, AuthError> {
        let reject = |reason: String| AuthError::encoding(field, ty.tag(), reason);
        match ty {
            FieldType::Address => match self {
                Self::Address(addr) => Ok(Token::Address(*addr)),
                Self::Bytes(bytes) => address_from_slice(bytes).map_err(reject),
                Self::Text(text) => parse_address(text).map_err(reject),
                Self::Uint(_) | Self::Int(_) => {
                    Err(reject("expected an address, got an integer".to_string()))
                }
            },
            FieldType::Uint8 | FieldType::Uint256 => {
                let value = match self {
                    Self::Uint(v) => *v,
                    Self::Int(v) if *v < 0 => {
                        return Err(reject(format!("negative integer {v}")));
                    }
                    Self::Int(v) => U256::from(*v as u128),
                    Self::Text(text) => parse_uint(text).map_err(reject)?,
                    Self::Address(_) | Self::Bytes(_) => {
                        return Err(reject("expected an integer".to_string()));
                    }
                };
                let bits = ty.uint_bits().unwrap_or(256);
                if value.bit_len() > bits {
                    return Err(reject(format!("{value} does not fit in {bits} bits")));
                }
                Ok(Token::Uint(value))
            }
        }
    }
}

fn address_from_slice(bytes: &[u8]) -> Result<Token, String> {
    if bytes.len() != 20 {
        return Err(format!("expected 20 address bytes, got {}", bytes.len()));
    }
    Ok(Token::Address(Address::from_slice(bytes)))
}

/// Mixed-case hex must carry a valid EIP-55 checksum; all-lower or all-upper
/// hex is taken as is.
fn parse_address(text: &str) -> Result<Token, String> {
    let text = text.trim();
    let bytes = hex::decode(text).map_err(|e| format!("invalid hex {text:?}: {e}"))?;
    let token = address_from_slice(&bytes)?;

    let digits = text.strip_prefix("0x").unwrap_or(text);
    let mixed_case = digits.bytes().any(|b| b.is_ascii_uppercase())
        && digits.bytes().any(|b| b.is_ascii_lowercase());
    if mixed_case {
        Address::parse_checksummed(text, None)
            .map_err(|e| format!("bad checksum in {text:?}: {e}"))?;
    }
    Ok(token)
}

/// Decimal, or `0x`/`0o`/`0b` prefixed. Digit separators and a prefix with no
/// digits are rejected rather than read as something else.
fn parse_uint(text: &str) -> Result<U256, String> {
    let text = text.trim();
    if text.starts_with('-') {
        return Err(format!("negative integer {text}"));
    }
    if text.is_empty() {
        return Err("empty integer".to_string());
    }
    if text.contains('_') {
        return Err(format!("digit separators are not allowed in {text:?}"));
    }
    if matches!(text.to_ascii_lowercase().as_str(), "0x" | "0o" | "0b") {
        return Err(format!("no digits after prefix {text:?}"));
    }
    text.parse::<U256>()
        .map_err(|e| format!("invalid integer {text:?}: {e}"))
}

/// Scales a decimal ether amount to wei.
pub fn parse_price(ether: &str) -> Result<U256, AuthError> {
    let ether = ether.trim();
    if ether.starts_with('-') {
        return Err(AuthError::encoding("price", "uint256", format!("negative amount {ether}")));
    }
    parse_ether(ether)
        .map_err(|e| AuthError::encoding("price", "uint256", format!("invalid ether amount {ether:?}: {e}")))
}

/// Field values keyed by name. Insertion order carries no meaning: encoding
/// always follows the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    entries: Vec<(String, FieldValue)>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns values to the schema's fields in declaration order.
    pub fn from_positional<I, V>(schema: &StructSchema, args: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let mut values = Self::new();
        for (i, arg) in args.into_iter().enumerate() {
            let field = schema.fields.get(i).ok_or_else(|| {
                AuthError::value(
                    schema.name,
                    format!("#{i}"),
                    format!("struct only declares {} fields", schema.fields.len()),
                )
            })?;
            values.insert(field.name, arg);
        }
        Ok(values)
    }

    /// Builder form of [`Values::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, replacing any earlier value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Resolves each schema field to a token, in schema order. Fields the
    /// schema does not declare are ignored here; see [`Values::validate`].
    pub fn tokens(&self, schema: &StructSchema) -> Result<Vec<Token>, AuthError> {
        schema
            .resolve()?
            .into_iter()
            .map(|(name, ty)| {
                self.get(name)
                    .ok_or_else(|| AuthError::value(schema.name, name, "missing"))?
                    .coerce(name, ty)
            })
            .collect()
    }

    /// Strict check: every declared field present and encodable, nothing extra.
    pub fn validate(&self, schema: &StructSchema) -> Result<(), AuthError> {
        if let Some((extra, _)) = self.iter().find(|(name, _)| schema.field(name).is_none()) {
            return Err(AuthError::value(schema.name, extra, "not declared by the struct"));
        }
        self.tokens(schema).map(|_| ())
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GIVE_UP_EVERYWHERE, MINT_AND_SELL};
    use alloy_primitives::{address, bytes};

    fn give_up() -> Values {
        Values::new()
            .with("id", 1u64)
            .with("nonce", 0u64)
            .with("claimer", address!("1111111111111111111111111111111111111111"))
            .with("deadline", "452312848583266388373324160190187140051835877600158453279131187530910662656")
    }

    #[test]
    fn uint8_accepts_255_and_rejects_256() {
        assert_eq!(
            FieldValue::from(255u64).coerce("nonce", FieldType::Uint8).unwrap(),
            Token::Uint(U256::from(255))
        );
        let err = FieldValue::from(256u64).coerce("nonce", FieldType::Uint8).unwrap_err();
        assert!(matches!(err, AuthError::Encoding { ref field, ref ty, .. } if field == "nonce" && ty == "uint8"));
        assert!(FieldValue::from("0x100").coerce("nonce", FieldType::Uint8).is_err());
    }

    #[test]
    fn negative_integers_are_rejected() {
        assert!(matches!(
            FieldValue::Int(-1).coerce("id", FieldType::Uint256),
            Err(AuthError::Encoding { .. })
        ));
        assert!(matches!(
            FieldValue::from("-7").coerce("id", FieldType::Uint256),
            Err(AuthError::Encoding { .. })
        ));
        assert_eq!(
            FieldValue::Int(7).coerce("id", FieldType::Uint256).unwrap(),
            Token::Uint(U256::from(7))
        );
    }

    #[test]
    fn uint256_overflow_is_rejected() {
        let too_big = format!("{}0", U256::MAX);
        assert!(matches!(
            FieldValue::from(too_big).coerce("id", FieldType::Uint256),
            Err(AuthError::Encoding { .. })
        ));
        assert_eq!(
            FieldValue::from(U256::MAX.to_string()).coerce("id", FieldType::Uint256).unwrap(),
            Token::Uint(U256::MAX)
        );
    }

    #[test]
    fn text_integers_accept_decimal_and_hex() {
        let dec = FieldValue::from("256").coerce("id", FieldType::Uint256).unwrap();
        let hex = FieldValue::from("0x100").coerce("id", FieldType::Uint256).unwrap();
        assert_eq!(dec, hex);
    }

    #[test]
    fn malformed_text_integers_are_rejected() {
        for text in ["0x", "0b", "0o", "0X", "1_000", "0x1_00"] {
            let err = FieldValue::from(text).coerce("id", FieldType::Uint256).unwrap_err();
            assert!(
                matches!(err, AuthError::Encoding { ref field, .. } if field == "id"),
                "{text:?} was accepted"
            );
        }
        assert!(FieldValue::from("").coerce("id", FieldType::Uint256).is_err());
        assert_eq!(
            FieldValue::from("0x0").coerce("id", FieldType::Uint256).unwrap(),
            Token::Uint(U256::ZERO)
        );
        assert_eq!(
            FieldValue::from("1000").coerce("id", FieldType::Uint256).unwrap(),
            Token::Uint(U256::from(1000))
        );
    }

    #[test]
    fn mixed_case_addresses_must_be_checksummed() {
        let expected = Token::Address(address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        for text in [
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266",
        ] {
            assert_eq!(
                FieldValue::from(text).coerce("beneficiary", FieldType::Address).unwrap(),
                expected
            );
        }

        let typo = FieldValue::from("0xF39fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert!(matches!(
            typo.coerce("beneficiary", FieldType::Address),
            Err(AuthError::Encoding { .. })
        ));
    }

    #[test]
    fn address_must_be_exactly_20_bytes() {
        let short = FieldValue::Bytes(bytes!("11111111111111111111111111111111111111"));
        assert!(matches!(
            short.coerce("claimer", FieldType::Address),
            Err(AuthError::Encoding { .. })
        ));
        let long = FieldValue::from("0x111111111111111111111111111111111111111111");
        assert!(matches!(
            long.coerce("claimer", FieldType::Address),
            Err(AuthError::Encoding { .. })
        ));
        let ok = FieldValue::from("0x1111111111111111111111111111111111111111")
            .coerce("claimer", FieldType::Address)
            .unwrap();
        assert_eq!(
            ok,
            Token::Address(address!("1111111111111111111111111111111111111111"))
        );
    }

    #[test]
    fn address_word_is_left_padded() {
        let word = Token::Address(address!("1111111111111111111111111111111111111111")).word();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0x11u8; 20]);
    }

    #[test]
    fn missing_field_is_a_value_error() {
        let mut values = give_up();
        values.entries.retain(|(name, _)| name != "claimer");
        let err = values.tokens(&GIVE_UP_EVERYWHERE).unwrap_err();
        assert!(matches!(err, AuthError::Value { ref field, .. } if field == "claimer"));
    }

    #[test]
    fn extra_field_is_ignored_by_tokens_but_rejected_by_validate() {
        let values = give_up().with("price", 5u64);
        assert_eq!(values.tokens(&GIVE_UP_EVERYWHERE).unwrap().len(), 4);
        let err = values.validate(&GIVE_UP_EVERYWHERE).unwrap_err();
        assert!(matches!(err, AuthError::Value { ref field, .. } if field == "price"));
        give_up().validate(&GIVE_UP_EVERYWHERE).unwrap();
    }

    #[test]
    fn insert_replaces_existing_value() {
        let values = give_up().with("id", 9u64);
        assert_eq!(values.len(), 4);
        assert_eq!(values.get("id"), Some(&FieldValue::from(9u64)));
    }

    #[test]
    fn positional_values_follow_schema_order() {
        let values = Values::from_positional(&MINT_AND_SELL, ["1", "2", "3"]).unwrap();
        assert_eq!(values.get("saltNonce"), Some(&FieldValue::from("2")));
        assert!(!values.contains("beneficiary"));

        let err = Values::from_positional(&GIVE_UP_EVERYWHERE, ["1", "2", "3", "4", "5"]).unwrap_err();
        assert!(matches!(err, AuthError::Value { .. }));
    }

    #[test]
    fn price_is_scaled_to_wei() {
        assert_eq!(parse_price("1.5").unwrap(), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(parse_price("0").unwrap(), U256::ZERO);
        assert!(matches!(parse_price("-1"), Err(AuthError::Encoding { .. })));
        assert!(matches!(parse_price("one"), Err(AuthError::Encoding { .. })));
    }

    #[test]
    fn json_rendering_per_type() {
        assert_eq!(Token::Uint(U256::from(3)).to_json(FieldType::Uint8), JsonValue::from(3u8));
        assert_eq!(
            Token::Uint(U256::from(3)).to_json(FieldType::Uint256),
            JsonValue::String("3".into())
        );
    }
}
