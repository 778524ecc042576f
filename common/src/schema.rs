//! Struct schemas signed by the market and the closed catalog of struct kinds.
//!
//! Field order is part of a schema's identity: it fixes both the type string
//! and the order in which values are encoded.

use std::{collections::HashSet, fmt, str::FromStr};

use alloy_primitives::{keccak256, B256};
use serde::Serialize;

use crate::AuthError;

/// Solidity types that appear in the market's structs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Uint8,
    Uint256,
    Address,
}

impl FieldType {
    /// Parses a Solidity type tag. Only the tags the market uses are known.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "uint8" => Some(Self::Uint8),
            "uint256" => Some(Self::Uint256),
            "address" => Some(Self::Address),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint256 => "uint256",
            Self::Address => "address",
        }
    }

    /// Largest bit width an unsigned value of this type may use.
    pub(crate) fn uint_bits(&self) -> Option<usize> {
        match self {
            Self::Uint8 => Some(8),
            Self::Uint256 => Some(256),
            Self::Address => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One member of a struct schema, with its type kept as the raw Solidity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

impl Field {
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self { name, ty }
    }
}

/// Ordered field list of one EIP-712 struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructSchema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

pub const GIVE_UP_EVERYWHERE: StructSchema = StructSchema {
    name: "GiveUpEverywhere",
    fields: &[
        Field::new("id", "uint256"),
        Field::new("nonce", "uint8"),
        Field::new("claimer", "address"),
        Field::new("deadline", "uint256"),
    ],
};

pub const MINT_AND_SELL: StructSchema = StructSchema {
    name: "MintAndSell",
    fields: &[
        Field::new("id", "uint256"),
        Field::new("saltNonce", "uint8"),
        Field::new("price", "uint256"),
        Field::new("beneficiary", "address"),
        Field::new("buyer", "address"),
        Field::new("nonce", "uint256"),
        Field::new("deadline", "uint256"),
    ],
};

impl StructSchema {
    /// Checks the struct and field names and resolves every type tag.
    pub fn resolve(&self) -> Result<Vec<(&'static str, FieldType)>, AuthError> {
        if !is_identifier(self.name) {
            return Err(AuthError::schema(self.name, "struct name is not an identifier"));
        }
        if self.fields.is_empty() {
            return Err(AuthError::schema(self.name, "struct declares no fields"));
        }
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .map(|field| {
                if !is_identifier(field.name) {
                    return Err(AuthError::schema(
                        self.name,
                        format!("field name {:?} is not an identifier", field.name),
                    ));
                }
                if !seen.insert(field.name) {
                    return Err(AuthError::schema(
                        self.name,
                        format!("field {} is declared twice", field.name),
                    ));
                }
                let ty = FieldType::parse(field.ty).ok_or_else(|| {
                    AuthError::schema(
                        self.name,
                        format!("unknown type {:?} for field {}", field.ty, field.name),
                    )
                })?;
                Ok((field.name, ty))
            })
            .collect()
    }

    /// e.g. `GiveUpEverywhere(uint256 id,uint8 nonce,address claimer,uint256 deadline)`
    pub fn encode_type(&self) -> String {
        let members = self
            .fields
            .iter()
            .map(|field| format!("{} {}", field.ty, field.name))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({members})", self.name)
    }

    pub fn type_hash(&self) -> B256 {
        keccak256(self.encode_type().as_bytes())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The structs the market verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructKind {
    GiveUpEverywhere,
    MintAndSell,
}

impl StructKind {
    pub const ALL: [StructKind; 2] = [StructKind::GiveUpEverywhere, StructKind::MintAndSell];

    pub fn schema(&self) -> &'static StructSchema {
        match self {
            Self::GiveUpEverywhere => &GIVE_UP_EVERYWHERE,
            Self::MintAndSell => &MINT_AND_SELL,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema().name
    }

    /// Whether the struct is signed over the domain without a chain id.
    pub fn is_cross_chain(&self) -> bool {
        match self {
            Self::GiveUpEverywhere => true,
            Self::MintAndSell => false,
        }
    }
}

impl fmt::Display for StructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| AuthError::schema(s, "unrecognized struct"))
    }
}
