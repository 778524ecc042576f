use alloy_primitives::{keccak256, Address, B256, U256};
use serde::Serialize;

use crate::codec::WordEncoder;

/// EIP-712 domain of an authorization.
///
/// Only the declared members take part in the separator. A domain without a
/// chain id has a different type string from one with `chainId = 0`, so the two
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        verifying_contract: Address,
        chain_id: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// `(name, type)` pairs of the members present, in canonical EIP-712 order.
    pub fn members(&self) -> Vec<(&'static str, &'static str)> {
        let mut members = vec![("name", "string"), ("version", "string")];
        if self.chain_id.is_some() {
            members.push(("chainId", "uint256"));
        }
        members.push(("verifyingContract", "address"));
        members
    }

    /// e.g. `EIP712Domain(string name,string version,address verifyingContract)`
    pub fn encode_type(&self) -> String {
        let members = self
            .members()
            .iter()
            .map(|(name, ty)| format!("{ty} {name}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("EIP712Domain({members})")
    }

    /// keccak256(typeHash || keccak(name) || keccak(version) [|| chainId] || verifyingContract)
    pub fn separator(&self) -> B256 {
        let mut enc = WordEncoder::new();
        enc.push_b256(&keccak256(self.encode_type().as_bytes()));
        enc.push_b256(&keccak256(self.name.as_bytes()));
        enc.push_b256(&keccak256(self.version.as_bytes()));
        if let Some(chain_id) = self.chain_id {
            enc.push_u256(U256::from(chain_id));
        }
        enc.push_address(&self.verifying_contract);
        keccak256(enc.finish())
    }
}
