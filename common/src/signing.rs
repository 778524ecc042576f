use std::{fmt, str::FromStr};

use alloy_primitives::{Address, Bytes, Signature, B256};
use alloy_signer::SignerSync;
use tracing::debug;

use crate::{codec, domain::Domain, schema::StructSchema, values::Values, AuthError};

/// Byte layout of a signature handed to the market contract.
/// - `Canonical`: 65 bytes, r || s || v with v = 27/28
/// - `Compact`: 64 bytes, r || vs (ERC-2098), the recovery parity folded into
///   the top bit of s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureFormat {
    #[default]
    Canonical,
    Compact,
}

impl FromStr for SignatureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" | "65" => Ok(Self::Canonical),
            "compact" | "64" => Ok(Self::Compact),
            other => Err(format!("unknown signature format {other:?}, expected canonical or compact")),
        }
    }
}

impl fmt::Display for SignatureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Canonical => "canonical",
            Self::Compact => "compact",
        })
    }
}

/// Sign a prehashed 32-byte digest.
pub fn sign_digest<S: SignerSync + ?Sized>(digest: &B256, signer: &S) -> Result<Signature, AuthError> {
    signer
        .sign_hash_sync(digest)
        .map_err(|e| AuthError::Signature(format!("signer failed: {e}")))
}

/// Hash `values` under `domain` and sign the resulting digest.
pub fn sign<S: SignerSync + ?Sized>(
    domain: &Domain,
    schema: &StructSchema,
    values: &Values,
    signer: &S,
) -> Result<Signature, AuthError> {
    let digest = codec::hash(domain, schema, values)?;
    debug!(schema = schema.name, %digest, "signing digest");
    sign_digest(&digest, signer)
}

/// Fold the recovery parity into the top bit of s.
pub fn fold_compact(signature: &Signature) -> Result<[u8; 64], AuthError> {
    if signature.s().bit(255) {
        return Err(AuthError::Signature(
            "s has its top bit set; parity cannot be folded into it".to_string(),
        ));
    }
    Ok(signature.as_erc2098())
}

/// Split a 64-byte r || vs signature back into (r, s, parity).
pub fn unfold_compact(bytes: &[u8]) -> Result<Signature, AuthError> {
    if bytes.len() != 64 {
        return Err(AuthError::Signature(format!(
            "compact signature must be 64 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Signature::from_erc2098(bytes))
}

pub fn encode_signature(signature: &Signature, format: SignatureFormat) -> Result<Bytes, AuthError> {
    match format {
        SignatureFormat::Canonical => Ok(Bytes::copy_from_slice(&signature.as_bytes())),
        SignatureFormat::Compact => Ok(Bytes::copy_from_slice(&fold_compact(signature)?)),
    }
}

/// Parse either representation back into a signature.
pub fn decode_signature(bytes: &[u8]) -> Result<Signature, AuthError> {
    match bytes.len() {
        64 => unfold_compact(bytes),
        65 => Signature::try_from(bytes)
            .map_err(|e| AuthError::Signature(format!("invalid 65-byte signature: {e}"))),
        n => Err(AuthError::Signature(format!(
            "signature must be 64 or 65 bytes, got {n}"
        ))),
    }
}

/// Recover the address that signed `digest`.
pub fn recover_signer(digest: &B256, signature: &Signature) -> Result<Address, AuthError> {
    signature
        .recover_address_from_prehash(digest)
        .map_err(|e| AuthError::Signature(format!("recovery failed: {e}")))
}

/// Recover the signer of `digest` and compare it with `expected`.
pub fn verify_signer(digest: &B256, signature: &Signature, expected: Address) -> Result<(), AuthError> {
    let recovered = recover_signer(digest, signature)?;
    if recovered != expected {
        return Err(AuthError::Signature(format!(
            "recovered address {recovered:#x} does not match expected address {expected:#x}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{MarketConfig, DEFAULT_DEADLINE},
        schema::{GIVE_UP_EVERYWHERE, MINT_AND_SELL},
    };
    use alloy_primitives::{address, b256, bytes, U256};
    use alloy_signer_local::PrivateKeySigner;

    // First default anvil account.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn signer() -> PrivateKeySigner {
        TEST_KEY.parse().unwrap()
    }

    fn give_up_values() -> Values {
        Values::new()
            .with("id", 1u64)
            .with("nonce", 0u64)
            .with("claimer", "0x1111111111111111111111111111111111111111")
            .with("deadline", DEFAULT_DEADLINE)
    }

    #[test]
    fn give_up_golden_signature() {
        let domain = MarketConfig::default().cross_chain_domain();
        let signature = sign(&domain, &GIVE_UP_EVERYWHERE, &give_up_values(), &signer()).unwrap();

        assert_eq!(
            encode_signature(&signature, SignatureFormat::Canonical).unwrap(),
            bytes!("a2fa87c1c8f70d463341d054c916d841b1b90a379dec25b6d0d636350b8bb4e011cb193f5780571ac79c438df35685c8403a3b35b3fe71edb6265e6834a966ab1c")
        );
        assert_eq!(
            encode_signature(&signature, SignatureFormat::Compact).unwrap(),
            bytes!("a2fa87c1c8f70d463341d054c916d841b1b90a379dec25b6d0d636350b8bb4e091cb193f5780571ac79c438df35685c8403a3b35b3fe71edb6265e6834a966ab")
        );
    }

    #[test]
    fn mint_and_sell_golden_signature() {
        let domain = MarketConfig::default().full_domain(1);
        let values = Values::new()
            .with("id", 5u64)
            .with("saltNonce", 3u64)
            .with("price", "1500000000000000000")
            .with("beneficiary", TEST_ADDRESS)
            .with("buyer", Address::ZERO)
            .with("nonce", 257u64)
            .with("deadline", DEFAULT_DEADLINE);
        let signature = sign(&domain, &MINT_AND_SELL, &values, &signer()).unwrap();
        assert_eq!(
            encode_signature(&signature, SignatureFormat::Compact).unwrap(),
            bytes!("ea07efbb0f08e6a4b8fce30f4b1c7fb7b55c53f9826ca14917c8504a55d91bb35ed8f1a99db7ebb037386e9f2b60a4507479ffd4b39827f6e5838ad473aea37d")
        );
    }

    #[test]
    fn signature_recovers_to_signer() {
        let domain = MarketConfig::default().cross_chain_domain();
        let digest = codec::hash(&domain, &GIVE_UP_EVERYWHERE, &give_up_values()).unwrap();
        let signature = sign_digest(&digest, &signer()).unwrap();

        assert_eq!(signer().address(), TEST_ADDRESS);
        assert_eq!(recover_signer(&digest, &signature).unwrap(), TEST_ADDRESS);
        verify_signer(&digest, &signature, TEST_ADDRESS).unwrap();

        let err = verify_signer(&digest, &signature, Address::ZERO).unwrap_err();
        assert!(format!("{err}").contains("does not match expected address"));
    }

    #[test]
    fn compact_unfolds_to_canonical() {
        let digest = b256!("55f1884dc080c9edd0ca44616e4e31327949c152d88e1aefcce3143c65e329aa");
        let signature = sign_digest(&digest, &signer()).unwrap();

        let compact = encode_signature(&signature, SignatureFormat::Compact).unwrap();
        assert_eq!(compact.len(), 64);
        let unfolded = unfold_compact(&compact).unwrap();
        assert_eq!(unfolded.r(), signature.r());
        assert_eq!(unfolded.s(), signature.s());
        assert_eq!(unfolded.v(), signature.v());

        let canonical = encode_signature(&signature, SignatureFormat::Canonical).unwrap();
        assert_eq!(canonical.len(), 65);
        assert_eq!(unfolded.as_bytes(), canonical[..]);
        assert_eq!(decode_signature(&canonical).unwrap(), decode_signature(&compact).unwrap());
    }

    #[test]
    fn fold_requires_low_s() {
        let high_s = Signature::new(U256::from(1), U256::MAX, false);
        assert!(matches!(fold_compact(&high_s), Err(AuthError::Signature(_))));
    }

    #[test]
    fn compact_parity_lives_in_top_bit_of_s() {
        let r = U256::from(7);
        let s = U256::from(9);
        for parity in [false, true] {
            let folded = fold_compact(&Signature::new(r, s, parity)).unwrap();
            assert_eq!(folded[32] & 0x80 != 0, parity);
            assert_eq!(U256::from_be_slice(&folded[..32]), r);

            let unfolded = unfold_compact(&folded).unwrap();
            assert_eq!((unfolded.r(), unfolded.s(), unfolded.v()), (r, s, parity));
        }
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        assert!(unfold_compact(&[0u8; 65]).is_err());
        assert!(decode_signature(&[0u8; 63]).is_err());
    }

    #[test]
    fn signature_format_parses() {
        assert_eq!("compact".parse::<SignatureFormat>().unwrap(), SignatureFormat::Compact);
        assert_eq!("65".parse::<SignatureFormat>().unwrap(), SignatureFormat::Canonical);
        assert!("rsv".parse::<SignatureFormat>().is_err());
    }
}
