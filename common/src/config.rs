//! Deployed constants of the vanity market and the configuration built from them.
//!
//! The name, version and verifying contract are part of every digest. Changing
//! any of them invalidates existing signatures, so a new deployment gets a new
//! `version` rather than an edited one.

use alloy_primitives::{address, Address, U256};
use tracing::debug;

use crate::{domain::Domain, nonce::NonceAllocator, schema::StructKind, AuthError};

/// The deployed market contract that verifies authorizations.
pub const VANITY_MARKET: Address = address!("000000000000b361194cfe6312ee3210d53c15aa");

pub const DOMAIN_NAME: &str = "Tokenized CREATE3 Vanity Addresses";
pub const DOMAIN_VERSION: &str = "1.0";

/// `2^248`: far beyond any real timestamp, still a valid non-zero uint256.
pub const DEFAULT_DEADLINE: U256 = U256::from_limbs([0, 0, 0, 1 << 56]);

/// Bitmap words scanned before the allocator gives up (262_144 nonces).
pub const DEFAULT_MAX_SCAN_WORDS: u64 = 1024;

/// Immutable market configuration shared by the codec callers and the nonce allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    pub name: String,
    pub version: String,
    pub verifying_contract: Address,
    pub max_scan_words: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            verifying_contract: VANITY_MARKET,
            max_scan_words: DEFAULT_MAX_SCAN_WORDS,
        }
    }
}

impl MarketConfig {
    /// Same name and version, different market deployment.
    pub fn with_market(mut self, verifying_contract: Address) -> Self {
        self.verifying_contract = verifying_contract;
        self
    }

    pub fn with_max_scan_words(mut self, max_scan_words: u64) -> Self {
        self.max_scan_words = max_scan_words;
        self
    }

    /// Domain without a chain id, valid on every chain the market is deployed to.
    pub fn cross_chain_domain(&self) -> Domain {
        Domain::new(&self.name, &self.version, self.verifying_contract, None)
    }

    /// Domain bound to a single chain.
    pub fn full_domain(&self, chain_id: u64) -> Domain {
        Domain::new(
            &self.name,
            &self.version,
            self.verifying_contract,
            Some(chain_id),
        )
    }

    /// Picks the domain variant the market verifies `kind` against.
    pub fn domain(&self, kind: StructKind, chain_id: Option<u64>) -> Result<Domain, AuthError> {
        if kind.is_cross_chain() {
            if let Some(chain_id) = chain_id {
                debug!(%kind, chain_id, "ignoring chain id for cross-chain struct");
            }
            return Ok(self.cross_chain_domain());
        }
        let chain_id = chain_id.ok_or_else(|| {
            AuthError::value(
                kind.name(),
                "chainId",
                "struct is signed over the full domain and needs a chain id",
            )
        })?;
        Ok(self.full_domain(chain_id))
    }

    pub fn nonce_allocator(&self) -> NonceAllocator {
        NonceAllocator::new(self.verifying_contract, self.max_scan_words)
    }
}
