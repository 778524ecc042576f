//! Discovery of the lowest unused nonce in the market's per-owner bitmap.
//!
//! The market stores `mapping(address => mapping(uint256 => uint256))` at slot
//! 0: word `i` of `owner` holds nonces `i * 256 ..= i * 256 + 255`, bit `b`
//! set meaning nonce `i * 256 + b` is used.
//!
//! The allocator only reads. A nonce it reports as free is a hint: another
//! transaction, or another run of this tool, can consume it before the caller's
//! authorization lands on-chain. Only the contract's own check-and-set is
//! authoritative, and a caller that loses the race has to discover a new nonce
//! and sign again.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use tracing::debug;

use crate::{AuthError, StorageError};

/// Storage slot of the nonce bitmap mapping in the market contract.
pub const BITMAP_MAPPING_SLOT: U256 = U256::ZERO;

/// Nonces per bitmap word.
pub const WORD_BITS: usize = 256;

/// Read-only view of contract storage.
#[async_trait]
pub trait StorageReader: Send + Sync {
    /// Returns the raw 32-byte word stored at `slot` of `contract`.
    async fn get_storage_word(&self, contract: Address, slot: B256) -> Result<U256, StorageError>;

    /// Returns the id of the chain the storage belongs to.
    async fn get_chain_id(&self) -> Result<u64, StorageError>;
}

/// Chain id reported by `reader`. A failed read is transient, as for word reads.
pub async fn read_chain_id<R>(reader: &R) -> Result<u64, AuthError>
where
    R: StorageReader + ?Sized,
{
    let chain_id = reader
        .get_chain_id()
        .await
        .map_err(|source| AuthError::Transient {
            context: "reading chain id".to_string(),
            source,
        })?;
    debug!(chain_id, "read chain id");
    Ok(chain_id)
}

/// keccak256(abi.encode(owner, BITMAP_MAPPING_SLOT))
pub fn bitmap_base_slot(owner: Address) -> B256 {
    keccak256((owner, BITMAP_MAPPING_SLOT).abi_encode_params())
}

/// keccak256(abi.encode(word_index, base_slot))
pub fn bitmap_word_slot(base_slot: B256, word_index: u64) -> B256 {
    keccak256((U256::from(word_index), U256::from_be_bytes(base_slot.0)).abi_encode_params())
}

/// Position of the lowest clear bit, or `None` if every bit is set.
pub fn first_free_bit(word: U256) -> Option<usize> {
    if word == U256::MAX {
        return None;
    }
    (0..WORD_BITS).find(|&bit| !word.bit(bit))
}

/// `word_index * 256 + bit`
pub fn nonce_index(word_index: u64, bit: usize) -> U256 {
    U256::from(word_index) * U256::from(WORD_BITS) + U256::from(bit)
}

/// Scans an owner's bitmap words in order until one has a clear bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceAllocator {
    contract: Address,
    max_words: u64,
}

impl NonceAllocator {
    /// `max_words` bounds the scan: past it the owner is reported as exhausted.
    pub fn new(contract: Address, max_words: u64) -> Self {
        Self { contract, max_words }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn max_words(&self) -> u64 {
        self.max_words
    }

    /// Lowest nonce of `owner` whose bit is clear at the time its word is read.
    ///
    /// Issues one storage read per word examined, strictly in sequence. Nothing
    /// is reserved: see the module docs for the race this leaves open.
    pub async fn next_free_nonce<R>(&self, reader: &R, owner: Address) -> Result<U256, AuthError>
    where
        R: StorageReader + ?Sized,
    {
        let base_slot = bitmap_base_slot(owner);
        for word_index in 0..self.max_words {
            let slot = bitmap_word_slot(base_slot, word_index);
            let word = reader
                .get_storage_word(self.contract, slot)
                .await
                .map_err(|source| AuthError::Transient {
                    context: format!("reading bitmap word {word_index} of {owner:#x}"),
                    source,
                })?;
            debug!(%owner, word_index, %slot, word = %format!("{word:#x}"), "read nonce bitmap word");

            if let Some(bit) = first_free_bit(word) {
                let nonce = nonce_index(word_index, bit);
                debug!(%owner, word_index, bit, %nonce, "found free nonce");
                return Ok(nonce);
            }
        }
        Err(AuthError::Exhausted {
            owner,
            words: self.max_words,
        })
    }
}
