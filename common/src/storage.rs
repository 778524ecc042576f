//! Storage readers for the nonce allocator.
//!
//! `RpcStorage` reads a live chain through any alloy provider. `MemoryStorage`
//! keeps words in a map, for tests and offline use.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    nonce::{bitmap_base_slot, bitmap_word_slot, StorageReader},
    StorageError,
};

/// Storage reader backed by a JSON-RPC provider.
///
/// Each read is a single `eth_getStorageAt` against the latest block; retries
/// and timeouts are whatever the provider's transport is configured with.
#[derive(Debug, Clone)]
pub struct RpcStorage<P> {
    provider: P,
}

impl<P> RpcStorage<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> StorageReader for RpcStorage<P>
where
    P: Provider + Send + Sync,
{
    async fn get_storage_word(&self, contract: Address, slot: B256) -> Result<U256, StorageError> {
        self.provider
            .get_storage_at(contract, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))
    }

    async fn get_chain_id(&self) -> Result<u64, StorageError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))
    }
}

/// In-memory storage reader.
///
/// Unwritten slots read as zero, as they do on-chain.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    words: Arc<RwLock<HashMap<(Address, B256), U256>>>,
    chain_id: Option<u64>,
    reads: AtomicU64,
}

impl MemoryStorage {
    /// Empty storage without a chain id.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain_id(chain_id: u64) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..Self::default()
        }
    }

    pub async fn set_word(&self, contract: Address, slot: B256, value: U256) {
        self.words.write().await.insert((contract, slot), value);
    }

    /// Writes word `word_index` of `owner`'s nonce bitmap in `contract`.
    pub async fn set_bitmap_word(&self, contract: Address, owner: Address, word_index: u64, value: U256) {
        let slot = bitmap_word_slot(bitmap_base_slot(owner), word_index);
        self.set_word(contract, slot, value).await;
    }

    /// Number of storage words read so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StorageReader for MemoryStorage {
    async fn get_storage_word(&self, contract: Address, slot: B256) -> Result<U256, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let words = self.words.read().await;
        Ok(words.get(&(contract, slot)).copied().unwrap_or_default())
    }

    async fn get_chain_id(&self) -> Result<u64, StorageError> {
        self.chain_id.ok_or(StorageError::ChainIdUnavailable)
    }
}
