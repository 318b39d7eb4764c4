//! In-memory implementation of the BlockStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use replica_ledger_core::BlockId;

use crate::error::Result;
use crate::traits::BlockStore;
use crate::updates::{KvWrite, Updates};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Committed batches; block id N is at index N-1.
    blocks: Vec<Updates>,

    /// Newest write per (category, key).
    latest: HashMap<(String, Vec<u8>), KvWrite>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// The batch committed as block `id`, exactly as it was appended.
    pub fn block_updates(&self, id: BlockId) -> Result<Option<Updates>> {
        let inner = self.inner.read()?;
        let index = match id.get().checked_sub(1) {
            Some(index) => index as usize,
            None => return Ok(None),
        };
        Ok(inner.blocks.get(index).cloned())
    }

    /// Number of committed blocks.
    pub fn block_count(&self) -> Result<usize> {
        Ok(self.inner.read()?.blocks.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn get_latest(&self, category: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let inner = self.inner.read()?;
        Ok(inner
            .latest
            .get(&(category.to_owned(), key.to_vec()))
            .and_then(KvWrite::value)
            .cloned())
    }

    async fn last_reachable_block_id(&self) -> Result<BlockId> {
        Ok(BlockId(self.inner.read()?.blocks.len() as u64))
    }

    async fn append(&self, updates: Updates) -> Result<BlockId> {
        let mut inner = self.inner.write()?;

        for (category, key, write) in updates.writes() {
            inner
                .latest
                .insert((category.to_owned(), key.to_vec()), write.clone());
        }
        inner.blocks.push(updates);

        let id = BlockId(inner.blocks.len() as u64);
        tracing::debug!(block_id = id.get(), "appended block to memory store");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(key: &[u8], value: &[u8]) -> Updates {
        let mut updates = Updates::new();
        updates.put("app", key.to_vec(), value.to_vec());
        updates
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.last_reachable_block_id().await.unwrap(), BlockId::NONE);

        let id = store.append(batch(b"k", b"v1")).await.unwrap();
        assert_eq!(id, BlockId(1));
        assert_eq!(store.last_reachable_block_id().await.unwrap(), BlockId(1));
        assert_eq!(
            store.get_latest("app", b"k").await.unwrap(),
            Some(Bytes::from_static(b"v1"))
        );
        assert_eq!(store.get_latest("other", b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_newest_version_wins() {
        let store = MemoryStore::new();
        store.append(batch(b"k", b"v1")).await.unwrap();
        store.append(batch(b"k", b"v2")).await.unwrap();
        assert_eq!(
            store.get_latest("app", b"k").await.unwrap(),
            Some(Bytes::from_static(b"v2"))
        );

        let mut delete = Updates::new();
        delete.delete("app", b"k".to_vec());
        assert_eq!(store.append(delete).await.unwrap(), BlockId(3));
        assert_eq!(store.get_latest("app", b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_keeps_block_log() {
        let store = MemoryStore::new();
        let first = batch(b"a", b"1");
        store.append(first.clone()).await.unwrap();
        store.append(Updates::new()).await.unwrap();

        assert_eq!(store.block_count().unwrap(), 2);
        assert_eq!(store.block_updates(BlockId(1)).unwrap(), Some(first));
        assert_eq!(store.block_updates(BlockId(2)).unwrap(), Some(Updates::new()));
        assert_eq!(store.block_updates(BlockId::NONE).unwrap(), None);
        assert_eq!(store.block_updates(BlockId(3)).unwrap(), None);
    }
}
