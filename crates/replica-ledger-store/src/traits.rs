//! BlockStore trait: the abstract interface to the versioned block store.
//!
//! The ledger only ever asks three things of storage: the newest value of a
//! key, how far the chain reaches, and to commit one more block.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use replica_ledger_core::BlockId;

use crate::error::Result;
use crate::updates::Updates;

/// Async interface to a block-versioned key/value store.
///
/// Commits are serialized by the caller: `last_reachable_block_id` followed by
/// `append` is not expected to race with another `append`.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Newest value of `key` in `category`, or `None` if it was never written
    /// or its newest version is a delete.
    async fn get_latest(&self, category: &str, key: &[u8]) -> Result<Option<Bytes>>;

    /// Id of the last committed block ([`BlockId::NONE`] when empty).
    async fn last_reachable_block_id(&self) -> Result<BlockId>;

    /// Commit `updates` as the next block and return its id.
    async fn append(&self, updates: Updates) -> Result<BlockId>;
}

#[async_trait]
impl<S: BlockStore + ?Sized> BlockStore for Arc<S> {
    async fn get_latest(&self, category: &str, key: &[u8]) -> Result<Option<Bytes>> {
        (**self).get_latest(category, key).await
    }

    async fn last_reachable_block_id(&self) -> Result<BlockId> {
        (**self).last_reachable_block_id().await
    }

    async fn append(&self, updates: Updates) -> Result<BlockId> {
        (**self).append(updates).await
    }
}
