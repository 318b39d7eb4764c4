//! Block chain extension: attaching a hash-linked header to every block.
//!
//! When header synthesis is enabled, each committed batch gains two entries in
//! the execution-private category before it reaches storage:
//!
//! - `block_header_key(N)`: the serialized header of block N, unless the
//!   batch already carries one (the execution layer produced it);
//! - `block_hash_key(N)`: the hash of that header.
//!
//! Header N is linked to block N-1 through the hash stored for N-1, so the
//! chain stays verifiable even across blocks that carry no execution output
//! (reconfiguration, internal commands).

use std::sync::Arc;

use replica_ledger_core::{block_hash_key, block_header_key, BlockHash, BlockHeader, BlockId};
use replica_ledger_store::{BlockStore, KvWrite, Updates, EXECUTION_PRIVATE_CATEGORY};

use crate::error::ChainError;

/// Chain extension settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainConfig {
    /// Attach headers and hashes to every block. When false, batches are
    /// appended unmodified.
    pub block_headers: bool,
}

impl ChainConfig {
    pub fn with_block_headers() -> Self {
        Self {
            block_headers: true,
        }
    }
}

/// Extends the chain by one block per [`add`](Self::add) call.
///
/// Commits must be serialized by the caller: the header number is derived
/// from the store's last reachable block before the append.
pub struct BlockChainExtender<S: BlockStore> {
    store: Arc<S>,
    config: ChainConfig,
}

impl<S: BlockStore> BlockChainExtender<S> {
    pub fn new(store: S, config: ChainConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create an extender over a store that is also used elsewhere.
    pub fn with_shared_store(store: Arc<S>, config: ChainConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> ChainConfig {
        self.config
    }

    /// Commit `updates` as the next block, attaching its header and hash.
    ///
    /// Returns the block id assigned by the store. A fatal error (see
    /// [`ChainError::is_fatal`]) means nothing was appended and the replica
    /// must not continue.
    pub async fn add(&self, updates: Updates) -> Result<BlockId, ChainError> {
        if !self.config.block_headers {
            return Ok(self.store.append(updates).await?);
        }

        match self.extend(updates).await {
            Ok(id) => Ok(id),
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(error = %e, "cannot extend block chain");
                }
                Err(e)
            }
        }
    }

    async fn extend(&self, mut updates: Updates) -> Result<BlockId, ChainError> {
        let number = self.store.last_reachable_block_id().await?.next_header_number();
        let header_key = block_header_key(number);

        let hash = match reused_header(number, &updates, &header_key)? {
            Some(header) => {
                self.check_reused_linkage(number, &header).await?;
                let hash = header.hash();
                tracing::debug!(number, hash = %hash, "using block header from batch");
                hash
            }
            None => {
                let header = self.synthesize(number).await?;
                let hash = header.hash();
                tracing::debug!(
                    number,
                    hash = %hash,
                    parent = %header.parent_hash(),
                    "synthesized block header"
                );
                updates.put(EXECUTION_PRIVATE_CATEGORY, header_key, header.serialize());
                hash
            }
        };

        updates.put(
            EXECUTION_PRIVATE_CATEGORY,
            block_hash_key(number),
            hash.as_bytes().to_vec(),
        );

        let id = self.store.append(updates).await?;
        tracing::debug!(number, block_id = id.get(), "appended block with header hash");
        Ok(id)
    }

    /// Build the header for a block that has none, linked to its predecessor.
    async fn synthesize(&self, number: u64) -> Result<BlockHeader, ChainError> {
        if number == 0 {
            return Ok(BlockHeader::genesis());
        }
        let parent_hash = self.stored_parent_hash(number).await?;
        Ok(BlockHeader::linked(number, parent_hash))
    }

    async fn stored_parent_hash(&self, number: u64) -> Result<BlockHash, ChainError> {
        let parent = number - 1;
        self.read_hash(number, parent)
            .await?
            .ok_or_else(|| ChainError::ChainCorruption {
                number,
                reason: format!("no hash stored for block {}", parent),
            })
    }

    /// Read the hash stored for `stored`, reporting corruption against block
    /// `number`.
    async fn read_hash(&self, number: u64, stored: u64) -> Result<Option<BlockHash>, ChainError> {
        let Some(raw) = self
            .store
            .get_latest(EXECUTION_PRIVATE_CATEGORY, &block_hash_key(stored))
            .await?
        else {
            return Ok(None);
        };

        BlockHash::try_from(raw.as_ref())
            .map(Some)
            .map_err(|_| ChainError::ChainCorruption {
                number,
                reason: format!(
                    "hash stored for block {} is {} bytes, expected 32",
                    stored,
                    raw.len()
                ),
            })
    }

    /// Warn when a header supplied with the batch does not continue the chain.
    ///
    /// The header is still persisted as given.
    async fn check_reused_linkage(&self, number: u64, header: &BlockHeader) -> Result<(), ChainError> {
        let expected_parent = if number == 0 {
            Some(BlockHash::ZERO)
        } else {
            self.read_hash(number, number - 1).await?
        };
        if let Some(reason) = linkage_mismatch(number, header, expected_parent.as_ref()) {
            tracing::warn!(
                number,
                header_number = header.number(),
                parent = %header.parent_hash(),
                "{}",
                reason
            );
        }
        Ok(())
    }

    /// Read back the header stored for block `number`.
    pub async fn stored_header(&self, number: u64) -> Result<Option<BlockHeader>, ChainError> {
        match self
            .store
            .get_latest(EXECUTION_PRIVATE_CATEGORY, &block_header_key(number))
            .await?
        {
            Some(raw) => Ok(Some(BlockHeader::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read back the hash stored for block `number`.
    ///
    /// A stored value that is not a 32-byte hash is a
    /// [`ChainError::ChainCorruption`].
    pub async fn stored_hash(&self, number: u64) -> Result<Option<BlockHash>, ChainError> {
        self.read_hash(number, number).await
    }
}

/// Describe how `header` fails to follow block `number - 1`, if it does.
///
/// `expected_parent` is `None` when no hash is stored for the predecessor.
fn linkage_mismatch(
    number: u64,
    header: &BlockHeader,
    expected_parent: Option<&BlockHash>,
) -> Option<String> {
    if header.number() != number {
        return Some(format!(
            "batch header is numbered {}, expected {}",
            header.number(),
            number
        ));
    }
    match expected_parent {
        None => Some(format!("no hash stored for the block before {}", number)),
        Some(parent) if parent != header.parent_hash() => Some(format!(
            "batch header parent {} does not match stored hash {}",
            header.parent_hash(),
            parent
        )),
        Some(_) => None,
    }
}

fn reused_header(
    number: u64,
    updates: &Updates,
    header_key: &[u8],
) -> Result<Option<BlockHeader>, ChainError> {
    match updates.get(EXECUTION_PRIVATE_CATEGORY, header_key) {
        None => Ok(None),
        Some(KvWrite::Delete) => Err(ChainError::CorruptReusedHeader {
            number,
            reason: "header entry is a delete".to_string(),
        }),
        Some(KvWrite::Put(raw)) => BlockHeader::deserialize(raw)
            .map(Some)
            .map_err(|e| ChainError::CorruptReusedHeader {
                number,
                reason: e.to_string(),
            }),
    }
}
