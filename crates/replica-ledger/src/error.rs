//! Error types for the ledger.

use replica_ledger_core::{HeaderError, RequestError};
use replica_ledger_store::StoreError;
use thiserror::Error;

/// Errors raised while extending the block chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The predecessor's hash is missing or unusable. The chain cannot be
    /// extended without breaking linkage.
    #[error("chain corruption at block {number}: {reason}")]
    ChainCorruption { number: u64, reason: String },

    /// The batch already carries a header for this block, but it is a delete
    /// or does not decode.
    #[error("corrupt block header in batch for block {number}: {reason}")]
    CorruptReusedHeader { number: u64, reason: String },

    /// A stored header failed to decode on read.
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ChainError {
    /// Whether the replica must halt rather than retry the commit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainError::ChainCorruption { .. } | ChainError::CorruptReusedHeader { .. }
        )
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Client request rejected.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// Block header error.
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    /// Chain extension error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Deployment configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl LedgerError {
    /// Whether the replica must halt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Chain(e) if e.is_fatal())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
