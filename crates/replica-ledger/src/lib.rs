//! # Replica Ledger
//!
//! The ledger half of a BFT replica: validating client requests as they come
//! off the wire, and committing blocks as a hash-linked chain.
//!
//! ## Overview
//!
//! - **Client requests**: a fixed little-endian wire layout, optionally
//!   signed by the client. Validation rejects mis-sized, self-addressed and
//!   badly signed requests before they reach ordering.
//! - **Block headers**: every committed block carries a header whose parent
//!   hash is the hash of the previous block's header.
//! - **Chain extension**: [`BlockChainExtender`] attaches the header and its
//!   hash to each batch before the store commits it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replica_ledger::{BlockChainExtender, LedgerConfig};
//! use replica_ledger::store::{SqliteStore, Updates};
//!
//! async fn example() {
//!     let config = LedgerConfig::from_json(r#"{"replica_id": 1, "block_headers": true}"#).unwrap();
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let extender = BlockChainExtender::new(store, config.chain());
//!
//!     let mut updates = Updates::new();
//!     updates.put("app", b"key".to_vec(), b"value".to_vec());
//!     let block_id = extender.add(updates).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `replica_ledger::core` - Wire codec, headers, keys, signing
//! - `replica_ledger::store` - Storage abstraction and SQLite

pub mod chain;
pub mod config;
pub mod error;

// Re-export component crates
pub use replica_ledger_core as core;
pub use replica_ledger_store as store;

pub use chain::{BlockChainExtender, ChainConfig};
pub use config::LedgerConfig;
pub use error::{ChainError, LedgerError, Result};

// Re-export commonly used core types
pub use replica_ledger_core::{
    BlockHash, BlockHeader, BlockId, ClientKeyRegistry, ClientRequest, Ed25519Signer, NodeId,
    RequestFlags, RequestSigner, SignatureVerifier, ValidationContext,
};
