//! # Replica Ledger Store
//!
//! Storage abstraction for the replica ledger. Blocks are committed as
//! [`Updates`] batches of category-keyed writes; every key keeps its
//! per-block versions and reads see the newest one.
//!
//! ## Key Types
//!
//! - [`BlockStore`] - The async trait the ledger talks to
//! - [`Updates`] - One block's worth of pending writes
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replica_ledger_store::{BlockStore, SqliteStore, Updates};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     let mut updates = Updates::new();
//!     updates.put("app", b"key".to_vec(), b"value".to_vec());
//!     let id = store.append(updates).await.unwrap();
//!     assert_eq!(id, store.last_reachable_block_id().await.unwrap());
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod updates;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::BlockStore;
pub use updates::{CategoryUpdates, KvWrite, Updates, EXECUTION_PRIVATE_CATEGORY};
