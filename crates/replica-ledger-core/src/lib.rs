//! # Replica Ledger Core
//!
//! Pure primitives for a BFT replica's ledger: the client request wire
//! codec, block headers, and the key layout of the block store.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`ClientRequest`] - A client request in its wire form (zero-copy view)
//! - [`BlockHeader`] - Hash-linked header of a committed block
//! - [`BlockHash`] - 32-byte content hash of a header
//! - [`RequestFlags`] - Bit flags carried by every client request
//!
//! ## Encoding
//!
//! Client requests use a fixed little-endian header (see [`request`]).
//! Headers are persisted as deterministic CBOR with a storage version tag
//! (see [`canonical`]).

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod flags;
pub mod header;
pub mod keys;
pub mod request;
pub mod signing;
pub mod types;

pub use crypto::{Blake3Digest, DigestGenerator, Ed25519PublicKey, Keypair};
pub use error::{CryptoError, HeaderError, RequestError};
pub use flags::RequestFlags;
pub use header::{BlockHeader, BlockHeaderBuilder, BLOCK_STORAGE_VERSION};
pub use keys::{block_hash_key, block_header_key, KeyTag};
pub use request::{
    ClientRequest, ClientRequestBuilder, ClientRequestHeader, ValidationContext,
    CLIENT_REQUEST_MSG_CODE,
};
pub use signing::{ClientKeyRegistry, Ed25519Signer, RequestSigner, SignatureVerifier};
pub use types::{BlockHash, BlockId, NodeId};
