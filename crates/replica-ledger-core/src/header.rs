//! Block headers: the hash-linked spine of the ledger.
//!
//! A header is built once (through [`BlockHeader::genesis`],
//! [`BlockHeader::linked`] or [`BlockHeaderBuilder`]) and is read-only from
//! then on. Its content hash covers every field except the storage version.

use crate::canonical::{decode_header_envelope, header_envelope_bytes, header_hash_input};
use crate::crypto::{Blake3Digest, DigestGenerator};
use crate::error::HeaderError;
use crate::types::BlockHash;

/// The only header storage version this build reads or writes.
pub const BLOCK_STORAGE_VERSION: i64 = 1;

/// Size of every fixed-width hash field in a header.
pub const HASH_SIZE: usize = 32;

/// A raw 32-byte field (state root, transaction hash, extra data, miner).
pub type Hash256 = [u8; HASH_SIZE];

/// An 8-byte proof-of-work style nonce, carried opaquely.
pub type Nonce = [u8; 8];

/// The header of a committed block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    number: u64,
    timestamp: u64,
    parent_hash: BlockHash,
    state_root: Hash256,
    gas_limit: u64,
    gas_used: u64,
    transactions: Vec<Hash256>,
    extra_data: Hash256,
    miner: Hash256,
    nonce: Nonce,
}

impl BlockHeader {
    /// The genesis header: number 0, zero parent hash, every other field zero.
    pub fn genesis() -> Self {
        Self::default()
    }

    /// A header that only links `number` to its predecessor's hash.
    ///
    /// Application fields (state root, gas, transactions, ...) stay zero; this
    /// is what gets synthesized for blocks that carry no execution output.
    pub fn linked(number: u64, parent_hash: BlockHash) -> Self {
        Self {
            number,
            parent_hash,
            ..Self::default()
        }
    }

    /// Start building a fully populated header.
    pub fn builder(number: u64) -> BlockHeaderBuilder {
        BlockHeaderBuilder::new(number)
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn parent_hash(&self) -> &BlockHash {
        &self.parent_hash
    }

    pub fn state_root(&self) -> &Hash256 {
        &self.state_root
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Transaction hashes, in block order.
    pub fn transactions(&self) -> &[Hash256] {
        &self.transactions
    }

    pub fn extra_data(&self) -> &Hash256 {
        &self.extra_data
    }

    pub fn miner(&self) -> &Hash256 {
        &self.miner
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Check if this is the first block of the chain.
    pub fn is_genesis(&self) -> bool {
        self.number == 0
    }

    /// Encode into the versioned storage envelope.
    ///
    /// # Panics
    ///
    /// If the encoder produces no bytes. The envelope always carries at least
    /// the version tag, so an empty result means the encoder is broken.
    pub fn serialize(&self) -> Vec<u8> {
        let bytes = header_envelope_bytes(self);
        assert!(!bytes.is_empty(), "block header serialized to zero bytes");
        bytes
    }

    /// Decode from the versioned storage envelope.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, HeaderError> {
        decode_header_envelope(bytes)
    }

    /// Compute the content hash with the default digest (BLAKE3).
    pub fn hash(&self) -> BlockHash {
        self.hash_with(Blake3Digest::new())
    }

    /// Compute the content hash with a caller-supplied digest generator.
    pub fn hash_with<D: DigestGenerator>(&self, mut digest: D) -> BlockHash {
        digest.update(&header_hash_input(self));
        BlockHash(digest.finalize())
    }
}

/// Builder for [`BlockHeader`]. Unset fields are zero.
#[derive(Debug, Clone)]
pub struct BlockHeaderBuilder {
    header: BlockHeader,
}

impl BlockHeaderBuilder {
    pub fn new(number: u64) -> Self {
        Self {
            header: BlockHeader {
                number,
                ..BlockHeader::default()
            },
        }
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    pub fn parent_hash(mut self, parent_hash: BlockHash) -> Self {
        self.header.parent_hash = parent_hash;
        self
    }

    pub fn state_root(mut self, state_root: Hash256) -> Self {
        self.header.state_root = state_root;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.header.gas_limit = gas_limit;
        self
    }

    pub fn gas_used(mut self, gas_used: u64) -> Self {
        self.header.gas_used = gas_used;
        self
    }

    /// Append one transaction hash.
    pub fn add_transaction(mut self, txn: Hash256) -> Self {
        self.header.transactions.push(txn);
        self
    }

    /// Replace the transaction list.
    pub fn transactions(mut self, txns: Vec<Hash256>) -> Self {
        self.header.transactions = txns;
        self
    }

    pub fn extra_data(mut self, extra_data: Hash256) -> Self {
        self.header.extra_data = extra_data;
        self
    }

    pub fn miner(mut self, miner: Hash256) -> Self {
        self.header.miner = miner;
        self
    }

    pub fn nonce(mut self, nonce: Nonce) -> Self {
        self.header.nonce = nonce;
        self
    }

    pub fn build(self) -> BlockHeader {
        self.header
    }
}
