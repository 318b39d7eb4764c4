//! Storage key derivation for block headers and header hashes.
//!
//! Every key is a one-byte category tag followed by the 8-byte little-endian
//! block number. Tags are persisted; never renumber them.

/// One-byte key-space tags used in the execution-private category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyTag {
    /// Block number -> serialized [`BlockHeader`](crate::header::BlockHeader).
    BlockHeader = 0x23,
    /// Block number -> 32-byte header content hash.
    BlockHash = 0x24,
}

impl KeyTag {
    /// All tags, for uniqueness checks.
    pub const ALL: [KeyTag; 2] = [KeyTag::BlockHeader, KeyTag::BlockHash];

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.to_u8() == value)
    }
}

/// Length of every key produced by this module.
pub const BLOCK_KEY_LEN: usize = 1 + 8;

/// Key for "hash of block `number`".
pub fn block_hash_key(number: u64) -> Vec<u8> {
    tagged_key(KeyTag::BlockHash, &number.to_le_bytes())
}

/// Key for "header of block `number`".
pub fn block_header_key(number: u64) -> Vec<u8> {
    tagged_key(KeyTag::BlockHeader, &number.to_le_bytes())
}

/// Prefix raw block-number bytes with a tag.
pub fn tagged_key(tag: KeyTag, number_bytes: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + number_bytes.len());
    key.push(tag.to_u8());
    key.extend_from_slice(number_bytes);
    key
}

/// Split a derived key back into its tag and block number.
pub fn parse_block_key(key: &[u8]) -> Option<(KeyTag, u64)> {
    if key.len() != BLOCK_KEY_LEN {
        return None;
    }
    let tag = KeyTag::from_u8(key[0])?;
    let number = u64::from_le_bytes(key[1..].try_into().ok()?);
    Some((tag, number))
}
