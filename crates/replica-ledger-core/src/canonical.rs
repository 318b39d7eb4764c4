//! Canonical encodings of a block header.
//!
//! Two distinct byte sequences are derived from a header:
//!
//! - the **envelope**: deterministic CBOR (RFC 8949 core deterministic
//!   encoding) carrying the storage version tag and every field. This is what
//!   gets persisted under the block's header key.
//! - the **hash input**: a flat concatenation of the fields without the
//!   version tag. The content hash is computed over this, so a header keeps
//!   its hash if the storage envelope ever changes.
//!
//! Integers in the hash input are 8-byte little-endian; fixed-size byte
//! fields are appended raw.

use ciborium::value::Value;
use std::io::Cursor;

use crate::error::HeaderError;
use crate::header::{BlockHeader, Hash256, BLOCK_STORAGE_VERSION};
use crate::types::BlockHash;

/// Envelope field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const NUMBER: u64 = 1;
    pub const TIMESTAMP: u64 = 2;
    pub const PARENT_HASH: u64 = 3;
    pub const STATE_ROOT: u64 = 4;
    pub const GAS_LIMIT: u64 = 5;
    pub const GAS_USED: u64 = 6;
    pub const TRANSACTIONS: u64 = 7;
    pub const EXTRA_DATA: u64 = 8;
    pub const MINER: u64 = 9;
    pub const NONCE: u64 = 10;
}

/// Encode a header into its versioned storage envelope.
pub fn header_envelope_bytes(header: &BlockHeader) -> Vec<u8> {
    encode_header_envelope(header, BLOCK_STORAGE_VERSION)
}

/// Encode a header under an explicit version tag.
pub(crate) fn encode_header_envelope(header: &BlockHeader, version: i64) -> Vec<u8> {
    let value = header_to_cbor_value(header, version);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

/// Build the byte sequence the content hash is computed over.
pub fn header_hash_input(header: &BlockHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 * 4 + 32 * (4 + header.transactions().len()) + 8);
    buf.extend_from_slice(&header.number().to_le_bytes());
    buf.extend_from_slice(&header.timestamp().to_le_bytes());
    buf.extend_from_slice(header.parent_hash().as_bytes());
    buf.extend_from_slice(header.state_root());
    buf.extend_from_slice(&header.gas_limit().to_le_bytes());
    buf.extend_from_slice(&header.gas_used().to_le_bytes());
    for txn in header.transactions() {
        buf.extend_from_slice(txn);
    }
    buf.extend_from_slice(header.extra_data());
    buf.extend_from_slice(header.miner());
    buf.extend_from_slice(header.nonce());
    buf
}

/// Convert a header to a CBOR Value (map with integer keys).
fn header_to_cbor_value(header: &BlockHeader, version: i64) -> Value {
    let transactions: Vec<Value> = header
        .transactions()
        .iter()
        .map(|t| Value::Bytes(t.to_vec()))
        .collect();

    // Entries in key order 0-10
    let entries = vec![
        (Value::Integer(keys::VERSION.into()), Value::Integer(version.into())),
        (Value::Integer(keys::NUMBER.into()), Value::Integer(header.number().into())),
        (
            Value::Integer(keys::TIMESTAMP.into()),
            Value::Integer(header.timestamp().into()),
        ),
        (
            Value::Integer(keys::PARENT_HASH.into()),
            Value::Bytes(header.parent_hash().0.to_vec()),
        ),
        (
            Value::Integer(keys::STATE_ROOT.into()),
            Value::Bytes(header.state_root().to_vec()),
        ),
        (
            Value::Integer(keys::GAS_LIMIT.into()),
            Value::Integer(header.gas_limit().into()),
        ),
        (
            Value::Integer(keys::GAS_USED.into()),
            Value::Integer(header.gas_used().into()),
        ),
        (Value::Integer(keys::TRANSACTIONS.into()), Value::Array(transactions)),
        (
            Value::Integer(keys::EXTRA_DATA.into()),
            Value::Bytes(header.extra_data().to_vec()),
        ),
        (Value::Integer(keys::MINER.into()), Value::Bytes(header.miner().to_vec())),
        (Value::Integer(keys::NONCE.into()), Value::Bytes(header.nonce().to_vec())),
    ];

    Value::Map(entries)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        _ => unreachable!("header envelopes only contain integers, byte strings, arrays and maps"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode an array (major type 4). The length prefix is always definite.
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode a header from its storage envelope.
///
/// The version tag is checked before any other field; a mismatch is
/// reported as [`HeaderError::UnsupportedVersion`] and never migrated.
pub fn decode_header_envelope(bytes: &[u8]) -> Result<BlockHeader, HeaderError> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| HeaderError::DecodingError(e.to_string()))?;

    if cursor.position() as usize != bytes.len() {
        return Err(HeaderError::MalformedHeader("trailing bytes after envelope".into()));
    }

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(HeaderError::MalformedHeader("expected map".into())),
    };

    let get = |key: u64| {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let version = match get(keys::VERSION) {
        Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
            .map_err(|_| HeaderError::MalformedHeader("version out of range".into()))?,
        _ => return Err(HeaderError::MalformedHeader("missing version".into())),
    };
    if version != BLOCK_STORAGE_VERSION {
        return Err(HeaderError::UnsupportedVersion(version));
    }

    let uint = |key: u64, name: &str| -> Result<u64, HeaderError> {
        match get(key) {
            Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
                .map_err(|_| HeaderError::MalformedHeader(format!("{} out of range", name))),
            _ => Err(HeaderError::MalformedHeader(format!("missing {}", name))),
        }
    };

    let hash = |key: u64, name: &str| -> Result<Hash256, HeaderError> {
        match get(key) {
            Some(Value::Bytes(b)) => fixed_bytes(b)
                .ok_or_else(|| HeaderError::MalformedHeader(format!("invalid {}", name))),
            _ => Err(HeaderError::MalformedHeader(format!("missing {}", name))),
        }
    };

    let transactions = match get(keys::TRANSACTIONS) {
        Some(Value::Array(arr)) => {
            let mut txns: Vec<Hash256> = Vec::with_capacity(arr.len());
            for item in arr {
                match item {
                    Value::Bytes(b) => txns.push(
                        fixed_bytes(b)
                            .ok_or_else(|| HeaderError::MalformedHeader("invalid transaction".into()))?,
                    ),
                    _ => return Err(HeaderError::MalformedHeader("invalid transaction".into())),
                }
            }
            txns
        }
        _ => return Err(HeaderError::MalformedHeader("missing transactions".into())),
    };

    let nonce: [u8; 8] = match get(keys::NONCE) {
        Some(Value::Bytes(b)) => {
            fixed_bytes(b).ok_or_else(|| HeaderError::MalformedHeader("invalid nonce".into()))?
        }
        _ => return Err(HeaderError::MalformedHeader("missing nonce".into())),
    };

    Ok(BlockHeader::builder(uint(keys::NUMBER, "number")?)
        .timestamp(uint(keys::TIMESTAMP, "timestamp")?)
        .parent_hash(BlockHash(hash(keys::PARENT_HASH, "parent_hash")?))
        .state_root(hash(keys::STATE_ROOT, "state_root")?)
        .gas_limit(uint(keys::GAS_LIMIT, "gas_limit")?)
        .gas_used(uint(keys::GAS_USED, "gas_used")?)
        .transactions(transactions)
        .extra_data(hash(keys::EXTRA_DATA, "extra_data")?)
        .miner(hash(keys::MINER, "miner")?)
        .nonce(nonce)
        .build())
}

fn fixed_bytes<const N: usize>(b: &[u8]) -> Option<[u8; N]> {
    b.try_into().ok()
}
