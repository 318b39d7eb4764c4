//! Golden test vectors for deterministic verification.
//!
//! Header hashes and request wire bytes must be identical on every replica,
//! whatever the build. These vectors pin both.

use serde::Serialize;

use replica_ledger_core::crypto::Keypair;
use replica_ledger_core::{
    BlockHash, BlockHeader, ClientRequest, Ed25519Signer, NodeId, RequestError, RequestFlags,
};

/// Client id used by the request vectors.
pub const GOLDEN_CLIENT: NodeId = NodeId(5);

/// Signing seed of [`GOLDEN_CLIENT`].
pub const GOLDEN_SEED: [u8; 32] = [0x42; 32];

/// Public key derived from [`GOLDEN_SEED`].
pub const GOLDEN_PUBLIC_KEY: &str =
    "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12";

/// Hash of the genesis header.
pub const GENESIS_HASH: &str = "1d479d4d83d0647c7f16e6f042ada82938dfc34ecf8aed15d0cb222cf24f1166";

/// What a vector computes.
#[derive(Debug, Clone, Copy)]
pub enum VectorKind {
    /// Hex of the header's content hash.
    HeaderHash(fn() -> BlockHeader),
    /// Hex of the request's wire bytes.
    RequestBytes(fn() -> Result<ClientRequest, RequestError>),
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub kind: VectorKind,
    /// Expected output (hex).
    pub expected: &'static str,
}

impl GoldenVector {
    /// Compute the vector's output as hex.
    pub fn compute(&self) -> Result<String, RequestError> {
        match self.kind {
            VectorKind::HeaderHash(header) => Ok(header().hash().to_hex()),
            VectorKind::RequestBytes(request) => Ok(hex::encode(request()?.as_bytes())),
        }
    }
}

/// Outcome of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorReport {
    pub name: String,
    pub expected: String,
    pub actual: String,
    pub matches: bool,
}

fn genesis_hash() -> BlockHash {
    BlockHeader::genesis().hash()
}

fn block_one() -> BlockHeader {
    BlockHeader::linked(1, genesis_hash())
}

fn block_two() -> BlockHeader {
    BlockHeader::linked(2, block_one().hash())
}

fn populated_header() -> BlockHeader {
    BlockHeader::builder(12)
        .timestamp(1_736_870_400)
        .parent_hash(BlockHash([0xab; 32]))
        .state_root([0x01; 32])
        .gas_limit(8_000_000)
        .gas_used(42_000)
        .add_transaction([0x02; 32])
        .add_transaction([0x03; 32])
        .extra_data([0x04; 32])
        .miner([0x05; 32])
        .nonce([0x06; 8])
        .build()
}

/// Signer for [`GOLDEN_CLIENT`].
pub fn golden_signer() -> Ed25519Signer {
    Ed25519Signer::new(GOLDEN_CLIENT, Keypair::from_seed(&GOLDEN_SEED))
}

fn unsigned_abc() -> Result<ClientRequest, RequestError> {
    ClientRequest::builder(GOLDEN_CLIENT)
        .sequence_number(42)
        .payload(&b"abc"[..])
        .correlation_id("cid1")
        .build()
}

fn signed_read_only() -> Result<ClientRequest, RequestError> {
    let signer = golden_signer();
    ClientRequest::builder(GOLDEN_CLIENT)
        .flags(RequestFlags::READ_ONLY)
        .sequence_number(43)
        .timeout_millis(5_000)
        .payload(&b"abc"[..])
        .correlation_id("cid2")
        .sign_with(&signer)
        .build()
}

fn traced_pre_process() -> Result<ClientRequest, RequestError> {
    ClientRequest::builder(GOLDEN_CLIENT)
        .flags(RequestFlags::PRE_PROCESS)
        .sequence_number(44)
        .timeout_millis(1_000)
        .payload(&b"transfer"[..])
        .correlation_id("tx-44")
        .trace_context(&b"00-trace"[..])
        .build()
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis header hash",
            kind: VectorKind::HeaderHash(BlockHeader::genesis),
            expected: GENESIS_HASH,
        },
        GoldenVector {
            name: "block 1 linked to genesis",
            kind: VectorKind::HeaderHash(block_one),
            expected: "6599f3d279b14cd1833d3aa8fab554f6a0b8f37ffb59a22f1f565e05a58db535",
        },
        GoldenVector {
            name: "block 2 linked to block 1",
            kind: VectorKind::HeaderHash(block_two),
            expected: "1524e66f944961ed9f07761ababece5545fe7bfc2a9972ad890336d1a3ce90d6",
        },
        GoldenVector {
            name: "fully populated header",
            kind: VectorKind::HeaderHash(populated_header),
            expected: "155a8026341b18472d7339b92c117c0aa2d487a656ac7c442af2d9995d69def3",
        },
        GoldenVector {
            name: "unsigned request abc/cid1",
            kind: VectorKind::RequestBytes(unsigned_abc),
            expected: "bc020000000005002a00000000000000000000000000000003000000040000\
                       61626363696431",
        },
        GoldenVector {
            name: "signed read-only request",
            kind: VectorKind::RequestBytes(signed_read_only),
            expected: "bc020000000005002b00000000000000881300000000000003000000040001\
                       61626363696432\
                       0ec9d99b3bbcf3778267e6e5f92a41f9c8c263dd90fc67e0ca4058f09c6bfd50\
                       89160f8fa2f0b07bc51d256715a4175a45a9d892e044af5fe201803cac0d560c",
        },
        GoldenVector {
            name: "pre-process request with trace context",
            kind: VectorKind::RequestBytes(traced_pre_process),
            expected: "bc020800000005002c00000000000000e8030000000000000800000005000230\
                       302d74726163657472616e7366657274782d3434",
        },
    ]
}

/// Check every vector and report the outcome.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    all_vectors()
        .iter()
        .map(|v| {
            let actual = v.compute().unwrap_or_else(|e| format!("error: {}", e));
            VectorReport {
                name: v.name.to_string(),
                expected: v.expected.to_string(),
                matches: actual == v.expected,
                actual,
            }
        })
        .collect()
}

/// Reports as pretty JSON, for comparing builds.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}
