//! Proptest generators for property-based testing.

use proptest::prelude::*;

use replica_ledger_core::crypto::Keypair;
use replica_ledger_core::header::Hash256;
use replica_ledger_core::{
    BlockHash, BlockHeader, ClientRequest, Ed25519Signer, NodeId, RequestError, RequestFlags,
};

/// Node ids of clients. Never 0, which the generators reserve for the replica.
pub fn client_id() -> impl Strategy<Value = NodeId> {
    (1u16..=u16::MAX).prop_map(NodeId)
}

/// Any combination of request flags.
pub fn request_flags() -> impl Strategy<Value = RequestFlags> {
    any::<u8>().prop_map(RequestFlags::from_byte)
}

/// Generate a random payload.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Correlation ids as clients tend to send them.
pub fn correlation_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9-]{0,40}".prop_map(String::from)
}

pub fn hash256() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>()
}

pub fn block_hash() -> impl Strategy<Value = BlockHash> {
    any::<[u8; 32]>().prop_map(BlockHash)
}

/// Parameters for generating a client request.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub sender: NodeId,
    pub seq_num: u64,
    pub timeout_millis: u64,
    pub flags: RequestFlags,
    pub payload: Vec<u8>,
    pub correlation_id: String,
    pub trace_context: Vec<u8>,
    /// Signing key seed; `None` builds an unsigned request.
    pub signing_seed: Option<[u8; 32]>,
}

impl Arbitrary for RequestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            client_id(),
            any::<u64>(),
            0u64..=600_000u64, // timeout
            request_flags(),
            payload(512),
            correlation_id(),
            payload(64), // trace context
            any::<Option<[u8; 32]>>(),
        )
            .prop_map(
                |(sender, seq_num, timeout_millis, flags, payload, cid, trace, seed)| RequestParams {
                    sender,
                    seq_num,
                    timeout_millis,
                    flags,
                    payload,
                    correlation_id: cid,
                    trace_context: trace,
                    signing_seed: seed,
                },
            )
            .boxed()
    }
}

impl RequestParams {
    pub fn signer(&self) -> Option<Ed25519Signer> {
        self.signing_seed
            .map(|seed| Ed25519Signer::new(self.sender, Keypair::from_seed(&seed)))
    }
}

/// Build a request from parameters.
pub fn request_from_params(params: &RequestParams) -> Result<ClientRequest, RequestError> {
    let builder = ClientRequest::builder(params.sender)
        .sequence_number(params.seq_num)
        .timeout_millis(params.timeout_millis)
        .flags(params.flags)
        .payload(params.payload.clone())
        .correlation_id(params.correlation_id.clone())
        .trace_context(params.trace_context.clone());

    match params.signer() {
        Some(signer) => builder.sign_with(&signer).build(),
        None => builder.build(),
    }
}

/// Parameters for generating a block header.
#[derive(Debug, Clone)]
pub struct HeaderParams {
    pub number: u64,
    pub timestamp: u64,
    pub parent_hash: BlockHash,
    pub state_root: Hash256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub transactions: Vec<Hash256>,
    pub extra_data: Hash256,
    pub miner: Hash256,
    pub nonce: [u8; 8],
}

impl Arbitrary for HeaderParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            (any::<u64>(), any::<u64>(), block_hash(), hash256()),
            (any::<u64>(), any::<u64>()),
            prop::collection::vec(hash256(), 0..8),
            (hash256(), hash256(), any::<[u8; 8]>()),
        )
            .prop_map(
                |(
                    (number, timestamp, parent_hash, state_root),
                    (gas_limit, gas_used),
                    transactions,
                    (extra_data, miner, nonce),
                )| {
                    HeaderParams {
                        number,
                        timestamp,
                        parent_hash,
                        state_root,
                        gas_limit,
                        gas_used,
                        transactions,
                        extra_data,
                        miner,
                        nonce,
                    }
                },
            )
            .boxed()
    }
}

/// Build a header from parameters.
pub fn header_from_params(params: &HeaderParams) -> BlockHeader {
    BlockHeader::builder(params.number)
        .timestamp(params.timestamp)
        .parent_hash(params.parent_hash)
        .state_root(params.state_root)
        .gas_limit(params.gas_limit)
        .gas_used(params.gas_used)
        .transactions(params.transactions.clone())
        .extra_data(params.extra_data)
        .miner(params.miner)
        .nonce(params.nonce)
        .build()
}
