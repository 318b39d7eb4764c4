//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use replica_ledger::{BlockChainExtender, ChainConfig, LedgerConfig};
use replica_ledger_core::crypto::Keypair;
use replica_ledger_core::{
    BlockHash, BlockHeader, ClientKeyRegistry, ClientRequest, Ed25519Signer, NodeId,
    RequestError, RequestFlags, ValidationContext,
};
use replica_ledger_store::MemoryStore;

/// A replica plus a set of clients with deterministic keys.
pub struct TestFixture {
    pub replica: NodeId,
    pub clients: Vec<Ed25519Signer>,
    pub registry: ClientKeyRegistry,
}

impl TestFixture {
    /// Replica 0 with `client_count` clients numbered from 1.
    pub fn new(client_count: usize) -> Self {
        let clients: Vec<Ed25519Signer> = (0..client_count)
            .map(|i| {
                let id = NodeId(i as u16 + 1);
                Ed25519Signer::new(id, Keypair::from_seed(&client_seed(id)))
            })
            .collect();
        let registry = clients.iter().map(|c| (c.client(), c.public_key())).collect();

        Self {
            replica: NodeId(0),
            clients,
            registry,
        }
    }

    pub fn client(&self, index: usize) -> &Ed25519Signer {
        &self.clients[index]
    }

    /// Deployment config for this replica.
    pub fn config(&self, signing: bool, block_headers: bool) -> LedgerConfig {
        LedgerConfig {
            replica_id: self.replica.get(),
            client_transaction_signing: signing,
            block_headers,
        }
    }

    /// Validation context for this replica.
    pub fn validation_context(&self, signing: bool) -> ValidationContext<'_> {
        let ctx = ValidationContext::new(self.replica);
        if signing {
            ctx.with_verifier(&self.registry)
        } else {
            ctx
        }
    }

    /// An unsigned write request from client `index`.
    pub fn unsigned_request(
        &self,
        index: usize,
        seq: u64,
        payload: &[u8],
    ) -> Result<ClientRequest, RequestError> {
        let client = self.client(index).client();
        ClientRequest::builder(client)
            .sequence_number(seq)
            .timeout_millis(1_000)
            .payload(payload.to_vec())
            .correlation_id(format!("{}-{}", client, seq))
            .build()
    }

    /// A signed write request from client `index`.
    pub fn signed_request(
        &self,
        index: usize,
        seq: u64,
        payload: &[u8],
    ) -> Result<ClientRequest, RequestError> {
        let signer = self.client(index);
        ClientRequest::builder(signer.client())
            .sequence_number(seq)
            .timeout_millis(1_000)
            .payload(payload.to_vec())
            .correlation_id(format!("{}-{}", signer.client(), seq))
            .sign_with(signer)
            .build()
    }

    /// A signed read-only request from client `index`.
    pub fn read_only_request(
        &self,
        index: usize,
        seq: u64,
        query: &[u8],
    ) -> Result<ClientRequest, RequestError> {
        let signer = self.client(index);
        ClientRequest::builder(signer.client())
            .flags(RequestFlags::READ_ONLY)
            .sequence_number(seq)
            .payload(query.to_vec())
            .sign_with(signer)
            .build()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Seed of a fixture client's keypair.
pub fn client_seed(client: NodeId) -> [u8; 32] {
    let mut seed = [0x5c; 32];
    seed[..2].copy_from_slice(&client.get().to_le_bytes());
    seed
}

/// Extender over a fresh memory store.
pub fn memory_extender(block_headers: bool) -> BlockChainExtender<MemoryStore> {
    BlockChainExtender::new(MemoryStore::new(), ChainConfig { block_headers })
}

/// A header with every field set, as the execution layer would produce it.
pub fn executed_header(number: u64, parent_hash: BlockHash) -> BlockHeader {
    let fill = |tag: u8| {
        let mut raw = [tag; 32];
        raw[..8].copy_from_slice(&number.to_le_bytes());
        raw
    };
    BlockHeader::builder(number)
        .timestamp(1_736_870_400 + number)
        .parent_hash(parent_hash)
        .state_root(fill(0x01))
        .gas_limit(30_000_000)
        .gas_used(21_000 * (number % 7))
        .add_transaction(fill(0x02))
        .add_transaction(fill(0x03))
        .extra_data(fill(0x04))
        .miner(fill(0x05))
        .nonce(number.to_be_bytes())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_ledger_core::{BlockId, RequestSigner};
    use replica_ledger_store::{BlockStore, Updates, EXECUTION_PRIVATE_CATEGORY};

    #[test]
    fn test_fixture_clients_are_deterministic() {
        let a = TestFixture::new(2);
        let b = TestFixture::new(2);
        assert_eq!(a.client(1).public_key(), b.client(1).public_key());
        assert_ne!(a.client(0).public_key(), a.client(1).public_key());
        assert_eq!(a.registry.len(), 2);
    }

    #[test]
    fn test_fixture_requests_validate() {
        let fixture = TestFixture::default();

        let unsigned = fixture.unsigned_request(0, 1, b"put k v").unwrap();
        unsigned.validate(&fixture.validation_context(false)).unwrap();

        let signed = fixture.signed_request(2, 9, b"put k v").unwrap();
        signed.validate(&fixture.validation_context(true)).unwrap();
        assert_eq!(signed.correlation_id(), "3-9");

        let query = fixture.read_only_request(1, 2, b"get k").unwrap();
        assert!(query.is_read_only());
        query.validate(&fixture.validation_context(true)).unwrap();
    }

    #[test]
    fn test_requests_from_other_clients_do_not_verify() {
        let fixture = TestFixture::new(2);
        let forged = ClientRequest::builder(fixture.client(0).client())
            .payload(b"steal".to_vec())
            .build()
            .unwrap();
        let signature = fixture
            .client(1)
            .sign(fixture.client(1).client(), forged.payload())
            .unwrap();

        let mut raw = forged.as_bytes().to_vec();
        raw.extend_from_slice(&signature);
        let forged = ClientRequest::from_bytes(raw).unwrap();

        let err = forged.validate(&fixture.validation_context(true)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_executed_headers_extend_chain() {
        let extender = memory_extender(true);
        extender.add(Updates::new()).await.unwrap();
        let parent = extender.stored_hash(0).await.unwrap().unwrap();

        let header = executed_header(1, parent);
        let mut batch = Updates::new();
        batch.put(
            EXECUTION_PRIVATE_CATEGORY,
            replica_ledger_core::block_header_key(1),
            header.serialize(),
        );
        assert_eq!(extender.add(batch).await.unwrap(), BlockId(2));
        assert_eq!(extender.store().last_reachable_block_id().await.unwrap(), BlockId(2));
        assert_eq!(extender.stored_hash(1).await.unwrap(), Some(header.hash()));
    }
}
