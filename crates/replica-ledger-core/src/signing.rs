//! Client transaction signing capabilities.
//!
//! Signing is enabled for a deployment by handing a [`RequestSigner`] to the
//! request builder and a [`SignatureVerifier`] to the validation context.
//! Absence of either means signing is disabled for that side.

use std::collections::HashMap;

use crate::crypto::{Ed25519PublicKey, Keypair, ED25519_SIGNATURE_LENGTH};
use crate::error::CryptoError;
use crate::types::NodeId;

/// Client-side capability: signs request payloads.
pub trait RequestSigner: Send + Sync {
    /// Length of the signatures this signer produces for `sender`, if it can
    /// sign for that sender at all.
    fn signature_length(&self, sender: NodeId) -> Option<usize>;

    /// Sign `payload` on behalf of `sender`.
    fn sign(&self, sender: NodeId, payload: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Replica-side capability: checks request signatures.
pub trait SignatureVerifier: Send + Sync {
    /// Length of the signatures expected from `sender`, if it is known.
    fn signature_length(&self, sender: NodeId) -> Option<usize>;

    /// Check `signature` over `payload` for `sender`.
    fn verify(&self, sender: NodeId, payload: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 signer holding one client's keypair.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    client: NodeId,
    keypair: Keypair,
}

impl Ed25519Signer {
    pub fn new(client: NodeId, keypair: Keypair) -> Self {
        Self { client, keypair }
    }

    pub fn client(&self) -> NodeId {
        self.client
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

impl RequestSigner for Ed25519Signer {
    fn signature_length(&self, sender: NodeId) -> Option<usize> {
        (sender == self.client).then_some(ED25519_SIGNATURE_LENGTH)
    }

    fn sign(&self, sender: NodeId, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sender != self.client {
            return Err(CryptoError::UnknownSigner(sender));
        }
        Ok(self.keypair.sign(payload).to_vec())
    }
}

/// Registry of client public keys known to a replica.
#[derive(Debug, Clone, Default)]
pub struct ClientKeyRegistry {
    keys: HashMap<NodeId, Ed25519PublicKey>,
}

impl ClientKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the public key of a client.
    pub fn insert(&mut self, client: NodeId, key: Ed25519PublicKey) -> Option<Ed25519PublicKey> {
        self.keys.insert(client, key)
    }

    pub fn get(&self, client: NodeId) -> Option<&Ed25519PublicKey> {
        self.keys.get(&client)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<(NodeId, Ed25519PublicKey)> for ClientKeyRegistry {
    fn from_iter<I: IntoIterator<Item = (NodeId, Ed25519PublicKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl SignatureVerifier for ClientKeyRegistry {
    fn signature_length(&self, sender: NodeId) -> Option<usize> {
        self.keys.get(&sender).map(|_| ED25519_SIGNATURE_LENGTH)
    }

    fn verify(&self, sender: NodeId, payload: &[u8], signature: &[u8]) -> bool {
        match self.keys.get(&sender) {
            Some(key) => key.verify(payload, signature).is_ok(),
            None => false,
        }
    }
}
