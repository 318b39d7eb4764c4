//! Deployment configuration.

use serde::{Deserialize, Serialize};

use replica_ledger_core::{NodeId, SignatureVerifier, ValidationContext};

use crate::chain::ChainConfig;
use crate::error::Result;

/// Per-replica ledger settings, usually read from the deployment file.
///
/// Missing fields take their defaults: replica 0, signing off, headers off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// This replica's node id.
    pub replica_id: u16,
    /// Clients sign their transactions and replicas verify them.
    pub client_transaction_signing: bool,
    /// Attach a hash-linked header to every block.
    pub block_headers: bool,
}

impl LedgerConfig {
    /// Parse a JSON deployment file.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn replica(&self) -> NodeId {
        NodeId(self.replica_id)
    }

    /// Settings for the [`BlockChainExtender`](crate::BlockChainExtender).
    pub fn chain(&self) -> ChainConfig {
        ChainConfig {
            block_headers: self.block_headers,
        }
    }

    /// Context for validating incoming client requests.
    ///
    /// `verifier` is only attached when client transaction signing is on.
    pub fn validation_context<'a>(
        &self,
        verifier: &'a dyn SignatureVerifier,
    ) -> ValidationContext<'a> {
        let ctx = ValidationContext::new(self.replica());
        if self.client_transaction_signing {
            ctx.with_verifier(verifier)
        } else {
            ctx
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_ledger_core::ClientKeyRegistry;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.replica(), NodeId(0));
        assert!(!config.chain().block_headers);
        assert!(!config.client_transaction_signing);
    }

    #[test]
    fn test_from_json_partial() {
        let config = LedgerConfig::from_json(r#"{"replica_id": 3, "block_headers": true}"#).unwrap();
        assert_eq!(config.replica(), NodeId(3));
        assert!(config.chain().block_headers);
        assert!(!config.client_transaction_signing);
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(LedgerConfig::from_json(r#"{"replica_id": "three"}"#).is_err());
        assert!(LedgerConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_validation_context_follows_signing_flag() {
        let registry = ClientKeyRegistry::new();

        let unsigned = LedgerConfig {
            replica_id: 2,
            ..LedgerConfig::default()
        };
        let ctx = unsigned.validation_context(&registry);
        assert_eq!(ctx.own_id(), NodeId(2));
        assert!(!ctx.signing_enabled());

        let signed = LedgerConfig {
            client_transaction_signing: true,
            ..unsigned
        };
        assert!(signed.validation_context(&registry).signing_enabled());
    }
}
