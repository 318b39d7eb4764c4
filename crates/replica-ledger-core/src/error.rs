//! Error types for the replica ledger core.

use thiserror::Error;

use crate::types::NodeId;

/// Errors raised while decoding a persisted block header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The envelope carries a storage version this build does not understand.
    /// Headers are never migrated between versions.
    #[error("unsupported block storage version: {0}")]
    UnsupportedVersion(i64),

    #[error("malformed block header: {0}")]
    MalformedHeader(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors raised while building or validating a client request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The buffer size disagrees with the lengths declared in its header.
    #[error("malformed request size: got {actual} bytes, expected {expected}")]
    MalformedSize { actual: u64, expected: u64 },

    /// The buffer does not carry a client request message code.
    #[error("unexpected message code {0}")]
    WrongMessageCode(u16),

    /// A variable section does not fit its length field.
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The request claims to come from the validating node itself.
    #[error("request sender {0} is the validating replica")]
    SelfSender(NodeId),

    /// The signing capability has no signature length for this sender.
    #[error("failed to get signature length for sender {0}")]
    SignatureLength(NodeId),

    /// The signature over the payload did not verify.
    #[error("signature verification failed for sender {sender} and request length {request_length}")]
    SignatureVerification { sender: NodeId, request_length: u32 },

    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),
}

impl RequestError {
    /// Whether the replica can drop the request and keep serving.
    ///
    /// Malformed or badly signed input from a peer is dropped. A missing
    /// signature length is a local configuration fault, and a request
    /// addressed from the replica itself means its own state is broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RequestError::MalformedSize { .. }
                | RequestError::WrongMessageCode(_)
                | RequestError::SignatureVerification { .. }
        )
    }

    /// Whether the request was well formed but its signature did not verify.
    pub fn is_hostile(&self) -> bool {
        matches!(self, RequestError::SignatureVerification { .. })
    }
}

/// Errors from the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("no signing key for sender {0}")]
    UnknownSigner(NodeId),
}
