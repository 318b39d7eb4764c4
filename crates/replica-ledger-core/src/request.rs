//! Client request wire codec.
//!
//! A request is one self-describing buffer:
//!
//! ```text
//! offset size field
//! 0      2    message code (700)
//! 2      4    trace-context length
//! 6      2    sender id
//! 8      8    request sequence number
//! 16     8    timeout (ms)
//! 24     4    request (payload) length
//! 28     2    correlation-id length
//! 30     1    flags
//! 31     ..   trace-context | payload | correlation-id | signature
//! ```
//!
//! All integers are little-endian. The signature is present only when the
//! deployment signs client transactions; its length is not on the wire and
//! comes from the signing capability for the sender.
//!
//! [`ClientRequest`] owns an immutable [`Bytes`] buffer. Parsing a received
//! buffer never copies it, and every accessor is an O(1) view.

use std::borrow::Cow;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::RequestError;
use crate::flags::RequestFlags;
use crate::signing::{RequestSigner, SignatureVerifier};
use crate::types::NodeId;

/// Message code of a client request in the shared message envelope.
pub const CLIENT_REQUEST_MSG_CODE: u16 = 700;

/// Size of the fixed request header, envelope included.
pub const HEADER_SIZE: usize = 31;

/// Fixed 31-byte request header (little-endian).
///
/// Fields are raw byte arrays so the packed layout has no alignment
/// requirements and every bit pattern is a valid header. Parsing casts the
/// received bytes in place.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ClientRequestHeader {
    msg_code: [u8; 2],
    trace_len: [u8; 4],
    sender_id: [u8; 2],
    seq_num: [u8; 8],
    timeout_millis: [u8; 8],
    request_len: [u8; 4],
    cid_len: [u8; 2],
    flags: u8,
}

const _: () = assert!(std::mem::size_of::<ClientRequestHeader>() == HEADER_SIZE);

impl ClientRequestHeader {
    pub const SIZE: usize = HEADER_SIZE;

    /// A header for `sender` with every other field zeroed.
    pub fn new(sender: NodeId) -> Self {
        Self {
            msg_code: CLIENT_REQUEST_MSG_CODE.to_le_bytes(),
            trace_len: [0; 4],
            sender_id: sender.get().to_le_bytes(),
            seq_num: [0; 8],
            timeout_millis: [0; 8],
            request_len: [0; 4],
            cid_len: [0; 2],
            flags: 0,
        }
    }

    /// View the leading bytes of `bytes` as a header without copying.
    ///
    /// Returns `None` if `bytes` is shorter than [`Self::SIZE`].
    pub fn from_prefix(bytes: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(bytes).ok().map(|(header, _)| header)
    }

    /// Mutable view of the leading bytes of `bytes`.
    pub fn from_prefix_mut(bytes: &mut [u8]) -> Option<&mut Self> {
        Self::mut_from_prefix(bytes).ok().map(|(header, _)| header)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut arr = [0u8; HEADER_SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    pub fn msg_code(&self) -> u16 {
        u16::from_le_bytes(self.msg_code)
    }

    pub fn sender_id(&self) -> NodeId {
        NodeId(u16::from_le_bytes(self.sender_id))
    }

    pub fn sequence_number(&self) -> u64 {
        u64::from_le_bytes(self.seq_num)
    }

    pub fn timeout_millis(&self) -> u64 {
        u64::from_le_bytes(self.timeout_millis)
    }

    pub fn flags(&self) -> RequestFlags {
        RequestFlags::from_byte(self.flags)
    }

    pub fn trace_context_length(&self) -> u32 {
        u32::from_le_bytes(self.trace_len)
    }

    pub fn request_length(&self) -> u32 {
        u32::from_le_bytes(self.request_len)
    }

    pub fn correlation_id_length(&self) -> u16 {
        u16::from_le_bytes(self.cid_len)
    }

    /// Header plus the declared trace context, payload and correlation id.
    pub fn declared_size(&self) -> u64 {
        HEADER_SIZE as u64
            + self.trace_context_length() as u64
            + self.request_length() as u64
            + self.correlation_id_length() as u64
    }

    pub fn set_msg_code(&mut self, code: u16) {
        self.msg_code = code.to_le_bytes();
    }

    pub fn set_sequence_number(&mut self, seq_num: u64) {
        self.seq_num = seq_num.to_le_bytes();
    }

    pub fn set_timeout_millis(&mut self, timeout: u64) {
        self.timeout_millis = timeout.to_le_bytes();
    }

    pub fn set_flags(&mut self, flags: RequestFlags) {
        self.flags = flags.to_byte();
    }

    pub fn set_trace_context_length(&mut self, len: u32) {
        self.trace_len = len.to_le_bytes();
    }

    pub fn set_request_length(&mut self, len: u32) {
        self.request_len = len.to_le_bytes();
    }

    pub fn set_correlation_id_length(&mut self, len: u16) {
        self.cid_len = len.to_le_bytes();
    }
}

impl fmt::Debug for ClientRequestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRequestHeader")
            .field("msg_code", &self.msg_code())
            .field("sender", &self.sender_id())
            .field("seq_num", &self.sequence_number())
            .field("timeout_millis", &self.timeout_millis())
            .field("flags", &self.flags())
            .field("trace_len", &self.trace_context_length())
            .field("request_len", &self.request_length())
            .field("cid_len", &self.correlation_id_length())
            .finish()
    }
}

/// End offsets of the variable sections, clamped to the buffer length.
///
/// Clamping keeps accessors panic-free on buffers whose declared lengths
/// overrun them; such buffers fail [`ClientRequest::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sections {
    trace_end: usize,
    payload_end: usize,
    cid_end: usize,
}

impl Sections {
    fn compute(header: &ClientRequestHeader, len: usize) -> Self {
        let clamp = |start: usize, section: u64| -> usize {
            (start as u64).saturating_add(section).min(len as u64) as usize
        };
        let trace_end = clamp(HEADER_SIZE, header.trace_context_length() as u64);
        let payload_end = clamp(trace_end, header.request_length() as u64);
        let cid_end = clamp(payload_end, header.correlation_id_length() as u64);
        Self {
            trace_end,
            payload_end,
            cid_end,
        }
    }
}

/// A client request message.
#[derive(Clone)]
pub struct ClientRequest {
    buf: Bytes,
    header: ClientRequestHeader,
    sections: Sections,
}

impl ClientRequest {
    /// Start building a request from its fields.
    pub fn builder(sender: NodeId) -> ClientRequestBuilder<'static> {
        ClientRequestBuilder::new(sender)
    }

    /// A header-only placeholder request: no payload, no correlation id,
    /// no trace context, all flags cleared.
    pub fn empty(sender: NodeId) -> Self {
        let header = ClientRequestHeader::new(sender);
        Self::from_parts(Bytes::copy_from_slice(&header.to_bytes()), header)
    }

    /// Wrap a received buffer without copying it.
    ///
    /// Only the fixed header and message code are checked here; the declared
    /// section lengths are checked by [`validate`](Self::validate).
    pub fn from_bytes(buf: impl Into<Bytes>) -> Result<Self, RequestError> {
        let buf = buf.into();
        let header = *ClientRequestHeader::from_prefix(&buf).ok_or(RequestError::MalformedSize {
            actual: buf.len() as u64,
            expected: HEADER_SIZE as u64,
        })?;
        if header.msg_code() != CLIENT_REQUEST_MSG_CODE {
            return Err(RequestError::WrongMessageCode(header.msg_code()));
        }
        Ok(Self::from_parts(buf, header))
    }

    /// Size implied by a raw header: fixed header plus trace context, payload
    /// and correlation id. The signature, if any, is not included.
    ///
    /// Returns `None` if `raw` is shorter than the fixed header.
    pub fn declared_size(raw: &[u8]) -> Option<u64> {
        ClientRequestHeader::from_prefix(raw).map(ClientRequestHeader::declared_size)
    }

    fn from_parts(buf: Bytes, header: ClientRequestHeader) -> Self {
        let sections = Sections::compute(&header, buf.len());
        Self {
            buf,
            header,
            sections,
        }
    }

    pub fn header(&self) -> &ClientRequestHeader {
        &self.header
    }

    /// Validate a received request.
    ///
    /// Checks, in order: the sender is not the validating replica, a
    /// signature length is known for the sender (when signing is enabled),
    /// the buffer size matches the declared lengths, and the signature
    /// verifies over the payload.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), RequestError> {
        match self.check(ctx) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    sender = self.sender_id().get(),
                    seq_num = self.sequence_number(),
                    size = self.size(),
                    error = %e,
                    "rejected client request"
                );
                Err(e)
            }
        }
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Result<(), RequestError> {
        let sender = self.sender_id();
        if sender == ctx.own_id {
            return Err(RequestError::SelfSender(sender));
        }

        let sig_len = match ctx.verifier {
            Some(verifier) => verifier
                .signature_length(sender)
                .filter(|len| *len > 0)
                .ok_or(RequestError::SignatureLength(sender))? as u64,
            None => 0,
        };

        let size = self.size() as u64;
        let min_size = HEADER_SIZE as u64
            + self.trace_context_length() as u64
            + self.correlation_id_length() as u64
            + sig_len;
        if size < min_size {
            return Err(RequestError::MalformedSize {
                actual: size,
                expected: min_size,
            });
        }
        let expected = min_size + self.request_length() as u64;
        if size != expected {
            return Err(RequestError::MalformedSize {
                actual: size,
                expected,
            });
        }

        if let Some(verifier) = ctx.verifier {
            if !verifier.verify(sender, self.payload(), self.signature()) {
                return Err(RequestError::SignatureVerification {
                    sender,
                    request_length: self.request_length(),
                });
            }
        }

        Ok(())
    }

    pub fn sender_id(&self) -> NodeId {
        self.header.sender_id()
    }

    pub fn sequence_number(&self) -> u64 {
        self.header.sequence_number()
    }

    pub fn timeout_millis(&self) -> u64 {
        self.header.timeout_millis()
    }

    pub fn flags(&self) -> RequestFlags {
        self.header.flags()
    }

    pub fn is_read_only(&self) -> bool {
        self.flags().contains(RequestFlags::READ_ONLY)
    }

    /// Declared payload length.
    pub fn request_length(&self) -> u32 {
        self.header.request_length()
    }

    /// Declared correlation-id length.
    pub fn correlation_id_length(&self) -> u16 {
        self.header.correlation_id_length()
    }

    /// Declared trace-context length.
    pub fn trace_context_length(&self) -> u32 {
        self.header.trace_context_length()
    }

    pub fn trace_context(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..self.sections.trace_end]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[self.sections.trace_end..self.sections.payload_end]
    }

    /// Raw correlation-id bytes.
    pub fn correlation_id_bytes(&self) -> &[u8] {
        &self.buf[self.sections.payload_end..self.sections.cid_end]
    }

    /// The correlation id; borrowed unless it is not valid UTF-8.
    pub fn correlation_id(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.correlation_id_bytes())
    }

    /// Trailing signature bytes (empty for unsigned requests).
    pub fn signature(&self) -> &[u8] {
        &self.buf[self.sections.cid_end..]
    }

    /// Total size of the message in bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Cheap handle to the underlying buffer.
    pub fn to_bytes(&self) -> Bytes {
        self.buf.clone()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf
    }
}

impl PartialEq for ClientRequest {
    fn eq(&self, other: &Self) -> bool {
        self.buf == other.buf
    }
}

impl Eq for ClientRequest {}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRequest")
            .field("sender", &self.sender_id())
            .field("seq_num", &self.sequence_number())
            .field("flags", &self.flags())
            .field("request_length", &self.request_length())
            .field("cid", &self.correlation_id())
            .field("size", &self.size())
            .finish()
    }
}

/// What the validating replica brings to [`ClientRequest::validate`].
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    own_id: NodeId,
    verifier: Option<&'a dyn SignatureVerifier>,
}

impl<'a> ValidationContext<'a> {
    /// Context for a deployment without client transaction signing.
    pub fn new(own_id: NodeId) -> Self {
        Self {
            own_id,
            verifier: None,
        }
    }

    /// Enable signature checks with the given verifier.
    pub fn with_verifier(mut self, verifier: &'a dyn SignatureVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn own_id(&self) -> NodeId {
        self.own_id
    }

    pub fn signing_enabled(&self) -> bool {
        self.verifier.is_some()
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("own_id", &self.own_id)
            .field("signing_enabled", &self.signing_enabled())
            .finish()
    }
}

fn section_len<T: TryFrom<usize>>(field: &'static str, len: usize, max: T) -> Result<T, RequestError>
where
    T: Into<u64> + Copy,
{
    T::try_from(len).map_err(|_| RequestError::FieldTooLarge {
        field,
        len,
        max: max.into() as usize,
    })
}

/// Builder for [`ClientRequest`].
pub struct ClientRequestBuilder<'a> {
    sender: NodeId,
    flags: RequestFlags,
    seq_num: u64,
    timeout_millis: u64,
    payload: Bytes,
    correlation_id: String,
    trace_context: Bytes,
    signer: Option<&'a dyn RequestSigner>,
}

impl<'a> ClientRequestBuilder<'a> {
    pub fn new(sender: NodeId) -> Self {
        Self {
            sender,
            flags: RequestFlags::empty(),
            seq_num: 0,
            timeout_millis: 0,
            payload: Bytes::new(),
            correlation_id: String::new(),
            trace_context: Bytes::new(),
            signer: None,
        }
    }

    pub fn flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn sequence_number(mut self, seq_num: u64) -> Self {
        self.seq_num = seq_num;
        self
    }

    pub fn timeout_millis(mut self, timeout: u64) -> Self {
        self.timeout_millis = timeout;
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn correlation_id(mut self, cid: impl Into<String>) -> Self {
        self.correlation_id = cid.into();
        self
    }

    pub fn trace_context(mut self, ctx: impl Into<Bytes>) -> Self {
        self.trace_context = ctx.into();
        self
    }

    /// Sign the payload with `signer` and append the signature.
    pub fn sign_with<'b>(self, signer: &'b dyn RequestSigner) -> ClientRequestBuilder<'b> {
        ClientRequestBuilder {
            sender: self.sender,
            flags: self.flags,
            seq_num: self.seq_num,
            timeout_millis: self.timeout_millis,
            payload: self.payload,
            correlation_id: self.correlation_id,
            trace_context: self.trace_context,
            signer: Some(signer),
        }
    }

    /// Lay out the buffer and, when signing, fill the signature region.
    pub fn build(self) -> Result<ClientRequest, RequestError> {
        let request_len = section_len("payload", self.payload.len(), u32::MAX)?;
        let cid_len = section_len("correlation id", self.correlation_id.len(), u16::MAX)?;
        let trace_len = section_len("trace context", self.trace_context.len(), u32::MAX)?;

        let sig_len = match self.signer {
            Some(signer) => signer
                .signature_length(self.sender)
                .filter(|len| *len > 0)
                .ok_or(RequestError::SignatureLength(self.sender))?,
            None => 0,
        };

        let unsigned_len = HEADER_SIZE
            + self.trace_context.len()
            + self.payload.len()
            + self.correlation_id.len();

        let mut header = ClientRequestHeader::new(self.sender);
        header.set_sequence_number(self.seq_num);
        header.set_timeout_millis(self.timeout_millis);
        header.set_flags(self.flags);
        header.set_trace_context_length(trace_len);
        header.set_request_length(request_len);
        header.set_correlation_id_length(cid_len);

        let mut buf = BytesMut::with_capacity(unsigned_len + sig_len);
        buf.put_slice(IntoBytes::as_bytes(&header));
        buf.put_slice(&self.trace_context);
        buf.put_slice(&self.payload);
        buf.put_slice(self.correlation_id.as_bytes());

        if let Some(signer) = self.signer {
            let signature = signer.sign(self.sender, &self.payload)?;
            if signature.len() != sig_len {
                return Err(RequestError::SignatureLength(self.sender));
            }
            buf.put_slice(&signature);
        }

        debug_assert_eq!(buf.len(), unsigned_len + sig_len);
        Ok(ClientRequest::from_parts(buf.freeze(), header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::signing::{ClientKeyRegistry, Ed25519Signer};

    const CLIENT: NodeId = NodeId(11);
    const REPLICA: NodeId = NodeId(1);

    fn signer() -> Ed25519Signer {
        Ed25519Signer::new(CLIENT, Keypair::from_seed(&[0x42; 32]))
    }

    fn registry(signer: &Ed25519Signer) -> ClientKeyRegistry {
        [(CLIENT, signer.public_key())].into_iter().collect()
    }

    fn unsigned(payload: &[u8]) -> ClientRequest {
        ClientRequest::builder(CLIENT)
            .sequence_number(42)
            .timeout_millis(5_000)
            .payload(payload.to_vec())
            .correlation_id("cid1")
            .trace_context(b"span".to_vec())
            .build()
            .unwrap()
    }

    fn with_header(req: &ClientRequest, edit: impl FnOnce(&mut ClientRequestHeader)) -> ClientRequest {
        let mut raw = req.as_bytes().to_vec();
        edit(ClientRequestHeader::from_prefix_mut(&mut raw).unwrap());
        ClientRequest::from_bytes(raw).unwrap()
    }

    #[test]
    fn test_scenario_abc_cid1() {
        let built = ClientRequest::builder(CLIENT)
            .sequence_number(42)
            .payload(b"abc".to_vec())
            .correlation_id("cid1")
            .build()
            .unwrap();

        let decoded = ClientRequest::from_bytes(built.to_bytes()).unwrap();
        assert_eq!(decoded.request_length(), 3);
        assert_eq!(decoded.correlation_id(), "cid1");
        assert_eq!(decoded.sequence_number(), 42);
        assert!(!decoded.is_read_only());
        assert!(decoded.validate(&ValidationContext::new(REPLICA)).is_ok());

        let read_only = ClientRequest::builder(CLIENT)
            .flags(RequestFlags::READ_ONLY)
            .payload(b"abc".to_vec())
            .correlation_id("cid1")
            .build()
            .unwrap();
        assert!(read_only.is_read_only());
    }

    #[test]
    fn test_layout_is_byte_exact() {
        let req = ClientRequest::builder(NodeId(0x0102))
            .sequence_number(3)
            .timeout_millis(4)
            .flags(RequestFlags::READ_ONLY)
            .payload(b"P".to_vec())
            .correlation_id("C")
            .trace_context(b"T".to_vec())
            .build()
            .unwrap();

        let mut expected = vec![0xbc, 0x02, 1, 0, 0, 0, 0x02, 0x01];
        expected.extend_from_slice(&3u64.to_le_bytes());
        expected.extend_from_slice(&4u64.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0x01]);
        expected.extend_from_slice(b"TPC");
        assert_eq!(req.as_bytes(), expected.as_slice());
        assert_eq!(req.size(), HEADER_SIZE + 3);
    }

    #[test]
    fn test_header_view_matches_layout() {
        let req = unsigned(b"abc");
        let raw = req.as_bytes();
        let header = ClientRequestHeader::from_prefix(raw).unwrap();

        assert_eq!(header.msg_code(), CLIENT_REQUEST_MSG_CODE);
        assert_eq!(header.trace_context_length(), 4);
        assert_eq!(header.request_length(), 3);
        assert_eq!(header.correlation_id_length(), 4);
        assert_eq!(&header.to_bytes()[..], &raw[..HEADER_SIZE]);
        assert_eq!(header.declared_size(), req.size() as u64);
        assert!(ClientRequestHeader::from_prefix(&raw[..HEADER_SIZE - 1]).is_none());
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let req = unsigned(b"some payload");
        let decoded = ClientRequest::from_bytes(req.to_bytes()).unwrap();
        assert_eq!(decoded.sender_id(), CLIENT);
        assert_eq!(decoded.sequence_number(), 42);
        assert_eq!(decoded.timeout_millis(), 5_000);
        assert_eq!(decoded.payload(), b"some payload");
        assert_eq!(decoded.trace_context(), b"span");
        assert_eq!(decoded.correlation_id(), "cid1");
        assert!(decoded.signature().is_empty());
        assert_eq!(decoded.size(), req.as_bytes().len());
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_parse_does_not_copy() {
        let req = unsigned(b"zero copy");
        let raw = req.to_bytes();
        let decoded = ClientRequest::from_bytes(raw.clone()).unwrap();
        assert_eq!(decoded.payload().as_ptr(), raw[HEADER_SIZE + 4..].as_ptr());
    }

    #[test]
    fn test_declared_size() {
        let req = unsigned(b"abc");
        assert_eq!(
            ClientRequest::declared_size(req.as_bytes()),
            Some(req.size() as u64)
        );
        assert_eq!(ClientRequest::declared_size(&[0u8; 10]), None);
    }

    #[test]
    fn test_perturbed_lengths_fail_validation() {
        let req = unsigned(b"abcdef");
        let ctx = ValidationContext::new(REPLICA);

        let cases = [
            with_header(&req, |h| h.set_request_length(5)),
            with_header(&req, |h| h.set_request_length(7)),
            with_header(&req, |h| h.set_trace_context_length(0)),
            with_header(&req, |h| h.set_trace_context_length(5)),
            with_header(&req, |h| h.set_request_length(u32::MAX)),
            with_header(&req, |h| h.set_correlation_id_length(3)),
        ];
        for perturbed in cases {
            assert!(matches!(
                perturbed.validate(&ctx),
                Err(RequestError::MalformedSize { .. })
            ));
        }
    }

    #[test]
    fn test_overrunning_lengths_do_not_panic() {
        let req = with_header(&unsigned(b"abc"), |h| h.set_trace_context_length(u32::MAX));
        assert_eq!(req.trace_context().len(), req.size() - HEADER_SIZE);
        assert!(req.payload().is_empty());
        assert!(req.correlation_id_bytes().is_empty());
        assert!(req.signature().is_empty());
    }

    #[test]
    fn test_below_minimum_size() {
        let req = unsigned(b"");
        let truncated = ClientRequest::from_bytes(req.as_bytes()[..HEADER_SIZE + 2].to_vec()).unwrap();
        let err = truncated.validate(&ValidationContext::new(REPLICA)).unwrap_err();
        assert!(matches!(
            err,
            RequestError::MalformedSize { actual, expected }
                if actual == (HEADER_SIZE + 2) as u64 && expected == (HEADER_SIZE + 8) as u64
        ));
    }

    #[test]
    fn test_self_sender_rejected() {
        let req = unsigned(b"abc");
        let err = req.validate(&ValidationContext::new(CLIENT)).unwrap_err();
        assert!(matches!(err, RequestError::SelfSender(id) if id == CLIENT));

        // Even a malformed request from ourselves reports the sender first.
        let broken = with_header(&req, |h| h.set_request_length(99));
        assert!(matches!(
            broken.validate(&ValidationContext::new(CLIENT)),
            Err(RequestError::SelfSender(_))
        ));
    }

    #[test]
    fn test_signed_request_verifies() {
        let signer = signer();
        let registry = registry(&signer);
        let req = ClientRequest::builder(CLIENT)
            .payload(b"transfer 10".to_vec())
            .correlation_id("cid-signed")
            .sign_with(&signer)
            .build()
            .unwrap();

        assert_eq!(req.signature().len(), 64);
        assert_eq!(
            req.size() as u64,
            ClientRequest::declared_size(req.as_bytes()).unwrap() + 64
        );
        let ctx = ValidationContext::new(REPLICA).with_verifier(&registry);
        assert!(req.validate(&ctx).is_ok());
    }

    #[test]
    fn test_signature_is_written_not_copied() {
        let signer = signer();
        let payload = vec![0x5a; 64];
        let req = ClientRequest::builder(CLIENT)
            .payload(payload.clone())
            .sign_with(&signer)
            .build()
            .unwrap();

        assert_ne!(req.signature(), payload.as_slice());
        assert_ne!(req.signature(), &[0u8; 64][..]);
        assert!(signer.public_key().verify(&payload, req.signature()).is_ok());
    }

    #[test]
    fn test_tampered_signature_is_recoverable() {
        let signer = signer();
        let registry = registry(&signer);
        let req = ClientRequest::builder(CLIENT)
            .payload(b"abc".to_vec())
            .sign_with(&signer)
            .build()
            .unwrap();

        let mut raw = req.as_bytes().to_vec();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        let tampered = ClientRequest::from_bytes(raw).unwrap();

        let ctx = ValidationContext::new(REPLICA).with_verifier(&registry);
        let err = tampered.validate(&ctx).unwrap_err();
        assert!(matches!(err, RequestError::SignatureVerification { .. }));
        assert!(err.is_recoverable());
        assert!(err.is_hostile());
    }

    #[test]
    fn test_unsigned_request_rejected_when_signing_enabled() {
        let signer = signer();
        let registry = registry(&signer);
        let ctx = ValidationContext::new(REPLICA).with_verifier(&registry);
        let err = unsigned(b"abc").validate(&ctx).unwrap_err();
        assert!(matches!(err, RequestError::MalformedSize { .. }));
        assert!(err.is_recoverable());
        assert!(!err.is_hostile());
    }

    #[test]
    fn test_trailing_byte_is_dropped_not_fatal() {
        let mut raw = unsigned(b"abc").as_bytes().to_vec();
        raw.push(0);
        let padded = ClientRequest::from_bytes(raw).unwrap();

        let err = padded.validate(&ValidationContext::new(REPLICA)).unwrap_err();
        let expected = (HEADER_SIZE + 4 + 3 + 4) as u64;
        assert!(matches!(
            err,
            RequestError::MalformedSize { actual, expected: e } if actual == expected + 1 && e == expected
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_local_faults_are_not_recoverable() {
        let signer = signer();
        let registry = registry(&signer);

        let own = unsigned(b"abc").validate(&ValidationContext::new(CLIENT)).unwrap_err();
        assert!(!own.is_recoverable());

        let unknown = ClientRequest::empty(NodeId(77))
            .validate(&ValidationContext::new(REPLICA).with_verifier(&registry))
            .unwrap_err();
        assert!(matches!(unknown, RequestError::SignatureLength(_)));
        assert!(!unknown.is_recoverable());
    }

    #[test]
    fn test_unknown_sender_has_no_signature_length() {
        let registry = ClientKeyRegistry::new();
        let ctx = ValidationContext::new(REPLICA).with_verifier(&registry);
        let err = unsigned(b"abc").validate(&ctx).unwrap_err();
        assert!(matches!(err, RequestError::SignatureLength(id) if id == CLIENT));
    }

    #[test]
    fn test_builder_rejects_foreign_signer() {
        let signer = Ed25519Signer::new(NodeId(99), Keypair::from_seed(&[1; 32]));
        let result = ClientRequest::builder(CLIENT)
            .payload(b"abc".to_vec())
            .sign_with(&signer)
            .build();
        assert!(matches!(result, Err(RequestError::SignatureLength(_))));
    }

    #[test]
    fn test_oversized_correlation_id() {
        let result = ClientRequest::builder(CLIENT)
            .correlation_id("x".repeat(u16::MAX as usize + 1))
            .build();
        assert!(matches!(
            result,
            Err(RequestError::FieldTooLarge { field: "correlation id", .. })
        ));
    }

    #[test]
    fn test_empty_request() {
        let req = ClientRequest::empty(CLIENT);
        assert_eq!(req.size(), HEADER_SIZE);
        assert!(req.flags().is_empty());
        assert!(!req.flags().contains(RequestFlags::EMPTY_CLIENT_REQ));
        assert!(req.payload().is_empty());
        assert_eq!(req.correlation_id(), "");
        assert!(req.validate(&ValidationContext::new(REPLICA)).is_ok());
    }

    #[test]
    fn test_rejects_short_and_foreign_buffers() {
        assert!(matches!(
            ClientRequest::from_bytes(vec![0u8; HEADER_SIZE - 1]),
            Err(RequestError::MalformedSize { .. })
        ));

        let mut raw = unsigned(b"abc").as_bytes().to_vec();
        ClientRequestHeader::from_prefix_mut(&mut raw).unwrap().set_msg_code(701);
        let err = ClientRequest::from_bytes(raw).unwrap_err();
        assert!(matches!(err, RequestError::WrongMessageCode(701)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_non_utf8_correlation_id_is_lossy() {
        let req = unsigned(b"abc");
        let mut raw = req.as_bytes().to_vec();
        let cid_start = raw.len() - 4;
        raw[cid_start] = 0xff;
        let decoded = ClientRequest::from_bytes(raw).unwrap();
        assert_eq!(decoded.correlation_id_bytes()[0], 0xff);
        assert!(decoded.correlation_id().ends_with("id1"));
    }
}
