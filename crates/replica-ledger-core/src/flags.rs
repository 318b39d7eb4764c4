//! Client request flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Client request flags (8 bits on the wire).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RequestFlags: u8 {
        /// Does not modify state; may be answered without ordering.
        const READ_ONLY = 0b0000_0001;

        /// Must go through the pre-execution stage first.
        const PRE_PROCESS = 0b0000_0010;

        /// Carries a pre-executed result.
        const HAS_PRE_PROCESSED = 0b0000_0100;

        /// Key exchange between a client and the replicas.
        const KEY_EXCHANGE = 0b0000_1000;

        /// Periodic tick generated inside the cluster.
        const TICK = 0b0001_0000;

        /// Reconfiguration command.
        const RECONFIG = 0b0010_0000;

        /// Generated by a replica, not a client.
        const INTERNAL = 0b0100_0000;

        /// Placeholder request with no payload.
        const EMPTY_CLIENT_REQ = 0b1000_0000;
    }
}

impl RequestFlags {
    /// Create flags from the raw wire byte. Unknown bits are kept.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.bits()
    }
}

impl Default for RequestFlags {
    fn default() -> Self {
        Self::empty()
    }
}
