//! Protocol constants and per-transport configuration

/// Frame layout constants
pub mod protocol {
    /// Largest frame a LoRa link can carry
    pub const MAX_LINK_FRAME: usize = 255;

    /// Network ID (2 bytes) + payload CRC (2 bytes)
    pub const TRAILER_LEN: usize = 4;

    /// Largest reliable payload, leaving room for the trailer in a 255-byte frame
    pub const MAX_RELIABLE_PAYLOAD: usize = MAX_LINK_FRAME - TRAILER_LEN;

    /// Seed used for every payload CRC
    pub const CRC_SEED: u16 = 0xFFFF;

    /// Trailer CRC value sent when payload CRC checking is disabled
    pub const NO_CRC_PLACEHOLDER: u16 = 0x0000;
}

/// Timing defaults
pub mod timing {
    /// Transmit timeout used when sending an ACK.
    /// The longest LoRa packet takes about 8.7 seconds on air.
    pub const ACK_SEND_TIMEOUT_MS: u32 = 12_000;
}

/// Data transfer (split-header) layout
pub mod split {
    /// Header byte holding the header length
    pub const HEADER_LEN_INDEX: usize = 2;

    /// Header byte holding the data segment length
    pub const DATA_LEN_INDEX: usize = 3;

    /// Smallest header able to carry both length bytes
    pub const MIN_HEADER_LEN: usize = 4;

    /// Smallest valid split frame: minimal header + trailer
    pub const MIN_FRAME_LEN: usize = MIN_HEADER_LEN + super::protocol::TRAILER_LEN;
}

bitset! {
    /// Options recognised by a reliable transport
    ///
    /// Set once by the caller and kept by the transport instance until changed.
    pub struct ReliableConfig {
        /// Skip payload CRC generation and checking
        const NO_CRC = 0, "NoReliableCRC";
        /// Caller drives the ACK exchange instead of the AutoACK operations
        const NO_AUTO_ACK = 1, "NoAutoACK";
    }
}

impl ReliableConfig {
    /// True when payload CRCs are generated and checked
    pub const fn crc_enabled(self) -> bool {
        !self.contains(Self::NO_CRC)
    }

    /// True when the AutoACK operations perform the ACK exchange themselves
    pub const fn auto_ack(self) -> bool {
        !self.contains(Self::NO_AUTO_ACK)
    }
}
