//! Trailer appended to every reliable frame
//!
//! ```text
//! [payload...][network_id_lo][network_id_hi][crc_lo][crc_hi]
//! ```

use crate::config::protocol::TRAILER_LEN;

/// Network ID and payload CRC carried in the last four bytes of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trailer {
    /// Caller-chosen tag correlating a packet with its ACK
    pub network_id: u16,
    /// CRC of the payload, or the placeholder when CRC checking is off
    pub payload_crc: u16,
}

impl Trailer {
    pub const fn new(network_id: u16, payload_crc: u16) -> Self {
        Self {
            network_id,
            payload_crc,
        }
    }

    /// Serialise to wire order
    pub fn to_bytes(&self) -> [u8; TRAILER_LEN] {
        encode_trailer(self.network_id, self.payload_crc)
    }

    /// Split a received frame into its body and trailer.
    ///
    /// Returns `None` if the frame is shorter than a trailer.
    pub fn split_frame(frame: &[u8]) -> Option<(&[u8], Trailer)> {
        let body_len = frame.len().checked_sub(TRAILER_LEN)?;
        let (body, trailer) = frame.split_at(body_len);
        Some((body, decode_trailer(trailer)))
    }
}

/// Encode a trailer: network ID then CRC, each little-endian
pub fn encode_trailer(network_id: u16, payload_crc: u16) -> [u8; TRAILER_LEN] {
    let id = network_id.to_le_bytes();
    let crc = payload_crc.to_le_bytes();
    [id[0], id[1], crc[0], crc[1]]
}

/// Decode the first four bytes of `bytes` as a trailer
///
/// The caller guarantees `bytes.len() >= 4`.
pub fn decode_trailer(bytes: &[u8]) -> Trailer {
    Trailer {
        network_id: u16::from_le_bytes([bytes[0], bytes[1]]),
        payload_crc: u16::from_le_bytes([bytes[2], bytes[3]]),
    }
}
