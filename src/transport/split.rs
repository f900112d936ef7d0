//! Split-header (data transfer) frames
//!
//! Same trailer and network ID rules as the reliable frame, but the body is a
//! header followed by a data segment:
//!
//! ```text
//! [header...][data...][network_id_lo][network_id_hi][crc_lo][crc_hi]
//! ```
//!
//! - Byte 2 of the header holds the header length, byte 3 the data length.
//!   The sender's application writes both; `receive_split` relies on them to
//!   find the segment boundary, so received headers are at least 4 bytes.
//! - The CRC covers the data segment only.
//! - ACKs carry a header and the echoed trailer, no data.

use crate::config::protocol::{MAX_LINK_FRAME, TRAILER_LEN};
use crate::config::split::{DATA_LEN_INDEX, HEADER_LEN_INDEX, MIN_FRAME_LEN, MIN_HEADER_LEN};
use crate::config::ReliableConfig;
use crate::link::{Clock, RadioLink, SignalQuality};
use crate::protocol::checksum::payload_crc;
use crate::protocol::status::{ReliableError, ReliableErrors, ReliableFlags, Status};
use crate::protocol::trailer::Trailer;
use crate::transport::reliable::{log_rx, Received, ReliableTransport, Reply, Sent};

/// Result of a successful split-header reception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitReceived {
    /// Header bytes copied into the header buffer
    pub header_len: usize,
    /// Data bytes copied into the data buffer
    pub data_len: usize,
    pub trailer: Trailer,
    pub quality: Option<SignalQuality>,
    pub status: Status,
}

/// Segment boundaries of a validated split frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segments {
    header_len: usize,
    data_len: usize,
    trailer: Trailer,
}

impl<L, C> ReliableTransport<L, C>
where
    L: RadioLink,
    C: Clock,
{
    /// Send `header` and `data` as one split-header frame
    ///
    /// The header goes on air exactly as given; filling in its length bytes
    /// is up to the caller. Fails with `SizeError`, without touching the link,
    /// when header and data together exceed the payload capacity.
    pub async fn send_split(
        &mut self,
        header: &[u8],
        data: &[u8],
        network_id: u16,
        tx_timeout_ms: u32,
        tx_power: i8,
    ) -> Result<Sent, ReliableError> {
        let mut status = Status::new();
        log::debug!(
            "Split TX: header {} bytes, data {} bytes, network ID {:#06x}",
            header.len(),
            data.len(),
            network_id
        );

        if header.len() + data.len() > self.payload_capacity() {
            status.errors |= ReliableErrors::SIZE;
            return Err(ReliableError::new(status));
        }

        let trailer = Trailer::new(network_id, payload_crc(data, self.config));
        let frame_len = self
            .transmit_frame(&[header, data], trailer, tx_timeout_ms, tx_power)
            .await
            .map_err(|e| ReliableError::from_link(status, e))?;

        Ok(Sent {
            payload_len: header.len() + data.len(),
            frame_len,
            trailer,
            status,
        })
    }

    /// Receive a split-header frame into `header` and `data`
    ///
    /// Both segments are copied only when every check passes; a segment
    /// larger than its buffer fails the call with `SizeError` before either
    /// is copied.
    pub async fn receive_split(
        &mut self,
        header: &mut [u8],
        data: &mut [u8],
        network_id: u16,
        rx_timeout_ms: u32,
    ) -> Result<SplitReceived, ReliableError> {
        let mut status = Status::new();
        let mut raw = [0u8; MAX_LINK_FRAME];

        let len = self
            .link
            .receive_raw(&mut raw, rx_timeout_ms)
            .await
            .map_err(|e| ReliableError::from_link(status, e))?
            .min(MAX_LINK_FRAME);

        let segments = match check_split_frame(&raw[..len], header.len(), data.len(), network_id, self.config) {
            Ok(segments) => segments,
            Err(errors) => {
                log::debug!("Split RX: {} byte frame rejected [{}]", len, errors);
                status.errors |= errors;
                return Err(ReliableError::new(status));
            }
        };

        let Segments {
            header_len,
            data_len,
            trailer,
        } = segments;
        header[..header_len].copy_from_slice(&raw[..header_len]);
        data[..data_len].copy_from_slice(&raw[header_len..header_len + data_len]);

        let quality = self.link.signal_quality();
        log_rx(header_len + data_len, trailer, quality);

        Ok(SplitReceived {
            header_len,
            data_len,
            trailer,
            quality,
            status,
        })
    }

    /// Reply to a split-header frame with `header` and the echoed `trailer`
    pub async fn send_split_ack(
        &mut self,
        header: &[u8],
        trailer: Trailer,
        tx_power: i8,
    ) -> Result<Sent, ReliableError> {
        let mut status = Status::new();

        if header.len() > self.payload_capacity() {
            status.errors |= ReliableErrors::SIZE | ReliableErrors::ACK;
            return Err(ReliableError::new(status));
        }

        match self.transmit_ack(header, trailer, tx_power).await {
            Ok(frame_len) => {
                status.flags |= ReliableFlags::ACK_SENT;
                Ok(Sent {
                    payload_len: header.len(),
                    frame_len,
                    trailer,
                    status,
                })
            }
            Err(e) => {
                status.errors |= ReliableErrors::ACK;
                Err(ReliableError::from_link(status, e))
            }
        }
    }

    /// Wait for a split-header ACK to the frame sent with `trailer`
    ///
    /// Replies with another network ID, a mismatching CRC (unless CRC checking
    /// is off) or a header too large for `header` are discarded and listening
    /// continues. A discarded CRC mismatch adds `CrcError` to the timeout
    /// error. The matching reply's header is copied into `header`.
    pub async fn wait_split_ack(
        &mut self,
        header: &mut [u8],
        trailer: Trailer,
        ack_timeout_ms: u32,
    ) -> Result<Received, ReliableError> {
        let capacity = header.len();
        let check_crc = self.config.crc_enabled();
        let mut raw = [0u8; MAX_LINK_FRAME];

        let len = self
            .wait_reply(&mut raw, ack_timeout_ms, |frame| match Trailer::split_frame(frame) {
                Some((body, heard)) if body.len() <= capacity && heard.network_id == trailer.network_id => {
                    if !check_crc || heard.payload_crc == trailer.payload_crc {
                        Reply::Matched
                    } else {
                        Reply::Suspect(ReliableErrors::CRC)
                    }
                }
                _ => Reply::Stray,
            })
            .await?;

        let header_len = len - TRAILER_LEN;
        header[..header_len].copy_from_slice(&raw[..header_len]);
        Ok(self.ack_received(header_len, trailer))
    }
}

/// Validate a received split-header frame against the caller's buffers
fn check_split_frame(
    frame: &[u8],
    header_capacity: usize,
    data_capacity: usize,
    network_id: u16,
    config: ReliableConfig,
) -> Result<Segments, ReliableErrors> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(ReliableErrors::SIZE);
    }

    let header_len = frame[HEADER_LEN_INDEX] as usize;
    let data_len = frame[DATA_LEN_INDEX] as usize;

    if header_len > header_capacity || data_len > data_capacity {
        return Err(ReliableErrors::SIZE);
    }
    if header_len < MIN_HEADER_LEN || header_len + data_len + TRAILER_LEN != frame.len() {
        return Err(ReliableErrors::SIZE);
    }

    let (body, trailer) = Trailer::split_frame(frame).ok_or(ReliableErrors::SIZE)?;
    let data = &body[header_len..];

    let mut errors = ReliableErrors::empty();
    if config.crc_enabled() && payload_crc(data, config) != trailer.payload_crc {
        errors |= ReliableErrors::CRC;
    }
    if trailer.network_id != network_id {
        errors |= ReliableErrors::ID;
    }

    if errors.is_empty() {
        Ok(Segments {
            header_len,
            data_len,
            trailer,
        })
    } else {
        Err(errors)
    }
}
