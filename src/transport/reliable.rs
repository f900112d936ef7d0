//! Reliable packet transport
//!
//! Adds a network ID + payload CRC trailer to outgoing payloads, validates it
//! on receive, and optionally runs an immediate ACK round-trip:
//!
//! ```text
//! Idle -> Sending -> Done                       (no ACK requested)
//! Idle -> Sending -> WaitingAck -> Done         (matching ACK)
//!                    WaitingAck -> WaitingAck   (stray frame, listen again)
//!                    WaitingAck -> TimedOut     (ack_timeout elapsed)
//! ```
//!
//! An ACK is a frame whose trailer echoes the network ID and payload CRC of
//! the packet being acknowledged. A plain ACK has no payload of its own.

use crate::config::protocol::{MAX_LINK_FRAME, MAX_RELIABLE_PAYLOAD, TRAILER_LEN};
use crate::config::timing::ACK_SEND_TIMEOUT_MS;
use crate::config::ReliableConfig;
use crate::link::{Clock, LinkError, RadioLink, SignalQuality};
use crate::protocol::checksum::payload_crc;
use crate::protocol::status::{link_error_kind, ReliableError, ReliableErrors, ReliableFlags, Status};
use crate::protocol::trailer::Trailer;
use heapless::Vec;

/// Frame buffer large enough for any link frame
pub(crate) type FrameBuf = Vec<u8, MAX_LINK_FRAME>;

/// Result of a successful transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    /// Payload bytes sent, excluding the trailer
    pub payload_len: usize,
    /// Bytes on air, including the trailer
    pub frame_len: usize,
    /// Trailer that was sent; pass it to the ACK wait operations
    pub trailer: Trailer,
    pub status: Status,
}

/// Result of a successful reception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Payload bytes copied into the caller's buffer
    pub payload_len: usize,
    /// Trailer of the received frame
    pub trailer: Trailer,
    /// Channel quality reported by the link, if any
    pub quality: Option<SignalQuality>,
    pub status: Status,
}

/// Verdict on a frame heard while waiting for an ACK
pub(crate) enum Reply {
    /// The awaited ACK
    Matched,
    /// Unrelated traffic, keep listening
    Stray,
    /// Discarded, but the errors are reported if the wait then times out
    Suspect(ReliableErrors),
    /// The awaited ACK, but unusable
    Rejected(ReliableErrors),
}

/// State of an ACK wait
enum AckWait {
    Listening,
    Matched(usize),
    TimedOut,
}

/// Reliable transport over a single radio link
///
/// One instance owns its link for the duration of every call; operations are
/// strictly sequential. Errors and flags are returned per call and never kept.
pub struct ReliableTransport<L, C> {
    pub(crate) link: L,
    pub(crate) clock: C,
    pub(crate) config: ReliableConfig,
    pub(crate) ack_send_timeout_ms: u32,
}

impl<L, C> ReliableTransport<L, C>
where
    L: RadioLink,
    C: Clock,
{
    /// Create a transport with CRC checking and AutoACK enabled
    pub fn new(link: L, clock: C) -> Self {
        Self {
            link,
            clock,
            config: ReliableConfig::default(),
            ack_send_timeout_ms: ACK_SEND_TIMEOUT_MS,
        }
    }

    /// Start with `config` instead of the defaults
    pub fn with_config(mut self, config: ReliableConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the transmit timeout used for ACK frames
    pub fn with_ack_send_timeout(mut self, timeout_ms: u32) -> Self {
        self.ack_send_timeout_ms = timeout_ms;
        self
    }

    /// Current options
    pub fn config(&self) -> ReliableConfig {
        self.config
    }

    /// Turn on the given options; they persist until cleared
    pub fn set_config(&mut self, options: ReliableConfig) {
        self.config.insert(options);
        log::debug!("Reliable config now [{}]", self.config);
    }

    /// Turn off the given options
    pub fn clear_config(&mut self, options: ReliableConfig) {
        self.config.remove(options);
        log::debug!("Reliable config now [{}]", self.config);
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Release the link and clock
    pub fn into_parts(self) -> (L, C) {
        (self.link, self.clock)
    }

    /// Largest payload that fits one frame together with the trailer
    pub fn payload_capacity(&self) -> usize {
        self.link
            .max_payload_size()
            .min(MAX_LINK_FRAME)
            .saturating_sub(TRAILER_LEN)
            .min(MAX_RELIABLE_PAYLOAD)
    }

    /// Send `payload` with a trailer carrying `network_id`
    ///
    /// The link is not touched when the payload is too large. A link timeout
    /// is reported, not retried.
    pub async fn send(
        &mut self,
        payload: &[u8],
        network_id: u16,
        tx_timeout_ms: u32,
        tx_power: i8,
    ) -> Result<Sent, ReliableError> {
        let mut status = Status::new();
        log::debug!("Reliable TX: {} bytes, network ID {:#06x}", payload.len(), network_id);

        if payload.len() > self.payload_capacity() {
            log::warn!("Reliable TX: {} bytes exceeds capacity {}", payload.len(), self.payload_capacity());
            status.errors |= ReliableErrors::SIZE;
            return Err(ReliableError::new(status));
        }

        let trailer = Trailer::new(network_id, payload_crc(payload, self.config));
        let frame_len = self
            .transmit_frame(&[payload], trailer, tx_timeout_ms, tx_power)
            .await
            .map_err(|e| ReliableError::from_link(status, e))?;

        log::debug!("Reliable TX: complete, CRC {:#06x}", trailer.payload_crc);
        Ok(Sent {
            payload_len: payload.len(),
            frame_len,
            trailer,
            status,
        })
    }

    /// Receive one reliable frame into `buffer`
    ///
    /// The payload is copied only when size, CRC and network ID all check
    /// out; on any error `buffer` is left untouched.
    pub async fn receive(
        &mut self,
        buffer: &mut [u8],
        network_id: u16,
        rx_timeout_ms: u32,
    ) -> Result<Received, ReliableError> {
        let mut status = Status::new();
        let mut raw = [0u8; MAX_LINK_FRAME];

        let len = self
            .link
            .receive_raw(&mut raw, rx_timeout_ms)
            .await
            .map_err(|e| ReliableError::from_link(status, e))?
            .min(MAX_LINK_FRAME);

        let (payload, trailer) = match check_frame(&raw[..len], buffer.len(), network_id, self.config) {
            Ok(parts) => parts,
            Err(errors) => {
                log::debug!("Reliable RX: {} byte frame rejected [{}]", len, errors);
                status.errors |= errors;
                return Err(ReliableError::new(status));
            }
        };

        buffer[..payload.len()].copy_from_slice(payload);
        let quality = self.link.signal_quality();
        log_rx(payload.len(), trailer, quality);

        Ok(Received {
            payload_len: payload.len(),
            trailer,
            quality,
            status,
        })
    }

    /// Send `payload` and wait up to `ack_timeout_ms` for its ACK
    ///
    /// Frames that are not the ACK are discarded and listening resumes. On
    /// expiry the call fails with `AckError | Timeout`; retrying is up to the
    /// caller. With `NO_AUTO_ACK` set this behaves like [`send`](Self::send).
    pub async fn send_with_ack(
        &mut self,
        payload: &[u8],
        network_id: u16,
        ack_timeout_ms: u32,
        tx_timeout_ms: u32,
        tx_power: i8,
    ) -> Result<Sent, ReliableError> {
        let mut sent = self.send(payload, network_id, tx_timeout_ms, tx_power).await?;

        if !self.config.auto_ack() {
            return Ok(sent);
        }

        let ack = self.wait_ack(sent.trailer, ack_timeout_ms).await?;
        sent.status.flags |= ack.status.flags;
        Ok(sent)
    }

    /// Receive a reliable frame and, after `ack_delay_ms`, acknowledge it
    ///
    /// The delay gives the half-duplex peer time to switch to receive. A
    /// failed ACK does not undo the delivery: the call still succeeds and
    /// reports `AckError` in the returned status. With `NO_AUTO_ACK` set no
    /// ACK is sent.
    pub async fn receive_with_ack(
        &mut self,
        buffer: &mut [u8],
        network_id: u16,
        ack_delay_ms: u32,
        tx_power: i8,
        rx_timeout_ms: u32,
    ) -> Result<Received, ReliableError> {
        let mut received = self.receive(buffer, network_id, rx_timeout_ms).await?;

        if !self.config.auto_ack() {
            return Ok(received);
        }

        self.clock.delay_ms(ack_delay_ms).await;

        match self.transmit_ack(&[], received.trailer, tx_power).await {
            Ok(_) => received.status.flags |= ReliableFlags::ACK_SENT,
            Err(e) => {
                log::warn!("Reliable ACK TX failed: {:?}", e);
                received.status.errors |= ReliableErrors::ACK | link_error_kind(e);
            }
        }

        Ok(received)
    }

    /// Send a bare ACK echoing `trailer`
    pub async fn send_ack(&mut self, trailer: Trailer, tx_power: i8) -> Result<Sent, ReliableError> {
        self.send_ack_with_payload(&[], trailer, tx_power).await
    }

    /// Send an ACK that carries `payload` in front of the echoed `trailer`
    pub async fn send_ack_with_payload(
        &mut self,
        payload: &[u8],
        trailer: Trailer,
        tx_power: i8,
    ) -> Result<Sent, ReliableError> {
        let mut status = Status::new();

        if payload.len() > self.payload_capacity() {
            status.errors |= ReliableErrors::SIZE | ReliableErrors::ACK;
            return Err(ReliableError::new(status));
        }

        match self.transmit_ack(payload, trailer, tx_power).await {
            Ok(frame_len) => {
                status.flags |= ReliableFlags::ACK_SENT;
                Ok(Sent {
                    payload_len: payload.len(),
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

    /// Wait up to `ack_timeout_ms` for an ACK echoing `trailer`
    pub async fn wait_ack(&mut self, trailer: Trailer, ack_timeout_ms: u32) -> Result<Received, ReliableError> {
        let mut raw = [0u8; MAX_LINK_FRAME];
        let len = self
            .wait_reply(&mut raw, ack_timeout_ms, |frame| match Trailer::split_frame(frame) {
                Some((_, heard)) if heard == trailer => Reply::Matched,
                _ => Reply::Stray,
            })
            .await?;

        Ok(self.ack_received(len - TRAILER_LEN, trailer))
    }

    /// Wait for an ACK echoing `trailer` and copy its payload into `buffer`
    ///
    /// A matching ACK whose payload does not fit fails with
    /// `AckError | SizeError` and nothing is copied.
    pub async fn wait_ack_with_payload(
        &mut self,
        buffer: &mut [u8],
        trailer: Trailer,
        ack_timeout_ms: u32,
    ) -> Result<Received, ReliableError> {
        let capacity = buffer.len();
        let mut raw = [0u8; MAX_LINK_FRAME];
        let len = self
            .wait_reply(&mut raw, ack_timeout_ms, |frame| match Trailer::split_frame(frame) {
                Some((body, heard)) if heard == trailer => {
                    if body.len() > capacity {
                        Reply::Rejected(ReliableErrors::ACK | ReliableErrors::SIZE)
                    } else {
                        Reply::Matched
                    }
                }
                _ => Reply::Stray,
            })
            .await?;

        let payload_len = len - TRAILER_LEN;
        buffer[..payload_len].copy_from_slice(&raw[..payload_len]);
        Ok(self.ack_received(payload_len, trailer))
    }

    /// Outcome of a matched ACK
    pub(crate) fn ack_received(&self, payload_len: usize, trailer: Trailer) -> Received {
        let mut status = Status::new();
        status.flags |= ReliableFlags::ACK_RECEIVED;
        log::debug!("Reliable ACK RX: network ID {:#06x}, CRC {:#06x}", trailer.network_id, trailer.payload_crc);

        Received {
            payload_len,
            trailer,
            quality: self.link.signal_quality(),
            status,
        }
    }

    /// Assemble `parts ++ trailer` and transmit it at `tx_power`
    ///
    /// Returns the frame length on success.
    pub(crate) async fn transmit_frame(
        &mut self,
        parts: &[&[u8]],
        trailer: Trailer,
        timeout_ms: u32,
        tx_power: i8,
    ) -> Result<usize, LinkError> {
        let mut frame = FrameBuf::new();
        for part in parts {
            frame
                .extend_from_slice(part)
                .map_err(|_| LinkError::InvalidConfig)?;
        }
        frame
            .extend_from_slice(&trailer.to_bytes())
            .map_err(|_| LinkError::InvalidConfig)?;

        self.link.set_tx_power(tx_power).await?;
        self.link.transmit_raw(&frame, timeout_ms).await?;
        Ok(frame.len())
    }

    /// Transmit an ACK frame with the ACK send timeout
    pub(crate) async fn transmit_ack(
        &mut self,
        payload: &[u8],
        trailer: Trailer,
        tx_power: i8,
    ) -> Result<usize, LinkError> {
        log::debug!("Reliable ACK TX: network ID {:#06x}, CRC {:#06x}", trailer.network_id, trailer.payload_crc);
        let timeout_ms = self.ack_send_timeout_ms;
        self.transmit_frame(&[payload], trailer, timeout_ms, tx_power)
            .await
    }

    /// Listen until `judge` accepts a frame or `timeout_ms` has elapsed
    ///
    /// Every receive is bounded by the time left, so the whole wait never
    /// exceeds the timeout by more than one link call's overshoot. Returns the
    /// length of the accepted frame, which stays in `raw`. Errors noted on
    /// suspect frames are dropped once a frame is accepted.
    pub(crate) async fn wait_reply<F>(
        &mut self,
        raw: &mut [u8; MAX_LINK_FRAME],
        timeout_ms: u32,
        mut judge: F,
    ) -> Result<usize, ReliableError>
    where
        F: FnMut(&[u8]) -> Reply,
    {
        let mut status = Status::new();
        let start = self.clock.now_ms();
        let mut state = AckWait::Listening;

        while let AckWait::Listening = state {
            let elapsed = self.clock.elapsed_since(start);
            if elapsed >= timeout_ms {
                state = AckWait::TimedOut;
                break;
            }

            match self.link.receive_raw(&mut raw[..], timeout_ms - elapsed).await {
                Ok(len) => match judge(&raw[..len.min(MAX_LINK_FRAME)]) {
                    Reply::Matched => state = AckWait::Matched(len.min(MAX_LINK_FRAME)),
                    Reply::Stray => log::trace!("Reliable ACK wait: discarded {} byte frame", len),
                    Reply::Suspect(errors) => {
                        log::trace!("Reliable ACK wait: discarded {} byte frame [{}]", len, errors);
                        status.errors |= errors;
                    }
                    Reply::Rejected(errors) => {
                        status.errors |= errors;
                        return Err(ReliableError::new(status));
                    }
                },
                Err(e) if e.is_transient() => continue,
                Err(e) => {
                    log::warn!("Reliable ACK wait aborted: {:?}", e);
                    status.errors |= ReliableErrors::ACK;
                    return Err(ReliableError::from_link(status, e));
                }
            }
        }

        match state {
            AckWait::Matched(len) => Ok(len),
            _ => {
                log::debug!("Reliable ACK wait: no ACK within {} ms", timeout_ms);
                status.errors |= ReliableErrors::ACK | ReliableErrors::TIMEOUT;
                Err(ReliableError::new(status))
            }
        }
    }
}

/// Validate a received reliable frame
///
/// Returns the payload and trailer, or every check that failed. Size errors
/// are final; CRC and ID mismatches are reported together.
pub(crate) fn check_frame(
    frame: &[u8],
    capacity: usize,
    network_id: u16,
    config: ReliableConfig,
) -> Result<(&[u8], Trailer), ReliableErrors> {
    let (payload, trailer) = Trailer::split_frame(frame).ok_or(ReliableErrors::SIZE)?;

    if payload.len() > capacity {
        return Err(ReliableErrors::SIZE);
    }

    let mut errors = ReliableErrors::empty();
    if config.crc_enabled() && payload_crc(payload, config) != trailer.payload_crc {
        errors |= ReliableErrors::CRC;
    }
    if trailer.network_id != network_id {
        errors |= ReliableErrors::ID;
    }

    if errors.is_empty() {
        Ok((payload, trailer))
    } else {
        Err(errors)
    }
}

pub(crate) fn log_rx(len: usize, trailer: Trailer, quality: Option<SignalQuality>) {
    match quality {
        Some(q) => log::debug!(
            "Reliable RX: {} bytes, network ID {:#06x} (RSSI: {}, SNR: {})",
            len,
            trailer.network_id,
            q.rssi,
            q.snr
        ),
        None => log::debug!("Reliable RX: {} bytes, network ID {:#06x}", len, trailer.network_id),
    }
}
