//! Radio link trait for abstraction and testability
//!
//! This trait is the only thing the reliable transport needs from a radio:
//! raw framed send and receive with a timeout. Each chip driver implements it,
//! and tests use the mock below.

use core::future::Future;

/// Errors that can occur during raw link operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Operation timed out
    Timeout,
    /// Packet header was invalid
    HeaderError,
    /// Physical-layer CRC error in received packet
    CrcError,
    /// Transmission failed
    TransmitFailed,
    /// Reception failed
    ReceiveFailed,
    /// Invalid configuration or frame length
    InvalidConfig,
    /// Radio busy timeout
    BusyTimeout,
    /// SPI communication error
    SpiError,
    /// Radio not initialised
    NotInitialised,
}

impl LinkError {
    /// True for failures that only affect the current frame
    ///
    /// A listener can re-arm receive and keep waiting after these.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            LinkError::Timeout | LinkError::HeaderError | LinkError::CrcError | LinkError::ReceiveFailed
        )
    }
}

/// Channel quality of the last received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    /// Received Signal Strength Indicator in dBm
    pub rssi: i16,
    /// Signal-to-Noise Ratio in dB
    pub snr: i8,
}

/// Raw framed radio interface
///
/// Timeouts are in milliseconds. Every call must return once its timeout has
/// elapsed; a link never blocks without bound.
pub trait RadioLink {
    /// Largest frame, in bytes, the link can send or receive
    fn max_payload_size(&self) -> usize;

    /// Set the transmit power used by following transmissions
    fn set_tx_power(&mut self, power_dbm: i8) -> impl Future<Output = Result<(), LinkError>>;

    /// Transmit one frame
    ///
    /// Returns the number of bytes sent.
    fn transmit_raw(&mut self, data: &[u8], timeout_ms: u32) -> impl Future<Output = Result<usize, LinkError>>;

    /// Receive one frame into `buffer`
    ///
    /// Returns the number of bytes written. Frames longer than `buffer` are
    /// truncated.
    fn receive_raw(&mut self, buffer: &mut [u8], timeout_ms: u32) -> impl Future<Output = Result<usize, LinkError>>;

    /// RSSI and SNR of the last received frame, if the link measures them
    fn signal_quality(&self) -> Option<SignalQuality> {
        None
    }
}

#[cfg(test)]
pub mod mock {
    //! Mock radio link for testing

    use super::*;
    use crate::config::protocol::MAX_LINK_FRAME;
    use crate::link::clock::mock::MockClock;
    use heapless::Vec;

    /// Frame buffer used by the mock
    pub type Frame = Vec<u8, MAX_LINK_FRAME>;

    /// Something the mock will hand to the next receive call
    #[derive(Debug, Clone)]
    struct RxEvent {
        /// Milliseconds until the event happens, counted from the receive call
        delay_ms: u32,
        result: Result<Frame, LinkError>,
    }

    /// Transmitted frame with the power it was sent at
    #[derive(Debug, Clone)]
    pub struct TxRecord {
        pub data: Frame,
        pub power_dbm: Option<i8>,
    }

    /// Mock radio link for unit testing
    ///
    /// Time passes on the shared [`MockClock`]: a receive that waits for a
    /// delayed frame or runs into its timeout advances the clock accordingly.
    pub struct MockRadioLink {
        clock: MockClock,
        max_payload: usize,
        /// Events queued to be returned by receive_raw()
        rx_queue: Vec<RxEvent, 16>,
        /// Record of transmitted frames
        tx_history: Vec<TxRecord, 16>,
        /// Error to return on next transmit
        next_tx_error: Option<LinkError>,
        /// Time each transmission takes
        airtime_ms: u32,
        tx_power: Option<i8>,
        quality: Option<SignalQuality>,
        rx_calls: usize,
    }

    impl MockRadioLink {
        /// Create a new mock link carrying up to 255-byte frames
        pub fn new(clock: MockClock) -> Self {
            Self {
                clock,
                max_payload: MAX_LINK_FRAME,
                rx_queue: Vec::new(),
                tx_history: Vec::new(),
                next_tx_error: None,
                airtime_ms: 0,
                tx_power: None,
                quality: None,
                rx_calls: 0,
            }
        }

        /// Limit the frame size the link reports
        pub fn with_max_payload(mut self, max_payload: usize) -> Self {
            self.max_payload = max_payload;
            self
        }

        /// Make every transmission take `airtime_ms`
        pub fn with_airtime(mut self, airtime_ms: u32) -> Self {
            self.airtime_ms = airtime_ms;
            self
        }

        /// Report this signal quality after receiving
        pub fn with_signal_quality(mut self, rssi: i16, snr: i8) -> Self {
            self.quality = Some(SignalQuality { rssi, snr });
            self
        }

        /// Queue a frame to be returned by the next receive_raw() call
        pub fn queue_rx_frame(&mut self, data: &[u8]) {
            self.queue_rx_frame_after(0, data);
        }

        /// Queue a frame that arrives `delay_ms` after the receive call starts
        pub fn queue_rx_frame_after(&mut self, delay_ms: u32, data: &[u8]) {
            let mut frame = Frame::new();
            let _ = frame.extend_from_slice(data);
            let _ = self.rx_queue.push(RxEvent {
                delay_ms,
                result: Ok(frame),
            });
        }

        /// Queue an error to be returned by a receive_raw() call
        pub fn queue_rx_error(&mut self, error: LinkError) {
            let _ = self.rx_queue.push(RxEvent {
                delay_ms: 0,
                result: Err(error),
            });
        }

        /// Set an error to be returned by the next transmit_raw() call
        pub fn set_next_tx_error(&mut self, error: LinkError) {
            self.next_tx_error = Some(error);
        }

        /// Get all transmitted frames
        pub fn tx_history(&self) -> &[TxRecord] {
            &self.tx_history
        }

        /// Number of transmit_raw() calls that reached the air
        pub fn tx_count(&self) -> usize {
            self.tx_history.len()
        }

        /// Number of receive_raw() calls made
        pub fn rx_calls(&self) -> usize {
            self.rx_calls
        }

        /// Events still waiting to be received
        pub fn pending_rx(&self) -> usize {
            self.rx_queue.len()
        }
    }

    impl RadioLink for MockRadioLink {
        fn max_payload_size(&self) -> usize {
            self.max_payload
        }

        async fn set_tx_power(&mut self, power_dbm: i8) -> Result<(), LinkError> {
            self.tx_power = Some(power_dbm);
            Ok(())
        }

        async fn transmit_raw(&mut self, data: &[u8], timeout_ms: u32) -> Result<usize, LinkError> {
            if let Some(error) = self.next_tx_error.take() {
                if error == LinkError::Timeout {
                    self.clock.advance(timeout_ms);
                }
                return Err(error);
            }

            if data.len() > self.max_payload {
                return Err(LinkError::InvalidConfig);
            }

            let mut frame = Frame::new();
            frame
                .extend_from_slice(data)
                .map_err(|_| LinkError::TransmitFailed)?;
            let _ = self.tx_history.push(TxRecord {
                data: frame,
                power_dbm: self.tx_power,
            });
            self.clock.advance(self.airtime_ms);

            Ok(data.len())
        }

        async fn receive_raw(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, LinkError> {
            self.rx_calls += 1;

            if self.rx_queue.is_empty() {
                self.clock.advance(timeout_ms);
                return Err(LinkError::Timeout);
            }

            // Event arrives after this call gives up
            if self.rx_queue[0].delay_ms > timeout_ms {
                self.rx_queue[0].delay_ms -= timeout_ms;
                self.clock.advance(timeout_ms);
                return Err(LinkError::Timeout);
            }

            // Pop from front (FIFO order)
            let event = self.rx_queue.remove(0);
            self.clock.advance(event.delay_ms);

            let frame = event.result?;
            let count = core::cmp::min(buffer.len(), frame.len());
            buffer[..count].copy_from_slice(&frame[..count]);
            Ok(count)
        }

        fn signal_quality(&self) -> Option<SignalQuality> {
            self.quality
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::link::clock::Clock;

        #[test]
        fn test_mock_transmit() {
            let mut link = MockRadioLink::new(MockClock::new());

            futures::executor::block_on(async {
                link.set_tx_power(10).await.unwrap();
                let sent = link.transmit_raw(&[0x01, 0x02, 0x03], 1000).await.unwrap();

                assert_eq!(sent, 3);
                assert_eq!(link.tx_count(), 1);
                assert_eq!(link.tx_history()[0].data.as_slice(), &[0x01, 0x02, 0x03]);
                assert_eq!(link.tx_history()[0].power_dbm, Some(10));
            });
        }

        #[test]
        fn test_mock_receive_truncates() {
            let mut link = MockRadioLink::new(MockClock::new());

            futures::executor::block_on(async {
                link.queue_rx_frame(&[0x48, 0x65, 0x6C, 0x6C, 0x6F]);

                let mut buf = [0u8; 3];
                let count = link.receive_raw(&mut buf, 1000).await.unwrap();
                assert_eq!(count, 3);
                assert_eq!(&buf, &[0x48, 0x65, 0x6C]);
            });
        }

        #[test]
        fn test_mock_receive_timeout_advances_clock() {
            let clock = MockClock::new();
            let mut link = MockRadioLink::new(clock.clone());

            futures::executor::block_on(async {
                let mut buf = [0u8; 16];
                let result = link.receive_raw(&mut buf, 250).await;
                assert_eq!(result, Err(LinkError::Timeout));
                assert_eq!(clock.now_ms(), 250);
            });
        }

        #[test]
        fn test_mock_delayed_frame() {
            let clock = MockClock::new();
            let mut link = MockRadioLink::new(clock.clone());

            futures::executor::block_on(async {
                link.queue_rx_frame_after(300, &[0xAA]);
                let mut buf = [0u8; 16];

                // Not there yet
                assert_eq!(link.receive_raw(&mut buf, 200).await, Err(LinkError::Timeout));
                assert_eq!(clock.now_ms(), 200);

                // Arrives 100 ms into the next call
                assert_eq!(link.receive_raw(&mut buf, 200).await, Ok(1));
                assert_eq!(clock.now_ms(), 300);
                assert_eq!(link.rx_calls(), 2);
            });
        }

        #[test]
        fn test_mock_tx_error() {
            let mut link = MockRadioLink::new(MockClock::new());

            futures::executor::block_on(async {
                link.set_next_tx_error(LinkError::TransmitFailed);

                let result = link.transmit_raw(&[0x01], 1000).await;
                assert_eq!(result, Err(LinkError::TransmitFailed));

                // Error should be cleared, next call should succeed
                link.transmit_raw(&[0x02], 1000).await.unwrap();
                assert_eq!(link.tx_count(), 1);
            });
        }
    }
}
