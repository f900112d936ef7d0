//! Millisecond time source for bounded waits
//!
//! Timestamps are free-running `u32` millisecond counters that wrap. Elapsed
//! time is always `now.wrapping_sub(start)`, which stays correct across the
//! wrap as long as a single wait is shorter than about 49 days.

use core::future::Future;

/// Monotonic millisecond clock with a cooperative delay
pub trait Clock {
    /// Current counter value in milliseconds
    fn now_ms(&self) -> u32;

    /// Wait for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) -> impl Future<Output = ()>;

    /// Milliseconds since `start`, wraparound-safe
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap
        embassy_time::Instant::now().as_millis() as u32
    }

    async fn delay_ms(&mut self, ms: u32) {
        embassy_time::Timer::after(embassy_time::Duration::from_millis(ms as u64)).await;
    }
}

/// Clock for hosted builds
///
/// `delay_ms` blocks the calling thread, which suits a blocking executor such
/// as `futures::executor::block_on`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }

    async fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
