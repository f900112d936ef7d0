pub mod clock;
pub mod traits;

pub use clock::Clock;
#[cfg(feature = "embassy")]
pub use clock::EmbassyClock;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use traits::{LinkError, RadioLink, SignalQuality};
