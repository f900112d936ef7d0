pub mod reliable;
pub mod split;

pub use reliable::{Received, ReliableTransport, Sent};
pub use split::SplitReceived;
