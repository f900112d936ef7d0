#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Reliable packet transport for LoRa radio links
//!
//! Every payload travels with a 4-byte trailer holding a 16-bit network ID and
//! a CRC-16/CCITT of the payload. Receivers drop frames meant for other
//! networks or damaged in flight, and senders can wait for an ACK that echoes
//! the trailer back.

#[macro_use]
mod bitset;

pub mod config;
pub mod link;
pub mod protocol;
pub mod transport;

pub use config::ReliableConfig;
pub use link::{Clock, LinkError, RadioLink, SignalQuality};
pub use protocol::{ReliableError, ReliableErrors, ReliableFlags, Status, Trailer};
pub use transport::{Received, ReliableTransport, Sent, SplitReceived};
