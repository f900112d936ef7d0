pub mod checksum;
pub mod status;
pub mod trailer;

pub use checksum::{crc16, payload_crc};
pub use status::{ReliableError, ReliableErrors, ReliableFlags, Status};
pub use trailer::{decode_trailer, encode_trailer, Trailer};
