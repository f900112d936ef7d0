//! CRC-16/CCITT checksum over reliable payloads
//!
//! Polynomial 0x1021, no reflection, no final XOR. The seed is supplied by the
//! caller; reliable frames always use [`CRC_SEED`] (0xFFFF), which makes the
//! result the CCITT-FALSE variant.

use crate::config::protocol::{CRC_SEED, NO_CRC_PLACEHOLDER};
use crate::config::ReliableConfig;
use crc::{Crc, CRC_16_XMODEM};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculate CRC-16/CCITT over `bytes`, starting from `seed`
pub fn crc16(bytes: &[u8], seed: u16) -> u16 {
    let mut digest = CRC.digest_with_initial(seed);
    digest.update(bytes);
    digest.finalize()
}

/// CRC carried in the trailer for `payload` under `config`
///
/// Returns the fixed placeholder when CRC checking is disabled.
pub fn payload_crc(payload: &[u8], config: ReliableConfig) -> u16 {
    if config.crc_enabled() {
        crc16(payload, CRC_SEED)
    } else {
        NO_CRC_PLACEHOLDER
    }
}
