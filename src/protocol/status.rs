//! Per-call outcome bitsets
//!
//! Every transport call starts from an empty [`Status`] and returns it, either
//! inside its success value or inside a [`ReliableError`]. Nothing is kept
//! between calls.

use crate::link::LinkError;
use core::fmt;

bitset! {
    /// Failure kinds raised by one transport call
    pub struct ReliableErrors {
        /// Payload CRC mismatch, or a CRC/header failure reported by the link
        const CRC = 0, "ReliableCRCError";
        /// Received network ID differs from the expected one
        const ID = 1, "ReliableIDError";
        /// Payload, header or frame does not fit
        const SIZE = 2, "ReliableSizeError";
        /// No matching ACK, or the ACK could not be sent
        const ACK = 3, "NoReliableACK";
        /// Link primitive or ACK wait ran out of time
        const TIMEOUT = 4, "ReliableTimeout";
    }
}

bitset! {
    /// Successful-outcome markers raised by one transport call
    pub struct ReliableFlags {
        const ACK_SENT = 0, "ACKsent";
        const ACK_RECEIVED = 1, "ACKreceived";
    }
}

/// Errors and flags gathered during a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub errors: ReliableErrors,
    pub flags: ReliableFlags,
}

impl Status {
    pub const fn new() -> Self {
        Self {
            errors: ReliableErrors::empty(),
            flags: ReliableFlags::empty(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.errors.is_empty(), self.flags.is_empty()) {
            (true, true) => f.write_str("OK"),
            (false, true) => write!(f, "{}", self.errors),
            (true, false) => write!(f, "{}", self.flags),
            (false, false) => write!(f, "{},{}", self.errors, self.flags),
        }
    }
}

/// Failed transport call
///
/// Carries the aggregated error bits, any flags raised before the failure, and
/// the link error when the radio itself caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliableError {
    pub status: Status,
    pub link: Option<LinkError>,
}

impl ReliableError {
    pub(crate) fn new(status: Status) -> Self {
        Self { status, link: None }
    }

    pub(crate) fn from_link(mut status: Status, error: LinkError) -> Self {
        status.errors |= link_error_kind(error);
        Self {
            status,
            link: Some(error),
        }
    }

    pub fn errors(&self) -> ReliableErrors {
        self.status.errors
    }

    pub fn flags(&self) -> ReliableFlags {
        self.status.flags
    }

    /// True if every bit of `errors` was raised
    pub fn contains(&self, errors: ReliableErrors) -> bool {
        self.status.errors.contains(errors)
    }
}

impl fmt::Display for ReliableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(link) = self.link {
            write!(f, " (link: {:?})", link)?;
        }
        Ok(())
    }
}

/// Reliable error kind for a failure reported by the link
///
/// Physical-layer corruption is reported as a CRC error. Faults outside the
/// taxonomy map to no bit and are only visible through `ReliableError::link`.
pub(crate) fn link_error_kind(error: LinkError) -> ReliableErrors {
    match error {
        LinkError::Timeout | LinkError::BusyTimeout => ReliableErrors::TIMEOUT,
        LinkError::CrcError | LinkError::HeaderError => ReliableErrors::CRC,
        _ => ReliableErrors::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_aggregate() {
        let mut errors = ReliableErrors::empty();
        errors |= ReliableErrors::CRC;
        errors.insert(ReliableErrors::ID);

        assert!(errors.contains(ReliableErrors::CRC | ReliableErrors::ID));
        assert!(!errors.contains(ReliableErrors::SIZE));
        assert!(errors.intersects(ReliableErrors::ID | ReliableErrors::ACK));
        assert_eq!(errors.bits(), 0b0000_0011);
    }

    #[test]
    fn test_display_lists_names() {
        let errors = ReliableErrors::ACK | ReliableErrors::TIMEOUT;
        assert_eq!(std::format!("{}", errors), "NoReliableACK,ReliableTimeout");
        assert_eq!(std::format!("{}", ReliableFlags::ACK_SENT), "ACKsent");
    }

    #[test]
    fn test_status_display() {
        let mut status = Status::new();
        assert_eq!(std::format!("{}", status), "OK");

        status.errors |= ReliableErrors::ACK;
        status.flags |= ReliableFlags::ACK_SENT;
        assert_eq!(std::format!("{}", status), "NoReliableACK,ACKsent");
    }

    #[test]
    fn test_link_error_mapping() {
        assert_eq!(link_error_kind(LinkError::Timeout), ReliableErrors::TIMEOUT);
        assert_eq!(link_error_kind(LinkError::HeaderError), ReliableErrors::CRC);
        assert_eq!(link_error_kind(LinkError::CrcError), ReliableErrors::CRC);
        assert!(link_error_kind(LinkError::SpiError).is_empty());
    }

    #[test]
    fn test_error_from_link_keeps_flags() {
        let mut status = Status::new();
        status.flags |= ReliableFlags::ACK_SENT;

        let error = ReliableError::from_link(status, LinkError::Timeout);
        assert!(error.contains(ReliableErrors::TIMEOUT));
        assert_eq!(error.flags(), ReliableFlags::ACK_SENT);
        assert_eq!(error.link, Some(LinkError::Timeout));
    }
}
