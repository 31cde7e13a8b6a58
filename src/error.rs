//! Error types shared by every slot operation.

use core::fmt;

use crate::config::ConfigError;
use crate::entropy::EntropyError;

/// Errors returned by slot, registry and engine operations.
///
/// Every error is local to the call that produced it; none of them leave the
/// engine or another slot in a corrupted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    /// The slot already has an open session.
    Busy,
    /// Operation is not valid for the slot's current pending/cursor state,
    /// or the session token is stale.
    InvalidState,
    /// Submitted credential length differs from the issued credential.
    LengthMismatch,
    /// Comparator rejected the submission. The credential stays pending.
    Mismatch,
    /// Requested active count is outside `[1, max_slots]`.
    OutOfRange,
    /// No credential material could be produced.
    Unavailable,
    /// The pending credential outlived the configured expiration window.
    Expired,
    /// Slot index is not currently active.
    UnknownSlot(usize),
    /// Unrecognised raw control code.
    InvalidCommand(u32),
    /// Rejected configuration.
    Config(ConfigError),
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpError::Busy => write!(f, "slot is already open"),
            OtpError::InvalidState => write!(f, "operation invalid in current slot state"),
            OtpError::LengthMismatch => write!(f, "submitted credential has the wrong length"),
            OtpError::Mismatch => write!(f, "submitted credential does not match"),
            OtpError::OutOfRange => write!(f, "slot count out of range"),
            OtpError::Unavailable => write!(f, "no credential material available"),
            OtpError::Expired => write!(f, "pending credential has expired"),
            OtpError::UnknownSlot(slot) => write!(f, "slot {} is not active", slot),
            OtpError::InvalidCommand(code) => write!(f, "invalid control command {}", code),
            OtpError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for OtpError {}

impl From<ConfigError> for OtpError {
    fn from(e: ConfigError) -> Self {
        OtpError::Config(e)
    }
}

impl From<EntropyError> for OtpError {
    fn from(_: EntropyError) -> Self {
        OtpError::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(OtpError::UnknownSlot(7).to_string(), "slot 7 is not active");
        assert_eq!(
            OtpError::from(ConfigError::EmptyPassword).to_string(),
            "invalid configuration: password list contains an empty entry"
        );
    }

    #[test]
    fn test_entropy_maps_to_unavailable() {
        assert_eq!(OtpError::from(EntropyError::CollectionFailed), OtpError::Unavailable);
    }
}
