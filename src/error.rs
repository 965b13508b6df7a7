//! Error taxonomy for claim, bind and control operations.
//!
//! Collaborator traits report failures as [`AxError`]; the binding layer wraps
//! them in [`UioError::Platform`] so callers can tell a refused device apart
//! from a platform that ran out of vectors.

use core::fmt;

use axerrno::{AxError, LinuxError};

/// Errors reported by the interrupt binding subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UioError {
    /// The device has a legacy line but cannot mask INTx at the device level.
    UnsupportedDevice,
    /// The hardware refused to provide the requested interrupt vectors.
    Capability,
    /// Table memory or the requested vector count could not be granted.
    Allocation,
    /// A vector index outside the table was addressed.
    OutOfRange,
    /// An external notifier identifier did not resolve.
    InvalidHandle,
    /// Vector delivery was disabled by the consumer.
    DeliveryDisabled,
    /// The binding is being torn down or the operation does not apply to its mode.
    BadState,
    /// A platform collaborator failed.
    Platform(AxError),
}

/// A specialized [`Result`] type for binding operations.
pub type UioResult<T = ()> = Result<T, UioError>;

impl UioError {
    /// Returns the negative Linux errno reported through the command surface.
    pub fn errno(self) -> i32 {
        let err = match self {
            Self::UnsupportedDevice | Self::BadState => LinuxError::ENODEV,
            Self::Capability | Self::OutOfRange | Self::InvalidHandle | Self::DeliveryDisabled => {
                LinuxError::EINVAL
            }
            Self::Allocation => LinuxError::ENOMEM,
            Self::Platform(err) => LinuxError::from(err),
        };
        -err.code()
    }
}

impl From<AxError> for UioError {
    fn from(err: AxError) -> Self {
        Self::Platform(err)
    }
}

impl From<UioError> for AxError {
    fn from(err: UioError) -> Self {
        match err {
            UioError::UnsupportedDevice => AxError::Unsupported,
            UioError::Capability | UioError::OutOfRange | UioError::InvalidHandle => {
                AxError::InvalidInput
            }
            UioError::Allocation => AxError::NoMemory,
            UioError::DeliveryDisabled | UioError::BadState => AxError::BadState,
            UioError::Platform(err) => err,
        }
    }
}

impl fmt::Display for UioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDevice => f.write_str("device does not support INTx masking"),
            Self::Capability => f.write_str("device cannot provide the requested vectors"),
            Self::Allocation => f.write_str("vector allocation failed"),
            Self::OutOfRange => f.write_str("vector index out of range"),
            Self::InvalidHandle => f.write_str("notifier identifier does not resolve"),
            Self::DeliveryDisabled => f.write_str("vector delivery is disabled"),
            Self::BadState => f.write_str("binding is not active"),
            Self::Platform(err) => write!(f, "platform error: {:?}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(UioError::OutOfRange.errno(), -(LinuxError::EINVAL.code()));
        assert_eq!(UioError::InvalidHandle.errno(), -(LinuxError::EINVAL.code()));
        assert_eq!(UioError::UnsupportedDevice.errno(), -(LinuxError::ENODEV.code()));
        assert_eq!(UioError::Allocation.errno(), -(LinuxError::ENOMEM.code()));
        assert!(UioError::Platform(AxError::ResourceBusy).errno() < 0);
    }

    #[test]
    fn test_ax_error_round_trip() {
        let err: UioError = AxError::ResourceBusy.into();
        assert_eq!(err, UioError::Platform(AxError::ResourceBusy));
        assert_eq!(AxError::from(err), AxError::ResourceBusy);
        assert_eq!(AxError::from(UioError::Allocation), AxError::NoMemory);
    }
}
