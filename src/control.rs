//! The consumer-facing control command.

use axerrno::LinuxError;

use crate::binding::UioBinding;

/// Argument of [`UIO_MSIX_DATA`]: bind notifier `fd` to MSI-X `vector`.
///
/// A negative `fd` disables interrupt delivery instead.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UioMsixData {
    pub fd: i32,
    pub vector: u32,
}

const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    (1 << 30) | ((size as u32) << 16) | ((ty as u32) << 8) | nr as u32
}

/// Binds a notifier to a vector. Encoded as `_IOW('u', 1, UioMsixData)`.
pub const UIO_MSIX_DATA: u32 = iow(b'u', 1, core::mem::size_of::<UioMsixData>());

impl UioBinding {
    /// Executes control command `cmd`.
    ///
    /// Returns 0 on success or a negative errno, ready to hand back to the
    /// consumer.
    pub fn ioctl(&self, cmd: u32, arg: &UioMsixData) -> i32 {
        match cmd {
            UIO_MSIX_DATA => match self.bind_notification(arg.vector, arg.fd) {
                Ok(()) => 0,
                Err(err) => {
                    debug!("uio{}: UIO_MSIX_DATA {:?} failed: {}", self.minor(), arg, err);
                    err.errno()
                }
            },
            _ => {
                warn!("Not support ioctl cmd: {:#x}", cmd);
                -LinuxError::EOPNOTSUPP.code()
            }
        }
    }
}
