//! Card device backends.
//!
//! The kernel driver is an external collaborator. This module exposes the
//! narrow synchronous interface the tools need:
//! - `PgpCard`: the real driver, reached through its character device node
//! - `SyntheticCard`: a `stub://` card for running the tools without hardware
//!
//! Closing the device is `Drop`.

#[cfg(target_os = "linux")]
pub mod pgpcard;
pub mod stub;

#[cfg(target_os = "linux")]
pub use pgpcard::PgpCard;
pub use stub::{StubConfig, SyntheticCard};

use crate::error::DeviceError;
use crate::frame::{RecvOutcome, RxBuffer};

/// Prefix that selects the synthetic backend.
pub const STUB_SCHEME: &str = "stub://";

/// Driver operations used by the loopback and read tools.
pub trait CardDevice {
    /// Enable loopback on one port.
    fn set_loopback(&mut self, port: u32) -> Result<(), DeviceError>;

    /// Disable loopback on one port.
    fn clear_loopback(&mut self, port: u32) -> Result<(), DeviceError>;

    /// Block until the next frame is available or the stream ends.
    ///
    /// On `Delivered`, the first `len` words of `buffer` hold the payload and
    /// `len <= buffer.capacity()`.
    fn receive(&mut self, buffer: &mut RxBuffer) -> Result<RecvOutcome, DeviceError>;
}

impl<D: CardDevice + ?Sized> CardDevice for Box<D> {
    fn set_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        (**self).set_loopback(port)
    }

    fn clear_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        (**self).clear_loopback(port)
    }

    fn receive(&mut self, buffer: &mut RxBuffer) -> Result<RecvOutcome, DeviceError> {
        (**self).receive(buffer)
    }
}

/// Open the device named by `path`.
///
/// `stub://...` paths open a synthetic card; anything else is treated as a
/// driver device node and opened read/write.
pub fn open_device(path: &str) -> Result<Box<dyn CardDevice>, DeviceError> {
    if path.starts_with(STUB_SCHEME) {
        let config = StubConfig::parse(path)?;
        return Ok(Box::new(SyntheticCard::new(config)));
    }
    open_driver(path)
}

#[cfg(target_os = "linux")]
fn open_driver(path: &str) -> Result<Box<dyn CardDevice>, DeviceError> {
    Ok(Box::new(PgpCard::open(path)?))
}

#[cfg(not(target_os = "linux"))]
fn open_driver(path: &str) -> Result<Box<dyn CardDevice>, DeviceError> {
    Err(DeviceError::Unsupported(path.to_string()))
}
