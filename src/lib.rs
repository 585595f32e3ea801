//! PGP Gen3 card utilities
//!
//! Library behind the `xloop` and `xread` tools. Both open the character
//! device exposed by the PGP Gen3 PCIe card driver and issue simple
//! operations through it:
//!
//! - `xloop` toggles per-port loopback bits (all ports, or one port).
//! - `xread` drains DMA-received frames and reports their metadata.
//!
//! The kernel driver, its DMA ring and register map are external. This crate
//! only speaks the driver's narrow synchronous interface.
//!
//! # Module Structure
//!
//! - `device`: `CardDevice` trait, the driver backend and a `stub://` card
//! - `frame`: frame metadata, receive outcome, reusable receive buffer
//! - `drain`: the frame drain loop and its report format
//! - `loopback`: loopback command parsing and application
//! - `config`: device path and drain options (file + env + flags)
//! - `error`: `DeviceError` and `UsageError`

pub mod config;
pub mod device;
pub mod drain;
pub mod error;
pub mod frame;
pub mod loopback;

pub use config::DeviceConfig;
pub use device::{open_device, CardDevice, StubConfig, SyntheticCard};
pub use drain::{
    drain_frames, read_device, write_frame_report, DrainError, DrainOptions, DrainSummary,
};
pub use error::{DeviceError, UsageError};
pub use frame::{FrameMeta, RecvOutcome, RxBuffer, DEFAULT_MAX_WORDS};
pub use loopback::{LoopbackCommand, LoopbackRun, LOOPBACK_USAGE};

#[cfg(target_os = "linux")]
pub use device::PgpCard;

/// Number of PGP ports on the card.
pub const PORT_COUNT: u32 = 8;

/// Default device node of the first card.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/PgpCardG3_0";
