//! Loopback control.
//!
//! Command-line forms understood by `xloop` (positional arguments only):
//!
//! | arguments     | effect                                   |
//! |---------------|------------------------------------------|
//! | `set`         | loopback on, ports 0..8                  |
//! | `clear`       | loopback off, ports 0..8                 |
//! | `port loop`   | `loop == 0` clears `port`, else sets it  |
//!
//! `port` and `loop` are read the way C `atoi` reads them: the leading
//! integer, or 0 when there is none. A negative port wraps to a large index
//! and is rejected by the device, not the parser. Any other argument count,
//! or an unknown single word, is a usage error and must not touch the device.

use crate::device::CardDevice;
use crate::error::{DeviceError, UsageError};
use crate::PORT_COUNT;

pub const LOOPBACK_USAGE: &str = "Usage: xloop port 1/0\n       xloop set|clear";

/// A parsed loopback request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopbackCommand {
    /// Apply the same setting to every port.
    All(bool),
    /// Set or clear a single port.
    Port { port: u32, enable: bool },
}

impl LoopbackCommand {
    /// Parse the positional arguments (program name excluded).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, UsageError> {
        match args {
            [mode] => match mode.as_ref() {
                "set" => Ok(Self::All(true)),
                "clear" => Ok(Self::All(false)),
                other => Err(UsageError::UnknownMode(other.to_string())),
            },
            [port, loop_flag] => Ok(Self::Port {
                port: atoi(port.as_ref()) as u32,
                enable: atoi(loop_flag.as_ref()) != 0,
            }),
            _ => Err(UsageError::ArgumentCount(args.len())),
        }
    }

    /// Issue the driver calls for this command.
    ///
    /// Stops at the first failing call.
    pub fn apply<D: CardDevice + ?Sized>(&self, device: &mut D) -> Result<(), DeviceError> {
        match *self {
            Self::All(enable) => {
                for port in 0..PORT_COUNT {
                    write_port(device, port, enable)?;
                }
                log::info!(
                    "loopback {} on all {} ports",
                    if enable { "set" } else { "cleared" },
                    PORT_COUNT
                );
            }
            Self::Port { port, enable } => {
                write_port(device, port, enable)?;
                log::info!(
                    "loopback {} on port {}",
                    if enable { "set" } else { "cleared" },
                    port
                );
            }
        }
        Ok(())
    }
}

/// What `run` did with a command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopbackRun {
    /// The arguments were not understood; the device was never opened.
    Usage(UsageError),
    Applied(LoopbackCommand),
}

/// Parse `args`, then open the device and apply the command.
///
/// `open` runs only for a well-formed command line. The device is dropped
/// (closed) before returning on every path.
pub fn run<S, D, F, E>(args: &[S], open: F) -> Result<LoopbackRun, E>
where
    S: AsRef<str>,
    D: CardDevice,
    F: FnOnce() -> Result<D, E>,
    E: From<DeviceError>,
{
    let command = match LoopbackCommand::from_args(args) {
        Ok(command) => command,
        Err(usage) => return Ok(LoopbackRun::Usage(usage)),
    };
    let mut device = open()?;
    command.apply(&mut device)?;
    Ok(LoopbackRun::Applied(command))
}

fn write_port<D: CardDevice + ?Sized>(
    device: &mut D,
    port: u32,
    enable: bool,
) -> Result<(), DeviceError> {
    if enable {
        device.set_loopback(port)
    } else {
        device.clear_loopback(port)
    }
}

/// Leading decimal integer of `value`, 0 if there is none.
fn atoi(value: &str) -> i32 {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, d| acc.wrapping_mul(10).wrapping_add(i32::from(d - b'0')));
    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}
