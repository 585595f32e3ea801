//! PGP Gen3 card driver backend.
//!
//! The driver does not use ioctl for data-path or loopback commands. Instead
//! the caller passes a command record to `write(2)` (transmit and control)
//! or a receive record to `read(2)`. Both records embed a user-space pointer
//! to a word buffer, so their layout must match the driver's C structs.
//!
//! The `read` return value is the received length in words: > 0 for a
//! frame, 0 when nothing is left, < 0 on error (errno set).

use std::fs::{File, OpenOptions};
use std::io;
use std::mem::size_of;
use std::os::unix::io::AsRawFd;

use crate::device::CardDevice;
use crate::error::DeviceError;
use crate::frame::{FrameMeta, RecvOutcome, RxBuffer};
use crate::PORT_COUNT;

/// Loopback enable command.
pub const CMD_SET_LOOP: u32 = 4;
/// Loopback disable command.
pub const CMD_CLR_LOOP: u32 = 5;

/// Pointer width in bytes; the driver uses it to pick 32/64-bit record layouts.
const MODEL: u32 = size_of::<*mut u32>() as u32;

/// Transmit/control record (`PgpCardTx`).
#[repr(C)]
#[derive(Debug)]
pub struct TxRecord {
    pub model: u32,
    pub cmd: u32,
    /// Buffer pointer for writes; the port number for loopback commands.
    pub data: *mut u32,
    pub lane: u32,
    pub vc: u32,
    pub size: u32,
}

/// Receive record (`PgpCardRx`), filled in by the driver.
#[repr(C)]
#[derive(Debug)]
pub struct RxRecord {
    pub model: u32,
    pub max_size: u32,
    pub data: *mut u32,
    pub lane: u32,
    pub vc: u32,
    pub rx_size: u32,
    pub eofe: u32,
    pub fifo_err: u32,
    pub length_err: u32,
}

impl TxRecord {
    fn loopback(cmd: u32, port: u32) -> Self {
        Self {
            model: MODEL,
            cmd,
            data: port as usize as *mut u32,
            lane: 0,
            vc: 0,
            size: 0,
        }
    }
}

/// Open handle to a `/dev/PgpCardG3_*` node. Closed on drop.
#[derive(Debug)]
pub struct PgpCard {
    file: File,
    path: String,
}

impl PgpCard {
    pub fn open(path: &str) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| DeviceError::Open {
                path: path.to_string(),
                source,
            })?;
        log::info!("PgpCard: opened {}", path);
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    fn loopback_command(
        &mut self,
        op: &'static str,
        cmd: u32,
        port: u32,
    ) -> Result<(), DeviceError> {
        if port >= PORT_COUNT {
            return Err(DeviceError::InvalidPort(port));
        }
        let record = TxRecord::loopback(cmd, port);
        // SAFETY: `record` is a live repr(C) value for the duration of the
        // call; the driver only reads `size_of::<TxRecord>()` bytes from it.
        let ret = unsafe {
            libc::write(
                self.file.as_raw_fd(),
                &record as *const TxRecord as *const libc::c_void,
                size_of::<TxRecord>(),
            )
        };
        if ret < 0 {
            return Err(DeviceError::Command {
                op,
                port,
                source: io::Error::last_os_error(),
            });
        }
        log::debug!("PgpCard: {} port {} on {}", op, port, self.path);
        Ok(())
    }
}

impl CardDevice for PgpCard {
    fn set_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        self.loopback_command("set_loopback", CMD_SET_LOOP, port)
    }

    fn clear_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        self.loopback_command("clear_loopback", CMD_CLR_LOOP, port)
    }

    fn receive(&mut self, buffer: &mut RxBuffer) -> Result<RecvOutcome, DeviceError> {
        let capacity = buffer.capacity();
        let words = buffer.as_mut_slice();
        let mut record = RxRecord {
            model: MODEL,
            max_size: u32::try_from(capacity).unwrap_or(u32::MAX),
            data: words.as_mut_ptr(),
            lane: 0,
            vc: 0,
            rx_size: 0,
            eofe: 0,
            fifo_err: 0,
            length_err: 0,
        };
        // SAFETY: the driver writes at most `max_size` words through `data`,
        // which points into `buffer` and stays borrowed for the whole call.
        let ret = unsafe {
            libc::read(
                self.file.as_raw_fd(),
                &mut record as *mut RxRecord as *mut libc::c_void,
                size_of::<RxRecord>(),
            )
        };
        if ret < 0 {
            return Err(DeviceError::Receive(io::Error::last_os_error()));
        }
        if ret == 0 {
            return Ok(RecvOutcome::Empty);
        }
        let len = ret as usize;
        if len > capacity {
            return Err(DeviceError::Overrun { len, capacity });
        }
        Ok(RecvOutcome::Delivered(FrameMeta {
            len,
            lane: record.lane,
            vc: record.vc,
            eofe: record.eofe != 0,
            fifo_err: record.fifo_err != 0,
            length_err: record.length_err != 0,
        }))
    }
}
