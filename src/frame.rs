//! Received frames and the receive buffer.
//!
//! - `FrameMeta`: per-frame metadata reported by the driver.
//! - `RecvOutcome`: result of one receive call (a frame, or end of data).
//! - `RxBuffer`: owned word buffer reused across receive calls.
//!
//! Frame payloads are never copied out of the buffer. A delivered frame is a
//! `FrameMeta` plus a borrowed view of the first `len` words of the buffer,
//! valid until the next receive overwrites it.

/// Default receive buffer capacity in 32-bit words (2 Mi words).
pub const DEFAULT_MAX_WORDS: usize = 1024 * 1024 * 2;

/// Metadata for one DMA-delivered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Payload length in 32-bit words. Always > 0 for a delivered frame.
    pub len: usize,
    pub lane: u32,
    pub vc: u32,
    /// End-of-frame marked with error.
    pub eofe: bool,
    pub fifo_err: bool,
    pub length_err: bool,
}

impl FrameMeta {
    /// True when the driver flagged the frame with any error bit.
    pub fn has_error(&self) -> bool {
        self.eofe || self.fifo_err || self.length_err
    }
}

/// Outcome of a single receive call that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecvOutcome {
    /// A frame of `meta.len` words now sits at the start of the buffer.
    Delivered(FrameMeta),
    /// No data available and the stream has ended.
    Empty,
}

/// Fixed-capacity receive buffer, allocated once and reused.
///
/// Dropping the buffer releases it, so every exit path of the drain loop
/// (including errors) frees the allocation.
pub struct RxBuffer {
    words: Vec<u32>,
}

impl RxBuffer {
    /// Allocate a zeroed buffer of `capacity` words.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0u32; capacity],
        }
    }

    /// Capacity in words.
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Whole buffer, for the device backend to fill.
    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// First `len` words (clamped to capacity).
    pub fn payload(&self, len: usize) -> &[u32] {
        &self.words[..len.min(self.words.len())]
    }
}

impl std::fmt::Debug for RxBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RxBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}
