//! Frame drain loop.
//!
//! Pulls frames from the card until the driver reports no more data or a
//! call fails, writing one report per frame. There is no retry: the first
//! non-positive result from the driver ends the loop and no further receive
//! is issued.

use std::io::Write;

use thiserror::Error;

use crate::device::CardDevice;
use crate::error::DeviceError;
use crate::frame::{FrameMeta, RecvOutcome, RxBuffer};

/// Payload words printed per report line.
const WORDS_PER_LINE: usize = 10;
const PAYLOAD_INDENT: &str = "   ";

/// Runtime switches for the drain loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrainOptions {
    /// Also print each frame's payload in hex.
    pub print_payload: bool,
}

/// Counters accumulated over one drain run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub frames: u64,
    pub words: u64,
    pub eofe_frames: u64,
    pub fifo_err_frames: u64,
    pub length_err_frames: u64,
}

impl DrainSummary {
    fn record(&mut self, meta: &FrameMeta) {
        self.frames += 1;
        self.words += meta.len as u64;
        self.eofe_frames += u64::from(meta.eofe);
        self.fifo_err_frames += u64::from(meta.fifo_err);
        self.length_err_frames += u64::from(meta.length_err);
    }
}

#[derive(Debug, Error)]
pub enum DrainError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to write frame report: {0}")]
    Report(#[from] std::io::Error),
}

/// Drain frames from `device` into `buffer`, reporting each one to `out`.
///
/// Returns once the driver reports no more data. A failing receive ends the
/// loop and is returned as the error.
pub fn drain_frames<D, W>(
    device: &mut D,
    buffer: &mut RxBuffer,
    out: &mut W,
    options: DrainOptions,
) -> Result<DrainSummary, DrainError>
where
    D: CardDevice + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = DrainSummary::default();
    log::debug!("drain: buffer capacity {} words", buffer.capacity());

    loop {
        let meta = match device.receive(buffer) {
            Ok(RecvOutcome::Delivered(meta)) => meta,
            Ok(RecvOutcome::Empty) => break,
            Err(e) => {
                log::error!("drain stopped after {} frames: {}", summary.frames, e);
                return Err(e.into());
            }
        };
        summary.record(&meta);
        if meta.has_error() {
            log::warn!(
                "frame {} on lane {} vc {} flagged (eofe={} fifo_err={} length_err={})",
                summary.frames,
                meta.lane,
                meta.vc,
                meta.eofe,
                meta.fifo_err,
                meta.length_err
            );
        }
        let payload = options.print_payload.then(|| buffer.payload(meta.len));
        write_frame_report(out, &meta, payload)?;
    }

    out.flush()?;
    log::info!(
        "drain complete: frames={} words={} eofe={} fifo_err={} length_err={}",
        summary.frames,
        summary.words,
        summary.eofe_frames,
        summary.fifo_err_frames,
        summary.length_err_frames
    );
    Ok(summary)
}

/// Open the device, allocate a `max_words` buffer and drain it.
///
/// Nothing is allocated when the open fails. The buffer and the device are
/// released before returning on every path.
pub fn read_device<D, F, W>(
    open: F,
    max_words: usize,
    out: &mut W,
    options: DrainOptions,
) -> Result<DrainSummary, DrainError>
where
    D: CardDevice,
    F: FnOnce() -> Result<D, DeviceError>,
    W: Write + ?Sized,
{
    let mut device = open()?;
    let mut buffer = RxBuffer::with_capacity(max_words);
    drain_frames(&mut device, &mut buffer, out, options)
}

/// Write the report for one frame.
///
/// The header line carries the metadata. When `payload` is given, it follows
/// as `0x%08x` words, ten per line, each line indented.
pub fn write_frame_report<W: Write + ?Sized>(
    out: &mut W,
    meta: &FrameMeta,
    payload: Option<&[u32]>,
) -> std::io::Result<()> {
    writeln!(
        out,
        "Ret={}, Lane={}, Vc={}, Eofe={}, FifoErr={}, LengthErr={}",
        meta.len,
        meta.lane,
        meta.vc,
        u8::from(meta.eofe),
        u8::from(meta.fifo_err),
        u8::from(meta.length_err)
    )?;
    if let Some(words) = payload {
        for line in words.chunks(WORDS_PER_LINE) {
            write!(out, "{PAYLOAD_INDENT}")?;
            for word in line {
                write!(out, " 0x{word:08x}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_line_matches_tool_format() {
        let meta = FrameMeta {
            len: 12,
            lane: 2,
            vc: 3,
            eofe: true,
            fifo_err: false,
            length_err: true,
        };
        let mut out = Vec::new();
        write_frame_report(&mut out, &meta, None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Ret=12, Lane=2, Vc=3, Eofe=1, FifoErr=0, LengthErr=1\n"
        );
    }

    #[test]
    fn payload_wraps_every_ten_words() {
        let meta = FrameMeta {
            len: 12,
            ..FrameMeta::default()
        };
        let words: Vec<u32> = (0..12).map(|i| 0xabc0_0000 | i).collect();
        let mut out = Vec::new();
        write_frame_report(&mut out, &meta, Some(&words)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("    0xabc00000 0xabc00001"));
        assert_eq!(lines[1].matches("0x").count(), 10);
        assert_eq!(lines[2], "    0xabc0000a 0xabc0000b");
    }

    #[test]
    fn summary_counts_flagged_frames() {
        let mut summary = DrainSummary::default();
        summary.record(&FrameMeta {
            len: 4,
            eofe: true,
            ..FrameMeta::default()
        });
        summary.record(&FrameMeta {
            len: 6,
            fifo_err: true,
            length_err: true,
            ..FrameMeta::default()
        });
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.words, 10);
        assert_eq!(summary.eofe_frames, 1);
        assert_eq!(summary.fifo_err_frames, 1);
        assert_eq!(summary.length_err_frames, 1);
    }
}
