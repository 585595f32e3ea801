//! Synthetic card (`stub://`) for running the tools without hardware.
//!
//! Produces a fixed number of frames with rotating lane/vc and a counting
//! payload, then reports end of data (or a receive failure, when asked to).
//! Loopback writes only update an in-memory port mask.

use url::Url;

use crate::device::CardDevice;
use crate::error::DeviceError;
use crate::frame::{FrameMeta, RecvOutcome, RxBuffer};
use crate::PORT_COUNT;

const DEFAULT_STUB_FRAMES: u64 = 16;
const DEFAULT_STUB_WORDS: usize = 32;
const STUB_LANES: u32 = 4;
const STUB_VCS: u32 = 4;

/// Parameters of a synthetic card, parsed from
/// `stub://<name>?frames=N&words=M&fail_after=K`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubConfig {
    pub name: String,
    pub frames: u64,
    pub words: usize,
    /// Fail the receive call after this many frames instead of ending cleanly.
    pub fail_after: Option<u64>,
}

impl StubConfig {
    /// Parse a full `stub://` device path.
    pub fn parse(path: &str) -> Result<Self, DeviceError> {
        let invalid = |reason: String| DeviceError::InvalidStub {
            path: path.to_string(),
            reason,
        };
        let url = Url::parse(path).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "stub" {
            return Err(invalid(format!("expected stub:// scheme, got {}", url.scheme())));
        }

        let mut cfg = Self {
            name: format!("{}{}", url.host_str().unwrap_or_default(), url.path()),
            frames: DEFAULT_STUB_FRAMES,
            words: DEFAULT_STUB_WORDS,
            fail_after: None,
        };
        for (key, value) in url.query_pairs() {
            let number = || {
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("{key} must be an integer, got {value:?}")))
            };
            match key.as_ref() {
                "frames" => cfg.frames = number()?,
                "words" => {
                    cfg.words = usize::try_from(number()?)
                        .map_err(|_| invalid(format!("words {value} too large")))?;
                    if cfg.words == 0 {
                        return Err(invalid("words must be greater than zero".into()));
                    }
                }
                "fail_after" => cfg.fail_after = Some(number()?),
                other => return Err(invalid(format!("unknown parameter {other:?}"))),
            }
        }
        Ok(cfg)
    }
}

/// In-memory card used for `stub://` device paths.
#[derive(Debug)]
pub struct SyntheticCard {
    config: StubConfig,
    sent: u64,
    loop_mask: u8,
}

impl SyntheticCard {
    pub fn new(config: StubConfig) -> Self {
        log::info!(
            "SyntheticCard: opened {} ({} frames of {} words)",
            config.name,
            config.frames,
            config.words
        );
        Self {
            config,
            sent: 0,
            loop_mask: 0,
        }
    }

    /// Bit p set when port p is in loopback.
    pub fn loop_mask(&self) -> u8 {
        self.loop_mask
    }

    fn check_port(port: u32) -> Result<(), DeviceError> {
        if port >= PORT_COUNT {
            return Err(DeviceError::InvalidPort(port));
        }
        Ok(())
    }
}

impl CardDevice for SyntheticCard {
    fn set_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        Self::check_port(port)?;
        self.loop_mask |= 1 << port;
        log::info!("SyntheticCard: loopback set on port {}", port);
        Ok(())
    }

    fn clear_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        Self::check_port(port)?;
        self.loop_mask &= !(1 << port);
        log::info!("SyntheticCard: loopback cleared on port {}", port);
        Ok(())
    }

    fn receive(&mut self, buffer: &mut RxBuffer) -> Result<RecvOutcome, DeviceError> {
        if self.config.fail_after == Some(self.sent) {
            return Err(DeviceError::Receive(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{}: synthetic failure", self.config.name),
            )));
        }
        if self.sent >= self.config.frames {
            return Ok(RecvOutcome::Empty);
        }
        let seq = self.sent;
        self.sent += 1;

        let len = self.config.words.min(buffer.capacity());
        if len == 0 {
            return Err(DeviceError::Overrun {
                len: self.config.words,
                capacity: 0,
            });
        }
        for (i, word) in buffer.as_mut_slice()[..len].iter_mut().enumerate() {
            *word = ((seq as u32) << 16) | (i as u32 & 0xffff);
        }

        Ok(RecvOutcome::Delivered(FrameMeta {
            len,
            lane: (seq as u32) % STUB_LANES,
            vc: (seq as u32 / STUB_LANES) % STUB_VCS,
            eofe: false,
            fifo_err: false,
            // Truncated to fit the caller's buffer.
            length_err: len < self.config.words,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_parameters() {
        let cfg = StubConfig::parse("stub://bench?frames=3&words=5").unwrap();
        assert_eq!(cfg.name, "bench");
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.words, 5);
        assert_eq!(cfg.fail_after, None);

        let cfg = StubConfig::parse("stub://card0").unwrap();
        assert_eq!(cfg.frames, DEFAULT_STUB_FRAMES);
        assert_eq!(cfg.words, DEFAULT_STUB_WORDS);
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let cfg = StubConfig::parse("stub://bench?frames=%31%32&fail_after=2#ignored").unwrap();
        assert_eq!(cfg.frames, 12);
        assert_eq!(cfg.fail_after, Some(2));
    }

    #[test]
    fn rejects_bad_query_parameters() {
        for path in [
            "stub://card0?speed=fast",
            "stub://card0?frames=lots",
            "stub://card0?words=0",
        ] {
            assert!(
                matches!(StubConfig::parse(path), Err(DeviceError::InvalidStub { .. })),
                "{path}"
            );
        }
    }

    #[test]
    fn fails_after_requested_frames() {
        let mut card =
            SyntheticCard::new(StubConfig::parse("stub://t?frames=5&fail_after=1").unwrap());
        let mut buf = RxBuffer::with_capacity(64);
        assert!(matches!(
            card.receive(&mut buf).unwrap(),
            RecvOutcome::Delivered(_)
        ));
        assert!(matches!(
            card.receive(&mut buf),
            Err(DeviceError::Receive(_))
        ));
    }

    #[test]
    fn delivers_configured_frames_then_ends() {
        let mut card = SyntheticCard::new(StubConfig::parse("stub://t?frames=5&words=4").unwrap());
        let mut buf = RxBuffer::with_capacity(16);
        for seq in 0..5u32 {
            match card.receive(&mut buf).unwrap() {
                RecvOutcome::Delivered(meta) => {
                    assert_eq!(meta.len, 4);
                    assert_eq!(meta.lane, seq % STUB_LANES);
                    assert_eq!(buf.payload(meta.len)[1], (seq << 16) | 1);
                }
                RecvOutcome::Empty => panic!("ended early at frame {seq}"),
            }
        }
        assert_eq!(card.receive(&mut buf).unwrap(), RecvOutcome::Empty);
    }

    #[test]
    fn short_buffer_truncates_with_length_error() {
        let mut card = SyntheticCard::new(StubConfig::parse("stub://t?frames=1&words=10").unwrap());
        let mut buf = RxBuffer::with_capacity(4);
        let RecvOutcome::Delivered(meta) = card.receive(&mut buf).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(meta.len, 4);
        assert!(meta.length_err);
    }

    #[test]
    fn loopback_mask_tracks_ports() {
        let mut card = SyntheticCard::new(StubConfig::parse("stub://t").unwrap());
        card.set_loopback(0).unwrap();
        card.set_loopback(7).unwrap();
        card.clear_loopback(0).unwrap();
        assert_eq!(card.loop_mask(), 0b1000_0000);
        assert!(matches!(
            card.set_loopback(8),
            Err(DeviceError::InvalidPort(8))
        ));
    }
}
