//! Recording card double shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;

use pgpcard::{CardDevice, DeviceError, FrameMeta, RecvOutcome, RxBuffer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    SetLoopback(u32),
    ClearLoopback(u32),
    Receive,
}

/// Scripted result of one receive call.
pub enum Step {
    Frame { lane: u32, vc: u32, words: Vec<u32> },
    Flagged(FrameMeta, Vec<u32>),
    Empty,
    Fail,
}

#[derive(Default)]
pub struct RecordingCard {
    pub calls: Vec<Call>,
    script: VecDeque<Step>,
    fail_on_port: Option<u32>,
}

impl RecordingCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(steps: Vec<Step>) -> Self {
        Self {
            script: steps.into(),
            ..Self::default()
        }
    }

    pub fn failing_on_port(port: u32) -> Self {
        Self {
            fail_on_port: Some(port),
            ..Self::default()
        }
    }

    pub fn receive_calls(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Receive).count()
    }

    fn port_call(&mut self, call: Call, port: u32) -> Result<(), DeviceError> {
        self.calls.push(call);
        if self.fail_on_port == Some(port) {
            return Err(DeviceError::Command {
                op: "test",
                port,
                source: io::Error::new(io::ErrorKind::Other, "rejected by driver"),
            });
        }
        Ok(())
    }
}

impl CardDevice for RecordingCard {
    fn set_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        self.port_call(Call::SetLoopback(port), port)
    }

    fn clear_loopback(&mut self, port: u32) -> Result<(), DeviceError> {
        self.port_call(Call::ClearLoopback(port), port)
    }

    fn receive(&mut self, buffer: &mut RxBuffer) -> Result<RecvOutcome, DeviceError> {
        self.calls.push(Call::Receive);
        let (meta, words) = match self.script.pop_front().unwrap_or(Step::Empty) {
            Step::Empty => return Ok(RecvOutcome::Empty),
            Step::Fail => {
                return Err(DeviceError::Receive(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "device closed",
                )))
            }
            Step::Frame { lane, vc, words } => (
                FrameMeta {
                    len: words.len(),
                    lane,
                    vc,
                    ..FrameMeta::default()
                },
                words,
            ),
            Step::Flagged(meta, words) => (
                FrameMeta {
                    len: words.len(),
                    ..meta
                },
                words,
            ),
        };
        buffer.as_mut_slice()[..words.len()].copy_from_slice(&words);
        Ok(RecvOutcome::Delivered(meta))
    }
}
