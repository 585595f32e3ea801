//! Error types for the card device layer.
//!
//! Device operations return `Result<T, DeviceError>`. Malformed command lines
//! are a separate `UsageError` so the tools can print usage and exit cleanly.

use thiserror::Error;

/// Errors raised while talking to the card driver.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device node could not be opened.
    #[error("failed to open device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A loopback command write was rejected by the driver.
    #[error("{op} failed on port {port}: {source}")]
    Command {
        op: &'static str,
        port: u32,
        #[source]
        source: std::io::Error,
    },

    /// The receive call reported an error.
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// The driver reported more words than the buffer can hold.
    #[error("driver reported {len} words for a {capacity}-word buffer")]
    Overrun { len: usize, capacity: usize },

    /// Port index outside the card's port range.
    #[error("invalid port {0} (expected 0..{max})", max = crate::PORT_COUNT)]
    InvalidPort(u32),

    /// A `stub://` device path could not be parsed.
    #[error("invalid stub device {path}: {reason}")]
    InvalidStub { path: String, reason: String },

    /// The device path names a backend this build cannot open.
    #[error("unsupported device {0}")]
    Unsupported(String),
}

/// A command line the loopback tool does not understand.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("expected `set`, `clear` or `port loop`, got {0} argument(s)")]
    ArgumentCount(usize),

    #[error("unknown mode {0:?} (expected `set` or `clear`)")]
    UnknownMode(String),
}
