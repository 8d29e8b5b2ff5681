//! Wire protocol error types.

use thiserror::Error;

/// Errors produced while framing, encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum WireError {
    /// The 24-byte frame header is unusable (bad magic, bad command, oversized length).
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// The payload does not hash to the checksum declared in the header.
    #[error("Checksum mismatch: header {expected}, payload {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// A payload exceeds the limit of its message type.
    #[error("Payload of {command} too large: {size} bytes, max {max} bytes")]
    PayloadTooLarge {
        command: String,
        size: usize,
        max: usize,
    },

    /// The message does not exist at the given protocol version.
    #[error("{command} message invalid for protocol version {version}")]
    UnsupportedVersion { command: String, version: u32 },

    /// A payload field is truncated or out of range.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Whether the error was produced by the frame header or checksum, as
    /// opposed to a payload the header accepted.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            WireError::MalformedHeader(_) | WireError::ChecksumMismatch { .. } | WireError::Io(_)
        )
    }
}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;
