//! Peer error types.

use colx_wire::WireError;
use std::time::Duration;
use thiserror::Error;

/// Violations of the version/verack exchange.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Remote advertised a protocol version below the configured minimum.
    #[error("Protocol version {version} is lower than minimum {min}")]
    ProtocolTooOld { version: i32, min: u32 },

    /// Remote echoed a nonce this process sent.
    #[error("Disconnecting peer connected to self")]
    SelfConnection,

    /// A message arrived before the remote version.
    #[error("Received {0} before version")]
    UnexpectedMessage(String),

    /// A second version or verack arrived.
    #[error("Duplicate {0} message")]
    Duplicate(String),

    /// The handshake did not finish in time.
    #[error("Handshake not completed within {0:?}")]
    Timeout(Duration),
}

/// Peer session errors.
#[derive(Error, Debug)]
pub enum PeerError {
    /// Framing or payload error.
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Address given to an outbound constructor does not resolve.
    #[error("Cannot resolve {addr}: {reason}")]
    AddressResolution { addr: String, reason: String },

    /// The newest-block callback failed.
    #[error("Newest block unavailable: {0}")]
    NewestBlock(String),

    /// A write did not complete within the write timeout.
    #[error("Write stalled for more than {0:?}")]
    WriteStalled(Duration),

    /// Nothing was received within the stall timeout.
    #[error("No data received for {0:?}")]
    Stalled(Duration),

    /// A ping was not answered in time.
    #[error("No pong received within {0:?}")]
    PingTimeout(Duration),

    /// Configuration the session cannot run with.
    #[error("Invalid peer config: {0}")]
    InvalidConfig(String),

    /// Caller supplied an invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Session is shutting down.
    #[error("Peer disconnected")]
    Disconnected,
}

impl PeerError {
    /// Liveness failures: stalls and timeouts.
    pub fn is_liveness(&self) -> bool {
        matches!(
            self,
            PeerError::WriteStalled(_)
                | PeerError::Stalled(_)
                | PeerError::PingTimeout(_)
                | PeerError::Handshake(HandshakeError::Timeout(_))
        )
    }
}

/// Result type for peer operations.
pub type PeerResult<T> = Result<T, PeerError>;
