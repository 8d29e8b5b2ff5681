//! Version/verack handshake.
//!
//! ```text
//! Idle ──▶ VersionSent (outbound) ──▶ VersionReceived ──▶ VerAckReceived / VerAckSent ──▶ Established
//!                       any violation ──▶ Failed
//! ```
//!
//! The state is derived from four flags so the read and write pumps can each
//! record their half without coordinating.

use crate::{HandshakeError, PeerConfig};
use colx_wire::MsgVersion;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Recently sent version nonces kept for self-connection detection.
pub const NONCE_REGISTRY_CAPACITY: usize = 50;

static GLOBAL_NONCES: Lazy<Arc<NonceRegistry>> =
    Lazy::new(|| Arc::new(NonceRegistry::new(NONCE_REGISTRY_CAPACITY)));

/// Bounded set of nonces placed in our own version messages.
///
/// A remote version carrying one of them means we dialed ourselves.
pub struct NonceRegistry {
    nonces: Mutex<LruCache<u64, ()>>,
}

impl NonceRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            nonces: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Process-wide registry shared by peers using the default configuration.
    pub fn global() -> Arc<NonceRegistry> {
        GLOBAL_NONCES.clone()
    }

    pub fn insert(&self, nonce: u64) {
        self.nonces.lock().put(nonce, ());
    }

    pub fn contains(&self, nonce: u64) -> bool {
        self.nonces.lock().contains(&nonce)
    }

    pub fn len(&self) -> usize {
        self.nonces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for NonceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    VersionSent,
    VersionReceived,
    VerAckReceived,
    VerAckSent,
    Established,
    Failed,
}

impl std::fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandshakeState::Idle => "idle",
            HandshakeState::VersionSent => "version-sent",
            HandshakeState::VersionReceived => "version-received",
            HandshakeState::VerAckReceived => "verack-received",
            HandshakeState::VerAckSent => "verack-sent",
            HandshakeState::Established => "established",
            HandshakeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Handshake {
    version_sent: bool,
    version_received: bool,
    verack_sent: bool,
    verack_received: bool,
    failed: bool,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HandshakeState {
        if self.failed {
            HandshakeState::Failed
        } else if self.version_received && self.verack_sent && self.verack_received {
            HandshakeState::Established
        } else if self.verack_received {
            HandshakeState::VerAckReceived
        } else if self.verack_sent {
            HandshakeState::VerAckSent
        } else if self.version_received {
            HandshakeState::VersionReceived
        } else if self.version_sent {
            HandshakeState::VersionSent
        } else {
            HandshakeState::Idle
        }
    }

    pub fn is_established(&self) -> bool {
        self.state() == HandshakeState::Established
    }

    pub fn version_received(&self) -> bool {
        self.version_received
    }

    pub fn verack_received(&self) -> bool {
        self.verack_received
    }

    pub fn version_sent(&self) -> bool {
        self.version_sent
    }

    pub fn verack_sent(&self) -> bool {
        self.verack_sent
    }

    /// Check that `command` may be processed at this point of the handshake.
    pub fn check_message(&self, command: &str) -> Result<(), HandshakeError> {
        if !self.version_received && command != "version" {
            return Err(HandshakeError::UnexpectedMessage(command.to_string()));
        }
        Ok(())
    }

    pub fn on_version_sent(&mut self) {
        self.version_sent = true;
    }

    pub fn on_version_received(&mut self) -> Result<(), HandshakeError> {
        if self.version_received {
            return Err(HandshakeError::Duplicate("version".to_string()));
        }
        self.version_received = true;
        Ok(())
    }

    pub fn on_verack_sent(&mut self) {
        self.verack_sent = true;
    }

    pub fn on_verack_received(&mut self) -> Result<(), HandshakeError> {
        if !self.version_received {
            return Err(HandshakeError::UnexpectedMessage("verack".to_string()));
        }
        if self.verack_received {
            return Err(HandshakeError::Duplicate("verack".to_string()));
        }
        self.verack_received = true;
        Ok(())
    }

    pub fn fail(&mut self) {
        self.failed = true;
    }
}

/// Reject remote versions that are too old or carry one of our own nonces.
pub fn validate_remote_version(remote: &MsgVersion, config: &PeerConfig) -> Result<(), HandshakeError> {
    if !config.allow_self_connections && config.nonce_registry.contains(remote.nonce) {
        return Err(HandshakeError::SelfConnection);
    }

    if i64::from(remote.protocol_version) < i64::from(config.min_protocol_version) {
        return Err(HandshakeError::ProtocolTooOld {
            version: remote.protocol_version,
            min: config.min_protocol_version,
        });
    }

    Ok(())
}

/// Protocol version both sides understand.
pub fn negotiate_version(local: u32, remote: i32) -> u32 {
    local.min(remote.max(0) as u32)
}
