//! # colx-peer
//!
//! Peer sessions for the ColossusXT network.
//!
//! This crate provides:
//! - The version/verack handshake with self-connection detection
//! - An outbound queue with immediate and trickled inventory classes
//! - Keepalive pings, stall and write-timeout detection
//! - A listener trait receiving every inbound message
//!
//! A [`Peer`] is created with [`Peer::new_inbound`] or [`Peer::new_outbound`]
//! and started by handing it a [`Transport`] through [`Peer::connect`].

mod config;
mod error;
mod handshake;
mod inventory;
mod listener;
mod peer;
mod queue;
mod session;
mod stats;
mod transport;

pub use config::{
    BoxError, NewestBlockFn, PeerConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_KNOWN_INVENTORY,
    DEFAULT_PING_INTERVAL, DEFAULT_PING_TIMEOUT, DEFAULT_STALL_TICK, DEFAULT_STALL_TIMEOUT,
    DEFAULT_TRICKLE_INTERVAL, DEFAULT_WRITE_TIMEOUT,
};
pub use error::{HandshakeError, PeerError, PeerResult};
pub use handshake::{
    negotiate_version, validate_remote_version, Handshake, HandshakeState, NonceRegistry,
    NONCE_REGISTRY_CAPACITY,
};
pub use inventory::KnownInventory;
pub use listener::{MessageListener, NoopListener};
pub use peer::Peer;
pub use queue::{jittered_trickle_interval, Outbound, OutboundQueue, QueuedMessage, MAX_INV_TRICKLE_SIZE};
pub use stats::{LiveStats, NegotiatedState, StatsSnapshot};
pub use transport::Transport;

pub use colx_wire as wire;
