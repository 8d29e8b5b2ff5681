//! Peer configuration.

use crate::{MessageListener, NonceRegistry, NoopListener, PeerError, PeerResult};
use colx_wire::{Hash256, Network, ServiceFlags, MULTIPLE_ADDRESS_VERSION, PROTOCOL_VERSION};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returns the hash and height of the local best block.
pub type NewestBlockFn = Arc<dyn Fn() -> Result<(Hash256, i32), BoxError> + Send + Sync>;

/// Interval between keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Time allowed to answer a ping.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the version/verack exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Silence after which a peer is considered stalled.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How often liveness is checked.
pub const DEFAULT_STALL_TICK: Duration = Duration::from_secs(15);

/// Time a single write may block before the session is stalled.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Base interval between trickled inventory batches.
pub const DEFAULT_TRICKLE_INTERVAL: Duration = Duration::from_secs(10);

/// Inventory hashes remembered per peer.
pub const DEFAULT_KNOWN_INVENTORY: usize = 1000;

/// Configuration shared by every peer created with it.
#[derive(Clone)]
pub struct PeerConfig {
    /// Application name appended to the user agent.
    pub user_agent_name: String,
    /// Application version appended to the user agent.
    pub user_agent_version: String,
    /// Comments rendered in parentheses after the user agent.
    pub user_agent_comments: Vec<String>,
    /// Network whose magic frames every message.
    pub network: Network,
    /// Services advertised in our version message.
    pub services: ServiceFlags,
    /// Highest protocol version we speak.
    pub protocol_version: u32,
    /// Lowest remote protocol version we accept.
    pub min_protocol_version: u32,
    /// Ask the remote not to relay transactions.
    pub disable_relay_tx: bool,
    /// Skip self-connection detection.
    pub allow_self_connections: bool,
    /// Source of the height advertised in our version message.
    pub newest_block: Option<NewestBlockFn>,
    /// Receives decoded messages and read/write notifications.
    pub listener: Arc<dyn MessageListener>,
    /// Recently sent version nonces, used to detect self connections.
    pub nonce_registry: Arc<NonceRegistry>,
    /// Interval between keepalive pings once established.
    pub ping_interval: Duration,
    /// Time allowed for a pong to arrive.
    pub ping_timeout: Duration,
    /// Time allowed for the version/verack exchange.
    pub handshake_timeout: Duration,
    /// Silence tolerated before the session is torn down.
    pub stall_timeout: Duration,
    /// Period of the liveness check.
    pub stall_tick: Duration,
    /// Limit on a single frame write and on transport shutdown.
    pub write_timeout: Duration,
    /// Base period for batching inventory announcements. Jittered per peer.
    pub trickle_interval: Duration,
    /// Inventory hashes remembered per peer.
    pub known_inventory_capacity: usize,
    /// Disconnect on a repeated version or verack instead of ignoring it.
    pub disconnect_on_duplicate_handshake: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            user_agent_name: "colx-peer".to_string(),
            user_agent_version: env!("CARGO_PKG_VERSION").to_string(),
            user_agent_comments: Vec::new(),
            network: Network::Mainnet,
            services: ServiceFlags::NODE_NETWORK,
            protocol_version: PROTOCOL_VERSION,
            min_protocol_version: MULTIPLE_ADDRESS_VERSION,
            disable_relay_tx: false,
            allow_self_connections: false,
            newest_block: None,
            listener: Arc::new(NoopListener),
            nonce_registry: NonceRegistry::global(),
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            stall_tick: DEFAULT_STALL_TICK,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            trickle_interval: DEFAULT_TRICKLE_INTERVAL,
            known_inventory_capacity: DEFAULT_KNOWN_INVENTORY,
            disconnect_on_duplicate_handshake: false,
        }
    }
}

impl PeerConfig {
    /// Install a listener.
    pub fn with_listener(mut self, listener: Arc<dyn MessageListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Install the newest-block callback.
    pub fn with_newest_block<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(Hash256, i32), BoxError> + Send + Sync + 'static,
    {
        self.newest_block = Some(Arc::new(f));
        self
    }

    /// Reject timer settings the session cannot run with.
    ///
    /// Every duration must be non-zero: the liveness timers cannot tick with
    /// a zero period and a zero trickle interval would spin the writer.
    pub fn validate(&self) -> PeerResult<()> {
        let durations = [
            ("ping_interval", self.ping_interval),
            ("ping_timeout", self.ping_timeout),
            ("handshake_timeout", self.handshake_timeout),
            ("stall_timeout", self.stall_timeout),
            ("stall_tick", self.stall_tick),
            ("write_timeout", self.write_timeout),
            ("trickle_interval", self.trickle_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(PeerError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PeerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConfig")
            .field("user_agent_name", &self.user_agent_name)
            .field("user_agent_version", &self.user_agent_version)
            .field("network", &self.network)
            .field("services", &self.services)
            .field("protocol_version", &self.protocol_version)
            .field("min_protocol_version", &self.min_protocol_version)
            .field("disable_relay_tx", &self.disable_relay_tx)
            .field("allow_self_connections", &self.allow_self_connections)
            .field("newest_block", &self.newest_block.is_some())
            .field("ping_interval", &self.ping_interval)
            .field("ping_timeout", &self.ping_timeout)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("stall_timeout", &self.stall_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("trickle_interval", &self.trickle_interval)
            .field("known_inventory_capacity", &self.known_inventory_capacity)
            .finish_non_exhaustive()
    }
}
