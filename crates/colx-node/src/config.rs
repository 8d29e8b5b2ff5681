//! Node configuration.

use crate::Args;
use anyhow::{Context, Result};
use colx_peer::PeerConfig;
use colx_wire::{Network, ServiceFlags, MULTIPLE_ADDRESS_VERSION, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network to join.
    #[serde(default)]
    pub network: Network,
    /// Peers to dial (`host:port`).
    #[serde(default)]
    pub connect: Vec<String>,
    /// Address to accept inbound peers on.
    #[serde(default)]
    pub listen: Option<String>,
    /// Dial timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Session settings.
    #[serde(default)]
    pub peer: PeerSection,
}

fn default_connect_timeout() -> u64 {
    10
}

/// Session settings, converted into a [`PeerConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSection {
    pub user_agent_name: String,
    pub user_agent_version: String,
    /// Advertised service bits.
    pub services: u64,
    pub protocol_version: u32,
    pub min_protocol_version: u32,
    pub disable_relay_tx: bool,
    pub allow_self_connections: bool,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub handshake_timeout_secs: u64,
    pub stall_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub trickle_interval_secs: u64,
    pub known_inventory_capacity: usize,
    pub disconnect_on_duplicate_handshake: bool,
}

impl Default for PeerSection {
    fn default() -> Self {
        let defaults = PeerConfig::default();
        Self {
            user_agent_name: "colx-node".to_string(),
            user_agent_version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceFlags::NONE.0,
            protocol_version: PROTOCOL_VERSION,
            min_protocol_version: MULTIPLE_ADDRESS_VERSION,
            disable_relay_tx: true,
            allow_self_connections: false,
            ping_interval_secs: defaults.ping_interval.as_secs(),
            ping_timeout_secs: defaults.ping_timeout.as_secs(),
            handshake_timeout_secs: defaults.handshake_timeout.as_secs(),
            stall_timeout_secs: defaults.stall_timeout.as_secs(),
            write_timeout_secs: defaults.write_timeout.as_secs(),
            trickle_interval_secs: defaults.trickle_interval.as_secs(),
            known_inventory_capacity: defaults.known_inventory_capacity,
            disconnect_on_duplicate_handshake: false,
        }
    }
}

impl PeerSection {
    /// Build a peer configuration for `network`.
    pub fn to_peer_config(&self, network: Network) -> PeerConfig {
        PeerConfig {
            user_agent_name: self.user_agent_name.clone(),
            user_agent_version: self.user_agent_version.clone(),
            network,
            services: ServiceFlags(self.services),
            protocol_version: self.protocol_version,
            min_protocol_version: self.min_protocol_version,
            disable_relay_tx: self.disable_relay_tx,
            allow_self_connections: self.allow_self_connections,
            ping_interval: secs(self.ping_interval_secs),
            ping_timeout: secs(self.ping_timeout_secs),
            handshake_timeout: secs(self.handshake_timeout_secs),
            stall_timeout: secs(self.stall_timeout_secs),
            write_timeout: secs(self.write_timeout_secs),
            trickle_interval: secs(self.trickle_interval_secs),
            known_inventory_capacity: self.known_inventory_capacity,
            disconnect_on_duplicate_handshake: self.disconnect_on_duplicate_handshake,
            ..PeerConfig::default()
        }
    }
}

/// Timer settings are at least one second; zero would stop the peer timers.
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

impl NodeConfig {
    /// Load configuration from file and CLI args.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let network = match &args.network {
                Some(name) => parse_network(name)?,
                None => Network::Mainnet,
            };
            Self::default_for_network(network)
        };

        // Only override if explicitly provided via CLI
        if let Some(ref name) = args.network {
            config.network = parse_network(name)?;
        }
        if !args.connect.is_empty() {
            config.connect = args.connect.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen = Some(listen.clone());
        }

        Ok(config)
    }

    /// Create default config for a network.
    pub fn default_for_network(network: Network) -> Self {
        Self {
            network,
            connect: Vec::new(),
            listen: None,
            connect_timeout_secs: default_connect_timeout(),
            peer: PeerSection::default(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_network(name: &str) -> Result<Network> {
    name.parse::<Network>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Invalid network {:?}", name))
}
