//! Network parameters and service flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Networks a node can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network (version 3).
    Testnet3,
    /// Regression test network.
    Regtest,
    /// Private simulation network.
    Simnet,
}

impl Network {
    /// Magic value opening every frame on this network.
    ///
    /// Serialized little-endian, so mainnet frames start with `F9 BE B4 D9`.
    pub fn magic(&self) -> u32 {
        match self {
            Network::Mainnet => 0xd9b4_bef9,
            Network::Testnet3 => 0x0709_110b,
            Network::Regtest => 0xdab5_bffa,
            Network::Simnet => 0x1214_1c16,
        }
    }

    /// Default listening port.
    pub fn default_port(&self) -> u16 {
        match self {
            Network::Mainnet => 8333,
            Network::Testnet3 => 18333,
            Network::Regtest => 18444,
            Network::Simnet => 18555,
        }
    }

    /// Look up the network owning a magic value.
    pub fn from_magic(magic: u32) -> Option<Self> {
        [
            Network::Mainnet,
            Network::Testnet3,
            Network::Regtest,
            Network::Simnet,
        ]
        .into_iter()
        .find(|n| n.magic() == magic)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet3 => "testnet3",
            Network::Regtest => "regtest",
            Network::Simnet => "simnet",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" | "testnet3" => Ok(Network::Testnet3),
            "regtest" => Ok(Network::Regtest),
            "simnet" => Ok(Network::Simnet),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

/// Services advertised by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceFlags(pub u64);

impl ServiceFlags {
    /// No services.
    pub const NONE: ServiceFlags = ServiceFlags(0);
    /// Full node serving the whole chain.
    pub const NODE_NETWORK: ServiceFlags = ServiceFlags(1 << 0);
    /// Node answering `getutxos` (BIP 64).
    pub const NODE_GETUTXO: ServiceFlags = ServiceFlags(1 << 1);
    /// Node supporting bloom filtering (BIP 111).
    pub const NODE_BLOOM: ServiceFlags = ServiceFlags(1 << 2);

    /// Check whether every bit of `other` is set.
    pub fn has(&self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combine multiple flags.
    pub fn combine(flags: &[ServiceFlags]) -> ServiceFlags {
        ServiceFlags(flags.iter().fold(0u64, |acc, f| acc | f.0))
    }
}

impl std::ops::BitOr for ServiceFlags {
    type Output = ServiceFlags;

    fn bitor(self, rhs: ServiceFlags) -> ServiceFlags {
        ServiceFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ServiceFlags, &str); 3] = [
            (ServiceFlags::NODE_NETWORK, "SFNodeNetwork"),
            (ServiceFlags::NODE_GETUTXO, "SFNodeGetUTXO"),
            (ServiceFlags::NODE_BLOOM, "SFNodeBloom"),
        ];

        if self.0 == 0 {
            return f.write_str("0x0");
        }

        let mut remaining = self.0;
        let mut parts = Vec::new();
        for (flag, name) in NAMES {
            if self.has(flag) {
                parts.push(name.to_string());
                remaining &= !flag.0;
            }
        }
        if remaining != 0 {
            parts.push(format!("{:#x}", remaining));
        }
        f.write_str(&parts.join("|"))
    }
}
