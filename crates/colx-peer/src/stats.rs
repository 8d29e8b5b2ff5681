//! Negotiated parameters and live counters for a session.

use crate::Handshake;
use colx_wire::{Hash256, ServiceFlags};
use serde::Serialize;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Values fixed by the handshake.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedState {
    pub handshake: Handshake,
    pub protocol_version: u32,
    pub services: ServiceFlags,
    pub user_agent: String,
    pub disable_relay_tx: bool,
    /// Remote asked for `headers` instead of `inv` block announcements.
    pub wants_headers: bool,
}

impl NegotiatedState {
    pub fn new(protocol_version: u32) -> Self {
        Self {
            protocol_version,
            ..Default::default()
        }
    }

    pub fn version_known(&self) -> bool {
        self.handshake.version_received()
    }

    pub fn verack_received(&self) -> bool {
        self.handshake.verack_received()
    }
}

/// Counters updated by the pumps.
#[derive(Debug, Clone, Default)]
pub struct LiveStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub last_send: Option<SystemTime>,
    pub last_recv: Option<SystemTime>,
    pub conn_time: Option<SystemTime>,
    pub last_announced_block: Option<Hash256>,
    pub starting_height: i32,
    pub last_block: i32,
    /// Remote clock minus local clock, in seconds.
    pub time_offset: i64,
    pub last_ping_nonce: u64,
    pub last_ping_time: Option<SystemTime>,
    pub last_ping_micros: i64,
    /// When the outstanding ping was written, if a pong is owed.
    pub awaiting_pong: Option<Instant>,
    pub(crate) last_recv_at: Option<Instant>,
}

/// Serializable point-in-time view of a peer.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub id: u64,
    pub addr: String,
    pub inbound: bool,
    /// Seconds since epoch.
    pub conn_time: Option<u64>,
    pub protocol_version: u32,
    pub services: ServiceFlags,
    pub user_agent: String,
    pub last_send: Option<u64>,
    pub last_recv: Option<u64>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub starting_height: i32,
    pub last_block: i32,
    pub last_announced_block: Option<Hash256>,
    pub time_offset: i64,
    pub last_ping_nonce: u64,
    pub last_ping_time: Option<u64>,
    pub last_ping_micros: i64,
    pub version_known: bool,
    pub verack_received: bool,
}

pub(crate) fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub(crate) fn now_secs() -> i64 {
    unix_secs(SystemTime::now()) as i64
}

impl StatsSnapshot {
    pub(crate) fn build(
        id: u64,
        addr: String,
        inbound: bool,
        negotiated: &NegotiatedState,
        stats: &LiveStats,
    ) -> Self {
        Self {
            id,
            addr,
            inbound,
            conn_time: stats.conn_time.map(unix_secs),
            protocol_version: negotiated.protocol_version,
            services: negotiated.services,
            user_agent: negotiated.user_agent.clone(),
            last_send: stats.last_send.map(unix_secs),
            last_recv: stats.last_recv.map(unix_secs),
            bytes_sent: stats.bytes_sent,
            bytes_received: stats.bytes_received,
            starting_height: stats.starting_height,
            last_block: stats.last_block,
            last_announced_block: stats.last_announced_block,
            time_offset: stats.time_offset,
            last_ping_nonce: stats.last_ping_nonce,
            last_ping_time: stats.last_ping_time.map(unix_secs),
            last_ping_micros: stats.last_ping_micros,
            version_known: negotiated.version_known(),
            verack_received: negotiated.verack_received(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes() {
        let negotiated = NegotiatedState::new(70013);
        let stats = LiveStats {
            bytes_sent: 158,
            last_announced_block: Some(Hash256::ZERO),
            ..Default::default()
        };
        let snapshot = StatsSnapshot::build(3, "127.0.0.1:8333".to_string(), false, &negotiated, &stats);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["bytes_sent"], 158);
        assert_eq!(json["protocol_version"], 70013);
        assert_eq!(json["version_known"], false);
        assert_eq!(
            json["last_announced_block"],
            "0000000000000000000000000000000000000000000000000000000000000000"
        );
    }
}
