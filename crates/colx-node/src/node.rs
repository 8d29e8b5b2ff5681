//! Node implementation.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use colx_peer::{MessageListener, Peer, PeerConfig, PeerError};
use colx_wire::{Message, MsgAddr, MsgInv, MsgReject, MsgVersion};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Logs inbound traffic and asks for addresses once a handshake completes.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl MessageListener for LoggingListener {
    fn on_version(&self, peer: &Peer, msg: &MsgVersion) {
        info!(
            peer = %peer,
            version = msg.protocol_version,
            user_agent = %msg.user_agent,
            height = msg.last_block,
            services = %msg.services,
            "Received version"
        );
    }

    fn on_verack(&self, peer: &Peer) {
        info!(
            peer = %peer,
            protocol_version = peer.protocol_version(),
            "Handshake complete"
        );
        peer.queue_message(Message::GetAddr, None);
    }

    fn on_addr(&self, peer: &Peer, msg: &MsgAddr) {
        info!(peer = %peer, count = msg.addr_list.len(), "Received addresses");
        for addr in &msg.addr_list {
            debug!(peer = %peer, addr = %addr.socket_addr(), services = %addr.services, "Address");
        }
    }

    fn on_inv(&self, peer: &Peer, msg: &MsgInv) {
        info!(peer = %peer, count = msg.inv_list.len(), "Received inventory");
        for iv in &msg.inv_list {
            debug!(peer = %peer, inv = %iv, "Inventory");
        }
    }

    fn on_reject(&self, peer: &Peer, msg: &MsgReject) {
        warn!(
            peer = %peer,
            command = %msg.cmd,
            code = %msg.code,
            reason = %msg.reason,
            "Peer rejected our message"
        );
    }

    fn on_read(&self, peer: &Peer, _bytes: usize, _msg: Option<&Message>, err: Option<&PeerError>) {
        if let Some(err) = err {
            debug!(peer = %peer, error = %err, "Read failed");
        }
    }
}

/// Dials configured peers and optionally accepts inbound ones.
pub struct Node {
    config: NodeConfig,
    peer_config: PeerConfig,
    peers: Arc<Mutex<Vec<Peer>>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let peer_config = config
            .peer
            .to_peer_config(config.network)
            .with_listener(Arc::new(LoggingListener));
        Self {
            config,
            peer_config,
            peers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Dial every configured peer, then serve inbound connections if a
    /// listen address is set. Returns once there is nothing left to accept.
    pub async fn run(&self) -> Result<()> {
        for addr in &self.config.connect {
            if let Err(e) = self.dial(addr).await {
                warn!("Failed to connect to {}: {:#}", addr, e);
            }
        }

        let Some(ref listen) = self.config.listen else {
            return Ok(());
        };

        let listener = TcpListener::bind(listen)
            .await
            .with_context(|| format!("Failed to bind {}", listen))?;
        info!("Accepting peers on {}", listener.local_addr()?);

        loop {
            let (stream, remote) = listener.accept().await?;
            debug!("Inbound connection from {}", remote);
            let peer = Peer::new_inbound(self.peer_config.clone());
            if let Err(e) = peer.connect(stream) {
                warn!("Failed to start inbound peer {}: {}", remote, e);
                continue;
            }
            self.track(peer);
        }
    }

    async fn dial(&self, addr: &str) -> Result<()> {
        let peer = Peer::new_outbound(self.peer_config.clone(), addr)?;
        let target = peer
            .addr()
            .with_context(|| format!("No address for {}", addr))?;

        let stream = tokio::time::timeout(self.config.connect_timeout(), TcpStream::connect(target))
            .await
            .with_context(|| format!("Timed out connecting to {}", target))?
            .with_context(|| format!("Failed to connect to {}", target))?;

        peer.connect(stream)?;
        self.track(peer);
        Ok(())
    }

    fn track(&self, peer: Peer) {
        let mut peers = self.peers.lock();
        peers.retain(|p| p.is_connected());
        peers.push(peer);
    }

    /// Wait until every tracked peer has disconnected.
    pub async fn wait_for_peers(&self) {
        let peers: Vec<Peer> = self.peers.lock().clone();
        for peer in peers {
            peer.wait_for_disconnect().await;
        }
    }

    /// Disconnect every peer and log its final statistics.
    pub async fn shutdown(&self) {
        let peers: Vec<Peer> = self.peers.lock().drain(..).collect();
        for peer in &peers {
            peer.disconnect();
        }
        for peer in &peers {
            peer.wait_for_disconnect().await;
            match serde_json::to_string(&peer.stats_snapshot()) {
                Ok(json) => info!(peer = %peer, "Final stats: {}", json),
                Err(e) => error!(peer = %peer, "Failed to serialize stats: {}", e),
            }
        }
    }
}
