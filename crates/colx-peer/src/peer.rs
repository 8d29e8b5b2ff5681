//! Peer handle and its public API.

use crate::queue::{jittered_trickle_interval, Outbound, QueuedMessage};
use crate::session;
use crate::stats::{now_secs, LiveStats, NegotiatedState, StatsSnapshot};
use crate::{
    HandshakeState, KnownInventory, PeerConfig, PeerError, PeerResult, Transport,
};
use colx_wire::{
    Hash256, InvVect, Message, MsgAddr, MsgGetBlocks, MsgGetHeaders, MsgReject, MsgVersion,
    NetAddress, RejectCode, ServiceFlags, MAX_ADDR_PER_MSG, MAX_BLOCK_LOCATORS_PER_MSG,
    MULTIPLE_ADDRESS_VERSION, REJECT_VERSION,
};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a peer session. Clones share the session.
#[derive(Clone)]
pub struct Peer {
    pub(crate) inner: Arc<PeerInner>,
}

pub(crate) struct PeerInner {
    pub(crate) id: u64,
    pub(crate) inbound: bool,
    pub(crate) addr: OnceCell<SocketAddr>,
    pub(crate) config: PeerConfig,
    pub(crate) trickle_interval: Duration,

    connected: AtomicBool,
    disconnecting: AtomicBool,
    pub(crate) quit: CancellationToken,

    // Lock order: negotiated before stats.
    pub(crate) negotiated: RwLock<NegotiatedState>,
    pub(crate) stats: Mutex<LiveStats>,
    pub(crate) known_inventory: Mutex<KnownInventory>,
    known_addresses: Mutex<HashSet<String>>,
    prev_get_blocks: Mutex<Option<(Hash256, Hash256)>>,
    prev_get_headers: Mutex<Option<(Hash256, Hash256)>>,

    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
}

impl Peer {
    fn new(config: PeerConfig, inbound: bool, addr: Option<SocketAddr>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let addr_cell = OnceCell::new();
        if let Some(addr) = addr {
            let _ = addr_cell.set(addr);
        }

        let inner = PeerInner {
            id: NEXT_PEER_ID.fetch_add(1, Ordering::SeqCst),
            inbound,
            addr: addr_cell,
            trickle_interval: jittered_trickle_interval(config.trickle_interval),
            connected: AtomicBool::new(false),
            disconnecting: AtomicBool::new(false),
            quit: CancellationToken::new(),
            negotiated: RwLock::new(NegotiatedState::new(config.protocol_version)),
            stats: Mutex::new(LiveStats::default()),
            known_inventory: Mutex::new(KnownInventory::new(config.known_inventory_capacity)),
            known_addresses: Mutex::new(HashSet::new()),
            prev_get_blocks: Mutex::new(None),
            prev_get_headers: Mutex::new(None),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Peer for a connection accepted from the network. The address is taken
    /// from the transport on [`connect`](Self::connect).
    pub fn new_inbound(config: PeerConfig) -> Peer {
        Self::new(config, true, None)
    }

    /// Peer that will dial `addr` (`host:port`).
    pub fn new_outbound(config: PeerConfig, addr: &str) -> PeerResult<Peer> {
        let resolved = addr
            .to_socket_addrs()
            .map_err(|e| PeerError::AddressResolution {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| PeerError::AddressResolution {
                addr: addr.to_string(),
                reason: "no addresses".to_string(),
            })?;
        Ok(Self::new(config, false, Some(resolved)))
    }

    /// Attach a transport and start the session.
    ///
    /// Outbound peers send their version immediately. Fails without starting
    /// the session when the config does not validate. Calling this more than
    /// once has no effect. Must be called from within a tokio runtime.
    pub fn connect<T: Transport>(&self, conn: T) -> PeerResult<()> {
        if self.inner.connected.swap(true, Ordering::SeqCst) {
            debug!(peer = %self, "Already connected");
            return Ok(());
        }

        if let Err(e) = self.inner.config.validate() {
            warn!(peer = %self, error = %e, "Refusing to start session");
            self.disconnect();
            return Err(e);
        }

        if self.inner.inbound {
            match conn.remote_addr() {
                Ok(addr) => {
                    let _ = self.inner.addr.set(addr);
                }
                Err(e) => debug!(peer = %self, error = %e, "Remote address unavailable"),
            }
        }

        let Some(rx) = self.inner.outbound_rx.lock().take() else {
            return Ok(());
        };

        let initial = if self.inner.inbound {
            None
        } else {
            match self.local_version_msg() {
                Ok(version) => Some(version),
                Err(e) => {
                    warn!(peer = %self, error = %e, "Cannot build version message");
                    self.disconnect();
                    return Err(e);
                }
            }
        };

        self.inner.stats.lock().conn_time = Some(SystemTime::now());
        info!(peer = %self, id = self.inner.id, "Peer connected");

        let (reader, writer) = tokio::io::split(conn);
        tokio::spawn(session::read_pump(self.clone(), reader));
        tokio::spawn(session::write_pump(self.clone(), writer, rx, initial));
        tokio::spawn(session::supervisor(self.clone()));
        Ok(())
    }

    /// Stop the session. Safe to call repeatedly and from any task.
    pub fn disconnect(&self) {
        if self.inner.disconnecting.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(peer = %self, "Disconnecting");
        self.inner.quit.cancel();
    }

    /// Resolves once the session has been told to shut down.
    pub async fn wait_for_disconnect(&self) {
        self.inner.quit.cancelled().await;
    }

    /// Queue `msg` for the write pump.
    ///
    /// `done` fires once the message has been written or dropped, and at once
    /// if the peer is not connected.
    pub fn queue_message(&self, msg: Message, done: Option<oneshot::Sender<()>>) {
        let queued = QueuedMessage::new(msg, done);
        if !self.is_connected() {
            debug!(peer = %self, command = queued.message.command(), "Dropping message for disconnected peer");
            queued.complete();
            return;
        }
        if let Err(mpsc::error::SendError(item)) =
            self.inner.outbound_tx.send(Outbound::Message(queued))
        {
            item.complete();
        }
    }

    /// Queue an inventory vector for the next trickle unless the remote
    /// already knows it.
    pub fn queue_inventory(&self, iv: InvVect) {
        if self.inner.known_inventory.lock().contains(&iv) {
            return;
        }
        if !self.is_connected() {
            return;
        }
        let _ = self.inner.outbound_tx.send(Outbound::Inventory(iv));
    }

    /// Send the addresses the remote does not yet know.
    ///
    /// At most [`MAX_ADDR_PER_MSG`] are sent, a random subset when more are
    /// given. Returns the addresses actually sent.
    pub fn push_addr_message(&self, addresses: &[NetAddress]) -> PeerResult<Vec<NetAddress>> {
        let mut fresh: Vec<NetAddress> = {
            let known = self.inner.known_addresses.lock();
            addresses
                .iter()
                .filter(|na| !known.contains(&na.key()))
                .cloned()
                .collect()
        };
        if fresh.is_empty() {
            return Ok(fresh);
        }

        let max = if self.protocol_version() < MULTIPLE_ADDRESS_VERSION {
            1
        } else {
            MAX_ADDR_PER_MSG
        };
        if fresh.len() > max {
            fresh.shuffle(&mut rand::thread_rng());
            fresh.truncate(max);
        }

        let msg = MsgAddr {
            addr_list: fresh.clone(),
        };
        self.add_known_addresses(&fresh);
        self.queue_message(Message::Addr(msg), None);
        Ok(fresh)
    }

    /// Request blocks after `locator`, ignoring an immediate repeat of the
    /// previous request.
    pub fn push_get_blocks_message(&self, locator: Vec<Hash256>, stop: Hash256) -> PeerResult<()> {
        check_locator(&locator)?;
        let begin = locator.first().copied();
        let mut prev = self.inner.prev_get_blocks.lock();
        if is_repeat(*prev, begin, stop) {
            debug!(peer = %self, stop = %stop, "Filtering duplicate getblocks");
            return Ok(());
        }

        let mut msg = MsgGetBlocks::new(stop);
        msg.protocol_version = self.inner.config.protocol_version;
        msg.block_locator_hashes = locator;
        self.queue_message(Message::GetBlocks(msg), None);
        *prev = begin.map(|b| (b, stop));
        Ok(())
    }

    /// Request headers after `locator`, ignoring an immediate repeat of the
    /// previous request.
    pub fn push_get_headers_message(&self, locator: Vec<Hash256>, stop: Hash256) -> PeerResult<()> {
        check_locator(&locator)?;
        let begin = locator.first().copied();
        let mut prev = self.inner.prev_get_headers.lock();
        if is_repeat(*prev, begin, stop) {
            debug!(peer = %self, stop = %stop, "Filtering duplicate getheaders");
            return Ok(());
        }

        let mut msg = MsgGetHeaders::new(stop);
        msg.protocol_version = self.inner.config.protocol_version;
        msg.block_locator_hashes = locator;
        self.queue_message(Message::GetHeaders(msg), None);
        *prev = begin.map(|b| (b, stop));
        Ok(())
    }

    /// Send a `reject` if the negotiated version supports it. With `wait`,
    /// returns after the message has been written or dropped.
    pub async fn push_reject_message(
        &self,
        command: &str,
        code: RejectCode,
        reason: &str,
        hash: Option<Hash256>,
        wait: bool,
    ) {
        if self.protocol_version() < REJECT_VERSION {
            debug!(peer = %self, command, "Remote does not support reject");
            return;
        }

        let mut msg = MsgReject::new(command, code, reason);
        if MsgReject::carries_hash(command) {
            if hash.is_none() {
                warn!(peer = %self, command, "Reject for {} without a hash", command);
            }
            msg.hash = hash;
        }

        if !wait {
            self.queue_message(Message::Reject(msg), None);
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.queue_message(Message::Reject(msg), Some(tx));
        let _ = rx.await;
    }

    /// Build our version message, registering its nonce.
    pub(crate) fn local_version_msg(&self) -> PeerResult<MsgVersion> {
        let config = &self.inner.config;
        let height = match &config.newest_block {
            Some(newest) => newest().map_err(|e| PeerError::NewestBlock(e.to_string()))?.1,
            None => 0,
        };

        let their_addr = match self.addr() {
            Some(addr) => NetAddress::new(addr, ServiceFlags::NONE),
            None => NetAddress::default(),
        };
        let our_addr = NetAddress {
            services: config.services,
            ..NetAddress::default()
        };

        let nonce = rand::random::<u64>();
        config.nonce_registry.insert(nonce);

        let mut msg = MsgVersion::new(our_addr, their_addr, nonce, height);
        msg.protocol_version = config.protocol_version as i32;
        msg.services = config.services;
        msg.disable_relay_tx = config.disable_relay_tx;
        let comments: Vec<&str> = config.user_agent_comments.iter().map(String::as_str).collect();
        msg.add_user_agent(&config.user_agent_name, &config.user_agent_version, &comments)?;
        Ok(msg)
    }

    /// Process-unique peer id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Remote address, unknown for inbound peers until connected.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.inner.addr.get().copied()
    }

    /// True when the remote dialed us.
    pub fn inbound(&self) -> bool {
        self.inner.inbound
    }

    /// Configuration this peer was created with.
    pub fn config(&self) -> &PeerConfig {
        &self.inner.config
    }

    /// Started and not shutting down.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst) && !self.inner.disconnecting.load(Ordering::SeqCst)
    }

    /// Progress of the version/verack exchange.
    pub fn handshake_state(&self) -> HandshakeState {
        self.inner.negotiated.read().handshake.state()
    }

    /// Negotiated protocol version: the lower of ours and the remote's.
    pub fn protocol_version(&self) -> u32 {
        self.inner.negotiated.read().protocol_version
    }

    /// Services advertised by the remote.
    pub fn services(&self) -> ServiceFlags {
        self.inner.negotiated.read().services
    }

    /// Remote user agent, empty until its version arrives.
    pub fn user_agent(&self) -> String {
        self.inner.negotiated.read().user_agent.clone()
    }

    /// The remote version message has been received.
    pub fn version_known(&self) -> bool {
        self.inner.negotiated.read().version_known()
    }

    /// The remote acknowledged our version.
    pub fn verack_received(&self) -> bool {
        self.inner.negotiated.read().verack_received()
    }

    /// The remote asked us not to relay transactions.
    pub fn disable_relay_tx(&self) -> bool {
        self.inner.negotiated.read().disable_relay_tx
    }

    /// Remote sent `sendheaders`; announce blocks with headers.
    pub fn wants_headers(&self) -> bool {
        self.inner.negotiated.read().wants_headers
    }

    /// Best known height of the remote.
    pub fn last_block(&self) -> i32 {
        self.inner.stats.lock().last_block
    }

    /// Height from the remote version message.
    pub fn starting_height(&self) -> i32 {
        self.inner.stats.lock().starting_height
    }

    /// Most recent block the remote announced.
    pub fn last_announced_block(&self) -> Option<Hash256> {
        self.inner.stats.lock().last_announced_block
    }

    /// Remote clock minus ours, in seconds, sampled at version receipt.
    pub fn time_offset(&self) -> i64 {
        self.inner.stats.lock().time_offset
    }

    /// Nonce of the outstanding ping, 0 when none.
    pub fn last_ping_nonce(&self) -> u64 {
        self.inner.stats.lock().last_ping_nonce
    }

    /// When the last ping was written.
    pub fn last_ping_time(&self) -> Option<SystemTime> {
        self.inner.stats.lock().last_ping_time
    }

    /// Round trip of the last answered ping.
    pub fn last_ping_micros(&self) -> i64 {
        self.inner.stats.lock().last_ping_micros
    }

    /// Total bytes written.
    pub fn bytes_sent(&self) -> u64 {
        self.inner.stats.lock().bytes_sent
    }

    /// Total bytes read.
    pub fn bytes_received(&self) -> u64 {
        self.inner.stats.lock().bytes_received
    }

    /// Time of the last write.
    pub fn last_send(&self) -> Option<SystemTime> {
        self.inner.stats.lock().last_send
    }

    /// Time of the last read.
    pub fn last_recv(&self) -> Option<SystemTime> {
        self.inner.stats.lock().last_recv
    }

    /// When `connect` started the session.
    pub fn conn_time(&self) -> Option<SystemTime> {
        self.inner.stats.lock().conn_time
    }

    /// Consistent view of negotiated state and counters.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        let negotiated = self.inner.negotiated.read();
        let stats = self.inner.stats.lock();
        StatsSnapshot::build(
            self.inner.id,
            self.addr_string(),
            self.inner.inbound,
            &negotiated,
            &stats,
        )
    }

    /// Raise the remote's known height. Lower heights are ignored.
    pub fn update_last_block_height(&self, height: i32) {
        let mut stats = self.inner.stats.lock();
        if height <= stats.last_block {
            return;
        }
        debug!(peer = %self, from = stats.last_block, to = height, "Updating last block height");
        stats.last_block = height;
    }

    /// Record the most recent block announced by the remote.
    pub fn update_last_announced_block(&self, hash: Hash256) {
        debug!(peer = %self, block = %hash, "Updating last announced block");
        self.inner.stats.lock().last_announced_block = Some(hash);
    }

    /// Mark `iv` as known to the remote so it is never announced to it.
    pub fn add_known_inventory(&self, iv: InvVect) {
        self.inner.known_inventory.lock().insert(iv);
    }

    pub(crate) fn add_known_addresses(&self, addresses: &[NetAddress]) {
        let mut known = self.inner.known_addresses.lock();
        for na in addresses {
            known.insert(na.key());
        }
    }

    pub(crate) fn record_time_offset(&self, remote_timestamp: i64) {
        self.inner.stats.lock().time_offset = remote_timestamp - now_secs();
    }

    fn addr_string(&self) -> String {
        self.addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

fn check_locator(locator: &[Hash256]) -> PeerResult<()> {
    if locator.len() > MAX_BLOCK_LOCATORS_PER_MSG {
        return Err(PeerError::InvalidRequest(format!(
            "Block locator has {} hashes, max {}",
            locator.len(),
            MAX_BLOCK_LOCATORS_PER_MSG
        )));
    }
    Ok(())
}

fn is_repeat(prev: Option<(Hash256, Hash256)>, begin: Option<Hash256>, stop: Hash256) -> bool {
    matches!((prev, begin), (Some((pb, ps)), Some(b)) if pb == b && ps == stop)
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.inner.inbound { "inbound" } else { "outbound" };
        write!(f, "{} ({})", self.addr_string(), direction)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.inner.id)
            .field("addr", &self.addr())
            .field("inbound", &self.inner.inbound)
            .field("state", &self.handshake_state())
            .finish()
    }
}
