//! Test harness for session tests.
//!
//! Provides in-memory transports, a listener that forwards events to a
//! channel, and helpers to wait for asynchronous state changes.

use colx_peer::{MessageListener, NonceRegistry, Peer, PeerConfig, PeerError, Transport, NONCE_REGISTRY_CAPACITY};
use colx_wire::{Message, MsgAddr, MsgGetBlocks, MsgInv, MsgPing, MsgPong, MsgReject, MsgVersion};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

/// Default wait for asynchronous conditions.
pub const WAIT: Duration = Duration::from_secs(5);

/// One end of an in-memory connection.
pub struct MockConn {
    stream: DuplexStream,
    remote: SocketAddr,
}

impl MockConn {
    pub fn new(stream: DuplexStream, remote: SocketAddr) -> Self {
        Self { stream, remote }
    }
}

/// Two connected in-memory transports.
///
/// The first end reports `10.0.0.2:8333` as its remote, the second
/// `10.0.0.1:8333`.
pub fn pipe() -> (MockConn, MockConn) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let a_addr = SocketAddr::from(([10, 0, 0, 1], 8333));
    let b_addr = SocketAddr::from(([10, 0, 0, 2], 8333));
    (MockConn::new(a, b_addr), MockConn::new(b, a_addr))
}

impl AsyncRead for MockConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

impl Transport for MockConn {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.remote)
    }
}

/// Transport whose reads and writes never complete.
#[derive(Debug, Default)]
pub struct HungConn;

impl AsyncRead for HungConn {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for HungConn {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Pending
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Transport for HungConn {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([10, 0, 0, 9], 8333)))
    }
}

/// Transport that accepts every write but never finishes shutting down.
///
/// The flag returned by [`StuckShutdownConn::new`] is set once the
/// transport is dropped.
#[derive(Debug)]
pub struct StuckShutdownConn {
    dropped: Arc<AtomicBool>,
}

impl StuckShutdownConn {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Self {
                dropped: dropped.clone(),
            },
            dropped,
        )
    }
}

impl Drop for StuckShutdownConn {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

impl AsyncRead for StuckShutdownConn {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for StuckShutdownConn {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl Transport for StuckShutdownConn {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([10, 0, 0, 10], 8333)))
    }
}

/// Events observed by a [`RecordingListener`].
#[derive(Debug, Clone)]
pub enum Event {
    Version(MsgVersion),
    VerAck,
    Addr(MsgAddr),
    Inv(MsgInv),
    Ping(MsgPing),
    Pong(MsgPong),
    GetBlocks(MsgGetBlocks),
    Reject(MsgReject),
    Read {
        bytes: usize,
        command: Option<String>,
        error: Option<String>,
    },
    Write {
        bytes: usize,
        command: String,
        error: Option<String>,
    },
}

/// Listener forwarding every callback to a channel.
pub struct RecordingListener {
    tx: mpsc::UnboundedSender<Event>,
}

impl RecordingListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl MessageListener for RecordingListener {
    fn on_version(&self, _peer: &Peer, msg: &MsgVersion) {
        self.send(Event::Version(msg.clone()));
    }

    fn on_verack(&self, _peer: &Peer) {
        self.send(Event::VerAck);
    }

    fn on_addr(&self, _peer: &Peer, msg: &MsgAddr) {
        self.send(Event::Addr(msg.clone()));
    }

    fn on_inv(&self, _peer: &Peer, msg: &MsgInv) {
        self.send(Event::Inv(msg.clone()));
    }

    fn on_ping(&self, _peer: &Peer, msg: &MsgPing) {
        self.send(Event::Ping(*msg));
    }

    fn on_pong(&self, _peer: &Peer, msg: &MsgPong) {
        self.send(Event::Pong(*msg));
    }

    fn on_get_blocks(&self, _peer: &Peer, msg: &MsgGetBlocks) {
        self.send(Event::GetBlocks(msg.clone()));
    }

    fn on_reject(&self, _peer: &Peer, msg: &MsgReject) {
        self.send(Event::Reject(msg.clone()));
    }

    fn on_read(&self, _peer: &Peer, bytes: usize, msg: Option<&Message>, err: Option<&PeerError>) {
        self.send(Event::Read {
            bytes,
            command: msg.map(|m| m.command().to_string()),
            error: err.map(|e| e.to_string()),
        });
    }

    fn on_write(&self, _peer: &Peer, bytes: usize, msg: &Message, err: Option<&PeerError>) {
        self.send(Event::Write {
            bytes,
            command: msg.command().to_string(),
            error: err.map(|e| e.to_string()),
        });
    }
}

/// Configuration for session tests: fixed user agent, private nonce
/// registry, fast liveness checks and no keepalive pings.
pub fn test_config() -> PeerConfig {
    PeerConfig {
        user_agent_name: "peer".to_string(),
        user_agent_version: "1.0".to_string(),
        allow_self_connections: true,
        nonce_registry: Arc::new(NonceRegistry::new(NONCE_REGISTRY_CAPACITY)),
        ping_interval: Duration::from_secs(3600),
        stall_tick: Duration::from_millis(50),
        trickle_interval: Duration::from_millis(50),
        ..PeerConfig::default()
    }
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Receive events until one matches `pick`, or `None` after [`WAIT`].
pub async fn next_event<T, F>(rx: &mut mpsc::UnboundedReceiver<Event>, mut pick: F) -> Option<T>
where
    F: FnMut(Event) -> Option<T>,
{
    let search = async {
        while let Some(event) = rx.recv().await {
            if let Some(found) = pick(event) {
                return Some(found);
            }
        }
        None
    };
    tokio::time::timeout(WAIT, search).await.ok().flatten()
}

/// Connect an outbound and an inbound peer over a [`pipe`] and wait for
/// both handshakes to complete.
pub async fn connected_pair(outbound_config: PeerConfig, inbound_config: PeerConfig) -> (Peer, Peer) {
    let (out_conn, in_conn) = pipe();
    let outbound = Peer::new_outbound(outbound_config, "10.0.0.2:8333").expect("resolvable address");
    let inbound = Peer::new_inbound(inbound_config);

    inbound.connect(in_conn).expect("inbound connect");
    outbound.connect(out_conn).expect("outbound connect");

    let established = wait_until(|| {
        outbound.handshake_state() == colx_peer::HandshakeState::Established
            && inbound.handshake_state() == colx_peer::HandshakeState::Established
    })
    .await;
    assert!(established, "handshake did not complete");
    (outbound, inbound)
}
